//! Offset-aware UTXO splitting.
//!
//! Records are laid end to end in input order, which is also the order sats
//! flow into outputs, so every inscription has a single position on one line
//! of sats. The splitter walks a cursor along that line and cuts it into
//! contiguous outputs: an ordinal output per inscription worth at least the
//! minimum ordinal value, gap outputs for spans between inscriptions that are
//! large enough to stand alone, and a trailing change output.

use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RecordFile")]
pub struct UtxoOffsetRecord {
  pub outpoint: OutPoint,
  pub value: Amount,
  offsets: Vec<u64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordFile {
  txid: Txid,
  vout: u32,
  value: u64,
  offsets: Vec<u64>,
}

impl TryFrom<RecordFile> for UtxoOffsetRecord {
  type Error = Error;

  fn try_from(record: RecordFile) -> Result<Self> {
    Self::new(
      OutPoint {
        txid: record.txid,
        vout: record.vout,
      },
      Amount::from_sat(record.value),
      record.offsets,
    )
  }
}

impl UtxoOffsetRecord {
  pub fn new(outpoint: OutPoint, value: Amount, mut offsets: Vec<u64>) -> Result<Self> {
    if offsets.is_empty() {
      bail!("{outpoint} has no inscription offsets");
    }

    if value > Amount::MAX_MONEY {
      bail!(
        "value {} of {outpoint} exceeds the money supply",
        value.to_sat()
      );
    }

    offsets.sort_unstable();
    offsets.dedup();

    if let Some(offset) = offsets.last().filter(|offset| **offset >= value.to_sat()) {
      bail!(
        "offset {offset} is past the end of {outpoint} with value {}",
        value.to_sat()
      );
    }

    Ok(Self {
      outpoint,
      value,
      offsets,
    })
  }

  /// Offsets in ascending order, without duplicates.
  pub fn offsets(&self) -> &[u64] {
    &self.offsets
  }

  /// Room left after the last inscription's minimum allotment. Negative when
  /// the last inscription sits closer than the minimum to the end.
  fn slack(&self, min_ordinal_value: u64) -> i64 {
    let last = self.offsets.last().copied().unwrap_or_default();
    self.value.to_sat() as i64 - last as i64 - min_ordinal_value as i64
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
  Ordinal,
  Gap,
  ServiceFee,
}

impl Display for OutputKind {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(
      f,
      "{}",
      match self {
        Self::Ordinal => "ordinal",
        Self::Gap => "gap",
        Self::ServiceFee => "service-fee",
      }
    )
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
  pub script_pubkey: ScriptBuf,
  pub value: Amount,
  pub kind: OutputKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
  pub outputs: Vec<PlannedOutput>,
  pub fee: Amount,
}

impl OutputPlan {
  pub fn total(&self) -> Amount {
    self
      .outputs
      .iter()
      .fold(Amount::ZERO, |total, output| total + output.value)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitResult {
  pub change: i64,
  pub is_fee_paid: bool,
  pub service_fee_remaining: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
  /// Inputs in the order their value flows into the outputs.
  pub inputs: Vec<OutPoint>,
  pub plan: OutputPlan,
  pub result: SplitResult,
}

impl Split {
  /// The plan as an unsigned transaction.
  pub fn transaction(&self) -> Transaction {
    Transaction {
      version: TRANSACTION_VERSION,
      lock_time: LockTime::ZERO,
      input: self
        .inputs
        .iter()
        .map(|previous_output| TxIn {
          previous_output: *previous_output,
          script_sig: ScriptBuf::new(),
          sequence: Sequence::MAX,
          witness: Witness::new(),
        })
        .collect(),
      output: self
        .plan
        .outputs
        .iter()
        .map(|output| TxOut {
          value: output.value.to_sat(),
          script_pubkey: output.script_pubkey.clone(),
        })
        .collect(),
    }
  }
}

/// A half-open span of the sat line.
#[derive(Debug)]
struct Allotment {
  start: u64,
  end: u64,
  kind: OutputKind,
  last_inscription: Option<u64>,
}

impl Allotment {
  fn value(&self) -> u64 {
    self.end - self.start
  }
}

#[derive(Default)]
struct Walk {
  allotments: Vec<Allotment>,
  cursor: u64,
  // Inscription whose value could not stand alone and rides on the next
  // output.
  pending: Option<u64>,
  quota: u64,
}

impl Walk {
  fn push(&mut self, end: u64, kind: OutputKind, last_inscription: Option<u64>) {
    let (kind, last_inscription) = match self.pending.take() {
      Some(pending) => (OutputKind::Ordinal, last_inscription.or(Some(pending))),
      None => (kind, last_inscription),
    };

    self.allotments.push(Allotment {
      start: self.cursor,
      end,
      kind,
      last_inscription,
    });

    self.cursor = end;
  }
}

pub struct Splitter {
  script_pubkey: ScriptBuf,
  min_ordinal_value: u64,
  dust_floor: u64,
  fee_rate: FeeRate,
  service: Option<(ScriptBuf, Amount)>,
}

impl Splitter {
  pub fn new(
    config: &Config,
    chain: Chain,
    script_pubkey: ScriptBuf,
    fee_rate: FeeRate,
  ) -> Result<Self> {
    let service = config
      .splitter_fee_for(chain)
      .map(|fee| -> Result<(ScriptBuf, Amount)> {
        Ok((
          chain
            .address_to_script(&fee.address)
            .context("invalid splitter fee address")?,
          Amount::from_sat(fee.amount),
        ))
      })
      .transpose()?;

    Ok(Self {
      script_pubkey,
      min_ordinal_value: config.min_ordinal_value,
      dust_floor: config.dust_floor,
      fee_rate,
      service,
    })
  }

  pub fn split(&self, records: &[UtxoOffsetRecord]) -> Result<Split> {
    let min = self.min_ordinal_value;

    let mut outpoints = BTreeSet::new();
    for record in records {
      if !outpoints.insert(record.outpoint) {
        bail!("{} is listed more than once", record.outpoint);
      }
    }

    let mut records = records.to_vec();
    records.sort_by_key(|record| record.slack(min));

    let mut walk = Walk {
      quota: self
        .service
        .as_ref()
        .map(|(_, quota)| quota.to_sat())
        .unwrap_or_default(),
      ..Default::default()
    };

    let mut start = 0u64;
    for record in &records {
      let end = start
        .checked_add(record.value.to_sat())
        .filter(|end| *end <= Amount::MAX_MONEY.to_sat())
        .ok_or_else(|| anyhow!("records total more than the money supply"))?;
      for offset in record.offsets() {
        self.place(&mut walk, start, end, start + offset);
      }
      start = end;
    }
    let total = start;

    let outputs = walk.allotments.len() + 1 + usize::from(walk.quota > 0);
    let fee = self.fee_rate.linear_fee(records.len(), outputs);

    let change = total as i64 - walk.cursor as i64 - fee.to_sat() as i64;

    let is_fee_paid = match walk.pending {
      Some(_) => change >= min as i64,
      None => change >= 0,
    };

    if is_fee_paid {
      let mut change = change as u64;

      if walk.pending.is_none()
        && walk.quota >= self.dust_floor
        && change
          .checked_sub(walk.quota)
          .map_or(false, |rest| rest >= self.dust_floor)
      {
        change -= walk.quota;
        walk.push(walk.cursor + walk.quota, OutputKind::ServiceFee, None);
        walk.quota = 0;
      }

      walk.push(walk.cursor + change, OutputKind::Gap, None);
    } else {
      log::warn!(
        "split of {total} sat leaves {change} sat after a {} sat fee, plan is unfunded",
        fee.to_sat()
      );
    }

    let plan = OutputPlan {
      outputs: walk
        .allotments
        .iter()
        .map(|allotment| PlannedOutput {
          script_pubkey: match (&self.service, allotment.kind) {
            (Some((script_pubkey, _)), OutputKind::ServiceFee) => script_pubkey.clone(),
            _ => self.script_pubkey.clone(),
          },
          value: Amount::from_sat(allotment.value()),
          kind: allotment.kind,
        })
        .collect(),
      fee,
    };

    for (i, output) in plan.outputs.iter().enumerate() {
      log::debug!("output {i}: {} {} sat", output.kind, output.value.to_sat());
    }

    Ok(Split {
      inputs: records.iter().map(|record| record.outpoint).collect(),
      result: SplitResult {
        change,
        is_fee_paid,
        service_fee_remaining: Amount::from_sat(walk.quota),
      },
      plan,
    })
  }

  /// Emits the outputs that carve the inscription at `position` out of the
  /// record spanning `[start, end)`.
  fn place(&self, walk: &mut Walk, start: u64, end: u64, position: u64) {
    let min = self.min_ordinal_value;

    if position < walk.cursor {
      return;
    }

    let (mut from, mut to) = if position - walk.cursor >= min {
      self.gap(walk, position);
      (position, position + min)
    } else {
      (walk.cursor, walk.cursor.max(start) + min)
    };

    if to > end {
      to = end;
      let deficit = min.saturating_sub(to - from);

      if deficit > 0 {
        match walk.allotments.last_mut() {
          Some(previous)
            if previous.kind != OutputKind::ServiceFee
              && previous.value() >= min + deficit
              && previous
                .last_inscription
                .map_or(true, |inscription| inscription < previous.end - deficit) =>
          {
            previous.end -= deficit;
            walk.cursor -= deficit;
            from -= deficit;
          }
          Some(previous) => {
            previous.end = end;
            previous.kind = OutputKind::Ordinal;
            previous.last_inscription = Some(position);
            walk.cursor = end;
            return;
          }
          None => {
            walk.pending = walk.pending.or(Some(position));
            return;
          }
        }
      }
    }

    debug_assert_eq!(from, walk.cursor);
    walk.push(to, OutputKind::Ordinal, Some(position));
  }

  /// Emits `[cursor, position)`, siphoning service quota off its front when
  /// the rest still stands alone.
  fn gap(&self, walk: &mut Walk, position: u64) {
    let min = self.min_ordinal_value;

    if walk.pending.is_none() && walk.quota > 0 {
      let siphon = walk.quota.min(position - walk.cursor - min);
      if siphon >= self.dust_floor {
        walk.push(walk.cursor + siphon, OutputKind::ServiceFee, None);
        walk.quota -= siphon;
      }
    }

    walk.push(position, OutputKind::Gap, None);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn splitter(fee_rate: f64) -> Splitter {
    Splitter::new(
      &Config::default(),
      Chain::Regtest,
      recipient(),
      FeeRate::try_from(fee_rate).unwrap(),
    )
    .unwrap()
  }

  fn values(split: &Split) -> Vec<u64> {
    split
      .plan
      .outputs
      .iter()
      .map(|output| output.value.to_sat())
      .collect()
  }

  fn kinds(split: &Split) -> Vec<OutputKind> {
    split.plan.outputs.iter().map(|output| output.kind).collect()
  }

  #[track_caller]
  fn case(records: &[UtxoOffsetRecord], outputs: &[u64], change: u64) {
    let split = splitter(200.0).split(records).unwrap();

    let mut expected = outputs.to_vec();
    expected.push(change);

    assert_eq!(values(&split), expected);
    assert_eq!(split.result.change, change as i64);
    assert!(split.result.is_fee_paid);

    let total = records
      .iter()
      .map(|record| record.value.to_sat())
      .sum::<u64>();
    assert_eq!(split.plan.total() + split.plan.fee, Amount::from_sat(total));

    for output in &split.plan.outputs {
      if output.kind == OutputKind::Ordinal {
        assert!(output.value.to_sat() >= 1000);
      }
    }
  }

  #[test]
  fn two_adjacent_inscriptions() {
    case(&[record(1, 100_000, &[0, 1000])], &[1000, 1000], 46_000);
  }

  #[test]
  fn single_inscription() {
    case(&[record(1, 60_000, &[0])], &[1000], 13_800);
  }

  #[test]
  fn short_gap_is_absorbed() {
    case(
      &[record(1, 2000, &[500]), record(2, 1_000_000, &[0])],
      &[1000, 1000, 1000],
      910_600,
    );
  }

  #[test]
  fn gaps_before_inscriptions() {
    case(
      &[record(1, 5000, &[1500]), record(2, 135_000, &[0])],
      &[1500, 1000, 2500, 1000],
      38_800,
    );
  }

  #[test]
  fn inscription_near_end_borrows_from_gap() {
    case(
      &[record(1, 200_600, &[200_500]), record(2, 135_000, &[0])],
      &[199_600, 1000, 1000],
      45_600,
    );
  }

  #[test]
  fn inscription_inside_previous_allotment() {
    case(
      &[record(1, 200_600, &[200_500, 200_501]), record(2, 135_000, &[0])],
      &[199_600, 1000, 1000],
      45_600,
    );
  }

  #[test]
  fn records_sorted_by_slack() {
    case(
      &[
        record(1, 135_000, &[0, 134_999]),
        record(2, 200_600, &[200_500, 200_501]),
        record(3, 1_000_000, &[0]),
      ],
      &[1000, 133_000, 1000, 199_600, 1000, 1000],
      860_600,
    );
  }

  #[test]
  fn close_inscriptions_share_no_gap() {
    case(
      &[
        record(1, 135_000, &[0, 1001, 134_999]),
        record(2, 200_600, &[200_500, 200_501]),
        record(3, 1_000_000, &[0]),
      ],
      &[1000, 1000, 132_000, 1000, 199_600, 1000, 1000],
      853_800,
    );
  }

  #[test]
  fn small_previous_ordinal_absorbs_record_end() {
    case(
      &[
        record(1, 135_500, &[0, 1001, 134_000, 135_300]),
        record(2, 3000, &[1000]),
        record(3, 1_000_000, &[0]),
      ],
      &[1000, 1000, 132_000, 1500, 1000, 1000, 1000, 1000],
      847_000,
    );
  }

  #[test]
  fn small_record_fits_behind_merged_ordinal() {
    case(
      &[
        record(1, 135_500, &[0, 1001, 134_000, 135_300]),
        record(2, 1000, &[300]),
        record(3, 1_000_000, &[0]),
      ],
      &[1000, 1000, 132_000, 1500, 1000, 1000],
      860_600,
    );
  }

  #[test]
  fn remaining_value_below_minimum() {
    let split = splitter(1.0).split(&[record(1, 2000, &[500])]).unwrap();
    assert_eq!(values(&split), [1000, 774]);
    assert_eq!(kinds(&split), [OutputKind::Ordinal, OutputKind::Gap]);
    assert_eq!(split.plan.fee, Amount::from_sat(226));
  }

  #[test]
  fn unfunded_plan() {
    let split = splitter(10.0).split(&[record(1, 2000, &[500])]).unwrap();
    assert_eq!(values(&split), [1000]);
    assert_eq!(
      split.result,
      SplitResult {
        change: -1260,
        is_fee_paid: false,
        service_fee_remaining: Amount::ZERO,
      }
    );
  }

  #[test]
  fn undersized_record_merges_forward() {
    let split = splitter(1.0).split(&[record(1, 500, &[0]), record(2, 5000, &[0])]).unwrap();
    assert_eq!(values(&split), [1500, 3626]);
    assert_eq!(kinds(&split), [OutputKind::Ordinal, OutputKind::Gap]);
    assert_eq!(split.inputs, [outpoint(1), outpoint(2)]);
  }

  #[test]
  fn forward_merge_turns_gap_into_ordinal() {
    let split = splitter(1.0).split(&[record(1, 500, &[0]), record(2, 5000, &[3000])]).unwrap();
    assert_eq!(values(&split), [3500, 1000, 592]);
    assert_eq!(
      kinds(&split),
      [OutputKind::Ordinal, OutputKind::Ordinal, OutputKind::Gap]
    );
  }

  #[test]
  fn forward_merge_into_change_needs_minimum() {
    let split = splitter(1.0).split(&[record(1, 500, &[0])]).unwrap();
    assert!(split.plan.outputs.is_empty());
    assert_eq!(split.result.change, 308);
    assert!(!split.result.is_fee_paid);

    let split = splitter(1.0).split(&[record(1, 900, &[100])]).unwrap();
    assert!(split.plan.outputs.is_empty());
    assert!(!split.result.is_fee_paid);

    let split = splitter(1.0).split(&[record(1, 999, &[0]), record(2, 500, &[0])]).unwrap();
    assert_eq!(split.inputs, [outpoint(2), outpoint(1)]);
    assert_eq!(values(&split), [1499]);
    assert_eq!(kinds(&split), [OutputKind::Ordinal]);
    assert_eq!(split.result.change, -374);
    assert!(!split.result.is_fee_paid);
  }

  fn service_splitter(quota: u64) -> Splitter {
    Splitter::new(
      &Config {
        splitter_fee: Some(SplitterFee {
          address: Chain::Mainnet.script_to_address(&change(7)).unwrap(),
          amount: quota,
        }),
        ..Default::default()
      },
      Chain::Mainnet,
      recipient(),
      FeeRate::try_from(1.0).unwrap(),
    )
    .unwrap()
  }

  #[test]
  fn service_quota_siphoned_from_gap() {
    let split = service_splitter(5000).split(&[record(1, 100_000, &[0, 50_000])]).unwrap();

    assert_eq!(values(&split), [1000, 5000, 44_000, 1000, 48_672]);
    assert_eq!(
      kinds(&split),
      [
        OutputKind::Ordinal,
        OutputKind::ServiceFee,
        OutputKind::Gap,
        OutputKind::Ordinal,
        OutputKind::Gap,
      ]
    );
    assert_eq!(split.plan.outputs[1].script_pubkey, change(7));
    assert_eq!(split.plan.outputs[2].script_pubkey, recipient());
    assert_eq!(split.result.service_fee_remaining, Amount::ZERO);
  }

  #[test]
  fn service_quota_siphoned_from_change() {
    let split = service_splitter(5000).split(&[record(1, 100_000, &[0])]).unwrap();

    assert_eq!(values(&split), [1000, 5000, 93_740]);
    assert_eq!(
      kinds(&split),
      [OutputKind::Ordinal, OutputKind::ServiceFee, OutputKind::Gap]
    );
    assert_eq!(split.plan.fee, Amount::from_sat(260));
    assert_eq!(split.result.service_fee_remaining, Amount::ZERO);
  }

  #[test]
  fn service_quota_left_when_change_is_short() {
    let split = service_splitter(5000).split(&[record(1, 3000, &[0])]).unwrap();

    assert_eq!(values(&split), [1000, 1740]);
    assert_eq!(split.result.service_fee_remaining, Amount::from_sat(5000));
  }

  #[test]
  fn service_quota_from_change_leaves_no_dust() {
    for quota in [98_740, 98_000] {
      let split = service_splitter(quota)
        .split(&[record(1, 100_000, &[0])])
        .unwrap();

      assert_eq!(values(&split), [1000, 98_740]);
      assert_eq!(kinds(&split), [OutputKind::Ordinal, OutputKind::Gap]);
      assert_eq!(split.result.service_fee_remaining, Amount::from_sat(quota));
    }

    let split = service_splitter(97_740)
      .split(&[record(1, 100_000, &[0])])
      .unwrap();

    assert_eq!(values(&split), [1000, 97_740, 1000]);
    assert_eq!(
      kinds(&split),
      [OutputKind::Ordinal, OutputKind::ServiceFee, OutputKind::Gap]
    );
    assert_eq!(split.result.service_fee_remaining, Amount::ZERO);
  }

  #[test]
  fn service_quota_below_dust_floor_is_not_siphoned() {
    let split = service_splitter(500)
      .split(&[record(1, 100_000, &[0])])
      .unwrap();

    assert_eq!(values(&split), [1000, 98_740]);
    assert_eq!(kinds(&split), [OutputKind::Ordinal, OutputKind::Gap]);
    assert_eq!(split.result.service_fee_remaining, Amount::from_sat(500));
  }

  #[test]
  fn duplicate_outpoints_are_rejected() {
    assert_eq!(
      splitter(1.0)
        .split(&[record(1, 100_000, &[0]), record(1, 100_000, &[0])])
        .unwrap_err()
        .to_string(),
      format!("{} is listed more than once", outpoint(1))
    );
  }

  #[test]
  fn records_above_money_supply_are_rejected() {
    let max = Amount::MAX_MONEY.to_sat();

    assert_eq!(
      splitter(1.0)
        .split(&[record(1, max, &[0]), record(2, 100_000, &[0])])
        .unwrap_err()
        .to_string(),
      "records total more than the money supply"
    );
  }

  #[test]
  fn service_quota_ignored_on_test_networks() {
    let splitter = Splitter::new(
      &Config {
        splitter_fee: Some(SplitterFee {
          address: "bogus".into(),
          amount: 5000,
        }),
        ..Default::default()
      },
      Chain::Testnet,
      recipient(),
      FeeRate::try_from(1.0).unwrap(),
    )
    .unwrap();

    let split = splitter.split(&[record(1, 100_000, &[0])]).unwrap();
    assert_eq!(kinds(&split), [OutputKind::Ordinal, OutputKind::Gap]);
  }

  #[test]
  fn unsigned_transaction_follows_plan() {
    let split = splitter(1.0).split(&[record(1, 100_000, &[0]), record(2, 2000, &[500])]).unwrap();
    let tx = split.transaction();

    assert_eq!(
      tx.input
        .iter()
        .map(|input| input.previous_output)
        .collect::<Vec<OutPoint>>(),
      [outpoint(2), outpoint(1)]
    );
    assert_eq!(tx.output.len(), split.plan.outputs.len());
    for (output, planned) in tx.output.iter().zip(&split.plan.outputs) {
      assert_eq!(output.value, planned.value.to_sat());
      assert_eq!(output.script_pubkey, recipient());
    }
  }

  #[test]
  fn records_are_validated() {
    assert_eq!(
      UtxoOffsetRecord::new(outpoint(1), Amount::from_sat(1000), Vec::new())
        .unwrap_err()
        .to_string(),
      format!("{} has no inscription offsets", outpoint(1))
    );

    assert_eq!(
      UtxoOffsetRecord::new(outpoint(1), Amount::from_sat(1000), vec![0, 1000])
        .unwrap_err()
        .to_string(),
      format!(
        "offset 1000 is past the end of {} with value 1000",
        outpoint(1)
      )
    );

    assert_eq!(
      UtxoOffsetRecord::new(outpoint(1), Amount::from_sat(u64::MAX - 10), vec![0])
        .unwrap_err()
        .to_string(),
      format!(
        "value {} of {} exceeds the money supply",
        u64::MAX - 10,
        outpoint(1)
      )
    );

    assert_eq!(record(1, 5000, &[300, 0, 300]).offsets(), [0, 300]);
  }

  #[test]
  fn records_deserialize() {
    let parsed: UtxoOffsetRecord = serde_yaml::from_str(&format!(
      "txid: {}\nvout: 1\nvalue: 5000\noffsets: [1500]\n",
      txid(1)
    ))
    .unwrap();

    assert_eq!(parsed, record(1, 5000, &[1500]));

    assert!(serde_yaml::from_str::<UtxoOffsetRecord>(&format!(
      "txid: {}\nvout: 1\nvalue: 5000\noffsets: [5000]\n",
      txid(1)
    ))
    .is_err());
  }
}
