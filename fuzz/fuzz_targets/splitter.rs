#![no_main]

use {
  arbitrary::Arbitrary,
  bitcoin::{hashes::Hash, Amount, OutPoint, ScriptBuf, Txid},
  chainscribe::{Chain, Config, FeeRate, OutputKind, Splitter, UtxoOffsetRecord},
  libfuzzer_sys::fuzz_target,
};

#[derive(Clone, Debug, Arbitrary)]
struct Record {
  value: u32,
  offsets: Vec<u32>,
}

fuzz_target!(|input: (u8, Vec<Record>)| {
  let (fee_rate, records) = input;

  let records = records
    .into_iter()
    .take(16)
    .enumerate()
    .filter_map(|(vout, record)| {
      UtxoOffsetRecord::new(
        OutPoint {
          txid: Txid::all_zeros(),
          vout: vout as u32,
        },
        Amount::from_sat(record.value.into()),
        record.offsets.into_iter().take(16).map(u64::from).collect(),
      )
      .ok()
    })
    .collect::<Vec<UtxoOffsetRecord>>();

  if records.is_empty() {
    return;
  }

  let config = Config::default();

  let split = Splitter::new(
    &config,
    Chain::Regtest,
    ScriptBuf::new(),
    FeeRate::try_from(f64::from(fee_rate)).unwrap(),
  )
  .unwrap()
  .split(&records)
  .unwrap();

  let total = records
    .iter()
    .fold(Amount::ZERO, |total, record| total + record.value);

  if split.result.is_fee_paid {
    assert_eq!(split.plan.total() + split.plan.fee, total);
  } else {
    assert!(split.plan.total() <= total);
  }

  for output in &split.plan.outputs {
    if output.kind == OutputKind::Ordinal {
      assert!(output.value.to_sat() >= config.min_ordinal_value);
    }
  }
});
