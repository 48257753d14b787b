use super::*;

/// A disposable, fully signed copy of a link and the fee its size implies.
pub(crate) struct Probe {
  pub(crate) fee: Amount,
  pub(crate) transaction: Transaction,
}

pub(crate) struct FeeEstimator<'a> {
  pub(crate) signer: &'a Signer,
  pub(crate) fee_rate: FeeRate,
}

impl<'a> FeeEstimator<'a> {
  fn placeholder(&self) -> TxOut {
    TxOut {
      value: 0,
      script_pubkey: self.signer.script_pubkey(),
    }
  }

  fn measure(&self, transaction: Transaction) -> Probe {
    Probe {
      fee: self.fee_rate.fee(transaction.vsize()),
      transaction,
    }
  }

  /// Signs and finalizes funding inputs normally, with a zero-value change
  /// placeholder appended to `outputs`.
  pub(crate) fn probe(&self, funding: &[Utxo], outputs: &[TxOut]) -> Result<Probe, Error> {
    let mut outputs = outputs.to_vec();
    outputs.push(self.placeholder());
    Ok(self.measure(link::assemble(
      self.signer,
      LinkInputs::Funding(funding),
      outputs,
    )?))
  }

  /// Spends `prior` with the real replayed unlock script so the measured size
  /// includes it.
  pub(crate) fn continuation(
    &self,
    prior: &PriorLinkHandle,
    outputs: &[TxOut],
    change: bool,
  ) -> Result<Probe, Error> {
    let mut outputs = outputs.to_vec();
    if change {
      outputs.push(self.placeholder());
    }
    Ok(self.measure(link::assemble(
      self.signer,
      LinkInputs::Prior(prior),
      outputs,
    )?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn probe_includes_change_placeholder() {
    let signer = signer();
    let estimator = FeeEstimator {
      signer: &signer,
      fee_rate: FeeRate::try_from(1.0).unwrap(),
    };

    let probe = estimator
      .probe(
        &[Utxo::synthetic()],
        &[TxOut {
          value: 1000,
          script_pubkey: recipient(),
        }],
      )
      .unwrap();

    assert_eq!(probe.transaction.output.len(), 2);
    assert_eq!(probe.transaction.output[1].value, 0);
    assert_eq!(
      probe.fee,
      Amount::from_sat(probe.transaction.vsize() as u64)
    );
  }

  #[test]
  fn fee_scales_with_rate() {
    let signer = signer();
    let outputs = [TxOut {
      value: 1000,
      script_pubkey: recipient(),
    }];

    let one = FeeEstimator {
      signer: &signer,
      fee_rate: FeeRate::try_from(1.0).unwrap(),
    }
    .probe(&[Utxo::synthetic()], &outputs)
    .unwrap();

    let ten = FeeEstimator {
      signer: &signer,
      fee_rate: FeeRate::try_from(10.0).unwrap(),
    }
    .probe(&[Utxo::synthetic()], &outputs)
    .unwrap();

    assert_eq!(ten.fee.to_sat(), one.fee.to_sat() * 10);
  }

  #[test]
  fn continuation_measures_replayed_partial() {
    let signer = signer();
    let estimator = FeeEstimator {
      signer: &signer,
      fee_rate: FeeRate::try_from(1.0).unwrap(),
    };

    let prior = |partial: Vec<Chunk>| {
      let lock = link::lock_script(&signer.public_key(), partial.len());
      PriorLinkHandle::new(
        Transaction {
          version: TRANSACTION_VERSION,
          lock_time: LockTime::ZERO,
          input: Vec::new(),
          output: vec![link::p2sh_output(&lock, Amount::from_sat(100_000))],
        },
        lock,
        partial,
      )
    };

    let outputs = [TxOut {
      value: 1000,
      script_pubkey: recipient(),
    }];

    let small = estimator
      .continuation(&prior(vec![Chunk::number(0), Chunk::push(vec![0; 10])]), &outputs, false)
      .unwrap();

    let large = estimator
      .continuation(&prior(vec![Chunk::number(0), Chunk::push(vec![0; 240])]), &outputs, false)
      .unwrap();

    // 231 more payload bytes and a wider script length prefix, give or take a
    // byte of signature length.
    assert_eq!(small.transaction.output.len(), 1);
    assert!((232..=234).contains(&(large.fee.to_sat() - small.fee.to_sat())));

    let with_change = estimator
      .continuation(&prior(vec![Chunk::number(0), Chunk::push(vec![0; 10])]), &outputs, true)
      .unwrap();

    assert!((33..=35).contains(&(with_change.fee.to_sat() - small.fee.to_sat())));
  }
}
