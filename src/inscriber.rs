use super::*;

/// Runs the estimate, fund, re-estimate protocol against an [`Api`] and
/// builds the chain.
pub struct Inscriber<'a, A: Api> {
  api: &'a A,
  builder: RevealChainBuilder<'a>,
  funding_address: String,
}

impl<'a, A: Api> Inscriber<'a, A> {
  pub fn new(api: &'a A, builder: RevealChainBuilder<'a>, funding_address: String) -> Self {
    Self {
      api,
      builder,
      funding_address,
    }
  }

  /// Fee schedule against synthetic funding. Nothing is fetched.
  pub fn estimate(&self, inscription: &Inscription) -> Result<Estimate> {
    Ok(self.builder.estimate(inscription, &[Utxo::synthetic()])?)
  }

  pub fn inscribe(&self, inscription: &Inscription) -> Result<RevealChain> {
    tprintln!("[estimate]");
    let estimate = self.estimate(inscription)?;

    tprintln!("[fund]");
    let mut funding = self.fund(estimate.required_value())?;
    let mut estimate = self.reestimate(inscription, &funding, estimate)?;

    if total(&funding) < estimate.required_value() {
      log::info!(
        "funding of {} sat short of re-estimated {} sat, fetching again",
        total(&funding).to_sat(),
        estimate.required_value().to_sat()
      );
      tprintln!("[refund]");
      funding = self.fund(estimate.required_value())?;
      estimate = self.reestimate(inscription, &funding, estimate)?;
    }

    tprintln!("[build]");
    Ok(self.builder.build(inscription, &funding, &estimate)?)
  }

  /// Pushes every transaction of `chain` in order, stopping at the first
  /// rejection.
  pub fn broadcast(&self, chain: &RevealChain) -> Result<Vec<Txid>> {
    let mut txids = Vec::with_capacity(chain.transactions.len());

    for (i, hex) in chain.hexes().iter().enumerate() {
      let txid = self.api.broadcast(hex).with_context(|| {
        format!(
          "failed to broadcast transaction {i} of {}",
          chain.transactions.len()
        )
      })?;
      log::info!("broadcast {txid}");
      txids.push(txid);
    }

    Ok(txids)
  }

  fn reestimate(
    &self,
    inscription: &Inscription,
    funding: &[RealUtxo],
    previous: Estimate,
  ) -> Result<Estimate> {
    if funding.is_empty() {
      return Ok(previous);
    }

    Ok(self.builder.estimate(
      inscription,
      &funding.iter().cloned().map(Utxo::Real).collect::<Vec<Utxo>>(),
    )?)
  }

  fn fund(&self, min_value: Amount) -> Result<Vec<RealUtxo>> {
    let utxos = self
      .api
      .fetch_address_utxos(&self.funding_address, Some(min_value))
      .with_context(|| format!("failed to fetch UTXOs for {}", self.funding_address))?;

    log::debug!(
      "fetched {} UTXOs for {} sat",
      utxos.len(),
      min_value.to_sat()
    );

    utxos
      .iter()
      .map(|utxo| {
        let hex = self
          .api
          .fetch_raw_hex(utxo.txid)
          .with_context(|| format!("failed to fetch raw transaction {}", utxo.txid))?;
        RealUtxo::new(utxo, &hex)
      })
      .collect()
  }
}

fn total(funding: &[RealUtxo]) -> Amount {
  funding
    .iter()
    .fold(Amount::ZERO, |total, utxo| total + utxo.value)
}
