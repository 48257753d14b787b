//! Reveal chains.
//!
//! An inscription too large for one script is spread over a chain of
//! transactions. Each link locks value in a P2SH output whose redeem script is
//!
//! ```text
//! <pubkey> CHECKSIGVERIFY DROP… TRUE
//! ```
//!
//! and the next link spends it by pushing one partial of the envelope, a
//! signature and the redeem script. The DROPs clear the partial off the stack
//! once the signature checks out. The last transaction spends the final link
//! and pays the destination.
//!
//! Fees are worked out first by building every link as a disposable probe
//! against real or synthetic funding, and the resulting schedule is then used
//! verbatim to build the real chain.

use {
  self::{
    estimator::FeeEstimator,
    link::{assemble, LinkInputs},
  },
  super::*,
  crate::partition::{partition, OversizedPair},
  itertools::Itertools,
};

pub use self::link::{lock_script, p2sh_output, unlock_script, PriorLinkHandle};

mod estimator;
pub mod link;

#[derive(Debug, PartialEq)]
pub enum Error {
  InsufficientFunds { need: Amount, have: Amount },
  MalformedChainState(String),
  OversizedPair(OversizedPair),
  UnspendableFunding(OutPoint),
}

impl Display for Error {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Error::InsufficientFunds { need, have } => write!(
        f,
        "insufficient funds: need {} sat, have {} sat",
        need.to_sat(),
        have.to_sat()
      ),
      Error::MalformedChainState(message) => write!(f, "malformed chain state: {message}"),
      Error::OversizedPair(err) => write!(f, "{err}"),
      Error::UnspendableFunding(outpoint) => {
        write!(f, "funding output {outpoint} is not spendable by the signing key")
      }
    }
  }
}

impl std::error::Error for Error {}

impl From<OversizedPair> for Error {
  fn from(err: OversizedPair) -> Self {
    Error::OversizedPair(err)
  }
}

/// Fee schedule for a chain: one fee per link, then the last transaction's.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
  pub link_fees: Vec<Amount>,
  pub terminal_fee: Amount,
  pub postage: Amount,
  pub service_fee: Amount,
}

impl Estimate {
  pub fn network_fees(&self) -> Amount {
    self
      .link_fees
      .iter()
      .fold(self.terminal_fee, |total, fee| total + *fee)
  }

  /// Value the funding must cover.
  pub fn required_value(&self) -> Amount {
    self.network_fees() + self.postage + self.service_fee
  }
}

/// Signed transactions of a chain, in broadcast order. The last one pays the
/// destination.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealChain {
  pub transactions: Vec<Transaction>,
  pub fees: Amount,
  pub service_fee: Amount,
  pub required_value: Amount,
}

impl RevealChain {
  pub fn links(&self) -> &[Transaction] {
    &self.transactions[..self.transactions.len().saturating_sub(1)]
  }

  pub fn terminal(&self) -> Option<&Transaction> {
    self.transactions.last()
  }

  pub fn txids(&self) -> Vec<Txid> {
    self.transactions.iter().map(Transaction::txid).collect()
  }

  pub fn hexes(&self) -> Vec<String> {
    self.transactions.iter().map(serialize_hex).collect()
  }
}

struct ServiceFeeOutput {
  script_pubkey: ScriptBuf,
  base: Amount,
  increment: Amount,
}

pub struct RevealChainBuilder<'a> {
  signer: &'a Signer,
  destination: ScriptBuf,
  fee_rate: FeeRate,
  part_size: usize,
  payload_ceiling: usize,
  dust_floor: Amount,
  postage: Amount,
  service_fee: Option<ServiceFeeOutput>,
}

impl<'a> RevealChainBuilder<'a> {
  pub fn new(
    config: &Config,
    chain: Chain,
    signer: &'a Signer,
    destination: ScriptBuf,
    fee_rate: FeeRate,
  ) -> Result<Self> {
    let service_fee = config
      .service_fee_for(chain)
      .map(|service_fee| -> Result<ServiceFeeOutput> {
        Ok(ServiceFeeOutput {
          script_pubkey: chain
            .address_to_script(&service_fee.address)
            .context("invalid service fee address")?,
          base: Amount::from_sat(service_fee.base),
          increment: Amount::from_sat(service_fee.increment),
        })
      })
      .transpose()?;

    Ok(Self {
      signer,
      destination,
      fee_rate,
      part_size: config.part_size,
      payload_ceiling: config.payload_ceiling,
      dust_floor: Amount::from_sat(config.dust_floor),
      postage: Amount::from_sat(config.postage),
      service_fee,
    })
  }

  fn estimator(&self) -> FeeEstimator {
    FeeEstimator {
      signer: self.signer,
      fee_rate: self.fee_rate,
    }
  }

  pub fn partials(&self, inscription: &Inscription) -> Result<Vec<Vec<Chunk>>, Error> {
    Ok(partition(
      &inscription.to_envelope(self.part_size),
      self.payload_ceiling,
    )?)
  }

  fn service_fee(&self, links: usize) -> Result<Amount, Error> {
    let service_fee = match &self.service_fee {
      Some(service_fee) => service_fee,
      None => return Ok(Amount::ZERO),
    };

    u64::try_from(links)
      .ok()
      .and_then(|links| service_fee.increment.checked_mul(links))
      .and_then(|increment| service_fee.base.checked_add(increment))
      .filter(|fee| *fee <= Amount::MAX_MONEY)
      .ok_or_else(|| {
        Error::MalformedChainState(format!(
          "service fee for {links} links exceeds the money supply"
        ))
      })
  }

  fn terminal_outputs(&self, service_fee: Amount) -> Vec<TxOut> {
    let mut outputs = vec![TxOut {
      value: self.postage.to_sat(),
      script_pubkey: self.destination.clone(),
    }];

    if let Some(service) = &self.service_fee {
      if service_fee > Amount::ZERO {
        outputs.push(TxOut {
          value: service_fee.to_sat(),
          script_pubkey: service.script_pubkey.clone(),
        });
      }
    }

    outputs
  }

  /// Builds every link as a probe against `funding` and returns the fee
  /// schedule. Output values do not change a transaction's size, so the
  /// probes carry the funding total throughout.
  pub fn estimate(&self, inscription: &Inscription, funding: &[Utxo]) -> Result<Estimate, Error> {
    if funding.is_empty() {
      return Err(Error::MalformedChainState(
        "cannot estimate without funding, use synthetic funding instead".into(),
      ));
    }

    let partials = self.partials(inscription)?;
    let estimator = self.estimator();
    let total = funding
      .iter()
      .fold(Amount::ZERO, |total, utxo| total + utxo.value());

    let mut link_fees = Vec::with_capacity(partials.len());
    let mut prior: Option<PriorLinkHandle> = None;

    for partial in partials.iter() {
      let lock = lock_script(&self.signer.public_key(), partial.len());
      let outputs = [p2sh_output(&lock, total)];

      let probe = match &prior {
        None => estimator.probe(funding, &outputs)?,
        Some(prior) => estimator.continuation(prior, &outputs, false)?,
      };

      link_fees.push(probe.fee);

      let mut transaction = probe.transaction;
      transaction.output.truncate(1);
      prior = Some(PriorLinkHandle::new(transaction, lock, partial.clone()));
    }

    let prior = prior.ok_or_else(|| Error::MalformedChainState("envelope has no partials".into()))?;

    let service_fee = self.service_fee(partials.len())?;

    let terminal_fee = estimator
      .continuation(&prior, &self.terminal_outputs(service_fee), true)?
      .fee;

    let estimate = Estimate {
      link_fees,
      terminal_fee,
      postage: self.postage,
      service_fee,
    };

    log::info!(
      "estimated {} links, {} sat network fees, {} sat required",
      estimate.link_fees.len(),
      estimate.network_fees().to_sat(),
      estimate.required_value().to_sat()
    );

    Ok(estimate)
  }

  /// Builds and signs the chain using `estimate` as the fee schedule. Fails
  /// without returning any transaction if the funding falls short.
  pub fn build(
    &self,
    inscription: &Inscription,
    funding: &[RealUtxo],
    estimate: &Estimate,
  ) -> Result<RevealChain, Error> {
    let partials = self.partials(inscription)?;

    if partials.len() != estimate.link_fees.len() {
      return Err(Error::MalformedChainState(format!(
        "estimate covers {} links, envelope needs {}",
        estimate.link_fees.len(),
        partials.len()
      )));
    }

    let need = estimate.required_value();
    let have = funding
      .iter()
      .fold(Amount::ZERO, |total, utxo| total + utxo.value);

    if funding.is_empty() || have < need {
      return Err(Error::InsufficientFunds { need, have });
    }

    let funding = funding.iter().cloned().map(Utxo::Real).collect::<Vec<Utxo>>();

    let mut remaining = need;
    let mut prior: Option<PriorLinkHandle> = None;
    let mut transactions = Vec::with_capacity(partials.len() + 1);

    for (i, (partial, fee)) in partials.into_iter().zip_eq(&estimate.link_fees).enumerate() {
      remaining = remaining
        .checked_sub(*fee)
        .ok_or_else(|| Error::MalformedChainState(format!("link {i} fee exceeds chain value")))?;

      let lock = lock_script(&self.signer.public_key(), partial.len());
      let mut outputs = vec![p2sh_output(&lock, remaining)];

      let transaction = match &prior {
        None => {
          let change = have - need;
          if change >= self.dust_floor {
            outputs.push(TxOut {
              value: change.to_sat(),
              script_pubkey: self.signer.script_pubkey(),
            });
          }
          assemble(self.signer, LinkInputs::Funding(&funding), outputs)?
        }
        Some(prior) => assemble(self.signer, LinkInputs::Prior(prior), outputs)?,
      };

      log::debug!(
        "link {i}: {} with {} chunks, {} sat locked",
        transaction.txid(),
        partial.len(),
        remaining.to_sat()
      );

      transactions.push(transaction.clone());
      prior = Some(PriorLinkHandle::new(transaction, lock, partial));
    }

    let prior = prior.ok_or_else(|| Error::MalformedChainState("envelope has no partials".into()))?;

    let mut outputs = self.terminal_outputs(estimate.service_fee);

    let leftover = remaining
      .checked_sub(estimate.terminal_fee + estimate.postage + estimate.service_fee)
      .ok_or_else(|| {
        Error::MalformedChainState("last link cannot cover postage and service fee".into())
      })?;

    if leftover >= self.dust_floor {
      outputs.push(TxOut {
        value: leftover.to_sat(),
        script_pubkey: self.signer.script_pubkey(),
      });
    }

    transactions.push(assemble(self.signer, LinkInputs::Prior(&prior), outputs)?);

    // Output 0 of every link is spent by the next transaction. Everything
    // else leaves the chain.
    let last = transactions.len() - 1;
    let paid_out = transactions
      .iter()
      .enumerate()
      .flat_map(|(i, tx)| tx.output.iter().skip(usize::from(i < last)))
      .map(|output| output.value)
      .sum::<u64>();

    let chain = RevealChain {
      fees: have - Amount::from_sat(paid_out),
      service_fee: estimate.service_fee,
      required_value: need,
      transactions,
    };

    log::info!(
      "built reveal chain of {} transactions paying {} sat in fees",
      chain.transactions.len(),
      chain.fees.to_sat()
    );

    Ok(chain)
  }
}
