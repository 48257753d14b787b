use super::*;

/// A funding output whose source transaction has been fetched and checked
/// against what the API reported.
#[derive(Debug, Clone, PartialEq)]
pub struct RealUtxo {
  pub outpoint: OutPoint,
  pub value: Amount,
  pub script_pubkey: ScriptBuf,
  pub transaction: Transaction,
}

impl RealUtxo {
  pub fn new(utxo: &ApiUtxo, hex: &str) -> Result<Self> {
    let bytes = hex::decode(hex.trim())
      .with_context(|| format!("raw transaction for {} is not valid hex", utxo.txid))?;

    let transaction: Transaction = consensus::deserialize(&bytes)
      .with_context(|| format!("raw transaction for {} does not decode", utxo.txid))?;

    Self::from_transaction(utxo, transaction)
  }

  pub fn from_transaction(utxo: &ApiUtxo, transaction: Transaction) -> Result<Self> {
    let txid = transaction.txid();
    if txid != utxo.txid {
      bail!("raw transaction has txid {txid}, expected {}", utxo.txid);
    }

    let output = usize::try_from(utxo.vout)
      .ok()
      .and_then(|vout| transaction.output.get(vout))
      .ok_or_else(|| {
        anyhow!(
          "output {} does not exist in transaction {txid} with {} outputs",
          utxo.vout,
          transaction.output.len()
        )
      })?;

    if output.value != utxo.value {
      bail!(
        "output {}:{} has value {}, API reported {}",
        txid,
        utxo.vout,
        output.value,
        utxo.value
      );
    }

    Ok(Self {
      outpoint: OutPoint {
        txid,
        vout: utxo.vout,
      },
      value: Amount::from_sat(output.value),
      script_pubkey: output.script_pubkey.clone(),
      transaction,
    })
  }
}

/// Funding used by the estimator. `Synthetic` stands in for funding that has
/// not been fetched yet and is never accepted by the chain builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Utxo {
  Real(RealUtxo),
  Synthetic { value: Amount },
}

impl Utxo {
  pub const SYNTHETIC_VALUE: Amount = Amount::from_sat(99_999_999_999_999);

  pub fn synthetic() -> Self {
    Self::Synthetic {
      value: Self::SYNTHETIC_VALUE,
    }
  }

  pub fn value(&self) -> Amount {
    match self {
      Self::Real(utxo) => utxo.value,
      Self::Synthetic { value } => *value,
    }
  }

  pub fn outpoint(&self) -> OutPoint {
    match self {
      Self::Real(utxo) => utxo.outpoint,
      Self::Synthetic { .. } => OutPoint {
        txid: Txid::all_zeros(),
        vout: 0,
      },
    }
  }

  /// The script the input is signed over. Synthetic funding is assumed to pay
  /// the signer.
  pub fn script_pubkey(&self, signer: &Signer) -> ScriptBuf {
    match self {
      Self::Real(utxo) => utxo.script_pubkey.clone(),
      Self::Synthetic { .. } => signer.script_pubkey(),
    }
  }
}

impl From<RealUtxo> for Utxo {
  fn from(utxo: RealUtxo) -> Self {
    Self::Real(utxo)
  }
}
