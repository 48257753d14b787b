use {
  super::*,
  bitcoin::{
    base58, ecdsa,
    secp256k1::{All, Message, Secp256k1, SecretKey},
    sighash::{EcdsaSighashType, SighashCache},
    PublicKey,
  },
};

/// Owner of the funding key. Every input this crate signs is a legacy input,
/// either a P2PKH funding output or a reveal-chain P2SH output.
pub struct Signer {
  secp: Secp256k1<All>,
  secret_key: SecretKey,
  public_key: PublicKey,
}

impl Signer {
  pub fn new(secret_key: SecretKey, compressed: bool) -> Self {
    let secp = Secp256k1::new();
    let inner = secret_key.public_key(&secp);

    Self {
      public_key: if compressed {
        PublicKey::new(inner)
      } else {
        PublicKey::new_uncompressed(inner)
      },
      secp,
      secret_key,
    }
  }

  pub fn from_wif(wif: &str, chain: Chain) -> Result<Self> {
    let data = base58::decode_check(wif).context("invalid WIF encoding")?;

    let compressed = match data.len() {
      33 => false,
      34 if data[33] == 1 => true,
      len => bail!("invalid WIF length {len}"),
    };

    if data[0] != chain.wif_prefix() {
      bail!("WIF key is not valid for {chain}");
    }

    Ok(Self::new(
      SecretKey::from_slice(&data[1..33]).context("invalid WIF secret key")?,
      compressed,
    ))
  }

  pub fn to_wif(&self, chain: Chain) -> String {
    let mut data = Vec::with_capacity(34);
    data.push(chain.wif_prefix());
    data.extend_from_slice(&self.secret_key.secret_bytes());
    if self.public_key.compressed {
      data.push(1);
    }
    base58::encode_check(&data)
  }

  pub fn public_key(&self) -> PublicKey {
    self.public_key
  }

  pub fn script_pubkey(&self) -> ScriptBuf {
    ScriptBuf::new_p2pkh(&self.public_key.pubkey_hash())
  }

  /// Signs `input` of `tx` with SIGHASH_ALL over `script_code`, returning the
  /// DER signature with the hash type appended.
  pub fn sign(&self, tx: &Transaction, input: usize, script_code: &Script) -> Result<Vec<u8>> {
    let sighash = SighashCache::new(tx)
      .legacy_signature_hash(input, script_code, EcdsaSighashType::All.to_u32())
      .with_context(|| format!("failed to compute signature hash for input {input}"))?;

    let message = Message::from_slice(sighash.as_byte_array())?;

    Ok(
      ecdsa::Signature {
        sig: self.secp.sign_ecdsa_low_r(&message, &self.secret_key),
        hash_ty: EcdsaSighashType::All,
      }
      .to_vec(),
    )
  }

  pub fn p2pkh_unlock_script(&self, signature: Vec<u8>) -> ScriptBuf {
    ScriptBuf::from_bytes(Chunk::compile(&[
      Chunk::push(signature),
      Chunk::push(self.public_key.to_bytes()),
    ]))
  }
}
