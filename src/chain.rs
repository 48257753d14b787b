use {
  super::*,
  bitcoin::{base58, PubkeyHash, ScriptHash},
  clap::ValueEnum,
};

#[derive(Default, ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
  #[default]
  #[clap(alias("main"))]
  Mainnet,
  #[clap(alias("test"))]
  Testnet,
  Regtest,
}

impl Chain {
  pub(crate) fn p2pkh_prefix(self) -> u8 {
    match self {
      Self::Mainnet => 0x1e,
      Self::Testnet => 0x71,
      Self::Regtest => 0x6f,
    }
  }

  pub(crate) fn p2sh_prefix(self) -> u8 {
    match self {
      Self::Mainnet => 0x16,
      Self::Testnet | Self::Regtest => 0xc4,
    }
  }

  pub(crate) fn wif_prefix(self) -> u8 {
    match self {
      Self::Mainnet => 0x9e,
      Self::Testnet => 0xf1,
      Self::Regtest => 0xef,
    }
  }

  pub fn is_test_network(self) -> bool {
    !matches!(self, Self::Mainnet)
  }

  pub fn address_to_script(self, address: &str) -> Result<ScriptBuf> {
    let data = base58::decode_check(address)
      .with_context(|| format!("invalid base58 address `{address}`"))?;

    let (prefix, hash) = data
      .split_first()
      .ok_or_else(|| anyhow!("empty address `{address}`"))?;

    if hash.len() != 20 {
      bail!("address `{address}` has a {}-byte payload, expected 20", hash.len());
    }

    if *prefix == self.p2pkh_prefix() {
      Ok(ScriptBuf::new_p2pkh(&PubkeyHash::from_slice(hash)?))
    } else if *prefix == self.p2sh_prefix() {
      Ok(ScriptBuf::new_p2sh(&ScriptHash::from_slice(hash)?))
    } else {
      bail!("address `{address}` is not valid for {self}")
    }
  }

  pub fn script_to_address(self, script: &Script) -> Option<String> {
    let bytes = script.as_bytes();

    let (prefix, hash) = if script.is_p2pkh() {
      (self.p2pkh_prefix(), &bytes[3..23])
    } else if script.is_p2sh() {
      (self.p2sh_prefix(), &bytes[2..22])
    } else {
      return None;
    };

    let mut data = Vec::with_capacity(21);
    data.push(prefix);
    data.extend_from_slice(hash);

    Some(base58::encode_check(&data))
  }
}

impl Display for Chain {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(
      f,
      "{}",
      match self {
        Self::Mainnet => "mainnet",
        Self::Testnet => "testnet",
        Self::Regtest => "regtest",
      }
    )
  }
}
