use super::*;

#[derive(Clone, Default, Debug, Parser)]
pub(crate) struct Options {
  #[clap(long, value_enum, default_value = "mainnet", help = "Use <CHAIN>.")]
  pub(crate) chain: Chain,
  #[clap(long, help = "Load configuration from <CONFIG>.")]
  pub(crate) config: Option<PathBuf>,
  #[clap(long, short, help = "Use regtest. Equivalent to `--chain regtest`.")]
  pub(crate) regtest: bool,
  #[clap(long, short, help = "Use testnet. Equivalent to `--chain testnet`.")]
  pub(crate) testnet: bool,
}

impl Options {
  pub(crate) fn chain(&self) -> Chain {
    if self.regtest {
      Chain::Regtest
    } else if self.testnet {
      Chain::Testnet
    } else {
      self.chain
    }
  }

  pub(crate) fn load_config(&self) -> Result<Config> {
    match &self.config {
      Some(path) => Config::load(path),
      None => Ok(Config::default()),
    }
  }
}

#[cfg(test)]
mod tests {
  use {super::*, tempfile::TempDir};

  fn parse(args: &[&str]) -> Options {
    Arguments::try_parse_from(
      ["chainscribe"]
        .iter()
        .chain(args)
        .chain(&["decode", "chain.txt"]),
    )
    .unwrap()
    .options
  }

  #[test]
  fn chain_defaults_to_mainnet() {
    assert_eq!(parse(&[]).chain(), Chain::Mainnet);
  }

  #[test]
  fn chain_flags() {
    assert_eq!(parse(&["--chain", "regtest"]).chain(), Chain::Regtest);
    assert_eq!(parse(&["--chain", "test"]).chain(), Chain::Testnet);
    assert_eq!(parse(&["-r"]).chain(), Chain::Regtest);
    assert_eq!(parse(&["--testnet"]).chain(), Chain::Testnet);
  }

  #[test]
  fn config_defaults_without_flag() {
    assert_eq!(parse(&[]).load_config().unwrap(), Config::default());
  }

  #[test]
  fn config_is_loaded_from_path() {
    let tempdir = TempDir::new().unwrap();
    let path = tempdir.path().join("chainscribe.yaml");
    fs::write(&path, "postage: 5000\n").unwrap();

    assert_eq!(
      parse(&["--config", path.to_str().unwrap()])
        .load_config()
        .unwrap()
        .postage,
      5000
    );
  }

  #[test]
  fn missing_config_is_an_error() {
    assert!(parse(&["--config", "/nonexistent/chainscribe.yaml"])
      .load_config()
      .is_err());
  }
}
