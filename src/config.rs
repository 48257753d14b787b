use super::*;

#[derive(Deserialize, Serialize, PartialEq, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub min_ordinal_value: u64,
  pub part_size: usize,
  pub payload_ceiling: usize,
  pub dust_floor: u64,
  pub postage: u64,
  pub service_fee: Option<ServiceFee>,
  pub splitter_fee: Option<SplitterFee>,
}

/// Paid by the last transaction of a reveal chain: `base` plus `increment`
/// for every link.
#[derive(Deserialize, Serialize, PartialEq, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServiceFee {
  pub address: String,
  pub base: u64,
  pub increment: u64,
}

#[derive(Deserialize, Serialize, PartialEq, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SplitterFee {
  pub address: String,
  pub amount: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      min_ordinal_value: 1000,
      part_size: 240,
      payload_ceiling: 1500,
      dust_floor: 1000,
      postage: 1000,
      service_fee: None,
      splitter_fee: None,
    }
  }
}

impl Config {
  pub fn load(path: &Path) -> Result<Self> {
    let file = fs::File::open(path)
      .with_context(|| format!("failed to open config file `{}`", path.display()))?;

    let config: Self = serde_yaml::from_reader(file)
      .with_context(|| format!("failed to deserialize config file `{}`", path.display()))?;

    config.check()?;

    Ok(config)
  }

  fn check(&self) -> Result {
    if self.part_size == 0 {
      bail!("part_size must be greater than zero");
    }

    if self.payload_ceiling == 0 {
      bail!("payload_ceiling must be greater than zero");
    }

    if self.min_ordinal_value < self.dust_floor {
      bail!(
        "min_ordinal_value {} is below dust_floor {}",
        self.min_ordinal_value,
        self.dust_floor
      );
    }

    Ok(())
  }

  pub fn service_fee_for(&self, chain: Chain) -> Option<&ServiceFee> {
    if chain.is_test_network() {
      None
    } else {
      self.service_fee.as_ref()
    }
  }

  pub fn splitter_fee_for(&self, chain: Chain) -> Option<&SplitterFee> {
    if chain.is_test_network() {
      None
    } else {
      self.splitter_fee.as_ref()
    }
  }
}
