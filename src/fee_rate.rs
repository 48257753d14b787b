use super::*;

#[derive(Debug, PartialEq, Clone, Copy, Serialize)]
pub struct FeeRate(f64);

impl FromStr for FeeRate {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::try_from(f64::from_str(s)?)
  }
}

impl TryFrom<f64> for FeeRate {
  type Error = Error;

  fn try_from(rate: f64) -> Result<Self, Self::Error> {
    if rate.is_sign_negative() | rate.is_nan() | rate.is_infinite() {
      bail!("invalid fee rate: {rate}")
    }
    Ok(Self(rate))
  }
}

impl FeeRate {
  /// Fee for a transaction of `vsize` virtual bytes.
  pub fn fee(&self, vsize: usize) -> Amount {
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    Amount::from_sat((self.0 * vsize as f64).ceil() as u64)
  }

  /// Fee estimated from input and output counts alone, for use before a
  /// transaction can be signed and measured.
  pub fn linear_fee(&self, inputs: usize, outputs: usize) -> Amount {
    self.fee(10 + 148 * inputs + 34 * outputs)
  }

  pub fn sat_per_vbyte(&self) -> f64 {
    self.0
  }
}
