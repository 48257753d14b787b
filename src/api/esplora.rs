use {super::*, reqwest::blocking::Client};

/// Chain access over an esplora-compatible HTTP API.
pub struct EsploraApi {
  client: Client,
  url: String,
}

impl EsploraApi {
  pub fn new(url: &str) -> Self {
    Self {
      client: Client::new(),
      url: url.trim_end_matches('/').into(),
    }
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}/{path}", self.url)
  }
}

impl Api for EsploraApi {
  fn fetch_raw_hex(&self, txid: Txid) -> Result<String> {
    Ok(
      self
        .client
        .get(self.endpoint(&format!("tx/{txid}/hex")))
        .send()?
        .error_for_status()?
        .text()?,
    )
  }

  fn fetch_address_utxos(&self, address: &str, min_value: Option<Amount>) -> Result<Vec<ApiUtxo>> {
    let utxos = self
      .client
      .get(self.endpoint(&format!("address/{address}/utxo")))
      .send()?
      .error_for_status()?
      .json::<Vec<ApiUtxo>>()?;

    Ok(select(utxos, min_value))
  }

  fn broadcast(&self, hex: &str) -> Result<Txid> {
    let response = self
      .client
      .post(self.endpoint("tx"))
      .body(hex.to_owned())
      .send()?;

    let status = response.status();
    let text = response.text()?;

    if !status.is_success() {
      bail!("broadcast rejected with {status}: {text}");
    }

    text
      .trim()
      .parse()
      .with_context(|| format!("broadcast returned malformed txid `{text}`"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn endpoints() {
    let api = EsploraApi::new("https://example.com/api/");
    assert_eq!(api.endpoint("tx"), "https://example.com/api/tx");
    assert_eq!(
      api.endpoint(&format!("tx/{}/hex", txid(1))),
      format!("https://example.com/api/tx/{}/hex", txid(1))
    );
  }
}
