use {super::*, std::cmp::Reverse};

pub use self::{esplora::EsploraApi, file::FileApi};

mod esplora;
mod file;

/// An unspent output as reported by an indexer, before its source
/// transaction has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUtxo {
  pub txid: Txid,
  pub vout: u32,
  pub value: u64,
}

/// Chain access needed by the inscriber. Implementations do not retry.
pub trait Api {
  fn fetch_raw_hex(&self, txid: Txid) -> Result<String>;

  /// Unspent outputs of `address`. With `min_value`, implementations may
  /// return only enough outputs to reach it.
  fn fetch_address_utxos(&self, address: &str, min_value: Option<Amount>) -> Result<Vec<ApiUtxo>>;

  fn broadcast(&self, hex: &str) -> Result<Txid>;
}

/// Largest outputs first, until their sum reaches `min_value`.
pub(crate) fn select(mut utxos: Vec<ApiUtxo>, min_value: Option<Amount>) -> Vec<ApiUtxo> {
  let Some(min_value) = min_value else {
    return utxos;
  };

  utxos.sort_by_key(|utxo| Reverse(utxo.value));

  let mut total = 0;
  utxos
    .into_iter()
    .take_while(|utxo| {
      let needed = total < min_value.to_sat();
      total += utxo.value;
      needed
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn utxos(values: &[u64]) -> Vec<ApiUtxo> {
    values
      .iter()
      .enumerate()
      .map(|(i, value)| ApiUtxo {
        txid: txid(1),
        vout: i as u32,
        value: *value,
      })
      .collect()
  }

  #[test]
  fn select_without_minimum_returns_everything() {
    assert_eq!(select(utxos(&[1, 2, 3]), None), utxos(&[1, 2, 3]));
  }

  #[test]
  fn select_takes_largest_first() {
    let selected = select(utxos(&[1_000, 50_000, 20_000, 30_000]), Some(Amount::from_sat(60_000)));
    assert_eq!(
      selected.iter().map(|utxo| utxo.value).collect::<Vec<u64>>(),
      [50_000, 30_000]
    );
  }

  #[test]
  fn select_returns_all_when_short() {
    assert_eq!(
      select(utxos(&[1, 2]), Some(Amount::from_sat(100))).len(),
      2
    );
  }

  #[test]
  fn api_utxo_ignores_indexer_fields() {
    let utxo: ApiUtxo = serde_json::from_str(&format!(
      r#"{{"txid":"{}","vout":1,"value":5000,"status":{{"confirmed":true}}}}"#,
      txid(1)
    ))
    .unwrap();
    assert_eq!(utxo.vout, 1);
    assert_eq!(utxo.value, 5000);
  }
}
