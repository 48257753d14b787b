use {super::*, std::collections::BTreeMap, std::io::Write};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Funding {
  utxos: Vec<ApiUtxo>,
  #[serde(default)]
  transactions: Vec<String>,
}

/// Offline chain access backed by a JSON file of unspent outputs and the raw
/// transactions that created them.
///
/// ```json
/// { "utxos": [{ "txid": "…", "vout": 0, "value": 100000 }], "transactions": ["0100…"] }
/// ```
///
/// Broadcast transactions are appended, one hex string per line, to the
/// outbox file when one is set.
#[derive(Debug, Default)]
pub struct FileApi {
  utxos: Vec<ApiUtxo>,
  transactions: BTreeMap<Txid, String>,
  outbox: Option<PathBuf>,
}

impl FileApi {
  pub fn load(path: &Path) -> Result<Self> {
    let funding: Funding = serde_json::from_reader(
      fs::File::open(path)
        .with_context(|| format!("failed to open funding file `{}`", path.display()))?,
    )
    .with_context(|| format!("failed to parse funding file `{}`", path.display()))?;

    let mut api = Self {
      utxos: funding.utxos,
      ..Default::default()
    };

    for hex in funding.transactions {
      api.insert_transaction(hex)?;
    }

    Ok(api)
  }

  pub fn new(utxos: Vec<ApiUtxo>, transactions: Vec<Transaction>) -> Self {
    Self {
      utxos,
      transactions: transactions
        .iter()
        .map(|tx| (tx.txid(), serialize_hex(tx)))
        .collect(),
      outbox: None,
    }
  }

  pub fn with_outbox(self, outbox: PathBuf) -> Self {
    Self {
      outbox: Some(outbox),
      ..self
    }
  }

  fn insert_transaction(&mut self, hex: String) -> Result {
    let tx: Transaction = consensus::deserialize(&hex::decode(hex.trim())?)
      .context("funding file contains an undecodable transaction")?;
    self.transactions.insert(tx.txid(), hex.trim().into());
    Ok(())
  }
}

impl Api for FileApi {
  fn fetch_raw_hex(&self, txid: Txid) -> Result<String> {
    self
      .transactions
      .get(&txid)
      .cloned()
      .ok_or_else(|| anyhow!("transaction {txid} not found"))
  }

  fn fetch_address_utxos(&self, address: &str, min_value: Option<Amount>) -> Result<Vec<ApiUtxo>> {
    log::debug!("serving {} funding outputs for {address}", self.utxos.len());
    Ok(select(self.utxos.clone(), min_value))
  }

  fn broadcast(&self, hex: &str) -> Result<Txid> {
    let Some(outbox) = &self.outbox else {
      bail!("no outbox configured, cannot broadcast offline");
    };

    let tx: Transaction = consensus::deserialize(&hex::decode(hex)?)?;

    let mut file = fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(outbox)
      .with_context(|| format!("failed to open outbox `{}`", outbox.display()))?;

    writeln!(file, "{hex}")?;

    Ok(tx.txid())
  }
}
