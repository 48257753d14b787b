use super::*;

#[derive(Serialize, Deserialize)]
pub struct PlannedOutputJson {
  pub kind: String,
  pub address: Option<String>,
  pub value: u64,
}

#[derive(Serialize, Deserialize)]
pub struct Output {
  pub inputs: Vec<OutPoint>,
  pub outputs: Vec<PlannedOutputJson>,
  pub fee: u64,
  pub change: i64,
  pub is_fee_paid: bool,
  pub service_fee_remaining: u64,
  pub transaction: Option<String>,
}

#[derive(Debug, Parser)]
pub(crate) struct Split {
  #[clap(long, help = "Send split outputs to <ADDRESS>.")]
  pub(crate) address: String,
  #[clap(long, help = "Use fee rate of <FEE_RATE> sats/vB")]
  pub(crate) fee_rate: FeeRate,
  #[clap(help = "Split the UTXOs listed in YAML or JSON file <RECORDS>.")]
  pub(crate) records: PathBuf,
}

impl Split {
  pub(crate) fn run(self, options: Options) -> Result {
    let chain = options.chain();
    let config = options.load_config()?;

    let records: Vec<UtxoOffsetRecord> = serde_yaml::from_reader(
      fs::File::open(&self.records)
        .with_context(|| format!("failed to open records file `{}`", self.records.display()))?,
    )
    .with_context(|| format!("failed to parse records file `{}`", self.records.display()))?;

    if records.is_empty() {
      bail!("records file `{}` lists no UTXOs", self.records.display());
    }

    let splitter = Splitter::new(
      &config,
      chain,
      chain
        .address_to_script(&self.address)
        .context("invalid split address")?,
      self.fee_rate,
    )?;

    let split = splitter.split(&records)?;

    print_json(Output {
      inputs: split.inputs.clone(),
      outputs: split
        .plan
        .outputs
        .iter()
        .map(|output| PlannedOutputJson {
          kind: output.kind.to_string(),
          address: chain.script_to_address(&output.script_pubkey),
          value: output.value.to_sat(),
        })
        .collect(),
      fee: split.plan.fee.to_sat(),
      change: split.result.change,
      is_fee_paid: split.result.is_fee_paid,
      service_fee_remaining: split.result.service_fee_remaining.to_sat(),
      transaction: split
        .result
        .is_fee_paid
        .then(|| serialize_hex(&split.transaction())),
    })
  }
}
