use super::*;

#[derive(Serialize, Deserialize)]
pub struct Output {
  pub txids: Vec<Txid>,
  pub transactions: Vec<String>,
  pub fees: u64,
  pub service_fee: u64,
  pub required_value: u64,
  pub broadcast: bool,
}

#[derive(Serialize, Deserialize)]
pub struct EstimateOutput {
  pub links: usize,
  pub link_fees: Vec<u64>,
  pub terminal_fee: u64,
  pub postage: u64,
  pub service_fee: u64,
  pub required_value: u64,
}

#[derive(Debug, Parser)]
pub(crate) struct Inscribe {
  #[clap(long, help = "Sign with WIF private key <WIF>.")]
  pub(crate) wif: String,
  #[clap(long, help = "Send inscription to <DESTINATION>.")]
  pub(crate) destination: String,
  #[clap(long, help = "Use fee rate of <FEE_RATE> sats/vB")]
  pub(crate) fee_rate: FeeRate,
  #[clap(
    long,
    help = "Use <CONTENT_TYPE> instead of guessing it from the file extension."
  )]
  pub(crate) content_type: Option<String>,
  #[clap(
    long,
    conflicts_with = "api",
    help = "Fund from the UTXOs and raw transactions in JSON file <UTXOS>."
  )]
  pub(crate) utxos: Option<PathBuf>,
  #[clap(long, help = "Fund and broadcast through the esplora API at <API>.")]
  pub(crate) api: Option<String>,
  #[clap(
    long,
    requires = "utxos",
    help = "Append broadcast transactions to <OUTBOX>, one hex string per line."
  )]
  pub(crate) outbox: Option<PathBuf>,
  #[clap(long, help = "Estimate fees without fetching funding or signing.")]
  pub(crate) dry_run: bool,
  #[clap(long, help = "Broadcast transactions once the whole chain is built.")]
  pub(crate) broadcast: bool,
  #[clap(help = "Inscribe contents of <FILE>")]
  pub(crate) file: PathBuf,
}

impl Inscribe {
  pub(crate) fn run(self, options: Options) -> Result {
    let chain = options.chain();
    let config = options.load_config()?;

    let signer = Signer::from_wif(&self.wif, chain)?;

    let destination = chain
      .address_to_script(&self.destination)
      .context("invalid destination")?;

    let funding_address = chain
      .script_to_address(&signer.script_pubkey())
      .ok_or_else(|| anyhow!("signing key has no {chain} address"))?;

    let inscription = Inscription::new(
      self.content_type()?,
      fs::read(&self.file).with_context(|| format!("io error reading {}", self.file.display()))?,
    );

    let builder = RevealChainBuilder::new(&config, chain, &signer, destination, self.fee_rate)?;

    match (&self.utxos, &self.api) {
      (Some(path), None) => {
        let mut api = FileApi::load(path)?;
        if let Some(outbox) = &self.outbox {
          api = api.with_outbox(outbox.clone());
        }
        self.inscribe(Inscriber::new(&api, builder, funding_address), &inscription)
      }
      (None, Some(url)) => {
        let api = EsploraApi::new(url);
        self.inscribe(Inscriber::new(&api, builder, funding_address), &inscription)
      }
      (None, None) if self.dry_run => self.inscribe(
        Inscriber::new(&FileApi::default(), builder, funding_address),
        &inscription,
      ),
      _ => bail!("one of --utxos or --api is required"),
    }
  }

  fn content_type(&self) -> Result<String> {
    if let Some(content_type) = &self.content_type {
      return Ok(content_type.clone());
    }

    mime_guess::from_path(&self.file)
      .first()
      .map(|mime| mime.to_string())
      .ok_or_else(|| {
        anyhow!(
          "unable to guess content type of {}, use --content-type",
          self.file.display()
        )
      })
  }

  fn inscribe<A: Api>(&self, inscriber: Inscriber<A>, inscription: &Inscription) -> Result {
    if self.dry_run {
      let estimate = inscriber.estimate(inscription)?;

      return print_json(EstimateOutput {
        links: estimate.link_fees.len(),
        link_fees: estimate.link_fees.iter().map(|fee| fee.to_sat()).collect(),
        terminal_fee: estimate.terminal_fee.to_sat(),
        postage: estimate.postage.to_sat(),
        service_fee: estimate.service_fee.to_sat(),
        required_value: estimate.required_value().to_sat(),
      });
    }

    let chain = inscriber.inscribe(inscription)?;

    let txids = if self.broadcast {
      inscriber.broadcast(&chain)?
    } else {
      chain.txids()
    };

    print_json(Output {
      txids,
      transactions: chain.hexes(),
      fees: chain.fees.to_sat(),
      service_fee: chain.service_fee.to_sat(),
      required_value: chain.required_value.to_sat(),
      broadcast: self.broadcast,
    })
  }
}
