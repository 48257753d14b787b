use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Decode {
  #[clap(help = "Decode the reveal chain in <CHAIN>, one hex transaction per line.")]
  chain: PathBuf,
  #[clap(
    long,
    default_value = "file.dat",
    help = "Write the inscription body to <OUTPUT>."
  )]
  output: PathBuf,
}

impl Decode {
  pub(crate) fn run(self, _options: Options) -> Result {
    let transactions = fs::read_to_string(&self.chain)
      .with_context(|| format!("io error reading {}", self.chain.display()))?
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .enumerate()
      .map(|(i, line)| -> Result<Transaction> {
        Ok(consensus::deserialize(&hex::decode(line)?).with_context(|| {
          format!("line {} is not a transaction", i + 1)
        })?)
      })
      .collect::<Result<Vec<Transaction>>>()?;

    let inscription = Inscription::from_chain(&transactions)?;

    fs::write(&self.output, &inscription.body)
      .with_context(|| format!("io error writing {}", self.output.display()))?;

    println!("content-type: {}", inscription.content_type);
    println!("body written to {}", self.output.display());

    Ok(())
  }
}
