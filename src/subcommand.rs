use super::*;

pub mod decode;
pub mod inscribe;
pub mod split;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
  #[clap(about = "Recover an inscription from a reveal chain")]
  Decode(decode::Decode),
  #[clap(about = "Inscribe a file through a chain of reveal transactions")]
  Inscribe(inscribe::Inscribe),
  #[clap(about = "Split inscribed UTXOs into one output per inscription")]
  Split(split::Split),
}

impl Subcommand {
  pub(crate) fn run(self, options: Options) -> Result {
    match self {
      Self::Decode(decode) => decode.run(options),
      Self::Inscribe(inscribe) => inscribe.run(options),
      Self::Split(split) => split.run(options),
    }
  }
}
