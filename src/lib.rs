#![allow(
  clippy::too_many_arguments,
  clippy::type_complexity,
  clippy::result_large_err
)]

use {
  self::{arguments::Arguments, options::Options, subcommand::Subcommand},
  anyhow::{anyhow, bail, Context, Error},
  bitcoin::{
    absolute::LockTime,
    consensus::{self, encode::serialize_hex},
    hashes::Hash,
    Amount, OutPoint, Script, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
  },
  clap::Parser,
  serde::{Deserialize, Serialize},
  std::{
    collections::BTreeSet,
    env,
    fmt::{self, Display, Formatter},
    fs, io,
    path::{Path, PathBuf},
    process,
    str::FromStr,
  },
};

pub use crate::{
  api::{Api, ApiUtxo, EsploraApi, FileApi},
  chain::Chain,
  chunk::Chunk,
  config::{Config, ServiceFee, SplitterFee},
  envelope::Inscription,
  fee_rate::FeeRate,
  inscriber::Inscriber,
  reveal::{Estimate, PriorLinkHandle, RevealChain, RevealChainBuilder},
  signer::Signer,
  splitter::{OutputKind, OutputPlan, PlannedOutput, Split, SplitResult, Splitter, UtxoOffsetRecord},
  utxo::{RealUtxo, Utxo},
};


#[cfg(test)]
use self::test::*;

macro_rules! tprintln {
    ($($arg:tt)*) => {
      if cfg!(not(test)) {
        eprintln!($($arg)*);
      }
    };
}

pub mod api;
mod arguments;
mod chain;
mod chunk;
mod config;
pub mod envelope;
mod fee_rate;
mod inscriber;
mod options;
pub mod partition;
pub mod reveal;
mod signer;
pub mod splitter;
pub mod subcommand;
mod utxo;

type Result<T = (), E = Error> = std::result::Result<T, E>;

const TRANSACTION_VERSION: i32 = 1;

fn print_json(output: impl Serialize) -> Result {
  serde_json::to_writer_pretty(io::stdout(), &output)?;
  println!();
  Ok(())
}

pub fn main() {
  env_logger::init();

  if let Err(err) = Arguments::parse().run() {
    eprintln!("error: {err}");
    err
      .chain()
      .skip(1)
      .for_each(|cause| eprintln!("because: {cause}"));
    if env::var_os("RUST_BACKTRACE")
      .map(|val| val == "1")
      .unwrap_or_default()
    {
      eprintln!("{}", err.backtrace());
    }
    process::exit(1);
  }
}
