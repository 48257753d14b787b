//! Inscription envelopes.
//!
//! An envelope is a flat list of chunks:
//!
//! ```text
//! "ord" <part count> <content type> (<index> <part>)*
//! ```
//!
//! Parts are paired with indices counting down to zero, so the first part
//! written carries the highest index. Readers reassemble parts in ascending
//! index order.

use super::*;

pub const MARKER: &[u8] = b"ord";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inscription {
  pub content_type: String,
  #[serde(skip)]
  pub body: Vec<u8>,
}

impl Inscription {
  pub fn new(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
    Self {
      content_type: content_type.into(),
      body: body.into(),
    }
  }

  pub fn to_envelope(&self, part_size: usize) -> Vec<Chunk> {
    encode(&self.content_type, &self.body, part_size)
  }

  pub fn from_envelope(chunks: &[Chunk]) -> Result<Self> {
    decode(chunks)
  }

  /// Recovers an inscription from the transactions of a reveal chain, in
  /// chain order. Every transaction after the first replays the previous
  /// link's partial in input 0, followed by a signature and the lock script.
  pub fn from_chain(transactions: &[Transaction]) -> Result<Self> {
    if transactions.len() < 2 {
      bail!("reveal chain must contain at least two transactions");
    }

    let mut envelope = Vec::new();

    for (i, tx) in transactions.iter().enumerate().skip(1) {
      let input = tx
        .input
        .first()
        .ok_or_else(|| anyhow!("transaction {i} has no inputs"))?;

      let mut chunks = Chunk::parse(input.script_sig.as_bytes())
        .with_context(|| format!("failed to parse unlock script of transaction {i}"))?;

      if chunks.len() < 2 {
        bail!("unlock script of transaction {i} is missing signature or lock script");
      }

      chunks.truncate(chunks.len() - 2);
      envelope.extend(chunks);
    }

    decode(&envelope)
  }
}

pub fn encode(content_type: &str, body: &[u8], part_size: usize) -> Vec<Chunk> {
  let parts = body.chunks(part_size.max(1)).collect::<Vec<&[u8]>>();
  let count = parts.len() as u32;

  let mut chunks = Vec::with_capacity(3 + parts.len() * 2);
  chunks.push(Chunk::push(MARKER));
  chunks.push(Chunk::number(count));
  chunks.push(Chunk::push(content_type.as_bytes()));

  for (i, part) in parts.into_iter().enumerate() {
    chunks.push(Chunk::number(count - i as u32 - 1));
    chunks.push(Chunk::push(part));
  }

  chunks
}

pub fn decode(chunks: &[Chunk]) -> Result<Inscription> {
  let mut chunks = chunks.iter();

  match chunks.next().and_then(Chunk::data) {
    Some(MARKER) => {}
    _ => bail!("envelope does not start with marker"),
  }

  let count = chunks
    .next()
    .and_then(Chunk::to_number)
    .ok_or_else(|| anyhow!("envelope part count is missing or not a number"))?;

  let content_type = chunks
    .next()
    .ok_or_else(|| anyhow!("envelope content type is missing"))?;

  let content_type = String::from_utf8(content_type.data().unwrap_or_default().to_vec())
    .context("envelope content type is not valid UTF-8")?;

  let mut body = Vec::new();

  for expected in (0..count).rev() {
    let index = chunks
      .next()
      .and_then(Chunk::to_number)
      .ok_or_else(|| anyhow!("envelope part {expected} is missing its index"))?;

    if index != expected {
      bail!("envelope part index {index} out of order, expected {expected}");
    }

    let part = chunks
      .next()
      .ok_or_else(|| anyhow!("envelope part {expected} is missing its data"))?;

    body.extend_from_slice(part.data().unwrap_or_default());
  }

  if chunks.next().is_some() {
    bail!("envelope has trailing chunks after {count} parts");
  }

  Ok(Inscription { content_type, body })
}
