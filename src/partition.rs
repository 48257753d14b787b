use {super::*, std::collections::VecDeque};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct OversizedPair {
  pub size: usize,
  pub ceiling: usize,
}

impl Display for OversizedPair {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(
      f,
      "envelope pair of {} bytes cannot fit in a partial of at most {} bytes",
      self.size, self.ceiling
    )
  }
}

impl std::error::Error for OversizedPair {}

/// Takes the next partial off the front of `remaining`.
///
/// The first partial of a chain takes the envelope marker unconditionally.
/// After that chunks are taken in pairs while the partial compiles to at most
/// `ceiling` bytes. The loop may overshoot by one pair, which is then put back.
pub fn next_partial(
  remaining: &mut VecDeque<Chunk>,
  ceiling: usize,
  first: bool,
) -> Result<Vec<Chunk>, OversizedPair> {
  let mut partial = Vec::new();

  if first {
    partial.extend(remaining.pop_front());
  }

  let header = partial.len();
  let mut size = Chunk::compiled_len(&partial);
  let mut last = Vec::new();

  while size <= ceiling && !remaining.is_empty() {
    last = remaining.drain(..remaining.len().min(2)).collect();
    size += Chunk::compiled_len(&last);
    partial.extend(last.iter().cloned());
  }

  if size > ceiling {
    partial.truncate(partial.len() - last.len());
    for chunk in last.iter().rev() {
      remaining.push_front(chunk.clone());
    }

    if partial.len() == header {
      return Err(OversizedPair {
        size: Chunk::compiled_len(&last),
        ceiling,
      });
    }
  }

  Ok(partial)
}

/// Splits an envelope into partials, in chain order.
pub fn partition(envelope: &[Chunk], ceiling: usize) -> Result<Vec<Vec<Chunk>>, OversizedPair> {
  let mut remaining = envelope.iter().cloned().collect::<VecDeque<Chunk>>();
  let mut partials = Vec::new();

  while !remaining.is_empty() {
    partials.push(next_partial(&mut remaining, ceiling, partials.is_empty())?);
  }

  Ok(partials)
}
