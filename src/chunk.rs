use {
  super::*,
  bitcoin::opcodes::all::{OP_PUSHBYTES_75, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4, OP_PUSHNUM_1},
};

/// A single script primitive: an opcode and, for pushes, the bytes it pushes.
///
/// `len` mirrors the data length because push-opcode selection depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
  opcode: u8,
  data: Option<Vec<u8>>,
  len: usize,
}

impl Chunk {
  pub fn opcode(opcode: u8) -> Self {
    Self {
      opcode,
      data: None,
      len: 0,
    }
  }

  pub fn push(data: impl Into<Vec<u8>>) -> Self {
    let data = data.into();
    let len = data.len();

    if len == 0 {
      return Self::opcode(0);
    }

    let opcode = if len <= usize::from(OP_PUSHBYTES_75.to_u8()) {
      len as u8
    } else if len <= 0xff {
      OP_PUSHDATA1.to_u8()
    } else if len <= 0xffff {
      OP_PUSHDATA2.to_u8()
    } else {
      OP_PUSHDATA4.to_u8()
    };

    Self {
      opcode,
      data: Some(data),
      len,
    }
  }

  pub fn number(n: u32) -> Self {
    match n {
      0 => Self::opcode(0),
      1..=16 => Self::opcode(OP_PUSHNUM_1.to_u8() + n as u8 - 1),
      _ => {
        let mut bytes = Vec::new();
        let mut n = n;
        while n > 0 {
          bytes.push((n & 0xff) as u8);
          n >>= 8;
        }
        if bytes.last().map(|byte| byte & 0x80 != 0).unwrap_or_default() {
          bytes.push(0);
        }
        Self::push(bytes)
      }
    }
  }

  pub fn data(&self) -> Option<&[u8]> {
    self.data.as_deref()
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn op(&self) -> u8 {
    self.opcode
  }

  /// Reads a chunk back as a script number, if it is one.
  pub fn to_number(&self) -> Option<u32> {
    match (self.opcode, &self.data) {
      (0, _) => Some(0),
      (op, None) if (OP_PUSHNUM_1.to_u8()..OP_PUSHNUM_1.to_u8() + 16).contains(&op) => {
        Some(u32::from(op - OP_PUSHNUM_1.to_u8()) + 1)
      }
      (_, Some(data)) if !data.is_empty() && data.len() <= 5 => {
        if data.last().map(|byte| byte & 0x80 != 0).unwrap_or_default() {
          return None;
        }
        let mut n = 0u64;
        for (i, byte) in data.iter().enumerate() {
          n |= u64::from(*byte) << (8 * i);
        }
        u32::try_from(n).ok()
      }
      _ => None,
    }
  }

  pub fn compile_into(&self, buffer: &mut Vec<u8>) {
    buffer.push(self.opcode);

    let Some(data) = &self.data else {
      return;
    };

    match self.opcode {
      op if op == OP_PUSHDATA1.to_u8() => buffer.push(self.len as u8),
      op if op == OP_PUSHDATA2.to_u8() => {
        buffer.extend_from_slice(&(self.len as u16).to_le_bytes())
      }
      op if op == OP_PUSHDATA4.to_u8() => {
        buffer.extend_from_slice(&(self.len as u32).to_le_bytes())
      }
      _ => {}
    }

    buffer.extend_from_slice(data);
  }

  pub fn compile(chunks: &[Chunk]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(Self::compiled_len(chunks));
    for chunk in chunks {
      chunk.compile_into(&mut buffer);
    }
    buffer
  }

  pub fn compiled_len(chunks: &[Chunk]) -> usize {
    chunks
      .iter()
      .map(|chunk| {
        1 + match chunk.data {
          None => 0,
          Some(_) => {
            chunk.len
              + match chunk.opcode {
                op if op == OP_PUSHDATA1.to_u8() => 1,
                op if op == OP_PUSHDATA2.to_u8() => 2,
                op if op == OP_PUSHDATA4.to_u8() => 4,
                _ => 0,
              }
          }
        }
      })
      .sum()
  }

  pub fn parse(script: &[u8]) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    let mut i = 0;

    while i < script.len() {
      let opcode = script[i];
      i += 1;

      let len = match opcode {
        0 => {
          chunks.push(Self::opcode(0));
          continue;
        }
        op if op <= OP_PUSHBYTES_75.to_u8() => usize::from(op),
        op if op == OP_PUSHDATA1.to_u8() => usize::from(Self::take(script, &mut i, 1)?[0]),
        op if op == OP_PUSHDATA2.to_u8() => {
          let bytes = Self::take(script, &mut i, 2)?;
          usize::from(u16::from_le_bytes([bytes[0], bytes[1]]))
        }
        op if op == OP_PUSHDATA4.to_u8() => {
          let bytes = Self::take(script, &mut i, 4)?;
          usize::try_from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))?
        }
        op => {
          chunks.push(Self::opcode(op));
          continue;
        }
      };

      let data = Self::take(script, &mut i, len)?.to_vec();

      chunks.push(Self {
        opcode,
        data: Some(data),
        len,
      });
    }

    Ok(chunks)
  }

  fn take<'a>(script: &'a [u8], i: &mut usize, n: usize) -> Result<&'a [u8]> {
    let end = i
      .checked_add(n)
      .filter(|end| *end <= script.len())
      .ok_or_else(|| anyhow!("push of {n} bytes at offset {} runs past end of script", *i))?;
    let bytes = &script[*i..end];
    *i = end;
    Ok(bytes)
  }
}
