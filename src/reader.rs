//! Byte stream reader for action bytecode
//!
//! Action blocks are views into a shared immutable buffer. Nested bodies
//! (function bodies, `with` blocks, try/catch/finally blocks) are carved out
//! of their parent without copying.

use crate::error::AvmError;
use crate::prelude::*;
use crate::value::AvmString;

/// An immutable view over a range of a shared byte buffer
#[derive(Clone)]
pub struct ActionBlock {
    data: Rc<[u8]>,
    start: usize,
    end: usize,
}

impl crate::value::CheapClone for ActionBlock {}

impl ActionBlock {
    /// Wrap a whole buffer
    pub fn new(bytes: impl Into<Rc<[u8]>>) -> Self {
        let data: Rc<[u8]> = bytes.into();
        let end = data.len();
        Self {
            data,
            start: 0,
            end,
        }
    }

    /// An empty block
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The bytes covered by this view
    pub fn as_bytes(&self) -> &[u8] {
        self.data.get(self.start..self.end).unwrap_or(&[])
    }

    /// Sub-view of `len` bytes starting `offset` bytes into this view
    pub fn sub(&self, offset: usize, len: usize) -> Option<ActionBlock> {
        let start = self.start.checked_add(offset)?;
        let end = start.checked_add(len)?;
        if end > self.end {
            return None;
        }
        Some(Self {
            data: self.data.clone(),
            start,
            end,
        })
    }
}

impl fmt::Debug for ActionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionBlock({}..{})", self.start, self.end)
    }
}

/// Sequential decoder over an [`ActionBlock`].
///
/// Positions are offsets from the start of the block.
pub struct ActionReader {
    block: ActionBlock,
    position: usize,
    version: u8,
}

impl ActionReader {
    pub fn new(block: ActionBlock, version: u8) -> Self {
        Self {
            block,
            position: 0,
            version,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor. Positions past the end simply end the stream.
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.block.len()
    }

    /// Peek at the next byte without consuming it
    pub fn peek_u8(&self) -> Option<u8> {
        self.block.as_bytes().get(self.position).copied()
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], AvmError> {
        let bytes = self
            .position
            .checked_add(N)
            .and_then(|end| self.block.as_bytes().get(self.position..end))
            .ok_or_else(|| self.truncated())?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.position += N;
        Ok(out)
    }

    fn truncated(&self) -> AvmError {
        AvmError::decode("unexpected end of action data", self.position)
    }

    pub fn read_u8(&mut self) -> Result<u8, AvmError> {
        let [byte] = self.take()?;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, AvmError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, AvmError> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, AvmError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, AvmError> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    /// Doubles are stored as two little-endian 32-bit words, high word first
    pub fn read_f64(&mut self) -> Result<f64, AvmError> {
        let high = u32::from_le_bytes(self.take()?) as u64;
        let low = u32::from_le_bytes(self.take()?) as u64;
        Ok(f64::from_bits((high << 32) | low))
    }

    pub fn read_boolean(&mut self) -> Result<bool, AvmError> {
        Ok(self.read_u8()? != 0)
    }

    /// Null-terminated string: UTF-8 from version 6 on, Latin-1 before
    pub fn read_string(&mut self) -> Result<AvmString, AvmError> {
        let rest = self.block.as_bytes().get(self.position..).unwrap_or(&[]);
        let terminator = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| AvmError::decode("unterminated string", self.position))?;
        let raw = rest.get(..terminator).unwrap_or(&[]);
        let text = if self.version >= 6 {
            String::from_utf8_lossy(raw).into_owned()
        } else {
            raw.iter().map(|&b| b as char).collect()
        };
        self.position += terminator + 1;
        Ok(AvmString::from(text))
    }

    /// Carve the next `len` bytes out as a nested block
    pub fn read_block(&mut self, len: usize) -> Result<ActionBlock, AvmError> {
        let block = self
            .block
            .sub(self.position, len)
            .ok_or_else(|| self.truncated())?;
        self.position += len;
        Ok(block)
    }
}
