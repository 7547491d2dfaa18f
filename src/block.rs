//! A bounded, seekable, in-memory view over one contiguous byte range of
//! the backing file, plus the big-endian primitive decoders every higher
//! layer is built out of.
//!
//! A `Cursor`-backed byte buffer with bounds-checked reads and writes,
//! built around the fixed big-endian primitives this format actually
//! needs rather than generic (de)serialization, since every field here
//! has an exact, non-negotiable on-disk shape.

use crate::allocator::Allocator;
use crate::entry::Entry;
use crate::error::{Error, Result};

/// Where a [`Block::seek`] offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Offset from the start of the block.
    Start,
    /// Offset from the current cursor position.
    Current,
    /// Offset from the end of the block.
    End,
}

/// A bounded view over `size` bytes of the file starting at `offset`.
///
/// Invariant: `0 <= pos <= data.len()`, and `data.len() == size`. Holds a
/// non-owning, lookup-only back-reference to the [`Allocator`] it was
/// issued by, used only by [`Block::flush`] to persist a dirty buffer;
/// blocks constructed purely to bootstrap the allocator's own root-block
/// parse (before the allocator is fully initialized) carry no such
/// back-reference, since they are never flushed.
pub struct Block<'a> {
    allocator: Option<&'a Allocator>,
    offset: u32,
    size: u32,
    pos: u32,
    data: Vec<u8>,
    dirty: bool,
}

impl<'a> Block<'a> {
    /// Construct a block issued by `allocator` over `data`, which must
    /// already hold exactly the block's bytes.
    pub fn new(allocator: &'a Allocator, offset: u32, data: Vec<u8>) -> Block<'a> {
        let size = data.len() as u32;
        Block {
            allocator: Some(allocator),
            offset,
            size,
            pos: 0,
            data,
            dirty: false,
        }
    }

    /// Construct a block with no back-reference to an allocator, for use
    /// only where the block will never be flushed — namely while the
    /// allocator itself is still parsing its root block during `open`.
    pub fn from_bytes(offset: u32, data: Vec<u8>) -> Block<'static> {
        let size = data.len() as u32;
        Block {
            allocator: None,
            offset,
            size,
            pos: 0,
            data,
            dirty: false,
        }
    }

    /// Allocate a fresh, zeroed, writable block not yet backed by any
    /// file region (used by tests and write-side callers building a new
    /// block's contents before it has a home).
    pub fn new_zero(size: u32) -> Block<'static> {
        Block {
            allocator: None,
            offset: 0,
            size,
            pos: 0,
            data: vec![0u8; size as usize],
            dirty: false,
        }
    }

    /// Size of this block, in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// This block's absolute offset within the file (before the
    /// allocator's +4 read/write adjustment).
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Current cursor position.
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Whether this block has unflushed writes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Raw contents of the block as read (or written) so far.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Move the cursor. `pos` is bounded to `[0, size]`; out of range is
    /// an error.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u32> {
        let base = match whence {
            Whence::Start => 0i64,
            Whence::Current => self.pos as i64,
            Whence::End => self.size as i64,
        };
        let target = base + offset;
        if target < 0 || target > self.size as i64 {
            return Err(Error::SeekOutOfRange {
                pos: target,
                size: self.size,
            });
        }
        self.pos = target as u32;
        Ok(self.pos)
    }

    /// Advance the cursor by `n` bytes without reading, bounded the same
    /// way `seek` is.
    pub fn skip(&mut self, n: i64) {
        let _ = self.seek(n, Whence::Current);
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        let start = self.pos as usize;
        let end = start
            .checked_add(len)
            .filter(|&e| e <= self.data.len())
            .ok_or(Error::SeekOutOfRange {
                pos: (start + len) as i64,
                size: self.size,
            })?;
        self.pos += len as u32;
        Ok(&self.data[start..end])
    }

    /// Read one big-endian `u32`, advancing the cursor by 4.
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    /// Read one byte, advancing the cursor by 1.
    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a fixed-length buffer, advancing the cursor by `len`.
    pub fn read_buf(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }

    /// Read `n` big-endian `u32`s back to back.
    pub fn read_u32_slice(&mut self, n: usize) -> Result<Vec<u32>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_u32()?);
        }
        Ok(out)
    }

    /// Read a fixed-size ASCII string of `len` bytes.
    pub fn read_ascii(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }

    /// Write `bytes` at the cursor, advancing it and marking the block
    /// dirty. Fails with [`Error::WritePastEnd`] if the write would run
    /// past `size`.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let start = self.pos as usize;
        let end = start.checked_add(bytes.len()).unwrap_or(usize::MAX);
        if end > self.data.len() {
            return Err(Error::WritePastEnd {
                cursor: self.pos,
                len: bytes.len(),
                size: self.size,
            });
        }
        self.data[start..end].copy_from_slice(bytes);
        self.pos = end as u32;
        self.dirty = true;
        Ok(bytes.len())
    }

    /// If dirty, persist this block's buffer back to the file at its
    /// absolute offset via the owning allocator, and clear the dirty flag.
    ///
    /// A dirty block that is dropped without a successful `flush` drops
    /// its pending writes silently — this is a stated contract of the
    /// block abstraction, not an implicit one; callers that want their
    /// writes to land must call this explicitly.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let allocator = self
            .allocator
            .expect("flush called on a block with no owning allocator");
        allocator.write(self.offset, &self.data)?;
        self.dirty = false;
        Ok(())
    }

    /// Decode one structured [`Entry`] at the cursor.
    pub fn read_entry(&mut self) -> Result<Entry> {
        Entry::decode(self)
    }
}
