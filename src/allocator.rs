//! The buddy allocator: owns the backing file, parses the `Bud1` header,
//! and maps block identifiers to `(offset, size)` regions of the file.
//!
//! A single struct owns the file (here, a read-write memory map of it) and
//! exposes bounded `read`/`write` primitives that every other layer goes
//! through. Addressing is relative to a logical origin 4 bytes into the
//! file (the version word occupies the first word before it); see
//! [`Allocator::read`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;

use memmap2::{MmapMut, MmapOptions};

use crate::block::Block;
use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"Bud1";
const HEADER_LEN: usize = 36;
const TOC_BUCKET_COUNT: usize = 32;
const OFFSET_TABLE_PAD: usize = 256;

/// The 36-byte header every buddy-allocated file starts with.
#[derive(Debug, Clone, Copy)]
struct Header {
    root_offset: u32,
    root_size: u32,
    /// The 16 opaque bytes following the root-offset duplicate. Retained
    /// verbatim so a later write-back path could reproduce them exactly.
    reserved: [u8; 16],
}

/// Owns the backing file and every [`Block`] view issued over it.
///
/// Blocks hold a non-owning, lookup-only reference back to their
/// `Allocator` (to call `read`/`write`); they never outlive it.
#[derive(Debug)]
pub struct Allocator {
    /// Wrapped in a `RefCell` so that [`Allocator::write`] can mutate the
    /// map through a shared `&self` — the same shared, non-owning
    /// back-reference [`Block`] holds to its allocator — without resorting
    /// to a raw pointer cast. This crate's concurrency model is
    /// single-threaded and synchronous (see the crate root docs), so the
    /// runtime borrow check never contends.
    mmap: RefCell<MmapMut>,
    header: Header,
    /// `offsets[block_id]` is the packed `(offset, size)` descriptor for
    /// that block id. Zero entries are valid — they denote an unallocated
    /// slot — and are kept in place so that `block_id` stays a stable
    /// index into this vector.
    offsets: Vec<u32>,
    /// Short ASCII name -> block id, as read from the root block. The
    /// well-known name `DSDB` points at the store descriptor block.
    toc: HashMap<String, u32>,
    /// One free-offset list per power-of-two size class (2^0 .. 2^31).
    /// Nothing in this crate's traversal path consumes the free list yet,
    /// but it is still parsed so that the root block's cursor stays
    /// aligned for any field that follows it.
    free_list: [Vec<u32>; TOC_BUCKET_COUNT],
}

impl Allocator {
    /// Open `path`, parse its header, and load the root block's offsets
    /// table, table of contents, and free list.
    ///
    /// Fails with [`Error::NotABuddyFile`] if the version word isn't `1`,
    /// the magic isn't `Bud1`, or the two root-offset header fields
    /// disagree.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Allocator> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };

        let header = Self::parse_header(&mmap)?;
        log::debug!(
            "parsed buddy header: root_offset={} root_size={}",
            header.root_offset,
            header.root_size
        );

        let mut allocator = Allocator {
            mmap: RefCell::new(mmap),
            header,
            offsets: Vec::new(),
            toc: HashMap::new(),
            free_list: Default::default(),
        };

        let root = allocator.read_block_raw(header.root_offset, header.root_size)?;
        let mut root = Block::from_bytes(header.root_offset, root);
        allocator.offsets = Self::read_offsets(&mut root)?;
        allocator.toc = Self::read_toc(&mut root)?;
        allocator.free_list = Self::read_free_list(&mut root)?;

        log::debug!(
            "loaded {} offsets, {} toc entries",
            allocator.offsets.len(),
            allocator.toc.len()
        );

        Ok(allocator)
    }

    fn parse_header(mmap: &[u8]) -> Result<Header> {
        if mmap.len() < HEADER_LEN {
            return Err(Error::NotABuddyFile);
        }
        let version = u32::from_be_bytes(mmap[0..4].try_into().unwrap());
        if version != 1 {
            return Err(Error::NotABuddyFile);
        }
        if &mmap[4..8] != MAGIC {
            return Err(Error::NotABuddyFile);
        }
        let root_offset = u32::from_be_bytes(mmap[8..12].try_into().unwrap());
        let root_size = u32::from_be_bytes(mmap[12..16].try_into().unwrap());
        let root_offset_dup = u32::from_be_bytes(mmap[16..20].try_into().unwrap());
        if root_offset != root_offset_dup {
            return Err(Error::NotABuddyFile);
        }
        let mut reserved = [0u8; 16];
        reserved.copy_from_slice(&mmap[20..36]);
        Ok(Header {
            root_offset,
            root_size,
            reserved,
        })
    }

    /// `offsets[]`: a length-prefixed vector of packed block descriptors,
    /// padded up to a multiple of 256 entries with zeros (the padding is
    /// discarded once the real count is known).
    fn read_offsets(root: &mut Block<'_>) -> Result<Vec<u32>> {
        let count = root.read_u32()? as usize;
        let _unused = root.read_u32()?;
        root.skip(4);
        let padded = count.div_ceil(OFFSET_TABLE_PAD) * OFFSET_TABLE_PAD;
        let mut words = root.read_u32_slice(padded)?;
        words.truncate(count);
        Ok(words)
    }

    /// `toc`: count, then count * (1-byte name length, name bytes, u32
    /// block id).
    fn read_toc(root: &mut Block<'_>) -> Result<HashMap<String, u32>> {
        let count = root.read_u32()?;
        let mut toc = HashMap::with_capacity(count as usize);
        for _ in 0..count {
            let len = root.read_byte()? as usize;
            let name = root.read_ascii(len)?;
            let block_id = root.read_u32()?;
            toc.insert(name, block_id);
        }
        Ok(toc)
    }

    /// `freeList`: 32 buckets, each a count followed by that many u32
    /// offsets.
    fn read_free_list(root: &mut Block<'_>) -> Result<[Vec<u32>; TOC_BUCKET_COUNT]> {
        let mut buckets: [Vec<u32>; TOC_BUCKET_COUNT] = Default::default();
        for bucket in buckets.iter_mut() {
            let count = root.read_u32()? as usize;
            *bucket = root.read_u32_slice(count)?;
        }
        Ok(buckets)
    }

    /// Absolute positioned read, adding the fixed 4-byte file prefix (the
    /// version word) to `offset` before indexing into the file, per the
    /// format's convention that on-disk pointers are relative to byte 4.
    pub fn read(&self, offset: u32, size: u32) -> Result<Vec<u8>> {
        self.read_block_raw(offset, size)
    }

    fn read_block_raw(&self, offset: u32, size: u32) -> Result<Vec<u8>> {
        let mmap = self.mmap.borrow();
        let start = offset as usize + 4;
        let end = start
            .checked_add(size as usize)
            .ok_or(Error::NotABuddyFile)?;
        if end > mmap.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "read past end of file",
            )
            .into());
        }
        Ok(mmap[start..end].to_vec())
    }

    /// Symmetric positioned write (same +4 adjustment as [`Allocator::read`]).
    ///
    /// Takes `&self`, the same shared, non-owning back-reference [`Block`]
    /// holds to its allocator: the map lives behind a `RefCell` so the
    /// write is a safe slice `copy_from_slice`, borrow-checked at run
    /// time. This crate's concurrency model is single-threaded and
    /// synchronous (see the crate root docs), so the borrow never
    /// contends with a concurrent read or write.
    pub fn write(&self, offset: u32, data: &[u8]) -> Result<usize> {
        let mut mmap = self.mmap.borrow_mut();
        let start = offset as usize + 4;
        let end = start
            .checked_add(data.len())
            .ok_or(Error::NotABuddyFile)?;
        if end > mmap.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "write past end of file",
            )
            .into());
        }
        mmap[start..end].copy_from_slice(data);
        Ok(data.len())
    }

    /// Look up `offsets[block_id]`, unpack its `(offset, size)`, and
    /// construct a [`Block`] over that range of the file.
    pub fn get_block(&self, block_id: u32) -> Result<Block<'_>> {
        let word = *self
            .offsets
            .get(block_id as usize)
            .ok_or(Error::UnknownBlock(block_id))?;
        let (offset, size) = unpack_descriptor(word);
        let data = self.read(offset, size)?;
        Ok(Block::new(self, offset, data))
    }

    /// The table of contents loaded from the root block: short ASCII name
    /// (e.g. `DSDB`) to block id.
    pub fn table_of_contents(&self) -> &HashMap<String, u32> {
        &self.toc
    }

    /// The offsets table loaded from the root block, indexed by block id.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// The free-offset lists, one per power-of-two size class.
    pub fn free_list(&self) -> &[Vec<u32>; TOC_BUCKET_COUNT] {
        &self.free_list
    }

    /// The root block's absolute offset and size, as recorded in the
    /// header (not yet adjusted for the +4 convention `read` applies).
    pub fn root_block_location(&self) -> (u32, u32) {
        (self.header.root_offset, self.header.root_size)
    }

    /// The 16 opaque header bytes, preserved verbatim.
    pub fn header_reserved(&self) -> &[u8; 16] {
        &self.header.reserved
    }
}

/// Unpack a single 32-bit packed block descriptor into `(offset, size)`.
///
/// The low 5 bits of the word carry `log2(size)`; the remaining high bits
/// carry `offset`, which is always aligned to `size`. This bit layout is
/// load-bearing for compatibility with the original format and must be
/// preserved exactly.
pub fn unpack_descriptor(word: u32) -> (u32, u32) {
    let size = 1u32 << (word & 0x1f);
    let offset = word & !0x1f;
    (offset, size)
}

/// Pack an `(offset, size)` pair back into the on-disk descriptor word.
/// `size` must be a power of two in `[1, 2^31]` and `offset` must already
/// be aligned to `size`; callers that violate this produce a descriptor
/// that will not round-trip through [`unpack_descriptor`].
pub fn pack_descriptor(offset: u32, size: u32) -> u32 {
    offset | size.trailing_zeros()
}
