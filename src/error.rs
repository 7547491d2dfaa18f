//! Errors produced by this crate.
//!
//! Follows the layered-error idiom of the device/controller layer this
//! crate is grounded on: a single `thiserror`-derived enum, `#[from]`
//! wrapping for the underlying I/O errors, and a crate-wide [`Result`]
//! alias so callers rarely have to spell out the error type.
//!
//! No error is recovered locally anywhere in this crate: every failure
//! surfaces to the caller unchanged. There are no retries and no partial
//! results — see the traversal and allocator modules for where each
//! variant originates.

use thiserror::Error;

/// The error type returned by every fallible operation in this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The file does not start with the expected `Bud1` header: either the
    /// version word was not `1`, the magic was not `Bud1`, or the two
    /// root-offset header fields disagreed.
    #[error("not a buddy-allocated store")]
    NotABuddyFile,

    /// Propagated I/O failure from the backing file (covers both outright
    /// I/O errors and short reads detected via `read_exact`/`read_exact_at`).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A `Block::seek` call asked for a position outside `[0, size]`.
    #[error("seek to {pos} out of range [0, {size}] for this block")]
    SeekOutOfRange {
        /// The position that was requested.
        pos: i64,
        /// The size of the block that rejected the seek.
        size: u32,
    },

    /// A `Block::write` call would have written past the end of the block.
    #[error("write of {len} bytes at cursor {cursor} exceeds block size {size}")]
    WritePastEnd {
        /// Cursor position the write started at.
        cursor: u32,
        /// Number of bytes the caller tried to write.
        len: usize,
        /// Size of the block being written to.
        size: u32,
    },

    /// `Allocator::get_block` was asked for a block id outside the offsets
    /// table loaded from the root block.
    #[error("unknown block id {0}")]
    UnknownBlock(u32),

    /// `Store::open` found no `DSDB` entry in the table of contents.
    #[error("no `DSDB` entry in the table of contents")]
    NoStoreRoot,

    /// An entry carried a `typeCode` this codec does not recognize.
    #[error("unknown type code `{0}`")]
    UnknownTypeCode(String),

    /// A typed payload accessor was called on an entry whose `typeCode` or
    /// `code` does not match what the accessor requires.
    #[error("type mismatch: expected {expected}, found `{found}`")]
    TypeMismatch {
        /// What the accessor required.
        expected: &'static str,
        /// What the entry actually carried.
        found: String,
    },

    /// A payload's length didn't match what its `typeCode` requires (e.g. a
    /// `bool` entry whose payload isn't exactly one byte).
    #[error("payload shape invalid for type code `{type_code}`: {reason}")]
    PayloadShape {
        /// The type code whose shape was violated.
        type_code: &'static str,
        /// Human-readable description of the mismatch.
        reason: &'static str,
    },

    /// A traversal visitor returned an error; traversal stopped immediately
    /// and the visitor's own error is carried unchanged.
    #[error("traversal aborted: {0}")]
    TraversalAborted(Box<Error>),

    /// The shell-style glob pattern passed to `Store::find` failed to parse.
    #[error("invalid find pattern: {0}")]
    InvalidPattern(#[from] glob::PatternError),

    /// A typed accessor that hands payload bytes to an externally supplied
    /// decoder (property list / alias-bookmark) was called without one.
    #[error("no {0} decoder was supplied")]
    NoDecoder(&'static str),
}

/// Crate-wide `Result` alias so callers rarely need to spell out the error type.
pub type Result<T> = std::result::Result<T, Error>;
