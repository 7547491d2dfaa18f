//! Reader (and, where specified, writer) for the buddy-allocated binary
//! container format used to persist per-folder view metadata — the file
//! commonly encountered as a hidden per-directory state file.
//!
//! The crate is organized bottom-up, each layer depending only on the one
//! below:
//!
//! - [`allocator`]: parses the file header, owns the backing file, and
//!   maps block identifiers to `(offset, size)` regions.
//! - [`block`]: a bounded, seekable view over one such region, with
//!   big-endian primitive decoders and the typed-entry codec.
//! - [`entry`]: the typed `(filename, code, typeCode, payload)` record
//!   and its typed payload accessors.
//! - [`store`]: the B-tree root descriptor and in-order traversal.
//! - [`boundary`]: traits through which an external property-list decoder
//!   and alias/bookmark decoder are injected, for the small subset of
//!   `code`s whose payload this crate does not interpret itself.
//!
//! # Scope
//!
//! This crate covers the buddy-allocated block store, the typed-record
//! codec, and B-tree traversal — not write-back scheduling semantics of
//! the originating operating system, not concurrent multi-writer access,
//! and not schema-level interpretation of every known four-character
//! code. The command-line binary built on top (`dsdump`) and the
//! property-list/alias-bookmark decoders are external to the core and
//! reached only through the boundary this crate exposes.
//!
//! # Concurrency
//!
//! Single-threaded and synchronous: every read is a bounded positioned
//! read against the backing file, nothing suspends, and there is no
//! cancellation handle beyond dropping the [`allocator::Allocator`],
//! which releases every [`block::Block`] issued from it along with the
//! file handle. Concurrent use of one `Allocator` from multiple threads
//! is undefined; callers must serialize externally.

#![deny(missing_docs)]

pub mod allocator;
pub mod block;
pub mod boundary;
pub mod entry;
pub mod error;
pub mod store;

pub use allocator::Allocator;
pub use block::Block;
pub use entry::Entry;
pub use error::{Error, Result};
pub use store::Store;
