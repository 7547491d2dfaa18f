//! Traits through which the two external collaborators this crate never
//! implements itself — a property-list decoder and an alias/bookmark
//! decoder — are injected by the caller.
//!
//! The core treats both as opaque byte-consumers (per the scoping in the
//! crate root docs): [`Entry::as_plist`](crate::entry::Entry::as_plist)
//! and [`Entry::as_bookmark`](crate::entry::Entry::as_bookmark) only
//! check that the entry's `code` is one this kind of payload is valid
//! for, then hand the raw bytes to whatever implementation the caller
//! supplies. A caller with no interest in interpreting these payloads can
//! use the no-op defaults below and simply not call those accessors.

use crate::error::{Error, Result};

/// A dynamically typed property-list value, mirroring the boundary
/// contract `bytes -> (map<string, dynamic>, format_tag)`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    /// A UTF-8 string value.
    String(String),
    /// A signed integer value.
    Integer(i64),
    /// A floating point value.
    Real(f64),
    /// A boolean value.
    Boolean(bool),
    /// Opaque binary data.
    Data(Vec<u8>),
    /// An ordered list of values.
    Array(Vec<PlistValue>),
    /// A string-keyed dictionary of values.
    Dictionary(std::collections::HashMap<String, PlistValue>),
}

/// Decodes the binary or XML property-list payload carried by entries
/// whose `code` is one of `bwsp`, `lsvp`, `lsvP`, or `icvp`.
pub trait PlistDecoder {
    /// Decode `bytes` into a value plus a caller-defined format tag (e.g.
    /// `"bplist00"` or `"xml"`).
    fn decode(&self, bytes: &[u8]) -> Result<(PlistValue, String)>;
}

/// A decoder that always reports no property-list support is wired up.
/// Useful for callers that never intend to call
/// [`Entry::as_plist`](crate::entry::Entry::as_plist).
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedPlistDecoder;

impl PlistDecoder for UnimplementedPlistDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<(PlistValue, String)> {
        Err(Error::NoDecoder("property-list"))
    }
}

/// Opaque alias/bookmark data, as produced by an injected
/// [`BookmarkDecoder`]. Callers reparse the bytes with their own
/// alias/bookmark crate as needed; this crate does not interpret them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkData(pub Vec<u8>);

/// Decodes the alias/bookmark payload carried by entries whose `code` is
/// `pBBk`.
pub trait BookmarkDecoder {
    /// Decode `bytes` into bookmark data.
    fn decode(&self, bytes: &[u8]) -> Result<BookmarkData>;
}

/// A decoder that always reports no alias/bookmark support is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedBookmarkDecoder;

impl BookmarkDecoder for UnimplementedBookmarkDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<BookmarkData> {
        Err(Error::NoDecoder("alias/bookmark"))
    }
}
