//! The typed record stored in B-tree nodes: `(filename, code, typeCode,
//! payload)`, its codec, and the typed payload accessors built on top of
//! it.
//!
//! `code` and `typeCode` are independent four-ASCII-byte tags: `code`
//! names the *kind* of property (e.g. `Iloc`, icon location), `typeCode`
//! names the *encoding* of the payload (e.g. `long`, a big-endian 32-bit
//! integer). The payload is kept as raw bytes plus the `typeCode` tag
//! rather than eagerly parsed into a heterogeneous value; the typed
//! accessors below parse on demand instead.

use crate::block::Block;
use crate::boundary::{BookmarkData, BookmarkDecoder, PlistDecoder, PlistValue};
use crate::error::{Error, Result};

/// One decoded record: a filename, a four-character `code`, a
/// four-character `typeCode`, and the raw payload bytes whose shape
/// `typeCode` determines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The file or directory name this record is attached to.
    pub filename: String,
    /// The four-ASCII-byte property kind, e.g. `Iloc`.
    pub code: String,
    /// The four-ASCII-byte payload encoding, e.g. `long`.
    pub type_code: String,
    /// Raw payload bytes, retained verbatim for later typed
    /// interpretation.
    pub payload: Vec<u8>,
}

impl Entry {
    /// Decode one entry from `block` at its current cursor.
    ///
    /// Reads, in order: a 32-bit filename length in UTF-16 code units,
    /// that many UTF-16BE code units, a 4-byte ASCII `code`, a 4-byte
    /// ASCII `typeCode`, and finally a payload whose length is determined
    /// by `typeCode` (see the module docs of [`crate`] for the table).
    pub fn decode(block: &mut Block<'_>) -> Result<Entry> {
        let name_units = block.read_u32()? as usize;
        let name_bytes = block.read_buf(name_units * 2)?;
        let filename = decode_utf16be(&name_bytes);

        let code = block.read_ascii(4)?;
        let type_code = block.read_ascii(4)?;

        let payload = match type_code.as_str() {
            "bool" => block.read_buf(1)?,
            "type" | "long" | "shor" => block.read_buf(4)?,
            "comp" | "dutc" => block.read_buf(8)?,
            "blob" => {
                let len = block.read_u32()? as usize;
                block.read_buf(len)?
            }
            "ustr" => {
                let units = block.read_u32()? as usize;
                block.read_buf(units * 2)?
            }
            other => return Err(Error::UnknownTypeCode(other.to_string())),
        };

        Ok(Entry {
            filename,
            code,
            type_code,
            payload,
        })
    }

    /// Re-encode this entry to its on-disk byte sequence. Inverse of
    /// [`Entry::decode`].
    ///
    /// Note the intentional asymmetry documented in the format notes: on
    /// decode, a `ustr` length field is a code-unit count (payload =
    /// `2 * length` bytes); on encode, the emitted length field is the
    /// byte length of the UTF-16BE-encoded payload. Both happen to be the
    /// same number for payloads that only contain characters outside the
    /// surrogate range, which is the common case, but callers relying on
    /// exact round-tripping of `ustr` payloads containing surrogate pairs
    /// should be aware the two conventions are pinned independently (see
    /// the `ustr_length_convention` test).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let name_bytes = encode_utf16be(&self.filename);
        out.extend_from_slice(&((name_bytes.len() / 2) as u32).to_be_bytes());
        out.extend_from_slice(&name_bytes);
        out.extend_from_slice(self.code.as_bytes());
        out.extend_from_slice(self.type_code.as_bytes());

        match self.type_code.as_str() {
            "bool" | "type" | "long" | "shor" | "comp" | "dutc" => {
                out.extend_from_slice(&self.payload);
            }
            "blob" => {
                out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
                out.extend_from_slice(&self.payload);
            }
            "ustr" => {
                out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
                out.extend_from_slice(&self.payload);
            }
            other => return Err(Error::UnknownTypeCode(other.to_string())),
        }
        Ok(out)
    }

    /// Interpret this entry's payload as a `bool`. Requires `typeCode ==
    /// "bool"` and a 1-byte payload; `0x01` decodes to `true`, any other
    /// byte value to `false`.
    pub fn as_bool(&self) -> Result<bool> {
        self.require_type_code("bool")?;
        if self.payload.len() != 1 {
            return Err(Error::PayloadShape {
                type_code: "bool",
                reason: "payload must be exactly 1 byte",
            });
        }
        Ok(self.payload[0] == 0x01)
    }

    /// Interpret this entry's payload as a Unicode string. Requires
    /// `typeCode == "ustr"`.
    pub fn as_ustring(&self) -> Result<String> {
        self.require_type_code("ustr")?;
        Ok(decode_utf16be(&self.payload))
    }

    /// Interpret this entry's payload as a Mac-epoch timestamp. Requires
    /// `typeCode == "dutc"`: a big-endian 64-bit fixed-point value, whole
    /// seconds in the high 48 bits and a 1/65536ths-of-a-second fraction
    /// in the low 16. Returns `None` for the sentinel `INT64_MIN` payload
    /// ("no timestamp"), otherwise `Some(unix_seconds)`.
    ///
    /// The sentinel is checked against the raw 64-bit payload before
    /// scaling by 65536 — scaling first and then comparing against
    /// `INT64_MIN` can never match, since dividing `INT64_MIN` by 65536
    /// yields a different value. Checking the raw payload is the only
    /// reading under which the sentinel check does anything at all.
    pub fn as_timestamp(&self) -> Result<Option<i64>> {
        self.require_type_code("dutc")?;
        if self.payload.len() != 8 {
            return Err(Error::PayloadShape {
                type_code: "dutc",
                reason: "payload must be exactly 8 bytes",
            });
        }
        let raw = i64::from_be_bytes(self.payload[..8].try_into().unwrap());
        if raw == i64::MIN {
            return Ok(None);
        }
        const UNIX_EPOCH_OFFSET_SECONDS: i64 = 2_082_844_800;
        let mac_seconds = raw / 65536;
        Ok(Some(mac_seconds - UNIX_EPOCH_OFFSET_SECONDS))
    }

    /// Interpret this entry's payload as an icon-location record. Requires
    /// `code == "Iloc"` (not `typeCode`): the payload begins with two
    /// big-endian `u32`s, `(x, y)`; any trailing bytes are ignored.
    pub fn decode_iloc(&self) -> Result<(u32, u32)> {
        if self.code != "Iloc" {
            return Err(Error::TypeMismatch {
                expected: "code `Iloc`",
                found: self.code.clone(),
            });
        }
        if self.payload.len() < 8 {
            return Err(Error::PayloadShape {
                type_code: "Iloc",
                reason: "payload must hold at least two u32 coordinates",
            });
        }
        let x = u32::from_be_bytes(self.payload[0..4].try_into().unwrap());
        let y = u32::from_be_bytes(self.payload[4..8].try_into().unwrap());
        Ok((x, y))
    }

    /// Hand this entry's payload to an externally supplied property-list
    /// decoder. Valid only for `code` in `{bwsp, lsvp, lsvP, icvp}`.
    pub fn as_plist(&self, decoder: &dyn PlistDecoder) -> Result<(PlistValue, String)> {
        match self.code.as_str() {
            "bwsp" | "lsvp" | "lsvP" | "icvp" => decoder.decode(&self.payload),
            other => Err(Error::TypeMismatch {
                expected: "code in {bwsp, lsvp, lsvP, icvp}",
                found: other.to_string(),
            }),
        }
    }

    /// Hand this entry's payload to an externally supplied alias/bookmark
    /// decoder. Valid only for `code == "pBBk"`.
    pub fn as_bookmark(&self, decoder: &dyn BookmarkDecoder) -> Result<BookmarkData> {
        if self.code != "pBBk" {
            return Err(Error::TypeMismatch {
                expected: "code `pBBk`",
                found: self.code.clone(),
            });
        }
        decoder.decode(&self.payload)
    }

    fn require_type_code(&self, expected: &'static str) -> Result<()> {
        if self.type_code != expected {
            return Err(Error::TypeMismatch {
                expected,
                found: self.type_code.clone(),
            });
        }
        Ok(())
    }
}

/// Decode a UTF-16BE byte stream to a Unicode string. A leading BOM
/// (`0xFEFF`), if present, is consumed; surrogate pairs are decoded per
/// the Unicode standard, and lone/invalid surrogates are replaced with
/// U+FFFD (matching `char::decode_utf16`'s lossy behavior).
pub fn decode_utf16be(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    if units.first() == Some(&0xFEFF) {
        units.remove(0);
    }
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Encode a Unicode string to UTF-16BE, without a BOM.
pub fn encode_utf16be(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_entry(type_code: &str, payload: Vec<u8>) -> Entry {
        Entry {
            filename: "foo.txt".to_string(),
            code: "plst".to_string(),
            type_code: type_code.to_string(),
            payload,
        }
    }

    #[test]
    fn utf16be_round_trips_bmp_text() {
        let s = "bar.txt";
        let encoded = encode_utf16be(s);
        assert_eq!(decode_utf16be(&encoded), s);
    }

    #[test]
    fn utf16be_decode_consumes_bom() {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend_from_slice(&encode_utf16be("hi"));
        assert_eq!(decode_utf16be(&bytes), "hi");
    }

    #[test]
    fn utf16be_round_trips_surrogate_pairs() {
        let s = "\u{1F600}"; // outside the BMP, needs a surrogate pair
        let encoded = encode_utf16be(s);
        assert_eq!(encoded.len(), 4);
        assert_eq!(decode_utf16be(&encoded), s);
    }

    #[test]
    fn fixed_width_entries_round_trip() {
        for (type_code, payload) in [
            ("bool", vec![0x01]),
            ("long", vec![0, 0, 0, 42]),
            ("shor", vec![0, 0, 0, 7]),
            ("type", b"APPL".to_vec()),
            ("comp", vec![0; 8]),
            ("dutc", vec![0, 0, 0, 0, 0, 0, 0, 0]),
        ] {
            let e = fixed_entry(type_code, payload);
            let bytes = e.encode().unwrap();
            let mut cursor = Block::new_zero(bytes.len() as u32);
            cursor.write(&bytes).unwrap();
            cursor.seek(0, crate::block::Whence::Start).unwrap();
            let decoded = Entry::decode(&mut cursor).unwrap();
            assert_eq!(decoded, e);
        }
    }

    #[test]
    fn blob_entry_round_trips() {
        let e = fixed_entry("blob", vec![1, 2, 3, 4, 5]);
        let bytes = e.encode().unwrap();
        let mut cursor = Block::new_zero(bytes.len() as u32);
        cursor.write(&bytes).unwrap();
        cursor.seek(0, crate::block::Whence::Start).unwrap();
        let decoded = Entry::decode(&mut cursor).unwrap();
        assert_eq!(decoded, e);
    }

    /// Pins the write-side `ustr` length convention: the length field
    /// emitted on encode is the byte length of the UTF-16BE encoding, not
    /// (as on decode) a code-unit count interpreted independently. For
    /// BMP-only strings the two coincide; this test exists so a future
    /// change to either convention gets caught.
    #[test]
    fn ustr_length_convention() {
        let s = "hello";
        let mut e = fixed_entry("ustr", Vec::new());
        e.payload = encode_utf16be(s);
        let bytes = e.encode().unwrap();
        // name length field (4) + name bytes (14) + code (4) + type_code (4) = 26
        let ustr_len_field_offset = 4 + e.filename.len() * 2 + 4 + 4;
        let len_field = u32::from_be_bytes(
            bytes[ustr_len_field_offset..ustr_len_field_offset + 4]
                .try_into()
                .unwrap(),
        );
        assert_eq!(len_field as usize, e.payload.len());

        let mut cursor = Block::new_zero(bytes.len() as u32);
        cursor.write(&bytes).unwrap();
        cursor.seek(0, crate::block::Whence::Start).unwrap();
        let decoded = Entry::decode(&mut cursor).unwrap();
        assert_eq!(decoded.as_ustring().unwrap(), s);
    }

    #[test]
    fn unknown_type_code_fails_to_decode() {
        let mut e = fixed_entry("xxxx", Vec::new());
        e.type_code = "xxxx".to_string();
        let mut payload_bytes = Vec::new();
        payload_bytes.extend_from_slice(&1u32.to_be_bytes());
        payload_bytes.extend_from_slice(&encode_utf16be("f"));
        payload_bytes.extend_from_slice(b"plst");
        payload_bytes.extend_from_slice(b"xxxx");
        let mut cursor = Block::new_zero(payload_bytes.len() as u32);
        cursor.write(&payload_bytes).unwrap();
        cursor.seek(0, crate::block::Whence::Start).unwrap();
        let err = Entry::decode(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::UnknownTypeCode(_)));
    }

    #[test]
    fn iloc_decodes_coordinates() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&59u32.to_be_bytes());
        payload.extend_from_slice(&40u32.to_be_bytes());
        let e = Entry {
            filename: "bar.txt".to_string(),
            code: "Iloc".to_string(),
            type_code: "blob".to_string(),
            payload,
        };
        assert_eq!(e.decode_iloc().unwrap(), (59, 40));
    }

    #[test]
    fn timestamp_sentinel_is_none() {
        let e = fixed_entry("dutc", i64::MIN.to_be_bytes().to_vec());
        assert_eq!(e.as_timestamp().unwrap(), None);
    }

    #[test]
    fn timestamp_converts_to_unix_epoch() {
        // 1 second after the Mac epoch (1904-01-01), scaled by 65536.
        let mac_ticks: i64 = 65536;
        let e = fixed_entry("dutc", mac_ticks.to_be_bytes().to_vec());
        let unix = e.as_timestamp().unwrap().unwrap();
        assert_eq!(unix, 1 - 2_082_844_800);
    }

    #[test]
    fn bool_requires_matching_type_code() {
        let e = fixed_entry("long", vec![0, 0, 0, 1]);
        let err = e.as_bool().unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
