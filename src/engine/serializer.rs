//! SHELF - Dataset Serializers
//! Converts a full snapshot to the bytes of the on-disk file and back.
//! The engine never looks inside the encoding; it only calls these two
//! boundary functions.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Result, ShelfError};
use crate::types::Entry;

/// Encodes a whole dataset to bytes and decodes it back.
pub trait Serializer: Send + Sync {
    fn serialize(&self, entries: &[Entry]) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<Entry>>;

    /// `false` selects text mode: the file must be valid UTF-8 when it is read back.
    fn uses_buffers(&self) -> bool {
        true
    }
}

/// Human-readable JSON array of `{ "key": [..], "value": [..] }` objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pub pretty: bool,
}

impl Serializer for JsonSerializer {
    fn serialize(&self, entries: &[Entry]) -> Result<Vec<u8>> {
        let out = if self.pretty {
            serde_json::to_vec_pretty(entries)
        } else {
            serde_json::to_vec(entries)
        };
        out.map_err(|e| ShelfError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<Entry>> {
        serde_json::from_slice(bytes).map_err(|e| ShelfError::Serialization(e.to_string()))
    }

    fn uses_buffers(&self) -> bool {
        false
    }
}

/// Compact binary encoding with an integrity frame.
///
/// ## Binary Format
/// ```text
/// [magic: 4 bytes "SHLF"][crc: 4 bytes (LE) over payload][payload: bincode Vec<Entry>]
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl BincodeSerializer {
    const MAGIC: &'static [u8; 4] = b"SHLF";
    const HEADER_LEN: usize = 8;
}

impl Serializer for BincodeSerializer {
    fn serialize(&self, entries: &[Entry]) -> Result<Vec<u8>> {
        let payload =
            bincode::serialize(entries).map_err(|e| ShelfError::Serialization(e.to_string()))?;
        let mut buf = Vec::with_capacity(Self::HEADER_LEN + payload.len());
        buf.extend_from_slice(Self::MAGIC);
        buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<Entry>> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(ShelfError::Corruption(format!(
                "file too short: {} bytes",
                bytes.len()
            )));
        }
        let (header, payload) = bytes.split_at(Self::HEADER_LEN);
        if &header[..4] != Self::MAGIC {
            return Err(ShelfError::Corruption("bad magic".into()));
        }
        let stored = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let actual = crc32fast::hash(payload);
        if stored != actual {
            return Err(ShelfError::Corruption(format!(
                "CRC mismatch: stored {:08x}, computed {:08x}",
                stored, actual
            )));
        }
        bincode::deserialize(payload).map_err(|e| ShelfError::Serialization(e.to_string()))
    }
}

/// Gzip-compresses the output of another serializer.
#[derive(Debug, Clone, Default)]
pub struct GzipSerializer<S> {
    inner: S,
    level: Compression,
}

impl<S: Serializer> GzipSerializer<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            level: Compression::default(),
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Compression::new(level);
        self
    }
}

impl<S: Serializer> Serializer for GzipSerializer<S> {
    fn serialize(&self, entries: &[Entry]) -> Result<Vec<u8>> {
        let raw = self.inner.serialize(entries)?;
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(&raw)
            .map_err(|e| ShelfError::Serialization(format!("gzip: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| ShelfError::Serialization(format!("gzip: {}", e)))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<Entry>> {
        let mut raw = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut raw)
            .map_err(|e| ShelfError::Corruption(format!("gzip: {}", e)))?;
        self.inner.deserialize(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Entry> {
        vec![
            Entry::new(b"alpha".to_vec(), b"1".to_vec()),
            Entry::new(vec![0u8, 255, 7], vec![0xAB; 64]),
        ]
    }

    #[test]
    fn test_json_is_text_mode() {
        let s = JsonSerializer::default();
        assert!(!s.uses_buffers());
        let bytes = s.serialize(&sample()).unwrap();
        assert!(std::str::from_utf8(&bytes).is_ok());
        assert_eq!(s.deserialize(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_json_empty_dataset() {
        let s = JsonSerializer::default();
        let bytes = s.serialize(&[]).unwrap();
        assert_eq!(bytes, b"[]");
        assert!(s.deserialize(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_json_rejects_garbage() {
        let err = JsonSerializer::default().deserialize(b"{not json").unwrap_err();
        assert!(matches!(err, ShelfError::Serialization(_)));
    }

    #[test]
    fn test_bincode_detects_bit_flip() {
        let s = BincodeSerializer;
        let mut bytes = s.serialize(&sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let err = s.deserialize(&bytes).unwrap_err();
        assert!(matches!(err, ShelfError::Corruption(_)));
    }

    #[test]
    fn test_bincode_rejects_short_and_foreign_files() {
        let s = BincodeSerializer;
        assert!(matches!(
            s.deserialize(b"SHL").unwrap_err(),
            ShelfError::Corruption(_)
        ));
        assert!(matches!(
            s.deserialize(b"JSON\0\0\0\0[]").unwrap_err(),
            ShelfError::Corruption(_)
        ));
    }

    #[test]
    fn test_gzip_wraps_inner_format() {
        let s = GzipSerializer::new(JsonSerializer::default()).with_level(9);
        let bytes = s.serialize(&sample()).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        assert_eq!(s.deserialize(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_gzip_rejects_plain_input() {
        let s = GzipSerializer::new(BincodeSerializer);
        let err = s.deserialize(b"[]").unwrap_err();
        assert!(matches!(err, ShelfError::Corruption(_)));
    }
}
