//! Byte-block codec seam and chunk checksums.
//!
//! The pipeline only needs `compress(bytes, level)` and `decompress(bytes)`;
//! [`ZstdCodec`] is the default implementation.

use std::io::Cursor;

/// Lowest accepted compression level
pub const MIN_LEVEL: i32 = 1;
/// Highest accepted compression level
pub const MAX_LEVEL: i32 = 9;

/// Errors reported by a [`Codec`]
#[derive(Debug, thiserror::Error)]
#[error("{codec}: {message}")]
pub struct CodecError {
    /// Codec name
    pub codec: &'static str,
    /// Underlying failure
    pub message: String,
}

/// A general-purpose byte-block compressor.
///
/// Implementations must be usable from several worker threads at once.
pub trait Codec: Send + Sync {
    /// Short identifier recorded in the metadata document
    fn name(&self) -> &'static str;

    /// Compress `input` at `level` (1-9)
    fn compress(&self, input: &[u8], level: i32) -> Result<Vec<u8>, CodecError>;

    /// Decompress `input`; `expected_len` is a capacity hint
    fn decompress(&self, input: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError>;
}

/// Zstandard codec
#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdCodec;

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, input: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
        zstd::stream::encode_all(Cursor::new(input), level).map_err(|e| CodecError {
            codec: "zstd",
            message: e.to_string(),
        })
    }

    fn decompress(&self, input: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(expected_len);
        zstd::stream::copy_decode(Cursor::new(input), &mut out).map_err(|e| CodecError {
            codec: "zstd",
            message: e.to_string(),
        })?;
        Ok(out)
    }
}

/// CRC32 of `bytes` as 8 lowercase hex digits
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    format!("{:08x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_roundtrip() {
        let input: Vec<u8> = (0..10_000u32).map(|i| (i % 7) as u8).collect();
        let codec = ZstdCodec;
        let compressed = codec.compress(&input, 9).unwrap();
        assert!(compressed.len() < input.len());
        let restored = codec.decompress(&compressed, input.len()).unwrap();
        assert_eq!(restored, input);
    }

    #[test]
    fn test_zstd_rejects_garbage() {
        let codec = ZstdCodec;
        assert!(codec.decompress(b"definitely not zstd", 0).is_err());
    }

    #[test]
    fn test_checksum_format() {
        assert_eq!(checksum(b""), "00000000");
        let sum = checksum(b"parquet");
        assert_eq!(sum.len(), 8);
        assert_ne!(sum, checksum(b"parqueT"));
    }
}
