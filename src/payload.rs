//! Payload codec: zlib-wrapped deflate plus the inverted CRC32 the header
//! stores.
//!
//! The compression level is part of the format contract only insofar as the
//! header must describe the bytes actually written. Decompression accepts any
//! level, so re-packed saves never need to match the original encoder
//! byte-for-byte.

use crc32fast::Hasher;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::FormatError;

/// Deflate level used when packing (the game writes `78 5E` streams).
pub const COMPRESSION_LEVEL: u32 = 3;

/// Compressed payload together with the header values derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub bytes:             Vec<u8>,
    pub uncompressed_size: u32,
    pub compressed_size:   u32,
    pub checksum:          u32,
}

pub fn compress(payload: &[u8]) -> Result<Vec<u8>, FormatError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(COMPRESSION_LEVEL));
    encoder.write_all(payload)?;
    Ok(encoder.finish()?)
}

pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::new();
    ZlibDecoder::new(compressed)
        .read_to_end(&mut out)
        .map_err(|e| FormatError::CorruptPayload(e.to_string()))?;
    Ok(out)
}

/// CRC32 of `compressed` with the final bitwise NOT applied.
pub fn checksum(compressed: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(compressed);
    !hasher.finalize()
}

#[inline]
pub fn size_of(compressed: &[u8]) -> u32 {
    u32::try_from(compressed.len()).unwrap_or(u32::MAX)
}

/// Compress `payload` and derive every header field that depends on it.
pub fn encode(payload: &[u8]) -> Result<EncodedPayload, FormatError> {
    let bytes = compress(payload)?;
    Ok(EncodedPayload {
        uncompressed_size: size_of(payload),
        compressed_size:   size_of(&bytes),
        checksum:          checksum(&bytes),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_round_trip() {
        let xml = b"<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<class type=\"sSave\">\n</class>\n";
        let packed = compress(xml).unwrap();
        assert_ne!(packed.as_slice(), xml.as_slice());
        assert_eq!(decompress(&packed).unwrap(), xml);
    }

    #[test]
    fn stream_uses_zlib_header() {
        let packed = compress(b"hello").unwrap();
        assert_eq!(packed[0], 0x78);
    }

    #[test]
    fn empty_payload_compresses_to_non_empty_stream() {
        let packed = compress(&[]).unwrap();
        assert!(!packed.is_empty());
        assert!(decompress(&packed).unwrap().is_empty());
    }

    #[test]
    fn malformed_stream_is_corrupt_payload() {
        let err = decompress(b"definitely not deflate").unwrap_err();
        assert!(matches!(err, FormatError::CorruptPayload(_)));
    }

    #[test]
    fn checksum_is_inverted_crc32() {
        // CRC32("123456789") = 0xCBF43926
        assert_eq!(checksum(b"123456789"), !0xCBF4_3926u32);
        assert_eq!(checksum(b"123456789"), 0x340B_C6D9);
        assert_eq!(checksum(&[]), 0xFFFF_FFFF);
    }

    #[test]
    fn encode_fills_header_values() {
        let data = vec![b'a'; 10_000];
        let enc = encode(&data).unwrap();
        assert_eq!(enc.uncompressed_size, 10_000);
        assert_eq!(enc.compressed_size as usize, enc.bytes.len());
        assert_eq!(enc.checksum, checksum(&enc.bytes));
        assert!(enc.bytes.len() < data.len());
    }
}
