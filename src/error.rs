use std::io;
use thiserror::Error;

/// Every way decoding or encoding a save container can fail.
///
/// Failures are deterministic: nothing here is transient, so callers never
/// retry. The library never logs these; surfacing them is the caller's job.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Header must be exactly 32 bytes, got {0}")]
    InvalidLength(usize),
    #[error("Invalid save header: marker fields do not match in either byte order")]
    InvalidHeader,
    #[error("Unrecognized leading byte 0x{0:02x}: not a save container or markup payload")]
    UnrecognizedMagic(u8),
    #[error("Corrupt compressed payload: {0}")]
    CorruptPayload(String),
    #[error("Compressed payload of {size} bytes exceeds container capacity of {capacity} bytes")]
    PayloadTooLarge { size: usize, capacity: usize },
    /// The header only validates as big-endian, and the console layout is
    /// unconfirmed. See `OpenOptions::allow_big_endian`.
    #[error("Big-endian (console) save headers are not supported")]
    UnsupportedByteOrder,
    #[error("Checksum mismatch: header stores {stored:#010x}, payload hashes to {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("Size mismatch: header declares {declared} uncompressed bytes, payload has {actual}")]
    SizeMismatch { declared: u32, actual: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
