//! Save container: format detection, open, pack and unpack.
//!
//! ```no_run
//! use ddsave::Container;
//!
//! // Save → markup
//! let save = Container::open(std::fs::File::open("DDDA.sav")?)?;
//! std::fs::write("DDDA.sav.xml", save.unpack())?;
//!
//! // Markup → save
//! let edited = Container::open(std::fs::File::open("DDDA.sav.xml")?)?;
//! std::fs::write("DDDA.sav", edited.pack()?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Layout
//! Every container is exactly [`CONTAINER_SIZE`] bytes: the 32-byte header,
//! the deflate stream, then zero padding. Padding is written as zeros but is
//! never checked on read.

use log::debug;
use std::io::{Read, Write};

use crate::error::FormatError;
use crate::header::{Endian, Header, HEADER_SIZE, VERSION_CONSOLE, VERSION_PC};
use crate::payload;

/// Total on-disk size of a save container.
pub const CONTAINER_SIZE: usize = 512 * 1024;
/// Room left for the compressed payload after the header.
pub const PAYLOAD_CAPACITY: usize = CONTAINER_SIZE - HEADER_SIZE;
/// First byte of a plain markup payload.
pub const MARKUP_MAGIC: u8 = b'<';

// ── SaveFormat ───────────────────────────────────────────────────────────────

/// What the leading byte of an input says it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    BinaryContainer,
    PlainPayload,
    Unknown(u8),
}

impl SaveFormat {
    pub fn detect(first_byte: u8) -> Self {
        match first_byte {
            b if b == VERSION_PC as u8 || b == VERSION_CONSOLE as u8 => SaveFormat::BinaryContainer,
            MARKUP_MAGIC => SaveFormat::PlainPayload,
            b            => SaveFormat::Unknown(b),
        }
    }
}

// ── OpenOptions ──────────────────────────────────────────────────────────────

/// Configuration for [`Container::open_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// Accept headers that only validate as big-endian. Their layout is
    /// guessed from the PC format, so this is off by default.
    pub allow_big_endian: bool,
    /// Check the stored checksum and uncompressed size against the payload.
    pub verify:           bool,
}

// ── Container ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Decoded from a binary container; header fields describe the input.
    Loaded,
    /// Built from a plain payload; size and checksum fields are filled by
    /// [`Container::pack`].
    Fresh,
}

/// One save: its header and its decompressed payload.
#[derive(Debug, Clone)]
pub struct Container {
    header:  Header,
    payload: Vec<u8>,
    state:   ContainerState,
}

impl Container {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Wrap a plain payload. The header defaults to a PC save.
    pub fn from_payload(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            header:  Header::new(VERSION_PC),
            payload: payload.into(),
            state:   ContainerState::Fresh,
        }
    }

    pub fn open<R: Read>(source: R) -> Result<Self, FormatError> {
        Self::open_with(source, &OpenOptions::default())
    }

    pub fn open_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        Self::open_with(bytes, &OpenOptions::default())
    }

    /// Read one save from `source`, dispatching on its first byte.
    ///
    /// A binary container consumes exactly [`CONTAINER_SIZE`] bytes; a markup
    /// payload consumes the rest of the source.
    pub fn open_with<R: Read>(mut source: R, opts: &OpenOptions) -> Result<Self, FormatError> {
        let mut first = [0u8; 1];
        source.read_exact(&mut first)?;
        let format = SaveFormat::detect(first[0]);
        debug!("detected {format:?} from leading byte 0x{:02x}", first[0]);

        match format {
            SaveFormat::BinaryContainer => {
                let mut buf = vec![0u8; CONTAINER_SIZE];
                buf[0] = first[0];
                source.read_exact(&mut buf[1..])?;
                Self::decode_binary(&buf, opts)
            }
            SaveFormat::PlainPayload => {
                let mut payload = first.to_vec();
                source.read_to_end(&mut payload)?;
                Ok(Self::from_payload(payload))
            }
            SaveFormat::Unknown(b) => Err(FormatError::UnrecognizedMagic(b)),
        }
    }

    fn decode_binary(buf: &[u8], opts: &OpenOptions) -> Result<Self, FormatError> {
        let header = Header::parse(&buf[..HEADER_SIZE])?;
        if header.endian() == Endian::Big && !opts.allow_big_endian {
            return Err(FormatError::UnsupportedByteOrder);
        }

        let size = header.compressed_size as usize;
        if size > PAYLOAD_CAPACITY {
            return Err(FormatError::PayloadTooLarge { size, capacity: PAYLOAD_CAPACITY });
        }
        let compressed = &buf[HEADER_SIZE..HEADER_SIZE + size];

        if opts.verify {
            let computed = payload::checksum(compressed);
            if computed != header.checksum {
                return Err(FormatError::ChecksumMismatch { stored: header.checksum, computed });
            }
        }

        let payload = payload::decompress(compressed)?;

        if opts.verify && payload.len() != header.uncompressed_size as usize {
            return Err(FormatError::SizeMismatch {
                declared: header.uncompressed_size,
                actual:   payload.len(),
            });
        }

        debug!(
            "loaded {} ({} endian): {} compressed -> {} bytes",
            header,
            header.endian().name(),
            size,
            payload.len()
        );
        Ok(Self { header, payload, state: ContainerState::Loaded })
    }

    // ── Pack ─────────────────────────────────────────────────────────────────

    /// Header as it would be written by [`Container::pack`], alongside the
    /// compressed payload.
    pub fn packed_header(&self) -> Result<(Header, Vec<u8>), FormatError> {
        let encoded = payload::encode(&self.payload)?;
        if HEADER_SIZE + encoded.bytes.len() > CONTAINER_SIZE {
            return Err(FormatError::PayloadTooLarge {
                size:     encoded.bytes.len(),
                capacity: PAYLOAD_CAPACITY,
            });
        }

        let mut header = self.header.clone();
        header.uncompressed_size = encoded.uncompressed_size;
        header.compressed_size   = encoded.compressed_size;
        header.checksum          = encoded.checksum;
        Ok((header, encoded.bytes))
    }

    /// Re-encode into a zero-padded buffer of exactly [`CONTAINER_SIZE`]
    /// bytes. Size and checksum fields are always recomputed.
    pub fn pack(&self) -> Result<Vec<u8>, FormatError> {
        let (header, compressed) = self.packed_header()?;

        let mut out = vec![0u8; CONTAINER_SIZE];
        out[..HEADER_SIZE].copy_from_slice(&header.serialize());
        out[HEADER_SIZE..HEADER_SIZE + compressed.len()].copy_from_slice(&compressed);

        debug!(
            "packed {} bytes into {} compressed (checksum {:#010x})",
            header.uncompressed_size, header.compressed_size, header.checksum
        );
        Ok(out)
    }

    pub fn pack_into<W: Write>(&self, mut writer: W) -> Result<(), FormatError> {
        writer.write_all(&self.pack()?)?;
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// The decompressed payload, verbatim.
    pub fn unpack(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }
}
