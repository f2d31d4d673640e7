//! The fixed 32-byte save header.
//!
//! # Layout
//! Eight `u32` words, all in one byte order:
//!
//! | Offset | Field | Value |
//! |--------|-------|-------|
//! | 0  | `version`           | 21 = PC, 5 = console |
//! | 4  | `uncompressed_size` | payload length |
//! | 8  | `compressed_size`   | deflate stream length |
//! | 12 | `marker1`           | [`MARKER_1`] |
//! | 16 | `marker2`           | [`MARKER_2`] |
//! | 20 | `marker3`           | [`MARKER_3`] |
//! | 24 | `checksum`          | `!crc32(compressed)` |
//! | 28 | `marker4`           | [`MARKER_4`] |
//!
//! # Endianness
//! PC saves are little-endian. A header whose markers do not validate as
//! little-endian is retried as big-endian; nothing else is sniffed. The
//! big-endian (console) layout is unconfirmed, so the container layer refuses
//! it unless explicitly allowed.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;
use std::fmt;
use std::io::{Read, Write};

use crate::error::FormatError;

pub const HEADER_SIZE: usize = 32;
pub const FIELD_COUNT: usize = HEADER_SIZE / 4;

/// `version` of a PC (Dark Arisen) save.
pub const VERSION_PC: u32 = 21;
/// `version` of an original console save.
pub const VERSION_CONSOLE: u32 = 5;

// ── Frozen marker values ─────────────────────────────────────────────────────

pub const MARKER_1: u32 = 0x334D_234D;
pub const MARKER_2: u32 = 0;
pub const MARKER_3: u32 = 0x334D_4044;
pub const MARKER_4: u32 = 0x4056_5235;

// ── Endian ───────────────────────────────────────────────────────────────────

/// Byte order a header was decoded with, and will be re-encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn name(self) -> &'static str {
        match self {
            Endian::Little => "little",
            Endian::Big    => "big",
        }
    }
}

// ── HeaderField ──────────────────────────────────────────────────────────────

/// One of the eight header words, in declaration (on-disk) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Version,
    UncompressedSize,
    CompressedSize,
    Marker1,
    Marker2,
    Marker3,
    Checksum,
    Marker4,
}

impl HeaderField {
    pub const ALL: [HeaderField; FIELD_COUNT] = [
        HeaderField::Version,
        HeaderField::UncompressedSize,
        HeaderField::CompressedSize,
        HeaderField::Marker1,
        HeaderField::Marker2,
        HeaderField::Marker3,
        HeaderField::Checksum,
        HeaderField::Marker4,
    ];

    /// Byte offset of this field inside the 32-byte header.
    #[inline]
    pub fn offset(self) -> usize {
        self as usize * 4
    }

    pub fn name(self) -> &'static str {
        match self {
            HeaderField::Version          => "version",
            HeaderField::UncompressedSize => "uncompressed_size",
            HeaderField::CompressedSize   => "compressed_size",
            HeaderField::Marker1          => "marker1",
            HeaderField::Marker2          => "marker2",
            HeaderField::Marker3          => "marker3",
            HeaderField::Checksum         => "checksum",
            HeaderField::Marker4          => "marker4",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        HeaderField::ALL.into_iter().find(|f| f.name() == s)
    }

    /// The frozen value of a marker field, `None` for data fields.
    pub fn marker_value(self) -> Option<u32> {
        match self {
            HeaderField::Marker1 => Some(MARKER_1),
            HeaderField::Marker2 => Some(MARKER_2),
            HeaderField::Marker3 => Some(MARKER_3),
            HeaderField::Marker4 => Some(MARKER_4),
            _                    => None,
        }
    }
}

// ── FieldLayout ──────────────────────────────────────────────────────────────

/// Positional view of the header: position → field.
///
/// Little-endian positions follow declaration order; big-endian positions are
/// the exact reverse. Tooling that addresses fields by index relies on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout([HeaderField; FIELD_COUNT]);

impl FieldLayout {
    pub fn for_endian(endian: Endian) -> Self {
        let mut order = HeaderField::ALL;
        if endian == Endian::Big {
            order.reverse();
        }
        FieldLayout(order)
    }

    #[inline]
    pub fn field_at(&self, index: usize) -> Option<HeaderField> {
        self.0.get(index).copied()
    }

    /// Byte offset of the field at `index`.
    #[inline]
    pub fn offset_at(&self, index: usize) -> Option<usize> {
        self.field_at(index).map(HeaderField::offset)
    }
}

// ── SaveVariant ──────────────────────────────────────────────────────────────

/// What the `version` word says about the save's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveVariant {
    Pc,
    Console,
    Unknown(u32),
}

impl From<u32> for SaveVariant {
    fn from(version: u32) -> Self {
        match version {
            VERSION_PC      => SaveVariant::Pc,
            VERSION_CONSOLE => SaveVariant::Console,
            v               => SaveVariant::Unknown(v),
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Decoded save header.
///
/// Marker words are not stored: they are format constants, re-emitted by
/// [`Header::serialize`]. The byte order is fixed when the header is parsed
/// or created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version:           u32,
    pub uncompressed_size: u32,
    pub compressed_size:   u32,
    pub checksum:          u32,
    endian:                Endian,
    #[serde(skip)]
    layout:                FieldLayout,
}

impl Header {
    /// A fresh little-endian header with size and checksum fields zeroed.
    pub fn new(version: u32) -> Self {
        Self::with_endian(version, Endian::Little)
    }

    fn with_endian(version: u32, endian: Endian) -> Self {
        Self {
            version,
            uncompressed_size: 0,
            compressed_size:   0,
            checksum:          0,
            endian,
            layout:            FieldLayout::for_endian(endian),
        }
    }

    /// Decode a header, trying little-endian first and big-endian second.
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() != HEADER_SIZE {
            return Err(FormatError::InvalidLength(bytes.len()));
        }
        let (words, endian) = decode_words::<LittleEndian>(bytes)
            .map(|w| (w, Endian::Little))
            .or_else(|| decode_big_endian(bytes))
            .ok_or(FormatError::InvalidHeader)?;

        let mut header = Self::with_endian(words[HeaderField::Version as usize], endian);
        header.uncompressed_size = words[HeaderField::UncompressedSize as usize];
        header.compressed_size   = words[HeaderField::CompressedSize as usize];
        header.checksum          = words[HeaderField::Checksum as usize];
        Ok(header)
    }

    /// Encode in the byte order recorded at parse time.
    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let words = HeaderField::ALL.map(|f| self.field(f));
        let mut out = [0u8; HEADER_SIZE];
        match self.endian {
            Endian::Little => LittleEndian::write_u32_into(&words, &mut out),
            Endian::Big    => BigEndian::write_u32_into(&words, &mut out),
        }
        out
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self, FormatError> {
        let mut buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut buf)?;
        Self::parse(&buf)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writer.write_all(&self.serialize())
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    pub fn layout(&self) -> FieldLayout {
        self.layout
    }

    pub fn variant(&self) -> SaveVariant {
        SaveVariant::from(self.version)
    }

    /// Value of a field by identity.
    pub fn field(&self, field: HeaderField) -> u32 {
        match field {
            HeaderField::Version          => self.version,
            HeaderField::UncompressedSize => self.uncompressed_size,
            HeaderField::CompressedSize   => self.compressed_size,
            HeaderField::Checksum         => self.checksum,
            marker => marker.marker_value().unwrap_or_default(),
        }
    }

    /// Value of the field at `index` in this header's positional view.
    pub fn get(&self, index: usize) -> Option<u32> {
        self.layout.field_at(index).map(|f| self.field(f))
    }

    /// Value of a field by its name, e.g. `"compressed_size"`.
    pub fn by_name(&self, name: &str) -> Option<u32> {
        HeaderField::from_name(name).map(|f| self.field(f))
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant() {
            SaveVariant::Pc         => f.write_str("Dragon's Dogma: Dark Arisen save header"),
            SaveVariant::Console    => f.write_str("Dragon's Dogma original console save header"),
            SaveVariant::Unknown(v) => write!(f, "unknown save header (version {v})"),
        }
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn decode_words<E: ByteOrder>(bytes: &[u8]) -> Option<[u32; FIELD_COUNT]> {
    let mut words = [0u32; FIELD_COUNT];
    E::read_u32_into(bytes, &mut words);
    markers_match(&words).then_some(words)
}

/// Console path. Field order and marker values are assumed identical to the
/// PC layout; neither has been confirmed against a real console save.
fn decode_big_endian(bytes: &[u8]) -> Option<([u32; FIELD_COUNT], Endian)> {
    decode_words::<BigEndian>(bytes).map(|w| (w, Endian::Big))
}

fn markers_match(words: &[u32; FIELD_COUNT]) -> bool {
    HeaderField::ALL
        .iter()
        .filter_map(|f| f.marker_value().map(|m| (f, m)))
        .all(|(f, m)| words[*f as usize] == m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header<E: ByteOrder>(version: u32, usize_: u32, csize: u32, crc: u32) -> [u8; HEADER_SIZE] {
        let words = [version, usize_, csize, MARKER_1, MARKER_2, MARKER_3, crc, MARKER_4];
        let mut out = [0u8; HEADER_SIZE];
        E::write_u32_into(&words, &mut out);
        out
    }

    #[test]
    fn parse_little_endian_pc_header() {
        let raw = raw_header::<LittleEndian>(VERSION_PC, 1_000, 250, 0xDEAD_BEEF);
        let h = Header::parse(&raw).unwrap();
        assert_eq!(h.version, VERSION_PC);
        assert_eq!(h.uncompressed_size, 1_000);
        assert_eq!(h.compressed_size, 250);
        assert_eq!(h.checksum, 0xDEAD_BEEF);
        assert_eq!(h.endian(), Endian::Little);
        assert_eq!(h.variant(), SaveVariant::Pc);
        assert_eq!(h.serialize(), raw);
    }

    #[test]
    fn markers_are_at_their_documented_offsets() {
        let raw = raw_header::<LittleEndian>(VERSION_PC, 0, 0, 0);
        assert_eq!(&raw[12..16], b"M#M3");
        assert_eq!(&raw[16..20], &[0, 0, 0, 0]);
        assert_eq!(&raw[20..24], b"D@M3");
        assert_eq!(&raw[28..32], b"5RV@");
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(matches!(Header::parse(&[0u8; 31]), Err(FormatError::InvalidLength(31))));
        assert!(matches!(Header::parse(&[0u8; 33]), Err(FormatError::InvalidLength(33))));
        assert!(matches!(Header::parse(&[]), Err(FormatError::InvalidLength(0))));
    }

    #[test]
    fn any_altered_marker_is_rejected() {
        let raw = raw_header::<LittleEndian>(VERSION_PC, 10, 10, 10);
        for field in HeaderField::ALL.iter().filter(|f| f.marker_value().is_some()) {
            let mut bad = raw;
            bad[field.offset()] ^= 0x01;
            assert!(
                matches!(Header::parse(&bad), Err(FormatError::InvalidHeader)),
                "{} accepted after corruption",
                field.name()
            );
        }
    }

    #[test]
    fn big_endian_header_is_detected_and_round_trips() {
        let raw = raw_header::<BigEndian>(VERSION_CONSOLE, 77, 33, 0x0102_0304);
        let h = Header::parse(&raw).unwrap();
        assert_eq!(h.endian(), Endian::Big);
        assert_eq!(h.version, VERSION_CONSOLE);
        assert_eq!(h.compressed_size, 33);
        assert_eq!(h.serialize(), raw);
    }

    #[test]
    fn positional_view_follows_byte_order() {
        let le = Header::parse(&raw_header::<LittleEndian>(VERSION_PC, 1, 2, 3)).unwrap();
        assert_eq!(le.get(0), Some(VERSION_PC));
        assert_eq!(le.get(1), Some(1));
        assert_eq!(le.get(6), Some(3));
        assert_eq!(le.get(7), Some(MARKER_4));
        assert_eq!(le.get(8), None);

        let be = Header::parse(&raw_header::<BigEndian>(VERSION_PC, 1, 2, 3)).unwrap();
        assert_eq!(be.get(0), Some(MARKER_4));
        assert_eq!(be.get(1), Some(3));
        assert_eq!(be.get(5), Some(2));
        assert_eq!(be.get(7), Some(VERSION_PC));
        assert_eq!(be.layout().offset_at(0), Some(28));
    }

    #[test]
    fn named_access() {
        let h = Header::parse(&raw_header::<LittleEndian>(VERSION_PC, 9, 8, 7)).unwrap();
        assert_eq!(h.by_name("uncompressed_size"), Some(9));
        assert_eq!(h.by_name("compressed_size"), Some(8));
        assert_eq!(h.by_name("checksum"), Some(7));
        assert_eq!(h.by_name("marker3"), Some(MARKER_3));
        assert_eq!(h.by_name("hash"), None);
    }

    #[test]
    fn new_headers_are_independent() {
        let mut a = Header::new(VERSION_PC);
        let b = Header::new(VERSION_PC);
        a.compressed_size = 42;
        assert_eq!(b.compressed_size, 0);
        assert_eq!(b.endian(), Endian::Little);
    }

    #[test]
    fn display_names_the_variant() {
        assert_eq!(Header::new(VERSION_PC).to_string(), "Dragon's Dogma: Dark Arisen save header");
        assert_eq!(Header::new(VERSION_CONSOLE).to_string(), "Dragon's Dogma original console save header");
        assert_eq!(Header::new(3).to_string(), "unknown save header (version 3)");
    }

    #[test]
    fn read_consumes_exactly_one_header() {
        let raw = raw_header::<LittleEndian>(VERSION_PC, 5, 6, 7);
        let mut src = raw.to_vec();
        src.extend_from_slice(b"trailing");
        let mut cursor = std::io::Cursor::new(src);
        let h = Header::read(&mut cursor).unwrap();
        assert_eq!(h.compressed_size, 6);
        assert_eq!(cursor.position(), HEADER_SIZE as u64);
    }
}
