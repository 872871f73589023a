//! PackStream marker bytes.
//!
//! Every PackStream value starts with a marker byte. The marker either
//! carries the value inline (tiny ints, booleans, null), carries the size
//! in its low nibble (tiny strings/lists/maps/structs), or announces a
//! fixed-width length prefix that follows.

/// Null marker
pub const NULL: u8 = 0xC0;

/// Float marker (64-bit IEEE 754, big-endian payload)
pub const FLOAT_64: u8 = 0xC1;

/// Boolean markers
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

/// Integer markers. Values in [-16, 127] are encoded inline in the
/// marker byte itself; wider values use a sign-extended payload.
pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

/// Bytes markers (8/16/32-bit length prefix)
pub const BYTES_8: u8 = 0xCC;
pub const BYTES_16: u8 = 0xCD;
pub const BYTES_32: u8 = 0xCE;

/// String markers. Strings of up to 15 bytes use 0x80-0x8F.
pub const TINY_STRING_BASE: u8 = 0x80;
pub const STRING_8: u8 = 0xD0;
pub const STRING_16: u8 = 0xD1;
pub const STRING_32: u8 = 0xD2;

/// List markers. Lists of up to 15 elements use 0x90-0x9F.
pub const TINY_LIST_BASE: u8 = 0x90;
pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

/// Map markers. Maps of up to 15 entries use 0xA0-0xAF.
pub const TINY_MAP_BASE: u8 = 0xA0;
pub const MAP_8: u8 = 0xD8;
pub const MAP_16: u8 = 0xD9;
pub const MAP_32: u8 = 0xDA;

/// Structure markers. Structures of up to 15 fields use 0xB0-0xBF,
/// larger ones an 8- or 16-bit field count.
pub const TINY_STRUCT_BASE: u8 = 0xB0;
pub const STRUCT_8: u8 = 0xDC;
pub const STRUCT_16: u8 = 0xDD;

/// Maximum size encodable in a tiny marker's low nibble.
pub const TINY_SIZE_MAX: usize = 15;

/// Logical family of the value announced by a marker byte.
///
/// This is what a non-destructive peek reports, before any payload is
/// consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PackStreamType {
    Null,
    Boolean,
    Integer,
    Float,
    Bytes,
    String,
    List,
    Map,
    Struct,
}

/// Classify a marker byte into its value family.
///
/// Returns `None` for bytes that are not valid PackStream markers
/// (the reserved gaps 0xC4-0xC7, 0xCF, 0xD3, 0xD7, 0xDB, 0xDE, 0xDF).
pub fn classify_marker(marker: u8) -> Option<PackStreamType> {
    match marker {
        NULL => Some(PackStreamType::Null),
        TRUE | FALSE => Some(PackStreamType::Boolean),
        FLOAT_64 => Some(PackStreamType::Float),
        INT_8 | INT_16 | INT_32 | INT_64 => Some(PackStreamType::Integer),
        BYTES_8 | BYTES_16 | BYTES_32 => Some(PackStreamType::Bytes),
        STRING_8 | STRING_16 | STRING_32 => Some(PackStreamType::String),
        LIST_8 | LIST_16 | LIST_32 => Some(PackStreamType::List),
        MAP_8 | MAP_16 | MAP_32 => Some(PackStreamType::Map),
        STRUCT_8 | STRUCT_16 => Some(PackStreamType::Struct),
        0x80..=0x8F => Some(PackStreamType::String),
        0x90..=0x9F => Some(PackStreamType::List),
        0xA0..=0xAF => Some(PackStreamType::Map),
        0xB0..=0xBF => Some(PackStreamType::Struct),
        // Remaining bytes in 0x00-0x7F and 0xF0-0xFF are inline ints.
        0x00..=0x7F | 0xF0..=0xFF => Some(PackStreamType::Integer),
        _ => None,
    }
}

/// Check whether an integer fits the single-byte inline encoding.
#[inline]
pub fn fits_tiny_int(value: i64) -> bool {
    (-16..=127).contains(&value)
}

/// Size carried in a tiny marker's low nibble.
#[inline]
pub fn tiny_size(marker: u8) -> usize {
    (marker & 0x0F) as usize
}
