//! Bolt protocol version definitions.

use std::fmt;

/// Bolt protocol versions.
///
/// On the wire a version is a 4-byte big-endian word with the major
/// version in the third byte and the minor version in the fourth
/// (`0x00_00_MM_mm` once reserved/range bytes are zero). The enum values
/// use `0x00MM_00mm` so major/minor extraction is a shift and a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BoltVersion {
    /// Bolt 4.0
    V4_0 = 0x0004_0000,
    /// Bolt 4.1
    V4_1 = 0x0004_0001,
    /// Bolt 4.2
    V4_2 = 0x0004_0002,
    /// Bolt 4.3
    V4_3 = 0x0004_0003,
    /// Bolt 4.4
    V4_4 = 0x0004_0004,
    /// Bolt 5.0 - element ids, UTC temporal encodings
    V5_0 = 0x0005_0000,
}

impl BoltVersion {
    /// Supported versions, newest first. The first four become the
    /// handshake proposals.
    pub const ALL: [BoltVersion; 6] = [
        BoltVersion::V5_0,
        BoltVersion::V4_4,
        BoltVersion::V4_3,
        BoltVersion::V4_2,
        BoltVersion::V4_1,
        BoltVersion::V4_0,
    ];

    /// Create from a raw u32 value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0004_0000 => Some(BoltVersion::V4_0),
            0x0004_0001 => Some(BoltVersion::V4_1),
            0x0004_0002 => Some(BoltVersion::V4_2),
            0x0004_0003 => Some(BoltVersion::V4_3),
            0x0004_0004 => Some(BoltVersion::V4_4),
            0x0005_0000 => Some(BoltVersion::V5_0),
            _ => None,
        }
    }

    /// Raw u32 value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Major version number.
    pub fn major(self) -> u16 {
        ((self as u32) >> 16) as u16
    }

    /// Minor version number.
    pub fn minor(self) -> u16 {
        ((self as u32) & 0xFFFF) as u16
    }

    /// Wire form: `[0, 0, major, minor]` big-endian.
    pub fn to_bytes(self) -> [u8; 4] {
        [0, 0, self.major() as u8, self.minor() as u8]
    }

    /// Parse the server's 4-byte handshake response.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        let value = ((bytes[2] as u32) << 16) | (bytes[3] as u32);
        Self::from_u32(value)
    }

    /// Whether negotiated values carry element ids on graph entities.
    pub fn uses_element_ids(self) -> bool {
        self.major() >= 5
    }

    /// Whether this version uses the UTC date-time structure encodings
    /// ('I'/'i') instead of the legacy local-epoch ones ('F'/'f').
    pub fn utc_datetime(self) -> bool {
        self.major() >= 5
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

impl PartialOrd for BoltVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoltVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_u32().cmp(&other.as_u32())
    }
}
