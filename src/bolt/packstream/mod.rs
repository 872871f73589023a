//! PackStream serialization format.
//!
//! PackStream is the self-describing binary value encoding used by the
//! Bolt protocol. Each value is a marker byte followed by an optional
//! length prefix and payload; tagged structures carry graph entities,
//! temporal and spatial values.
//!
//! This module is the byte layer only: it knows markers, sizes and
//! nesting, but not what any structure signature means. Interpreting
//! signatures (Node, Relationship, Date, ...) against the active
//! protocol mode is the job of the driver's value unpacker.

pub mod decoder;
pub mod encoder;
pub mod marker;
pub mod types;

pub use decoder::{decode, PackStreamDecoder};
pub use encoder::{encode, PackStreamEncoder};
pub use marker::PackStreamType;
pub use types::{PackStreamStructure, PackStreamValue};

use std::fmt;

/// Errors raised while encoding or decoding PackStream bytes.
#[derive(Debug, Clone)]
pub enum PackStreamError {
    /// Input ended in the middle of a value
    UnexpectedEof,
    /// Reserved or unassigned marker byte
    UnknownMarker(u8),
    /// String payload is not valid UTF-8
    InvalidUtf8(String),
    /// Map key was not a string
    InvalidMapKey,
    /// A size exceeds what its widest length prefix can carry
    Overflow(&'static str, usize),
    /// Structure-level violation (wrong signature, bad field)
    InvalidStructure(String),
}

impl fmt::Display for PackStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStreamError::UnexpectedEof => write!(f, "unexpected end of PackStream data"),
            PackStreamError::UnknownMarker(m) => write!(f, "unknown PackStream marker: 0x{m:02X}"),
            PackStreamError::InvalidUtf8(e) => write!(f, "invalid UTF-8 in string: {e}"),
            PackStreamError::InvalidMapKey => write!(f, "map keys must be strings"),
            PackStreamError::Overflow(kind, size) => {
                write!(f, "{kind} too large to encode: {size}")
            }
            PackStreamError::InvalidStructure(msg) => write!(f, "invalid structure: {msg}"),
        }
    }
}

impl std::error::Error for PackStreamError {}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn roundtrip(value: &PackStreamValue) -> PackStreamValue {
        let bytes = encode(value).unwrap();
        decode(&bytes).unwrap()
    }

    #[test]
    fn roundtrip_scalars() {
        for v in [
            PackStreamValue::Null,
            PackStreamValue::Boolean(true),
            PackStreamValue::Boolean(false),
        ] {
            assert_eq!(roundtrip(&v), v);
        }
    }

    #[test]
    fn roundtrip_integers() {
        for i in [0i64, 1, -1, 127, -16, 128, -17, -128, 1000, -1000, 100_000, i64::MAX, i64::MIN]
        {
            let v = PackStreamValue::Integer(i);
            assert_eq!(roundtrip(&v), v, "failed for {i}");
        }
    }

    #[test]
    fn roundtrip_floats() {
        for f in [0.0f64, 1.0, -1.0, 3.14159, f64::MAX, f64::MIN, f64::EPSILON] {
            let v = PackStreamValue::Float(f);
            assert_eq!(roundtrip(&v), v);
        }
    }

    #[test]
    fn roundtrip_strings() {
        for s in ["", "a", "hello", "héllo wörld", &"x".repeat(100), &"y".repeat(70_000)] {
            let v = PackStreamValue::String(s.to_string());
            assert_eq!(roundtrip(&v), v);
        }
    }

    #[test]
    fn roundtrip_bytes() {
        for b in [vec![], vec![1u8], vec![1, 2, 3], vec![0u8; 300]] {
            let v = PackStreamValue::Bytes(b);
            assert_eq!(roundtrip(&v), v);
        }
    }

    #[test]
    fn roundtrip_list_and_map() {
        let mut map = IndexMap::new();
        map.insert("first".to_string(), PackStreamValue::Integer(1));
        map.insert("second".to_string(), PackStreamValue::String("two".into()));

        let v = PackStreamValue::List(vec![
            PackStreamValue::Map(map),
            PackStreamValue::Boolean(true),
            PackStreamValue::Null,
        ]);
        assert_eq!(roundtrip(&v), v);
    }

    #[test]
    fn roundtrip_map_order_is_stable() {
        let mut map = IndexMap::new();
        for key in ["zulu", "alpha", "mike", "bravo"] {
            map.insert(key.to_string(), PackStreamValue::Integer(1));
        }
        let v = PackStreamValue::Map(map);
        let decoded = roundtrip(&v);
        let keys: Vec<&String> = decoded.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["zulu", "alpha", "mike", "bravo"]);
    }

    #[test]
    fn roundtrip_structure() {
        let s = PackStreamStructure::new(
            0x4E,
            vec![
                PackStreamValue::Integer(1),
                PackStreamValue::List(vec![PackStreamValue::String("Person".into())]),
                PackStreamValue::Map(IndexMap::new()),
            ],
        );
        let v = PackStreamValue::Structure(s);
        assert_eq!(roundtrip(&v), v);
    }

    #[test]
    fn roundtrip_deep_nesting() {
        let mut v = PackStreamValue::Integer(42);
        for _ in 0..20 {
            v = PackStreamValue::List(vec![v]);
        }
        assert_eq!(roundtrip(&v), v);
    }
}
