//! PackStream decoder.

use bytes::Buf;
use indexmap::IndexMap;

use super::marker::*;
use super::types::{PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// Reads PackStream values from a byte slice.
pub struct PackStreamDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackStreamDecoder<'a> {
    /// Create a new decoder over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Whether all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Classify the next value without consuming anything.
    ///
    /// Fails on a reserved marker byte or at end of input.
    pub fn peek_type(&self) -> Result<PackStreamType, PackStreamError> {
        let marker = *self
            .data
            .get(self.pos)
            .ok_or(PackStreamError::UnexpectedEof)?;
        classify_marker(marker).ok_or(PackStreamError::UnknownMarker(marker))
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> Result<PackStreamValue, PackStreamError> {
        let marker = self.read_u8()?;

        match marker {
            NULL => return Ok(PackStreamValue::Null),
            TRUE => return Ok(PackStreamValue::Boolean(true)),
            FALSE => return Ok(PackStreamValue::Boolean(false)),
            FLOAT_64 => return Ok(PackStreamValue::Float(self.read_f64()?)),
            INT_8 => return Ok(PackStreamValue::Integer(self.read_i8()? as i64)),
            INT_16 => return Ok(PackStreamValue::Integer(self.read_i16()? as i64)),
            INT_32 => return Ok(PackStreamValue::Integer(self.read_i32()? as i64)),
            INT_64 => return Ok(PackStreamValue::Integer(self.read_i64()?)),
            _ => {}
        }

        // Sized families: tiny forms carry the size in the marker nibble,
        // the wider forms read a length prefix.
        match marker {
            0x80..=0x8F => self.read_string_data(tiny_size(marker)),
            0x90..=0x9F => self.read_list_data(tiny_size(marker)),
            0xA0..=0xAF => self.read_map_data(tiny_size(marker)),
            0xB0..=0xBF => self.read_struct_data(tiny_size(marker)),

            BYTES_8 => {
                let len = self.read_u8()? as usize;
                self.read_bytes_data(len)
            }
            BYTES_16 => {
                let len = self.read_u16()? as usize;
                self.read_bytes_data(len)
            }
            BYTES_32 => {
                let len = self.read_u32()? as usize;
                self.read_bytes_data(len)
            }

            STRING_8 => {
                let len = self.read_u8()? as usize;
                self.read_string_data(len)
            }
            STRING_16 => {
                let len = self.read_u16()? as usize;
                self.read_string_data(len)
            }
            STRING_32 => {
                let len = self.read_u32()? as usize;
                self.read_string_data(len)
            }

            LIST_8 => {
                let len = self.read_u8()? as usize;
                self.read_list_data(len)
            }
            LIST_16 => {
                let len = self.read_u16()? as usize;
                self.read_list_data(len)
            }
            LIST_32 => {
                let len = self.read_u32()? as usize;
                self.read_list_data(len)
            }

            MAP_8 => {
                let len = self.read_u8()? as usize;
                self.read_map_data(len)
            }
            MAP_16 => {
                let len = self.read_u16()? as usize;
                self.read_map_data(len)
            }
            MAP_32 => {
                let len = self.read_u32()? as usize;
                self.read_map_data(len)
            }

            STRUCT_8 => {
                let len = self.read_u8()? as usize;
                self.read_struct_data(len)
            }
            STRUCT_16 => {
                let len = self.read_u16()? as usize;
                self.read_struct_data(len)
            }

            // Anything left in 0x00-0x7F / 0xF0-0xFF is an inline int.
            0x00..=0x7F | 0xF0..=0xFF => Ok(PackStreamValue::Integer(marker as i8 as i64)),

            _ => Err(PackStreamError::UnknownMarker(marker)),
        }
    }

    fn read_bytes_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let bytes = self.read_bytes(len)?;
        Ok(PackStreamValue::Bytes(bytes.to_vec()))
    }

    fn read_string_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let bytes = self.read_bytes(len)?;
        let s = std::str::from_utf8(bytes)
            .map_err(|e| PackStreamError::InvalidUtf8(e.to_string()))?;
        Ok(PackStreamValue::String(s.to_string()))
    }

    fn read_list_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(PackStreamValue::List(items))
    }

    fn read_map_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let mut map = IndexMap::with_capacity(len.min(1024));
        for _ in 0..len {
            let key = match self.decode()? {
                PackStreamValue::String(s) => s,
                _ => return Err(PackStreamError::InvalidMapKey),
            };
            let value = self.decode()?;
            map.insert(key, value);
        }
        Ok(PackStreamValue::Map(map))
    }

    fn read_struct_data(&mut self, field_count: usize) -> Result<PackStreamValue, PackStreamError> {
        let tag = self.read_u8()?;
        let mut fields = Vec::with_capacity(field_count.min(64));
        for _ in 0..field_count {
            fields.push(self.decode()?);
        }
        Ok(PackStreamValue::Structure(PackStreamStructure::new(
            tag, fields,
        )))
    }

    fn read_u8(&mut self) -> Result<u8, PackStreamError> {
        if self.remaining() < 1 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    fn read_i8(&mut self) -> Result<i8, PackStreamError> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16(&mut self) -> Result<u16, PackStreamError> {
        if self.remaining() < 2 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_u16();
        self.pos += 2;
        Ok(value)
    }

    fn read_i16(&mut self) -> Result<i16, PackStreamError> {
        Ok(self.read_u16()? as i16)
    }

    fn read_u32(&mut self) -> Result<u32, PackStreamError> {
        if self.remaining() < 4 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_u32();
        self.pos += 4;
        Ok(value)
    }

    fn read_i32(&mut self) -> Result<i32, PackStreamError> {
        Ok(self.read_u32()? as i32)
    }

    fn read_i64(&mut self) -> Result<i64, PackStreamError> {
        if self.remaining() < 8 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_i64();
        self.pos += 8;
        Ok(value)
    }

    fn read_f64(&mut self) -> Result<f64, PackStreamError> {
        if self.remaining() < 8 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_f64();
        self.pos += 8;
        Ok(value)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PackStreamError> {
        if self.remaining() < len {
            return Err(PackStreamError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}

/// Decode a single value from bytes.
pub fn decode(data: &[u8]) -> Result<PackStreamValue, PackStreamError> {
    let mut decoder = PackStreamDecoder::new(data);
    decoder.decode()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_scalars() {
        assert!(decode(&[0xC0]).unwrap().is_null());
        assert_eq!(decode(&[0xC3]).unwrap(), PackStreamValue::Boolean(true));
        assert_eq!(decode(&[0xC2]).unwrap(), PackStreamValue::Boolean(false));
    }

    #[test]
    fn decode_inline_ints() {
        assert_eq!(decode(&[0x00]).unwrap(), PackStreamValue::Integer(0));
        assert_eq!(decode(&[0x7F]).unwrap(), PackStreamValue::Integer(127));
        assert_eq!(decode(&[0xF0]).unwrap(), PackStreamValue::Integer(-16));
        assert_eq!(decode(&[0xFF]).unwrap(), PackStreamValue::Integer(-1));
    }

    #[test]
    fn decode_prefixed_ints() {
        assert_eq!(decode(&[0xC8, 0xEF]).unwrap(), PackStreamValue::Integer(-17));
        assert_eq!(
            decode(&[0xC9, 0x03, 0xE8]).unwrap(),
            PackStreamValue::Integer(1000)
        );
        assert_eq!(
            decode(&[0xCA, 0x00, 0x01, 0x86, 0xA0]).unwrap(),
            PackStreamValue::Integer(100_000)
        );
        let data = [0xCB, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(decode(&data).unwrap(), PackStreamValue::Integer(i64::MAX));
    }

    #[test]
    fn decode_float() {
        let mut data = vec![0xC1];
        data.extend_from_slice(&1.25f64.to_be_bytes());
        assert_eq!(decode(&data).unwrap(), PackStreamValue::Float(1.25));
    }

    #[test]
    fn decode_strings() {
        let data = [0x85, b'h', b'e', b'l', b'l', b'o'];
        assert_eq!(
            decode(&data).unwrap(),
            PackStreamValue::String("hello".to_string())
        );
        assert_eq!(
            decode(&[0x80]).unwrap(),
            PackStreamValue::String(String::new())
        );
    }

    #[test]
    fn decode_bytes_value() {
        assert_eq!(
            decode(&[0xCC, 0x03, 1, 2, 3]).unwrap(),
            PackStreamValue::Bytes(vec![1, 2, 3])
        );
    }

    #[test]
    fn decode_list() {
        let value = decode(&[0x93, 1, 2, 3]).unwrap();
        assert_eq!(
            value,
            PackStreamValue::List(vec![
                PackStreamValue::Integer(1),
                PackStreamValue::Integer(2),
                PackStreamValue::Integer(3),
            ])
        );
        assert_eq!(decode(&[0x90]).unwrap(), PackStreamValue::List(vec![]));
    }

    #[test]
    fn decode_map_keeps_order() {
        // {"b": 1, "a": 2}
        let data = [0xA2, 0x81, b'b', 1, 0x81, b'a', 2];
        let value = decode(&data).unwrap();
        let map = value.as_map().unwrap();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(map["b"], PackStreamValue::Integer(1));
        assert_eq!(map["a"], PackStreamValue::Integer(2));
    }

    #[test]
    fn decode_map_rejects_non_string_key() {
        // map of 1 entry with integer key
        let data = [0xA1, 0x01, 0x02];
        assert!(matches!(
            decode(&data).unwrap_err(),
            PackStreamError::InvalidMapKey
        ));
    }

    #[test]
    fn decode_structure() {
        let value = decode(&[0xB1, 0x4E, 1]).unwrap();
        let s = value.as_structure().unwrap();
        assert_eq!(s.tag, 0x4E);
        assert_eq!(s.fields, vec![PackStreamValue::Integer(1)]);
    }

    #[test]
    fn decode_truncated_input() {
        assert!(matches!(
            decode(&[0xC9]).unwrap_err(),
            PackStreamError::UnexpectedEof
        ));
        assert!(matches!(
            decode(&[0x85, b'h', b'i']).unwrap_err(),
            PackStreamError::UnexpectedEof
        ));
    }

    #[test]
    fn decode_reserved_marker() {
        assert!(matches!(
            decode(&[0xC7]).unwrap_err(),
            PackStreamError::UnknownMarker(0xC7)
        ));
    }

    #[test]
    fn decode_invalid_utf8() {
        let data = [0x82, 0xFF, 0xFE];
        assert!(matches!(
            decode(&data).unwrap_err(),
            PackStreamError::InvalidUtf8(_)
        ));
    }

    #[test]
    fn peek_does_not_consume() {
        let data = [0x93, 1, 2, 3];
        let mut dec = PackStreamDecoder::new(&data);
        assert_eq!(dec.peek_type().unwrap(), PackStreamType::List);
        assert_eq!(dec.peek_type().unwrap(), PackStreamType::List);
        assert_eq!(dec.position(), 0);
        dec.decode().unwrap();
        assert!(dec.is_empty());
    }

    #[test]
    fn peek_classifies_families() {
        for (bytes, expected) in [
            (vec![0xC0u8], PackStreamType::Null),
            (vec![0xC3], PackStreamType::Boolean),
            (vec![0x2A], PackStreamType::Integer),
            (vec![0xC1], PackStreamType::Float),
            (vec![0xCC], PackStreamType::Bytes),
            (vec![0x81], PackStreamType::String),
            (vec![0x91], PackStreamType::List),
            (vec![0xA1], PackStreamType::Map),
            (vec![0xB1], PackStreamType::Struct),
        ] {
            let dec = PackStreamDecoder::new(&bytes);
            assert_eq!(dec.peek_type().unwrap(), expected);
        }
    }

    #[test]
    fn peek_errors() {
        let dec = PackStreamDecoder::new(&[]);
        assert!(matches!(
            dec.peek_type().unwrap_err(),
            PackStreamError::UnexpectedEof
        ));

        let dec = PackStreamDecoder::new(&[0xDF]);
        assert!(matches!(
            dec.peek_type().unwrap_err(),
            PackStreamError::UnknownMarker(0xDF)
        ));
    }

    #[test]
    fn decode_nested() {
        // [{"x": 5}]
        let data = [0x91, 0xA1, 0x81, b'x', 0x05];
        let value = decode(&data).unwrap();
        let list = value.as_list().unwrap();
        let map = list[0].as_map().unwrap();
        assert_eq!(map["x"], PackStreamValue::Integer(5));
    }
}
