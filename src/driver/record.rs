//! Query result records.

use std::fmt;
use std::sync::Arc;

use super::error::{DriverError, DriverResult};
use super::value::Value;

/// One row of a result: ordered values plus the declared field names.
#[derive(Debug, Clone)]
pub struct Record {
    keys: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Record {
    /// Create a record from field names and values.
    pub fn new(keys: Vec<String>, values: Vec<Value>) -> Self {
        Self::with_keys(Arc::new(keys), values)
    }

    /// Create a record sharing an existing key set. Streams use this so
    /// every row of a result reuses one allocation.
    pub fn with_keys(keys: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { keys, values }
    }

    /// Field names.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Field values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of a named field.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Whether a field with this name exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    /// Value of a named field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index_of(key).and_then(|i| self.values.get(i))
    }

    /// Value at an index.
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Named field converted to a concrete type.
    pub fn get_as<T>(&self, key: &str) -> DriverResult<T>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        self.get(key)
            .cloned()
            .ok_or_else(|| DriverError::type_conversion(format!("field '{key}' not found")))
            .and_then(T::try_from)
    }

    /// Named field converted to a concrete type, with Null as None.
    pub fn get_optional<T>(&self, key: &str) -> DriverResult<Option<T>>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => T::try_from(v.clone()).map(Some),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .keys
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| format!("{k}: {v}"))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter().zip(self.values.iter())
    }
}

// ============================================================================
// Coercion
// ============================================================================

/// Coercion rules for the typed getters.
///
/// These are deliberately narrow: a boolean comes from a Boolean, from
/// the integers 0 and 1, or from the strings "0" and "1"; integers
/// narrow only when the value fits. Everything else is a
/// `TypeConversion` error. Null handling (defaults plus the was-null
/// flag) lives in the row cursor, not here.
pub mod coerce {
    use super::*;

    /// Coerce to boolean.
    pub fn to_bool(value: &Value) -> DriverResult<bool> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::Integer(other) => Err(DriverError::type_conversion(format!(
                "cannot coerce integer {other} to boolean"
            ))),
            Value::Float(f) if *f == 0.0 => Ok(false),
            Value::Float(f) if *f == 1.0 => Ok(true),
            Value::Float(f) => Err(DriverError::type_conversion(format!(
                "cannot coerce float {f} to boolean"
            ))),
            Value::String(s) if s == "0" => Ok(false),
            Value::String(s) if s == "1" => Ok(true),
            Value::String(s) => Err(DriverError::type_conversion(format!(
                "cannot coerce string \"{s}\" to boolean"
            ))),
            other => mismatch(other, "boolean"),
        }
    }

    /// Coerce to i64.
    pub fn to_i64(value: &Value) -> DriverResult<i64> {
        match value {
            Value::Integer(i) => Ok(*i),
            other => mismatch(other, "integer"),
        }
    }

    /// Coerce to i32, failing when out of range.
    pub fn to_i32(value: &Value) -> DriverResult<i32> {
        let wide = to_i64(value)?;
        i32::try_from(wide)
            .map_err(|_| DriverError::type_conversion(format!("{wide} out of range for int")))
    }

    /// Coerce to i16, failing when out of range.
    pub fn to_i16(value: &Value) -> DriverResult<i16> {
        let wide = to_i64(value)?;
        i16::try_from(wide)
            .map_err(|_| DriverError::type_conversion(format!("{wide} out of range for short")))
    }

    /// Coerce to i8, failing when out of range.
    pub fn to_i8(value: &Value) -> DriverResult<i8> {
        let wide = to_i64(value)?;
        i8::try_from(wide)
            .map_err(|_| DriverError::type_conversion(format!("{wide} out of range for byte")))
    }

    /// Coerce to f64. Integers widen.
    pub fn to_f64(value: &Value) -> DriverResult<f64> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            other => mismatch(other, "float"),
        }
    }

    /// Coerce to String.
    pub fn to_string(value: &Value) -> DriverResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => mismatch(other, "string"),
        }
    }

    /// Coerce to bytes.
    pub fn to_bytes(value: &Value) -> DriverResult<Vec<u8>> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => mismatch(other, "bytes"),
        }
    }

    fn mismatch<T>(value: &Value, wanted: &str) -> DriverResult<T> {
        if let Value::Unsupported(u) = value {
            return Err(DriverError::unsupported(format!("{}: {}", u.kind, u.reason)));
        }
        Err(DriverError::type_conversion(format!(
            "cannot coerce {} to {wanted}",
            value.type_name()
        )))
    }
}
