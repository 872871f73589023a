//! The typed value model.
//!
//! Everything a query can send or receive is a [`Value`]: scalars,
//! collections, graph entities, spatial points and temporal values.
//! Values are immutable once constructed; the only exception is the
//! one-shot endpoint binding of relationships while the unpacker
//! assembles a path, which happens before the path is published.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::{DriverError, DriverResult};

// ============================================================================
// Value
// ============================================================================

/// A graph database value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit IEEE-754 float
    Float(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// List of values
    List(Vec<Value>),
    /// Insertion-ordered map
    Map(IndexMap<String, Value>),
    /// Graph node
    Node(Node),
    /// Graph relationship
    Relationship(Relationship),
    /// Graph path
    Path(Path),
    /// Spatial point (2D or 3D)
    Point(Point),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day with a fixed UTC offset
    Time(OffsetTime),
    /// Time of day without a zone
    LocalTime(NaiveTime),
    /// Date and time without a zone
    LocalDateTime(NaiveDateTime),
    /// Date and time in a zone (fixed offset or named)
    DateTime(ZonedDateTime),
    /// Calendar-aware duration
    Duration(Duration),
    /// A server-sent value this client cannot represent
    Unsupported(UnsupportedValue),
}

impl Value {
    /// Whether this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to view as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to view as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to view as float. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to view as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to view as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to view as list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Try to view as map.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Try to view as node.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Try to view as relationship.
    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Try to view as path.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Logical type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Bytes(_) => "Bytes",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
            Value::Path(_) => "Path",
            Value::Point(_) => "Point",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::LocalTime(_) => "LocalTime",
            Value::LocalDateTime(_) => "LocalDateTime",
            Value::DateTime(_) => "DateTime",
            Value::Duration(_) => "Duration",
            Value::Unsupported(_) => "Unsupported",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(fl) => write!(f, "{fl}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(l) => write!(f, "[{} items]", l.len()),
            Value::Map(m) => write!(f, "{{{} entries}}", m.len()),
            Value::Node(n) => write!(f, "{n}"),
            Value::Relationship(r) => write!(f, "{r}"),
            Value::Path(p) => write!(f, "{p}"),
            Value::Point(p) => write!(f, "{p}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::LocalTime(t) => write!(f, "{t}"),
            Value::LocalDateTime(dt) => write!(f, "{dt}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Duration(d) => write!(f, "{d}"),
            Value::Unsupported(u) => write!(f, "<unsupported {}: {}>", u.kind, u.reason),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::LocalTime(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::LocalDateTime(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// A graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Numeric node id
    pub id: i64,
    /// Server-assigned element id; falls back to the numeric id rendered
    /// as a string on servers that predate element ids
    pub element_id: String,
    /// Labels, in server order
    pub labels: Vec<String>,
    /// Properties, insertion-ordered
    pub properties: IndexMap<String, Value>,
}

impl Node {
    /// Create a node; the element id defaults to the numeric id.
    pub fn new(id: i64, labels: Vec<String>, properties: IndexMap<String, Value>) -> Self {
        Self {
            id,
            element_id: id.to_string(),
            labels,
            properties,
        }
    }

    /// Override the element id.
    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = element_id.into();
        self
    }

    /// Whether the node carries the given label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Look up and convert a property.
    pub fn get_as<T: TryFrom<Value, Error = DriverError>>(&self, key: &str) -> DriverResult<T> {
        self.properties
            .get(key)
            .cloned()
            .ok_or_else(|| DriverError::type_conversion(format!("property '{key}' not found")))
            .and_then(T::try_from)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = if self.labels.is_empty() {
            String::new()
        } else {
            format!(":{}", self.labels.join(":"))
        };
        write!(f, "({}{})", self.id, labels)
    }
}

// ============================================================================
// Relationship
// ============================================================================

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Numeric relationship id
    pub id: i64,
    /// Server-assigned element id
    pub element_id: String,
    /// Start node id
    pub start_node_id: i64,
    /// Start node element id
    pub start_node_element_id: String,
    /// End node id
    pub end_node_id: i64,
    /// End node element id
    pub end_node_element_id: String,
    /// Relationship type
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Properties, insertion-ordered
    pub properties: IndexMap<String, Value>,
}

impl Relationship {
    /// Create a relationship with numeric-id-derived element ids.
    pub fn new(
        id: i64,
        start_node_id: i64,
        end_node_id: i64,
        rel_type: String,
        properties: IndexMap<String, Value>,
    ) -> Self {
        Self {
            id,
            element_id: id.to_string(),
            start_node_id,
            start_node_element_id: start_node_id.to_string(),
            end_node_id,
            end_node_element_id: end_node_id.to_string(),
            rel_type,
            properties,
        }
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[:{}]->({})",
            self.start_node_id, self.rel_type, self.end_node_id
        )
    }
}

// ============================================================================
// Path
// ============================================================================

/// An alternating node/relationship sequence.
///
/// `nodes.len() == relationships.len() + 1`; each relationship connects
/// the neighbouring nodes. The arrays are frozen at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
}

impl Path {
    /// Build a path from already-bound parts.
    ///
    /// Fails when the node/relationship counts don't line up or a
    /// relationship's endpoints don't match its neighbouring nodes.
    pub fn new(nodes: Vec<Node>, relationships: Vec<Relationship>) -> DriverResult<Self> {
        if nodes.is_empty() {
            return Err(DriverError::protocol("a path requires at least one node"));
        }
        if nodes.len() != relationships.len() + 1 {
            return Err(DriverError::protocol(format!(
                "path with {} nodes cannot have {} relationships",
                nodes.len(),
                relationships.len()
            )));
        }
        for (i, rel) in relationships.iter().enumerate() {
            let (a, b) = (nodes[i].id, nodes[i + 1].id);
            let forward = rel.start_node_id == a && rel.end_node_id == b;
            let reverse = rel.start_node_id == b && rel.end_node_id == a;
            if !forward && !reverse {
                return Err(DriverError::protocol(format!(
                    "relationship {} does not connect nodes {a} and {b}",
                    rel.id
                )));
            }
        }
        Ok(Self {
            nodes,
            relationships,
        })
    }

    /// Nodes in traversal order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Relationships in traversal order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Path length (number of relationships).
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether the path is a single node.
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// First node.
    pub fn start(&self) -> &Node {
        &self.nodes[0]
    }

    /// Last node.
    pub fn end(&self) -> &Node {
        self.nodes.last().expect("path has at least one node")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Path: {} nodes, {} rels>",
            self.nodes.len(),
            self.relationships.len()
        )
    }
}

// ============================================================================
// Point
// ============================================================================

/// A spatial point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Spatial reference system id
    pub srid: i32,
    /// X coordinate (longitude for WGS-84)
    pub x: f64,
    /// Y coordinate (latitude for WGS-84)
    pub y: f64,
    /// Z coordinate, when 3D
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Point {
    /// 2D point.
    pub fn new_2d(srid: i32, x: f64, y: f64) -> Self {
        Self { srid, x, y, z: None }
    }

    /// 3D point.
    pub fn new_3d(srid: i32, x: f64, y: f64, z: f64) -> Self {
        Self {
            srid,
            x,
            y,
            z: Some(z),
        }
    }

    /// WGS-84 2D point (longitude, latitude).
    pub fn wgs84_2d(longitude: f64, latitude: f64) -> Self {
        Self::new_2d(4326, longitude, latitude)
    }

    /// WGS-84 3D point (longitude, latitude, height).
    pub fn wgs84_3d(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new_3d(4979, longitude, latitude, height)
    }

    /// Cartesian 2D point.
    pub fn cartesian_2d(x: f64, y: f64) -> Self {
        Self::new_2d(7203, x, y)
    }

    /// Cartesian 3D point.
    pub fn cartesian_3d(x: f64, y: f64, z: f64) -> Self {
        Self::new_3d(9157, x, y, z)
    }

    /// Whether the point has a Z coordinate.
    pub fn is_3d(&self) -> bool {
        self.z.is_some()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(
                f,
                "Point(srid={}, x={}, y={}, z={z})",
                self.srid, self.x, self.y
            ),
            None => write!(f, "Point(srid={}, x={}, y={})", self.srid, self.x, self.y),
        }
    }
}

// ============================================================================
// Temporal types
// ============================================================================

/// Time of day with a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetTime {
    /// Local time of day
    pub time: NaiveTime,
    /// Offset from UTC in seconds
    pub offset_seconds: i32,
}

impl OffsetTime {
    /// Create from a time and an offset in seconds.
    pub fn new(time: NaiveTime, offset_seconds: i32) -> Self {
        Self {
            time,
            offset_seconds,
        }
    }

    /// Nanoseconds since midnight.
    pub fn nanos_of_day(&self) -> i64 {
        self.time.num_seconds_from_midnight() as i64 * 1_000_000_000
            + self.time.nanosecond() as i64
    }

    /// The offset as a chrono `FixedOffset`.
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.offset_seconds)
    }
}

impl fmt::Display for OffsetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, abs) = if self.offset_seconds < 0 {
            ('-', -self.offset_seconds)
        } else {
            ('+', self.offset_seconds)
        };
        write!(
            f,
            "{}{}{:02}:{:02}",
            self.time,
            sign,
            abs / 3600,
            (abs % 3600) / 60
        )
    }
}

/// The zone attached to a [`ZonedDateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    /// Fixed offset from UTC, in seconds
    Offset(i32),
    /// Named IANA time zone
    Named(Tz),
}

/// A date-time in a zone.
///
/// `utc_baseline` records which wire encoding produced the value: the
/// legacy local-epoch form or the UTC form negotiated on Bolt 5.0+.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonedDateTime {
    /// The resolved instant with its local offset applied
    pub datetime: DateTime<FixedOffset>,
    /// The zone the server named
    pub zone: Zone,
    /// Which encoding family produced this value
    pub utc_baseline: bool,
}

impl ZonedDateTime {
    /// Create from a resolved instant and its zone.
    pub fn new(datetime: DateTime<FixedOffset>, zone: Zone, utc_baseline: bool) -> Self {
        Self {
            datetime,
            zone,
            utc_baseline,
        }
    }

    /// The zone name, for named zones.
    pub fn zone_id(&self) -> Option<&'static str> {
        match self.zone {
            Zone::Named(tz) => Some(tz.name()),
            Zone::Offset(_) => None,
        }
    }

    /// The effective offset from UTC in seconds.
    pub fn offset_seconds(&self) -> i32 {
        self.datetime.offset().local_minus_utc()
    }
}

impl fmt::Display for ZonedDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.zone {
            Zone::Named(tz) => write!(f, "{}[{}]", self.datetime, tz.name()),
            Zone::Offset(_) => write!(f, "{}", self.datetime),
        }
    }
}

// ============================================================================
// Duration
// ============================================================================

/// A calendar-aware duration.
///
/// Nanoseconds are normalised into `[0, 1_000_000_000)`; the seconds
/// component absorbs the carry, so negative sub-second durations are
/// expressed as `seconds = -1, nanoseconds = 999_999_999`-style pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    /// Months
    pub months: i64,
    /// Days
    pub days: i64,
    /// Seconds
    pub seconds: i64,
    /// Nanoseconds, always in [0, 10^9)
    pub nanoseconds: i32,
}

impl Duration {
    /// Create a duration, normalising the nanosecond component.
    pub fn new(months: i64, days: i64, seconds: i64, nanoseconds: i64) -> Self {
        let seconds = seconds + nanoseconds.div_euclid(1_000_000_000);
        let nanos = nanoseconds.rem_euclid(1_000_000_000);
        Self {
            months,
            days,
            seconds,
            nanoseconds: nanos as i32,
        }
    }

    /// A duration of whole seconds.
    pub fn from_seconds(seconds: i64) -> Self {
        Self::new(0, 0, seconds, 0)
    }

    /// A duration of whole days.
    pub fn from_days(days: i64) -> Self {
        Self::new(0, days, 0, 0)
    }

    /// A duration of whole months.
    pub fn from_months(months: i64) -> Self {
        Self::new(months, 0, 0, 0)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P{}M{}DT{}S",
            self.months,
            self.days,
            self.seconds as f64 + self.nanoseconds as f64 / 1_000_000_000.0
        )
    }
}

// ============================================================================
// Unsupported
// ============================================================================

/// Sentinel for a server-sent value this client cannot represent,
/// typically a zoned date-time naming an unknown zone.
///
/// It is a legal list/map element; any typed projection fails with the
/// carried reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedValue {
    /// What kind of value could not be represented
    pub kind: String,
    /// Why
    pub reason: String,
}

impl UnsupportedValue {
    /// Create a new sentinel.
    pub fn new(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// TryFrom projections
// ============================================================================

fn unsupported_err(u: &UnsupportedValue) -> DriverError {
    DriverError::unsupported(format!("{}: {}", u.kind, u.reason))
}

macro_rules! try_from_value {
    ($target:ty, $name:literal, $($pattern:pat => $result:expr),+ $(,)?) => {
        impl TryFrom<Value> for $target {
            type Error = DriverError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    $($pattern => $result,)+
                    Value::Unsupported(ref u) => Err(unsupported_err(u)),
                    other => Err(DriverError::type_conversion(format!(
                        concat!("cannot convert {} to ", $name),
                        other.type_name()
                    ))),
                }
            }
        }
    };
}

try_from_value!(bool, "bool", Value::Boolean(b) => Ok(b));
try_from_value!(i64, "i64", Value::Integer(i) => Ok(i));
try_from_value!(f64, "f64",
    Value::Float(f) => Ok(f),
    Value::Integer(i) => Ok(i as f64),
);
try_from_value!(String, "String", Value::String(s) => Ok(s));
try_from_value!(Vec<u8>, "bytes", Value::Bytes(b) => Ok(b));
try_from_value!(Node, "Node", Value::Node(n) => Ok(n));
try_from_value!(Relationship, "Relationship", Value::Relationship(r) => Ok(r));
try_from_value!(Path, "Path", Value::Path(p) => Ok(p));
try_from_value!(Point, "Point", Value::Point(p) => Ok(p));
try_from_value!(NaiveDate, "Date", Value::Date(d) => Ok(d));
try_from_value!(NaiveTime, "LocalTime", Value::LocalTime(t) => Ok(t));
try_from_value!(NaiveDateTime, "LocalDateTime", Value::LocalDateTime(dt) => Ok(dt));
try_from_value!(OffsetTime, "Time", Value::Time(t) => Ok(t));
try_from_value!(ZonedDateTime, "DateTime", Value::DateTime(dt) => Ok(dt));
try_from_value!(Duration, "Duration", Value::Duration(d) => Ok(d));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(42).as_int(), Some(42));
        assert_eq!(Value::Integer(42).as_float(), Some(42.0));
        assert_eq!(Value::Float(1.5).as_float(), Some(1.5));
        assert_eq!(Value::String("hi".into()).as_str(), Some("hi"));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::String("hi".into()).to_string(), "\"hi\"");
        assert_eq!(Value::Bytes(vec![1, 2]).to_string(), "<2 bytes>");
    }

    #[test]
    fn conversions() {
        let v: Value = true.into();
        assert_eq!(v, Value::Boolean(true));
        let v: Value = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: Value = vec![1i64, 2].into();
        assert_eq!(v.as_list().unwrap().len(), 2);

        assert!(bool::try_from(Value::Boolean(true)).unwrap());
        assert_eq!(i64::try_from(Value::Integer(7)).unwrap(), 7);
        assert_eq!(f64::try_from(Value::Integer(7)).unwrap(), 7.0);
        assert!(i64::try_from(Value::String("7".into())).is_err());
    }

    #[test]
    fn unsupported_propagates_reason() {
        let v = Value::Unsupported(UnsupportedValue::new(
            "DateTimeZoneId",
            "unknown time zone: Mars/Olympus",
        ));
        let err = ZonedDateTime::try_from(v).unwrap_err();
        match err {
            DriverError::Unsupported(msg) => assert!(msg.contains("Mars/Olympus")),
            other => panic!("expected Unsupported, got {other:?}"),
        }
    }

    #[test]
    fn node_basics() {
        let mut props = IndexMap::new();
        props.insert("name".to_string(), Value::String("Alice".into()));
        let node = Node::new(1, vec!["Person".into()], props);

        assert_eq!(node.element_id, "1");
        assert!(node.has_label("Person"));
        assert!(!node.has_label("Movie"));
        assert_eq!(node.get("name"), Some(&Value::String("Alice".into())));
        assert_eq!(node.get_as::<String>("name").unwrap(), "Alice");
        assert!(node.get_as::<String>("missing").is_err());
        assert_eq!(node.to_string(), "(1:Person)");
    }

    #[test]
    fn node_properties_keep_order() {
        let mut props = IndexMap::new();
        props.insert("zulu".to_string(), Value::Integer(1));
        props.insert("alpha".to_string(), Value::Integer(2));
        let node = Node::new(1, vec![], props);
        let keys: Vec<&String> = node.properties.keys().collect();
        assert_eq!(keys, ["zulu", "alpha"]);
    }

    #[test]
    fn relationship_basics() {
        let rel = Relationship::new(9, 1, 2, "KNOWS".into(), IndexMap::new());
        assert_eq!(rel.element_id, "9");
        assert_eq!(rel.start_node_element_id, "1");
        assert_eq!(rel.to_string(), "(1)-[:KNOWS]->(2)");
    }

    #[test]
    fn path_validation() {
        let n0 = Node::new(0, vec![], IndexMap::new());
        let n1 = Node::new(1, vec![], IndexMap::new());
        let r = Relationship::new(10, 0, 1, "KNOWS".into(), IndexMap::new());

        let path = Path::new(vec![n0.clone(), n1.clone()], vec![r.clone()]).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.start().id, 0);
        assert_eq!(path.end().id, 1);

        // single node, no relationships
        let single = Path::new(vec![n0.clone()], vec![]).unwrap();
        assert!(single.is_empty());

        // count mismatch
        assert!(Path::new(vec![n0.clone()], vec![r.clone()]).is_err());

        // disconnected relationship
        let stray = Relationship::new(11, 5, 6, "KNOWS".into(), IndexMap::new());
        assert!(Path::new(vec![n0, n1], vec![stray]).is_err());
    }

    #[test]
    fn point_constructors() {
        assert_eq!(Point::wgs84_2d(-122.3, 47.6).srid, 4326);
        assert_eq!(Point::wgs84_3d(-122.3, 47.6, 10.0).srid, 4979);
        assert_eq!(Point::cartesian_2d(1.0, 2.0).srid, 7203);
        assert_eq!(Point::cartesian_3d(1.0, 2.0, 3.0).srid, 9157);
        assert!(Point::cartesian_3d(1.0, 2.0, 3.0).is_3d());
        assert!(!Point::cartesian_2d(1.0, 2.0).is_3d());
    }

    #[test]
    fn offset_time_nanos() {
        let t = OffsetTime::new(
            NaiveTime::from_hms_nano_opt(1, 2, 3, 400).unwrap(),
            3600,
        );
        assert_eq!(t.nanos_of_day(), (3600 + 120 + 3) * 1_000_000_000 + 400);
        assert_eq!(t.offset().unwrap().local_minus_utc(), 3600);
        assert!(t.to_string().ends_with("+01:00"));
    }

    #[test]
    fn duration_normalisation() {
        let d = Duration::new(0, 0, 1, 1_500_000_000);
        assert_eq!(d.seconds, 2);
        assert_eq!(d.nanoseconds, 500_000_000);

        let d = Duration::new(0, 0, 0, -1);
        assert_eq!(d.seconds, -1);
        assert_eq!(d.nanoseconds, 999_999_999);

        let d = Duration::new(1, 2, 3, 400_000_000);
        assert_eq!((d.months, d.days, d.seconds, d.nanoseconds), (1, 2, 3, 400_000_000));
    }

    #[test]
    fn zoned_datetime_accessors() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let offset = FixedOffset::east_opt(3600).unwrap();
        let dt = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+01:00").unwrap();
        let zdt = ZonedDateTime::new(dt, Zone::Named(tz), true);

        assert_eq!(zdt.zone_id(), Some("Europe/Berlin"));
        assert_eq!(zdt.offset_seconds(), 3600);
        assert!(zdt.to_string().contains("Europe/Berlin"));

        let zdt = ZonedDateTime::new(dt, Zone::Offset(offset.local_minus_utc()), false);
        assert_eq!(zdt.zone_id(), None);
        assert_eq!(zdt.offset_seconds(), 3600);
    }
}
