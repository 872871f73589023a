//! Structure-aware value conversion.
//!
//! The packstream layer only knows bytes and nesting; this module gives
//! structure signatures their meaning. The unpacker validates each
//! signature against the table of expected field counts, honours the
//! negotiated date-time mode, and reassembles paths from their wire
//! form. The packer is the inverse for client-supplied parameters.

use chrono::{DateTime, Datelike, FixedOffset, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use indexmap::IndexMap;

use crate::bolt::packstream::{PackStreamStructure, PackStreamValue};

use super::error::{DriverError, DriverResult};
use super::value::{
    Duration, Node, OffsetTime, Path, Point, Relationship, UnsupportedValue, Value, Zone,
    ZonedDateTime,
};

/// Structure signatures.
pub mod sig {
    /// Node ('N')
    pub const NODE: u8 = 0x4E;
    /// Relationship ('R')
    pub const RELATIONSHIP: u8 = 0x52;
    /// Relationship without endpoints, inside paths ('r')
    pub const UNBOUND_RELATIONSHIP: u8 = 0x72;
    /// Path ('P')
    pub const PATH: u8 = 0x50;
    /// Date ('D')
    pub const DATE: u8 = 0x44;
    /// Time with offset ('T')
    pub const TIME: u8 = 0x54;
    /// Local time ('t')
    pub const LOCAL_TIME: u8 = 0x74;
    /// Local date-time ('d')
    pub const LOCAL_DATE_TIME: u8 = 0x64;
    /// Legacy date-time with offset ('F')
    pub const DATE_TIME_LEGACY_OFFSET: u8 = 0x46;
    /// Legacy date-time with zone id ('f')
    pub const DATE_TIME_LEGACY_ZONE_ID: u8 = 0x66;
    /// UTC date-time with offset ('I')
    pub const DATE_TIME_UTC_OFFSET: u8 = 0x49;
    /// UTC date-time with zone id ('i')
    pub const DATE_TIME_UTC_ZONE_ID: u8 = 0x69;
    /// Duration ('E')
    pub const DURATION: u8 = 0x45;
    /// 2D point ('X')
    pub const POINT_2D: u8 = 0x58;
    /// 3D point ('Y')
    pub const POINT_3D: u8 = 0x59;
}

/// Unix epoch as a day number from the chrono common era.
const EPOCH_CE_DAYS: i64 = 719_163;

/// Converts wire structures into [`Value`]s.
///
/// `utc_patch_enabled` selects which pair of zoned date-time signatures
/// is legal: 'I'/'i' when enabled (Bolt 5.0+), 'F'/'f' otherwise. A
/// signature belonging to the other mode is treated as unknown.
#[derive(Debug, Clone, Copy)]
pub struct ValueUnpacker {
    utc_patch_enabled: bool,
}

impl ValueUnpacker {
    /// Create an unpacker for the given date-time mode.
    pub fn new(utc_patch_enabled: bool) -> Self {
        Self { utc_patch_enabled }
    }

    /// Whether the UTC date-time encodings are active.
    pub fn utc_patch_enabled(&self) -> bool {
        self.utc_patch_enabled
    }

    /// Convert a decoded PackStream value into a typed value.
    pub fn unpack(&self, value: &PackStreamValue) -> DriverResult<Value> {
        match value {
            PackStreamValue::Null => Ok(Value::Null),
            PackStreamValue::Boolean(b) => Ok(Value::Boolean(*b)),
            PackStreamValue::Integer(i) => Ok(Value::Integer(*i)),
            PackStreamValue::Float(f) => Ok(Value::Float(*f)),
            PackStreamValue::Bytes(b) => Ok(Value::Bytes(b.clone())),
            PackStreamValue::String(s) => Ok(Value::String(s.clone())),
            PackStreamValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.unpack(item)?);
                }
                Ok(Value::List(out))
            }
            PackStreamValue::Map(map) => Ok(Value::Map(self.unpack_map(map)?)),
            PackStreamValue::Structure(s) => self.unpack_struct(s),
        }
    }

    fn unpack_map(
        &self,
        map: &IndexMap<String, PackStreamValue>,
    ) -> DriverResult<IndexMap<String, Value>> {
        let mut out = IndexMap::with_capacity(map.len());
        for (k, v) in map {
            out.insert(k.clone(), self.unpack(v)?);
        }
        Ok(out)
    }

    fn unpack_struct(&self, s: &PackStreamStructure) -> DriverResult<Value> {
        match s.tag {
            sig::NODE => {
                ensure_field_count("Node", &[3, 4], s)?;
                Ok(Value::Node(self.unpack_node(s)?))
            }
            sig::RELATIONSHIP => {
                ensure_field_count("Relationship", &[5, 8], s)?;
                Ok(Value::Relationship(self.unpack_relationship(s)?))
            }
            sig::PATH => {
                ensure_field_count("Path", &[3], s)?;
                Ok(Value::Path(self.unpack_path(s)?))
            }
            sig::DATE => {
                ensure_field_count("Date", &[1], s)?;
                let days = int_field(s, 0, "Date.epochDay")?;
                let date = NaiveDate::from_num_days_from_ce_opt(
                    i32::try_from(days + EPOCH_CE_DAYS).map_err(|_| {
                        DriverError::protocol(format!("Date epoch day {days} out of range"))
                    })?,
                )
                .ok_or_else(|| {
                    DriverError::protocol(format!("Date epoch day {days} out of range"))
                })?;
                Ok(Value::Date(date))
            }
            sig::TIME => {
                ensure_field_count("Time", &[2], s)?;
                let nanos = int_field(s, 0, "Time.nanosOfDay")?;
                let offset = int_field(s, 1, "Time.offsetSeconds")?;
                let time = time_from_nanos_of_day(nanos)?;
                let offset = i32::try_from(offset).map_err(|_| {
                    DriverError::protocol(format!("Time offset {offset} out of range"))
                })?;
                Ok(Value::Time(OffsetTime::new(time, offset)))
            }
            sig::LOCAL_TIME => {
                ensure_field_count("LocalTime", &[1], s)?;
                let nanos = int_field(s, 0, "LocalTime.nanosOfDay")?;
                Ok(Value::LocalTime(time_from_nanos_of_day(nanos)?))
            }
            sig::LOCAL_DATE_TIME => {
                ensure_field_count("LocalDateTime", &[2], s)?;
                let secs = int_field(s, 0, "LocalDateTime.epochSecond")?;
                let nanos = int_field(s, 1, "LocalDateTime.nano")?;
                let dt = DateTime::from_timestamp(secs, nano_u32(nanos)?).ok_or_else(|| {
                    DriverError::protocol(format!("LocalDateTime {secs}s out of range"))
                })?;
                Ok(Value::LocalDateTime(dt.naive_utc()))
            }
            sig::DATE_TIME_LEGACY_OFFSET if !self.utc_patch_enabled => {
                ensure_field_count("DateTime", &[3], s)?;
                self.unpack_datetime(s, ZoneMode::Offset, false)
            }
            sig::DATE_TIME_LEGACY_ZONE_ID if !self.utc_patch_enabled => {
                ensure_field_count("DateTime", &[3], s)?;
                self.unpack_datetime(s, ZoneMode::ZoneId, false)
            }
            sig::DATE_TIME_UTC_OFFSET if self.utc_patch_enabled => {
                ensure_field_count("DateTime", &[3], s)?;
                self.unpack_datetime(s, ZoneMode::Offset, true)
            }
            sig::DATE_TIME_UTC_ZONE_ID if self.utc_patch_enabled => {
                ensure_field_count("DateTime", &[3], s)?;
                self.unpack_datetime(s, ZoneMode::ZoneId, true)
            }
            sig::DURATION => {
                ensure_field_count("Duration", &[4], s)?;
                let months = int_field(s, 0, "Duration.months")?;
                let days = int_field(s, 1, "Duration.days")?;
                let seconds = int_field(s, 2, "Duration.seconds")?;
                let nanos = int_field(s, 3, "Duration.nanos")?;
                Ok(Value::Duration(Duration::new(months, days, seconds, nanos)))
            }
            sig::POINT_2D => {
                ensure_field_count("Point", &[3], s)?;
                let srid = int_field(s, 0, "Point.srid")?;
                Ok(Value::Point(Point::new_2d(
                    srid_i32(srid)?,
                    float_field(s, 1, "Point.x")?,
                    float_field(s, 2, "Point.y")?,
                )))
            }
            sig::POINT_3D => {
                ensure_field_count("Point", &[4], s)?;
                let srid = int_field(s, 0, "Point.srid")?;
                Ok(Value::Point(Point::new_3d(
                    srid_i32(srid)?,
                    float_field(s, 1, "Point.x")?,
                    float_field(s, 2, "Point.y")?,
                    float_field(s, 3, "Point.z")?,
                )))
            }
            other => Err(DriverError::protocol(format!(
                "unknown struct signature 0x{other:02X}"
            ))),
        }
    }

    fn unpack_node(&self, s: &PackStreamStructure) -> DriverResult<Node> {
        let id = int_field(s, 0, "Node.id")?;
        let labels = s.fields[1]
            .as_list()
            .ok_or_else(|| DriverError::protocol("Node labels must be a list"))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| DriverError::protocol("Node label must be a string"))
            })
            .collect::<DriverResult<Vec<_>>>()?;
        let properties = s.fields[2]
            .as_map()
            .ok_or_else(|| DriverError::protocol("Node properties must be a map"))?;

        let mut node = Node::new(id, labels, self.unpack_map(properties)?);
        if let Some(element_id) = s.fields.get(3).and_then(|v| v.as_str()) {
            node = node.with_element_id(element_id);
        }
        Ok(node)
    }

    fn unpack_relationship(&self, s: &PackStreamStructure) -> DriverResult<Relationship> {
        let id = int_field(s, 0, "Relationship.id")?;
        let start = int_field(s, 1, "Relationship.startNodeId")?;
        let end = int_field(s, 2, "Relationship.endNodeId")?;
        let rel_type = s.fields[3]
            .as_str()
            .ok_or_else(|| DriverError::protocol("Relationship type must be a string"))?
            .to_string();
        let properties = s.fields[4]
            .as_map()
            .ok_or_else(|| DriverError::protocol("Relationship properties must be a map"))?;

        let mut rel = Relationship::new(id, start, end, rel_type, self.unpack_map(properties)?);
        if s.fields.len() == 8 {
            if let Some(eid) = s.fields[5].as_str() {
                rel.element_id = eid.to_string();
            }
            if let Some(eid) = s.fields[6].as_str() {
                rel.start_node_element_id = eid.to_string();
            }
            if let Some(eid) = s.fields[7].as_str() {
                rel.end_node_element_id = eid.to_string();
            }
        }
        Ok(rel)
    }

    /// Reassemble a path from its wire form: unique nodes, unique
    /// endpoint-less relationships, and an alternating sequence of
    /// (rel_index, node_index) pairs. Relationship indices are 1-based;
    /// a negative index marks reverse traversal, which swaps the
    /// endpoint binding.
    fn unpack_path(&self, s: &PackStreamStructure) -> DriverResult<Path> {
        let node_structs = s.fields[0]
            .as_list()
            .ok_or_else(|| DriverError::protocol("Path nodes must be a list"))?;
        let mut unique_nodes = Vec::with_capacity(node_structs.len());
        for v in node_structs {
            let ns = expect_struct(v, sig::NODE, "Node")?;
            ensure_field_count("Node", &[3, 4], ns)?;
            unique_nodes.push(self.unpack_node(ns)?);
        }

        let rel_structs = s.fields[1]
            .as_list()
            .ok_or_else(|| DriverError::protocol("Path relationships must be a list"))?;
        let mut unique_rels = Vec::with_capacity(rel_structs.len());
        for v in rel_structs {
            let rs = expect_struct(v, sig::UNBOUND_RELATIONSHIP, "UnboundRelationship")?;
            ensure_field_count("UnboundRelationship", &[3, 4], rs)?;
            unique_rels.push(self.unpack_unbound_relationship(rs)?);
        }

        let sequence = s.fields[2]
            .as_list()
            .ok_or_else(|| DriverError::protocol("Path sequence must be a list"))?;
        if sequence.len() % 2 != 0 {
            return Err(DriverError::protocol(format!(
                "Path sequence must have an even length, got {}",
                sequence.len()
            )));
        }

        let mut builder = PathBuilder::new(unique_nodes, unique_rels)?;
        for pair in sequence.chunks_exact(2) {
            let rel_index = pair[0]
                .as_int()
                .ok_or_else(|| DriverError::protocol("Path sequence entries must be integers"))?;
            let node_index = pair[1]
                .as_int()
                .ok_or_else(|| DriverError::protocol("Path sequence entries must be integers"))?;
            builder.step(rel_index, node_index)?;
        }
        builder.build()
    }

    fn unpack_unbound_relationship(
        &self,
        s: &PackStreamStructure,
    ) -> DriverResult<UnboundRelationship> {
        let id = int_field(s, 0, "UnboundRelationship.id")?;
        let rel_type = s.fields[1]
            .as_str()
            .ok_or_else(|| DriverError::protocol("UnboundRelationship type must be a string"))?
            .to_string();
        let properties = s.fields[2]
            .as_map()
            .ok_or_else(|| DriverError::protocol("UnboundRelationship properties must be a map"))?;
        Ok(UnboundRelationship {
            id,
            rel_type,
            properties: self.unpack_map(properties)?,
            element_id: s
                .fields
                .get(3)
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }

    fn unpack_datetime(
        &self,
        s: &PackStreamStructure,
        zone_mode: ZoneMode,
        utc_baseline: bool,
    ) -> DriverResult<Value> {
        let epoch_second = int_field(s, 0, "DateTime.epochSecond")?;
        let nano = int_field(s, 1, "DateTime.nano")?;

        let instant = DateTime::from_timestamp(epoch_second, nano_u32(nano)?)
            .ok_or_else(|| DriverError::protocol(format!("DateTime {epoch_second}s out of range")))?;

        let zone = match zone_mode {
            ZoneMode::Offset => {
                let offset_seconds = int_field(s, 2, "DateTime.offsetSeconds")?;
                let offset_seconds = i32::try_from(offset_seconds).map_err(|_| {
                    DriverError::protocol(format!("DateTime offset {offset_seconds} out of range"))
                })?;
                Zone::Offset(offset_seconds)
            }
            ZoneMode::ZoneId => {
                let zone_id = s.fields[2]
                    .as_str()
                    .ok_or_else(|| DriverError::protocol("DateTime zone id must be a string"))?;
                match zone_id.parse::<Tz>() {
                    Ok(tz) => Zone::Named(tz),
                    // Unknown zone does not abort the record.
                    Err(_) => {
                        return Ok(Value::Unsupported(UnsupportedValue::new(
                            "DateTimeZoneId",
                            format!("unknown time zone: {zone_id}"),
                        )))
                    }
                }
            }
        };

        let datetime = if utc_baseline {
            // The wire carries the true instant; shift it into the zone.
            match zone {
                Zone::Offset(secs) => {
                    let offset = fixed_offset(secs)?;
                    instant.with_timezone(&offset)
                }
                Zone::Named(tz) => instant.with_timezone(&tz).fixed_offset(),
            }
        } else {
            // Legacy baseline: the wire carries the local wall clock
            // written as if it were UTC. Reinterpret it in the zone.
            let local = instant.naive_utc();
            match zone {
                Zone::Offset(secs) => {
                    let offset = fixed_offset(secs)?;
                    match offset.from_local_datetime(&local) {
                        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
                        LocalResult::None => {
                            return Ok(Value::Unsupported(UnsupportedValue::new(
                                "DateTime",
                                format!("local time {local} does not exist at offset {secs}s"),
                            )))
                        }
                    }
                }
                Zone::Named(tz) => match tz.from_local_datetime(&local) {
                    LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.fixed_offset(),
                    LocalResult::None => {
                        return Ok(Value::Unsupported(UnsupportedValue::new(
                            "DateTime",
                            format!("local time {local} does not exist in {}", tz.name()),
                        )))
                    }
                },
            }
        };

        Ok(Value::DateTime(ZonedDateTime::new(datetime, zone, utc_baseline)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZoneMode {
    Offset,
    ZoneId,
}

/// A relationship read out of a path, before its endpoints are bound.
#[derive(Debug, Clone)]
struct UnboundRelationship {
    id: i64,
    rel_type: String,
    properties: IndexMap<String, Value>,
    element_id: Option<String>,
}

/// Assembles a [`Path`] step by step, binding relationship endpoints
/// from the traversal sequence. The result is frozen on `build`.
struct PathBuilder {
    unique_nodes: Vec<Node>,
    unique_rels: Vec<UnboundRelationship>,
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
    prev: usize,
}

impl PathBuilder {
    fn new(unique_nodes: Vec<Node>, unique_rels: Vec<UnboundRelationship>) -> DriverResult<Self> {
        if unique_nodes.is_empty() {
            return Err(DriverError::protocol("Path requires at least one node"));
        }
        // The start node is always index 0 and is not in the sequence.
        let start = unique_nodes[0].clone();
        Ok(Self {
            unique_nodes,
            unique_rels,
            nodes: vec![start],
            relationships: Vec::new(),
            prev: 0,
        })
    }

    fn step(&mut self, rel_index: i64, node_index: i64) -> DriverResult<()> {
        let reversed = rel_index < 0;
        let rel_pos = usize::try_from(rel_index.unsigned_abs())
            .ok()
            .and_then(|i| i.checked_sub(1))
            .filter(|&i| i < self.unique_rels.len())
            .ok_or_else(|| {
                DriverError::protocol(format!("Path relationship index {rel_index} out of range"))
            })?;
        let next_pos = usize::try_from(node_index)
            .ok()
            .filter(|&i| i < self.unique_nodes.len())
            .ok_or_else(|| {
                DriverError::protocol(format!("Path node index {node_index} out of range"))
            })?;

        let prev_node = &self.unique_nodes[self.prev];
        let next_node = &self.unique_nodes[next_pos];
        let unbound = &self.unique_rels[rel_pos];

        // Reverse traversal binds end -> start.
        let (start, end) = if reversed {
            (next_node, prev_node)
        } else {
            (prev_node, next_node)
        };

        let mut rel = Relationship::new(
            unbound.id,
            start.id,
            end.id,
            unbound.rel_type.clone(),
            unbound.properties.clone(),
        );
        rel.element_id = unbound
            .element_id
            .clone()
            .unwrap_or_else(|| unbound.id.to_string());
        rel.start_node_element_id = start.element_id.clone();
        rel.end_node_element_id = end.element_id.clone();

        self.nodes.push(next_node.clone());
        self.relationships.push(rel);
        self.prev = next_pos;
        Ok(())
    }

    fn build(self) -> DriverResult<Path> {
        Path::new(self.nodes, self.relationships)
    }
}

// ============================================================================
// Packer
// ============================================================================

/// Converts [`Value`]s into wire structures.
///
/// The date-time mode mirrors the unpacker: with the UTC patch enabled
/// the packer emits 'I'/'i', otherwise 'F'/'f'. Graph entities carry
/// element ids only in UTC (5.0+) mode.
#[derive(Debug, Clone, Copy)]
pub struct ValuePacker {
    utc_patch_enabled: bool,
}

impl ValuePacker {
    /// Create a packer for the given date-time mode.
    pub fn new(utc_patch_enabled: bool) -> Self {
        Self { utc_patch_enabled }
    }

    /// Convert a typed value into its wire form.
    pub fn pack(&self, value: &Value) -> DriverResult<PackStreamValue> {
        match value {
            Value::Null => Ok(PackStreamValue::Null),
            Value::Boolean(b) => Ok(PackStreamValue::Boolean(*b)),
            Value::Integer(i) => Ok(PackStreamValue::Integer(*i)),
            Value::Float(f) => Ok(PackStreamValue::Float(*f)),
            Value::Bytes(b) => Ok(PackStreamValue::Bytes(b.clone())),
            Value::String(s) => Ok(PackStreamValue::String(s.clone())),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.pack(item)?);
                }
                Ok(PackStreamValue::List(out))
            }
            Value::Map(map) => Ok(PackStreamValue::Map(self.pack_map(map)?)),
            Value::Node(n) => self.pack_node(n),
            Value::Relationship(r) => self.pack_relationship(r),
            Value::Path(p) => self.pack_path(p),
            Value::Point(p) => Ok(self.pack_point(p)),
            Value::Date(d) => {
                let days = d.num_days_from_ce() as i64 - EPOCH_CE_DAYS;
                Ok(structure(sig::DATE, vec![PackStreamValue::Integer(days)]))
            }
            Value::Time(t) => Ok(structure(
                sig::TIME,
                vec![
                    PackStreamValue::Integer(t.nanos_of_day()),
                    PackStreamValue::Integer(t.offset_seconds as i64),
                ],
            )),
            Value::LocalTime(t) => Ok(structure(
                sig::LOCAL_TIME,
                vec![PackStreamValue::Integer(nanos_of_day(t))],
            )),
            Value::LocalDateTime(dt) => {
                let utc = dt.and_utc();
                Ok(structure(
                    sig::LOCAL_DATE_TIME,
                    vec![
                        PackStreamValue::Integer(utc.timestamp()),
                        PackStreamValue::Integer(utc.timestamp_subsec_nanos() as i64),
                    ],
                ))
            }
            Value::DateTime(dt) => Ok(self.pack_datetime(dt)),
            Value::Duration(d) => Ok(structure(
                sig::DURATION,
                vec![
                    PackStreamValue::Integer(d.months),
                    PackStreamValue::Integer(d.days),
                    PackStreamValue::Integer(d.seconds),
                    PackStreamValue::Integer(d.nanoseconds as i64),
                ],
            )),
            Value::Unsupported(u) => Err(DriverError::unsupported(format!(
                "cannot send an unsupported value ({}: {})",
                u.kind, u.reason
            ))),
        }
    }

    fn pack_map(
        &self,
        map: &IndexMap<String, Value>,
    ) -> DriverResult<IndexMap<String, PackStreamValue>> {
        let mut out = IndexMap::with_capacity(map.len());
        for (k, v) in map {
            out.insert(k.clone(), self.pack(v)?);
        }
        Ok(out)
    }

    fn pack_node(&self, n: &Node) -> DriverResult<PackStreamValue> {
        let labels = n
            .labels
            .iter()
            .map(|l| PackStreamValue::String(l.clone()))
            .collect();
        let mut fields = vec![
            PackStreamValue::Integer(n.id),
            PackStreamValue::List(labels),
            PackStreamValue::Map(self.pack_map(&n.properties)?),
        ];
        if self.utc_patch_enabled {
            fields.push(PackStreamValue::String(n.element_id.clone()));
        }
        Ok(structure(sig::NODE, fields))
    }

    fn pack_relationship(&self, r: &Relationship) -> DriverResult<PackStreamValue> {
        let mut fields = vec![
            PackStreamValue::Integer(r.id),
            PackStreamValue::Integer(r.start_node_id),
            PackStreamValue::Integer(r.end_node_id),
            PackStreamValue::String(r.rel_type.clone()),
            PackStreamValue::Map(self.pack_map(&r.properties)?),
        ];
        if self.utc_patch_enabled {
            fields.push(PackStreamValue::String(r.element_id.clone()));
            fields.push(PackStreamValue::String(r.start_node_element_id.clone()));
            fields.push(PackStreamValue::String(r.end_node_element_id.clone()));
        }
        Ok(structure(sig::RELATIONSHIP, fields))
    }

    fn pack_path(&self, p: &Path) -> DriverResult<PackStreamValue> {
        // Re-derive the unique-node / unique-rel / sequence wire form.
        let mut unique_nodes: Vec<&Node> = Vec::new();
        let mut node_positions: Vec<i64> = Vec::with_capacity(p.nodes().len());
        for node in p.nodes() {
            let pos = match unique_nodes.iter().position(|n| n.id == node.id) {
                Some(i) => i as i64,
                None => {
                    unique_nodes.push(node);
                    (unique_nodes.len() - 1) as i64
                }
            };
            node_positions.push(pos);
        }

        let mut unique_rels: Vec<&Relationship> = Vec::new();
        let mut sequence: Vec<PackStreamValue> = Vec::with_capacity(p.len() * 2);
        for (i, rel) in p.relationships().iter().enumerate() {
            let pos = match unique_rels.iter().position(|r| r.id == rel.id) {
                Some(j) => j,
                None => {
                    unique_rels.push(rel);
                    unique_rels.len() - 1
                }
            };
            // 1-based; negative when traversed against its direction.
            let prev_id = p.nodes()[i].id;
            let signed = if rel.start_node_id == prev_id {
                (pos + 1) as i64
            } else {
                -((pos + 1) as i64)
            };
            sequence.push(PackStreamValue::Integer(signed));
            sequence.push(PackStreamValue::Integer(node_positions[i + 1]));
        }

        let nodes = unique_nodes
            .into_iter()
            .map(|n| self.pack_node(n))
            .collect::<DriverResult<Vec<_>>>()?;
        let rels = unique_rels
            .into_iter()
            .map(|r| {
                let mut fields = vec![
                    PackStreamValue::Integer(r.id),
                    PackStreamValue::String(r.rel_type.clone()),
                    PackStreamValue::Map(self.pack_map(&r.properties)?),
                ];
                if self.utc_patch_enabled {
                    fields.push(PackStreamValue::String(r.element_id.clone()));
                }
                Ok(structure(sig::UNBOUND_RELATIONSHIP, fields))
            })
            .collect::<DriverResult<Vec<_>>>()?;

        Ok(structure(
            sig::PATH,
            vec![
                PackStreamValue::List(nodes),
                PackStreamValue::List(rels),
                PackStreamValue::List(sequence),
            ],
        ))
    }

    fn pack_point(&self, p: &Point) -> PackStreamValue {
        match p.z {
            Some(z) => structure(
                sig::POINT_3D,
                vec![
                    PackStreamValue::Integer(p.srid as i64),
                    PackStreamValue::Float(p.x),
                    PackStreamValue::Float(p.y),
                    PackStreamValue::Float(z),
                ],
            ),
            None => structure(
                sig::POINT_2D,
                vec![
                    PackStreamValue::Integer(p.srid as i64),
                    PackStreamValue::Float(p.x),
                    PackStreamValue::Float(p.y),
                ],
            ),
        }
    }

    fn pack_datetime(&self, dt: &ZonedDateTime) -> PackStreamValue {
        let (epoch_second, nano) = if self.utc_patch_enabled {
            (
                dt.datetime.timestamp(),
                dt.datetime.timestamp_subsec_nanos() as i64,
            )
        } else {
            // Legacy baseline: write the local wall clock as if it were
            // a UTC timestamp.
            let local = dt.datetime.naive_local().and_utc();
            (local.timestamp(), local.timestamp_subsec_nanos() as i64)
        };

        let (tag, zone_field) = match dt.zone {
            Zone::Offset(secs) => (
                if self.utc_patch_enabled {
                    sig::DATE_TIME_UTC_OFFSET
                } else {
                    sig::DATE_TIME_LEGACY_OFFSET
                },
                PackStreamValue::Integer(secs as i64),
            ),
            Zone::Named(tz) => (
                if self.utc_patch_enabled {
                    sig::DATE_TIME_UTC_ZONE_ID
                } else {
                    sig::DATE_TIME_LEGACY_ZONE_ID
                },
                PackStreamValue::String(tz.name().to_string()),
            ),
        };

        structure(
            tag,
            vec![
                PackStreamValue::Integer(epoch_second),
                PackStreamValue::Integer(nano),
                zone_field,
            ],
        )
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn structure(tag: u8, fields: Vec<PackStreamValue>) -> PackStreamValue {
    PackStreamValue::Structure(PackStreamStructure::new(tag, fields))
}

fn ensure_field_count(
    name: &str,
    expected: &[usize],
    s: &PackStreamStructure,
) -> DriverResult<()> {
    if expected.contains(&s.fields.len()) {
        Ok(())
    } else {
        Err(DriverError::protocol(format!(
            "serialized {name} structures should have {} fields, received {} structure has {} fields",
            expected
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(" or "),
            name,
            s.fields.len()
        )))
    }
}

fn expect_struct<'a>(
    value: &'a PackStreamValue,
    tag: u8,
    name: &str,
) -> DriverResult<&'a PackStreamStructure> {
    let s = value
        .as_structure()
        .ok_or_else(|| DriverError::protocol(format!("expected a {name} structure")))?;
    if s.tag != tag {
        return Err(DriverError::protocol(format!(
            "expected a {name} (signature 0x{tag:02X}), received signature 0x{:02X}",
            s.tag
        )));
    }
    Ok(s)
}

fn int_field(s: &PackStreamStructure, index: usize, name: &str) -> DriverResult<i64> {
    s.fields
        .get(index)
        .and_then(|v| v.as_int())
        .ok_or_else(|| DriverError::protocol(format!("{name} must be an integer")))
}

fn float_field(s: &PackStreamStructure, index: usize, name: &str) -> DriverResult<f64> {
    s.fields
        .get(index)
        .and_then(|v| v.as_float())
        .ok_or_else(|| DriverError::protocol(format!("{name} must be a float")))
}

fn srid_i32(value: i64) -> DriverResult<i32> {
    i32::try_from(value)
        .map_err(|_| DriverError::protocol(format!("Point srid {value} out of range")))
}

fn nano_u32(value: i64) -> DriverResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|&n| n < 1_000_000_000)
        .ok_or_else(|| DriverError::protocol(format!("nano adjustment {value} out of range")))
}

fn time_from_nanos_of_day(nanos: i64) -> DriverResult<NaiveTime> {
    if !(0..86_400_000_000_000).contains(&nanos) {
        return Err(DriverError::protocol(format!(
            "nanos of day {nanos} out of range"
        )));
    }
    let secs = (nanos / 1_000_000_000) as u32;
    let nano = (nanos % 1_000_000_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nano)
        .ok_or_else(|| DriverError::protocol(format!("nanos of day {nanos} out of range")))
}

fn nanos_of_day(t: &NaiveTime) -> i64 {
    t.num_seconds_from_midnight() as i64 * 1_000_000_000 + t.nanosecond() as i64
}

fn fixed_offset(seconds: i32) -> DriverResult<FixedOffset> {
    FixedOffset::east_opt(seconds)
        .ok_or_else(|| DriverError::protocol(format!("UTC offset {seconds}s out of range")))
}
