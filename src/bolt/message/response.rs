//! Bolt protocol response messages.
//!
//! Response messages are sent from the server to the client.

use indexmap::IndexMap;

use super::tag;
use crate::bolt::packstream::{PackStreamError, PackStreamStructure, PackStreamValue};

/// All Bolt response messages.
#[derive(Debug, Clone)]
pub enum BoltResponse {
    /// SUCCESS - the request completed
    Success(SuccessMessage),
    /// RECORD - one row of an open stream
    Record(RecordMessage),
    /// FAILURE - the request failed
    Failure(FailureMessage),
    /// IGNORED - the request was skipped (connection in a failed state)
    Ignored,
}

impl BoltResponse {
    /// Structure signature for this message.
    pub fn tag(&self) -> u8 {
        match self {
            BoltResponse::Success(_) => tag::SUCCESS,
            BoltResponse::Record(_) => tag::RECORD,
            BoltResponse::Failure(_) => tag::FAILURE,
            BoltResponse::Ignored => tag::IGNORED,
        }
    }

    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Failure(_) => "FAILURE",
            BoltResponse::Ignored => "IGNORED",
        }
    }

    /// Whether this is a SUCCESS.
    pub fn is_success(&self) -> bool {
        matches!(self, BoltResponse::Success(_))
    }

    /// Whether this is a FAILURE.
    pub fn is_failure(&self) -> bool {
        matches!(self, BoltResponse::Failure(_))
    }

    /// Whether this is a RECORD.
    pub fn is_record(&self) -> bool {
        matches!(self, BoltResponse::Record(_))
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltResponse::Success(msg) => msg.to_structure(),
            BoltResponse::Record(msg) => msg.to_structure(),
            BoltResponse::Failure(msg) => msg.to_structure(),
            BoltResponse::Ignored => PackStreamStructure::new(tag::IGNORED, vec![]),
        }
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.tag {
            tag::SUCCESS => Ok(BoltResponse::Success(SuccessMessage::from_structure(s)?)),
            tag::RECORD => Ok(BoltResponse::Record(RecordMessage::from_structure(s)?)),
            tag::FAILURE => Ok(BoltResponse::Failure(FailureMessage::from_structure(s)?)),
            tag::IGNORED => Ok(BoltResponse::Ignored),
            _ => Err(PackStreamError::InvalidStructure(format!(
                "unknown response message tag: 0x{:02X}",
                s.tag
            ))),
        }
    }
}

/// SUCCESS message and its metadata map.
#[derive(Debug, Clone, Default)]
pub struct SuccessMessage {
    /// Response metadata
    pub metadata: IndexMap<String, PackStreamValue>,
}

impl SuccessMessage {
    /// Create a SUCCESS with empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a SUCCESS with the given metadata.
    pub fn with_metadata(metadata: IndexMap<String, PackStreamValue>) -> Self {
        Self { metadata }
    }

    /// Add a metadata entry.
    pub fn add(&mut self, key: &str, value: PackStreamValue) {
        self.metadata.insert(key.to_string(), value);
    }

    /// Look up a metadata entry.
    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.metadata.get(key)
    }

    /// Server agent string from a HELLO success.
    pub fn server(&self) -> Option<&str> {
        self.metadata.get("server").and_then(|v| v.as_str())
    }

    /// Connection id from a HELLO success.
    pub fn connection_id(&self) -> Option<&str> {
        self.metadata.get("connection_id").and_then(|v| v.as_str())
    }

    /// Declared field names from a RUN success.
    pub fn fields(&self) -> Option<Vec<String>> {
        self.metadata.get("fields").and_then(|v| {
            v.as_list().map(|list| {
                list.iter()
                    .filter_map(|item| item.as_str().map(|s| s.to_string()))
                    .collect()
            })
        })
    }

    /// Statement id from a RUN success inside a transaction.
    pub fn qid(&self) -> Option<i64> {
        self.metadata.get("qid").and_then(|v| v.as_int())
    }

    /// Whether a PULL/DISCARD success says the stream has more records.
    pub fn has_more(&self) -> bool {
        self.metadata
            .get("has_more")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Bookmark from a terminal summary.
    pub fn bookmark(&self) -> Option<&str> {
        self.metadata.get("bookmark").and_then(|v| v.as_str())
    }

    /// Database name from a summary.
    pub fn db(&self) -> Option<&str> {
        self.metadata.get("db").and_then(|v| v.as_str())
    }

    /// Update counters from a terminal summary.
    pub fn stats(&self) -> Option<&IndexMap<String, PackStreamValue>> {
        self.metadata.get("stats").and_then(|v| v.as_map())
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            tag::SUCCESS,
            vec![PackStreamValue::Map(self.metadata.clone())],
        )
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.tag != tag::SUCCESS {
            return Err(PackStreamError::InvalidStructure(
                "expected SUCCESS tag".to_string(),
            ));
        }
        let metadata = s
            .fields
            .first()
            .and_then(|v| v.as_map())
            .cloned()
            .unwrap_or_default();
        Ok(Self { metadata })
    }
}

/// RECORD message - one row of field values.
#[derive(Debug, Clone)]
pub struct RecordMessage {
    /// Field values in declared-field order
    pub fields: Vec<PackStreamValue>,
}

impl RecordMessage {
    /// Create a new RECORD.
    pub fn new(fields: Vec<PackStreamValue>) -> Self {
        Self { fields }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            tag::RECORD,
            vec![PackStreamValue::List(self.fields.clone())],
        )
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.tag != tag::RECORD {
            return Err(PackStreamError::InvalidStructure(
                "expected RECORD tag".to_string(),
            ));
        }
        let fields = match s.fields.first() {
            Some(PackStreamValue::List(list)) => list.clone(),
            Some(other) => {
                return Err(PackStreamError::InvalidStructure(format!(
                    "RECORD fields must be a list, got {}",
                    other.type_name()
                )))
            }
            None => Vec::new(),
        };
        Ok(Self { fields })
    }
}

/// FAILURE message - error code and human-readable message.
#[derive(Debug, Clone)]
pub struct FailureMessage {
    /// Server error code, "Neo.<class>.<category>.<title>"
    pub code: String,
    /// Error message
    pub message: String,
}

impl FailureMessage {
    /// Create a new FAILURE.
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Error classification: the segment after "Neo." in the code.
    pub fn classification(&self) -> &str {
        self.code.split('.').nth(1).unwrap_or("Unknown")
    }

    /// Whether this is a client error.
    pub fn is_client_error(&self) -> bool {
        self.code.starts_with("Neo.ClientError")
    }

    /// Whether this is a database error.
    pub fn is_database_error(&self) -> bool {
        self.code.starts_with("Neo.DatabaseError")
    }

    /// Whether this is a transient error (a retry may succeed).
    pub fn is_transient(&self) -> bool {
        self.code.starts_with("Neo.TransientError")
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut map = IndexMap::new();
        map.insert(
            "code".to_string(),
            PackStreamValue::String(self.code.clone()),
        );
        map.insert(
            "message".to_string(),
            PackStreamValue::String(self.message.clone()),
        );
        PackStreamStructure::new(tag::FAILURE, vec![PackStreamValue::Map(map)])
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.tag != tag::FAILURE {
            return Err(PackStreamError::InvalidStructure(
                "expected FAILURE tag".to_string(),
            ));
        }
        let map = s
            .fields
            .first()
            .and_then(|v| v.as_map())
            .ok_or_else(|| {
                PackStreamError::InvalidStructure("FAILURE requires a metadata map".to_string())
            })?;

        let code = map
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("Neo.DatabaseError.General.UnknownError")
            .to_string();
        let message = map
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("An unknown error occurred")
            .to_string();

        Ok(Self { code, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success_with(key: &str, value: PackStreamValue) -> SuccessMessage {
        let mut msg = SuccessMessage::new();
        msg.add(key, value);
        msg
    }

    #[test]
    fn success_roundtrip() {
        let msg = success_with("server", PackStreamValue::String("GraphServer/5.0".into()));
        let s = msg.to_structure();
        assert_eq!(s.tag, tag::SUCCESS);

        let parsed = SuccessMessage::from_structure(&s).unwrap();
        assert_eq!(parsed.server(), Some("GraphServer/5.0"));
    }

    #[test]
    fn success_fields_accessor() {
        let msg = success_with(
            "fields",
            PackStreamValue::List(vec![
                PackStreamValue::String("name".into()),
                PackStreamValue::String("age".into()),
            ]),
        );
        assert_eq!(msg.fields(), Some(vec!["name".into(), "age".into()]));
        assert_eq!(SuccessMessage::new().fields(), None);
    }

    #[test]
    fn success_has_more() {
        let msg = success_with("has_more", PackStreamValue::Boolean(true));
        assert!(msg.has_more());
        assert!(!SuccessMessage::new().has_more());
    }

    #[test]
    fn record_roundtrip() {
        let msg = RecordMessage::new(vec![
            PackStreamValue::Integer(1),
            PackStreamValue::String("x".into()),
        ]);
        let s = msg.to_structure();
        assert_eq!(s.tag, tag::RECORD);

        let parsed = RecordMessage::from_structure(&s).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.fields[0].as_int(), Some(1));
    }

    #[test]
    fn record_rejects_non_list_payload() {
        let s = PackStreamStructure::new(tag::RECORD, vec![PackStreamValue::Integer(1)]);
        assert!(RecordMessage::from_structure(&s).is_err());
    }

    #[test]
    fn failure_roundtrip_and_classification() {
        let msg = FailureMessage::new("Neo.ClientError.Statement.SyntaxError", "bad query");
        let parsed = FailureMessage::from_structure(&msg.to_structure()).unwrap();
        assert_eq!(parsed.code, "Neo.ClientError.Statement.SyntaxError");
        assert_eq!(parsed.message, "bad query");
        assert!(parsed.is_client_error());
        assert!(!parsed.is_transient());
        assert_eq!(parsed.classification(), "ClientError");

        let transient = FailureMessage::new(
            "Neo.TransientError.Transaction.DeadlockDetected",
            "deadlock",
        );
        assert!(transient.is_transient());

        let db = FailureMessage::new("Neo.DatabaseError.General.UnknownError", "boom");
        assert!(db.is_database_error());
    }

    #[test]
    fn response_from_structure_dispatch() {
        let ignored = PackStreamStructure::new(tag::IGNORED, vec![]);
        assert!(matches!(
            BoltResponse::from_structure(&ignored).unwrap(),
            BoltResponse::Ignored
        ));

        let unknown = PackStreamStructure::new(0x42, vec![]);
        assert!(BoltResponse::from_structure(&unknown).is_err());
    }

    #[test]
    fn response_predicates() {
        let success = BoltResponse::Success(SuccessMessage::new());
        assert!(success.is_success());
        assert!(!success.is_failure());
        assert_eq!(success.name(), "SUCCESS");
        assert_eq!(BoltResponse::Ignored.name(), "IGNORED");
        assert!(BoltResponse::Record(RecordMessage::new(vec![])).is_record());
    }
}
