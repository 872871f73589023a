//! Bolt protocol request messages.
//!
//! Request messages are sent from the client to the server.

use std::time::Duration;

use indexmap::IndexMap;

use super::tag;
use crate::bolt::packstream::{PackStreamStructure, PackStreamValue};

/// Access mode hint carried in BEGIN/RUN metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Read-write access (default)
    #[default]
    Write,
    /// Read-only access
    Read,
}

impl AccessMode {
    /// Wire representation used in metadata maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "r",
            AccessMode::Write => "w",
        }
    }
}

/// Authentication token embedded in the HELLO extra map.
#[derive(Debug, Clone)]
pub struct AuthToken {
    /// Authentication scheme ("basic", "bearer", "none")
    pub scheme: String,
    /// Principal (username)
    pub principal: Option<String>,
    /// Credentials (password or token)
    pub credentials: Option<String>,
    /// Realm
    pub realm: Option<String>,
}

impl AuthToken {
    /// Username/password authentication.
    pub fn basic(principal: &str, credentials: &str) -> Self {
        Self {
            scheme: "basic".to_string(),
            principal: Some(principal.to_string()),
            credentials: Some(credentials.to_string()),
            realm: None,
        }
    }

    /// Bearer token authentication.
    pub fn bearer(token: &str) -> Self {
        Self {
            scheme: "bearer".to_string(),
            principal: None,
            credentials: Some(token.to_string()),
            realm: None,
        }
    }

    /// No authentication.
    pub fn none() -> Self {
        Self {
            scheme: "none".to_string(),
            principal: None,
            credentials: None,
            realm: None,
        }
    }

    /// Serialise into the HELLO extra entries.
    pub fn to_map(&self) -> IndexMap<String, PackStreamValue> {
        let mut map = IndexMap::new();
        map.insert(
            "scheme".to_string(),
            PackStreamValue::String(self.scheme.clone()),
        );
        if let Some(ref p) = self.principal {
            map.insert("principal".to_string(), PackStreamValue::String(p.clone()));
        }
        if let Some(ref c) = self.credentials {
            map.insert(
                "credentials".to_string(),
                PackStreamValue::String(c.clone()),
            );
        }
        if let Some(ref r) = self.realm {
            map.insert("realm".to_string(), PackStreamValue::String(r.clone()));
        }
        map
    }
}

/// All Bolt request messages.
#[derive(Debug, Clone)]
pub enum BoltRequest {
    /// HELLO - initialize and authenticate the connection
    Hello(HelloMessage),
    /// GOODBYE - close the connection gracefully
    Goodbye,
    /// RESET - return the connection to a clean state
    Reset,
    /// RUN - execute a query
    Run(RunMessage),
    /// PULL - fetch records from the open stream
    Pull(PullMessage),
    /// DISCARD - release the rest of the open stream
    Discard(DiscardMessage),
    /// BEGIN - open an explicit transaction
    Begin(BeginMessage),
    /// COMMIT - commit the explicit transaction
    Commit,
    /// ROLLBACK - roll back the explicit transaction
    Rollback,
}

impl BoltRequest {
    /// Structure signature for this message.
    pub fn tag(&self) -> u8 {
        match self {
            BoltRequest::Hello(_) => tag::HELLO,
            BoltRequest::Goodbye => tag::GOODBYE,
            BoltRequest::Reset => tag::RESET,
            BoltRequest::Run(_) => tag::RUN,
            BoltRequest::Pull(_) => tag::PULL,
            BoltRequest::Discard(_) => tag::DISCARD,
            BoltRequest::Begin(_) => tag::BEGIN,
            BoltRequest::Commit => tag::COMMIT,
            BoltRequest::Rollback => tag::ROLLBACK,
        }
    }

    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltRequest::Hello(_) => "HELLO",
            BoltRequest::Goodbye => "GOODBYE",
            BoltRequest::Reset => "RESET",
            BoltRequest::Run(_) => "RUN",
            BoltRequest::Pull(_) => "PULL",
            BoltRequest::Discard(_) => "DISCARD",
            BoltRequest::Begin(_) => "BEGIN",
            BoltRequest::Commit => "COMMIT",
            BoltRequest::Rollback => "ROLLBACK",
        }
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltRequest::Hello(msg) => msg.to_structure(),
            BoltRequest::Goodbye => PackStreamStructure::new(tag::GOODBYE, vec![]),
            BoltRequest::Reset => PackStreamStructure::new(tag::RESET, vec![]),
            BoltRequest::Run(msg) => msg.to_structure(),
            BoltRequest::Pull(msg) => msg.to_structure(),
            BoltRequest::Discard(msg) => msg.to_structure(),
            BoltRequest::Begin(msg) => msg.to_structure(),
            BoltRequest::Commit => PackStreamStructure::new(tag::COMMIT, vec![]),
            BoltRequest::Rollback => PackStreamStructure::new(tag::ROLLBACK, vec![]),
        }
    }
}

/// HELLO message - initialize connection.
#[derive(Debug, Clone)]
pub struct HelloMessage {
    /// User agent string
    pub user_agent: String,
    /// Authentication token
    pub auth: AuthToken,
    /// Additional extra entries
    pub extra: IndexMap<String, PackStreamValue>,
}

impl HelloMessage {
    /// Create a new HELLO message.
    pub fn new(user_agent: &str, auth: AuthToken) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            auth,
            extra: IndexMap::new(),
        }
    }

    /// Add an extra entry to the HELLO map.
    pub fn with_extra(mut self, key: &str, value: PackStreamValue) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut extra = IndexMap::new();
        extra.insert(
            "user_agent".to_string(),
            PackStreamValue::String(self.user_agent.clone()),
        );
        for (k, v) in self.auth.to_map() {
            extra.insert(k, v);
        }
        for (k, v) in &self.extra {
            extra.insert(k.clone(), v.clone());
        }
        PackStreamStructure::new(tag::HELLO, vec![PackStreamValue::Map(extra)])
    }
}

/// RUN message - execute a query.
#[derive(Debug, Clone)]
pub struct RunMessage {
    /// Cypher query string
    pub query: String,
    /// Query parameters
    pub parameters: IndexMap<String, PackStreamValue>,
    /// Extra metadata (db, mode, tx_timeout, ...)
    pub extra: IndexMap<String, PackStreamValue>,
}

impl RunMessage {
    /// Create a new RUN message.
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            parameters: IndexMap::new(),
            extra: IndexMap::new(),
        }
    }

    /// Set query parameters.
    pub fn with_parameters(mut self, params: IndexMap<String, PackStreamValue>) -> Self {
        self.parameters = params;
        self
    }

    /// Set the target database.
    pub fn with_database(mut self, db: &str) -> Self {
        self.extra
            .insert("db".to_string(), PackStreamValue::String(db.to_string()));
        self
    }

    /// Set the access mode hint.
    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        if mode == AccessMode::Read {
            self.extra
                .insert("mode".to_string(), PackStreamValue::String("r".into()));
        }
        self
    }

    /// Set the server-side transaction timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.extra.insert(
            "tx_timeout".to_string(),
            PackStreamValue::Integer(timeout.as_millis() as i64),
        );
        self
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            tag::RUN,
            vec![
                PackStreamValue::String(self.query.clone()),
                PackStreamValue::Map(self.parameters.clone()),
                PackStreamValue::Map(self.extra.clone()),
            ],
        )
    }
}

/// PULL message - fetch records from the open stream.
#[derive(Debug, Clone)]
pub struct PullMessage {
    /// Number of records to pull (-1 for all)
    pub n: i64,
    /// Statement id within the transaction, when the server assigned one
    pub qid: Option<i64>,
}

impl PullMessage {
    /// PULL everything left in the stream.
    pub fn all() -> Self {
        Self { n: -1, qid: None }
    }

    /// PULL up to `n` records.
    pub fn with_n(n: i64) -> Self {
        Self { n, qid: None }
    }

    /// Address a specific statement in the transaction.
    pub fn with_qid(mut self, qid: i64) -> Self {
        self.qid = Some(qid);
        self
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut extra = IndexMap::new();
        extra.insert("n".to_string(), PackStreamValue::Integer(self.n));
        if let Some(qid) = self.qid {
            extra.insert("qid".to_string(), PackStreamValue::Integer(qid));
        }
        PackStreamStructure::new(tag::PULL, vec![PackStreamValue::Map(extra)])
    }
}

/// DISCARD message - release the rest of the open stream.
#[derive(Debug, Clone)]
pub struct DiscardMessage {
    /// Number of records to discard (-1 for all)
    pub n: i64,
    /// Statement id within the transaction
    pub qid: Option<i64>,
}

impl DiscardMessage {
    /// DISCARD everything left in the stream.
    pub fn all() -> Self {
        Self { n: -1, qid: None }
    }

    /// Address a specific statement in the transaction.
    pub fn with_qid(mut self, qid: i64) -> Self {
        self.qid = Some(qid);
        self
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut extra = IndexMap::new();
        extra.insert("n".to_string(), PackStreamValue::Integer(self.n));
        if let Some(qid) = self.qid {
            extra.insert("qid".to_string(), PackStreamValue::Integer(qid));
        }
        PackStreamStructure::new(tag::DISCARD, vec![PackStreamValue::Map(extra)])
    }
}

/// BEGIN message - open an explicit transaction.
#[derive(Debug, Clone, Default)]
pub struct BeginMessage {
    /// Server-side transaction timeout
    pub tx_timeout: Option<Duration>,
    /// Access mode
    pub mode: AccessMode,
    /// Target database
    pub database: Option<String>,
    /// Application metadata attached to the transaction
    pub tx_metadata: IndexMap<String, PackStreamValue>,
}

impl BeginMessage {
    /// Create an empty BEGIN message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server-side transaction timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = Some(timeout);
        self
    }

    /// Set the access mode.
    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the target database.
    pub fn with_database(mut self, db: &str) -> Self {
        self.database = Some(db.to_string());
        self
    }

    /// Attach transaction metadata.
    pub fn with_metadata(mut self, metadata: IndexMap<String, PackStreamValue>) -> Self {
        self.tx_metadata = metadata;
        self
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut extra = IndexMap::new();
        if let Some(timeout) = self.tx_timeout {
            extra.insert(
                "tx_timeout".to_string(),
                PackStreamValue::Integer(timeout.as_millis() as i64),
            );
        }
        if self.mode == AccessMode::Read {
            extra.insert("mode".to_string(), PackStreamValue::String("r".into()));
        }
        if let Some(ref db) = self.database {
            extra.insert("db".to_string(), PackStreamValue::String(db.clone()));
        }
        if !self.tx_metadata.is_empty() {
            extra.insert(
                "tx_metadata".to_string(),
                PackStreamValue::Map(self.tx_metadata.clone()),
            );
        }
        PackStreamStructure::new(tag::BEGIN, vec![PackStreamValue::Map(extra)])
    }
}

/// Parse a request back from a structure. Used by scripted-server tests
/// to assert what the client put on the wire.
pub fn request_tag_name(tag_byte: u8) -> Option<&'static str> {
    match tag_byte {
        tag::HELLO => Some("HELLO"),
        tag::GOODBYE => Some("GOODBYE"),
        tag::RESET => Some("RESET"),
        tag::RUN => Some("RUN"),
        tag::PULL => Some("PULL"),
        tag::DISCARD => Some("DISCARD"),
        tag::BEGIN => Some("BEGIN"),
        tag::COMMIT => Some("COMMIT"),
        tag::ROLLBACK => Some("ROLLBACK"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_structure_carries_auth() {
        let msg = HelloMessage::new("graphbolt/0.1", AuthToken::basic("user", "secret"));
        let s = msg.to_structure();
        assert_eq!(s.tag, tag::HELLO);

        let extra = s.fields[0].as_map().unwrap();
        assert_eq!(extra["user_agent"].as_str(), Some("graphbolt/0.1"));
        assert_eq!(extra["scheme"].as_str(), Some("basic"));
        assert_eq!(extra["principal"].as_str(), Some("user"));
        assert_eq!(extra["credentials"].as_str(), Some("secret"));
    }

    #[test]
    fn auth_token_variants() {
        assert_eq!(AuthToken::basic("u", "p").scheme, "basic");
        assert_eq!(AuthToken::bearer("tok").scheme, "bearer");
        assert_eq!(AuthToken::none().scheme, "none");
        assert!(AuthToken::none().to_map().get("principal").is_none());
    }

    #[test]
    fn run_structure_layout() {
        let mut params = IndexMap::new();
        params.insert("name".to_string(), PackStreamValue::String("Alice".into()));

        let msg = RunMessage::new("MATCH (n:Person {name: $name}) RETURN n")
            .with_parameters(params)
            .with_database("graph")
            .with_mode(AccessMode::Read);

        let s = msg.to_structure();
        assert_eq!(s.tag, tag::RUN);
        assert_eq!(s.fields.len(), 3);
        assert_eq!(
            s.fields[0].as_str(),
            Some("MATCH (n:Person {name: $name}) RETURN n")
        );
        assert!(s.fields[1].as_map().unwrap().contains_key("name"));
        let extra = s.fields[2].as_map().unwrap();
        assert_eq!(extra["db"].as_str(), Some("graph"));
        assert_eq!(extra["mode"].as_str(), Some("r"));
    }

    #[test]
    fn pull_and_discard_carry_n_and_qid() {
        let s = PullMessage::all().to_structure();
        assert_eq!(s.tag, tag::PULL);
        assert_eq!(s.fields[0].as_map().unwrap()["n"].as_int(), Some(-1));

        let s = PullMessage::with_n(100).with_qid(3).to_structure();
        let extra = s.fields[0].as_map().unwrap();
        assert_eq!(extra["n"].as_int(), Some(100));
        assert_eq!(extra["qid"].as_int(), Some(3));

        let s = DiscardMessage::all().with_qid(1).to_structure();
        assert_eq!(s.tag, tag::DISCARD);
        let extra = s.fields[0].as_map().unwrap();
        assert_eq!(extra["n"].as_int(), Some(-1));
        assert_eq!(extra["qid"].as_int(), Some(1));
    }

    #[test]
    fn begin_structure_layout() {
        let msg = BeginMessage::new()
            .with_database("graph")
            .with_mode(AccessMode::Read)
            .with_timeout(Duration::from_secs(30));

        let s = msg.to_structure();
        assert_eq!(s.tag, tag::BEGIN);
        let extra = s.fields[0].as_map().unwrap();
        assert_eq!(extra["db"].as_str(), Some("graph"));
        assert_eq!(extra["mode"].as_str(), Some("r"));
        assert_eq!(extra["tx_timeout"].as_int(), Some(30_000));
    }

    #[test]
    fn write_mode_is_implicit() {
        let s = BeginMessage::new().to_structure();
        assert!(s.fields[0].as_map().unwrap().get("mode").is_none());
    }

    #[test]
    fn fieldless_requests() {
        for (req, expected) in [
            (BoltRequest::Goodbye, tag::GOODBYE),
            (BoltRequest::Reset, tag::RESET),
            (BoltRequest::Commit, tag::COMMIT),
            (BoltRequest::Rollback, tag::ROLLBACK),
        ] {
            let s = req.to_structure();
            assert_eq!(s.tag, expected);
            assert!(s.is_empty());
        }
    }

    #[test]
    fn request_names() {
        assert_eq!(BoltRequest::Goodbye.name(), "GOODBYE");
        assert_eq!(BoltRequest::Run(RunMessage::new("")).name(), "RUN");
        assert_eq!(request_tag_name(tag::BEGIN), Some("BEGIN"));
        assert_eq!(request_tag_name(0x42), None);
    }
}
