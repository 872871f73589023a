//! The client-facing statement API.
//!
//! A [`Statement`] executes query text on an authenticated connection
//! in auto-commit mode, optionally translating SQL to Cypher first.
//! Results come back as a [`ResultSet`]: a forward-only row cursor with
//! typed getters and the was-null flag.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::bolt::message::RunMessage;
use crate::translator::SqlTranslator;

use super::bolt::BoltClient;
use super::error::{DriverError, DriverResult};
use super::record::{coerce, Record};
use super::stream::{RecordStream, ResultSummary, DEFAULT_FETCH_SIZE};
use super::transaction::Transaction;
use super::unpacker::ValuePacker;
use super::value::Value;

/// Resolves a column reference (index or name) against a record.
pub trait ColumnIndex {
    /// The value index for this reference, or a conversion error.
    fn resolve(&self, record: &Record) -> DriverResult<usize>;
}

impl ColumnIndex for usize {
    fn resolve(&self, record: &Record) -> DriverResult<usize> {
        if *self < record.len() {
            Ok(*self)
        } else {
            Err(DriverError::type_conversion(format!(
                "column index {self} out of range (record has {} fields)",
                record.len()
            )))
        }
    }
}

impl ColumnIndex for &str {
    fn resolve(&self, record: &Record) -> DriverResult<usize> {
        record
            .index_of(self)
            .ok_or_else(|| DriverError::type_conversion(format!("no column named '{self}'")))
    }
}

/// Executes queries on one connection.
pub struct Statement<S> {
    client: BoltClient<S>,
    fetch_size: i64,
    max_rows: usize,
    query_timeout: Option<Duration>,
    database: Option<String>,
    translator: Option<Arc<SqlTranslator>>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Statement<S> {
    /// Wrap an authenticated client.
    pub fn new(client: BoltClient<S>) -> Self {
        Self {
            client,
            fetch_size: DEFAULT_FETCH_SIZE,
            max_rows: 0,
            query_timeout: None,
            database: None,
            translator: None,
        }
    }

    /// Records fetched per PULL.
    pub fn with_fetch_size(mut self, fetch_size: i64) -> Self {
        self.fetch_size = if fetch_size > 0 {
            fetch_size
        } else {
            DEFAULT_FETCH_SIZE
        };
        self
    }

    /// Cap on the total number of rows a query yields (0 = unbounded).
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Client-side deadline per query.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Target database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Translate statement text from SQL to Cypher before execution.
    /// The force-cypher pragma bypasses translation per statement.
    pub fn with_translator(mut self, translator: Arc<SqlTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &BoltClient<S> {
        &self.client
    }

    /// Execute a query and stream its rows.
    pub async fn execute_query(
        &mut self,
        text: &str,
        parameters: IndexMap<String, Value>,
    ) -> DriverResult<ResultSet<'_, S>> {
        let cypher = self.prepare_text(text)?;
        let message = self.build_run(&cypher, parameters)?;

        let run_summary = match self.query_timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.client.run(message)).await {
                    Ok(result) => result?,
                    Err(_) => {
                        // Deadline passed mid-exchange: interrupt the
                        // server and put the connection back together.
                        self.client.cancel().await?;
                        return Err(DriverError::timeout(format!(
                            "query exceeded the {deadline:?} deadline"
                        )));
                    }
                }
            }
            None => self.client.run(message).await?,
        };

        let stream = RecordStream::open(
            &mut self.client,
            &run_summary,
            self.fetch_size,
            self.max_rows,
        );
        Ok(ResultSet::new(stream))
    }

    /// Execute a statement for its side effects; the server-side stream
    /// is discarded and the summary counters returned.
    pub async fn execute(
        &mut self,
        text: &str,
        parameters: IndexMap<String, Value>,
    ) -> DriverResult<ResultSummary> {
        let mut result = self.execute_query(text, parameters).await?;
        let summary = result.stream.consume().await?;
        Ok(summary)
    }

    /// Open an explicit transaction.
    pub async fn begin(&mut self) -> DriverResult<Transaction<'_, S>> {
        Transaction::begin(&mut self.client, self.database.clone(), self.fetch_size).await
    }

    /// Close the connection.
    pub async fn close(mut self) -> DriverResult<()> {
        self.client.goodbye().await
    }

    fn prepare_text(&self, text: &str) -> DriverResult<String> {
        match &self.translator {
            Some(translator) => {
                if SqlTranslator::force_cypher(text) {
                    debug!("force-cypher pragma present, skipping translation");
                    Ok(text.to_string())
                } else {
                    Ok(translator.translate(text)?)
                }
            }
            None => Ok(text.to_string()),
        }
    }

    fn build_run(
        &self,
        cypher: &str,
        parameters: IndexMap<String, Value>,
    ) -> DriverResult<RunMessage> {
        let packer = ValuePacker::new(self.client.utc_patch_enabled());
        let mut packed = IndexMap::with_capacity(parameters.len());
        for (key, value) in parameters {
            packed.insert(key, packer.pack(&value)?);
        }

        let mut message = RunMessage::new(cypher).with_parameters(packed);
        if let Some(ref db) = self.database {
            message = message.with_database(db);
        }
        Ok(message)
    }
}

impl<S> std::fmt::Debug for Statement<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("fetch_size", &self.fetch_size)
            .field("max_rows", &self.max_rows)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

/// A forward-only row cursor over a record stream.
///
/// Typed getters follow the coercion table; Null coerces to each
/// getter's default and raises the was-null flag, which stays valid
/// until the next getter, row advance or close.
pub struct ResultSet<'c, S> {
    stream: RecordStream<'c, S>,
    row: Option<Record>,
    was_null: Option<bool>,
    closed: bool,
}

impl<'c, S: AsyncRead + AsyncWrite + Unpin> ResultSet<'c, S> {
    fn new(stream: RecordStream<'c, S>) -> Self {
        Self {
            stream,
            row: None,
            was_null: None,
            closed: false,
        }
    }

    /// Declared field names.
    pub fn keys(&self) -> &[String] {
        self.stream.keys()
    }

    /// Advance to the next row. Returns false at the end of the stream.
    pub async fn advance(&mut self) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::type_conversion("result set is closed"));
        }
        self.was_null = None;
        self.row = self.stream.next().await?;
        Ok(self.row.is_some())
    }

    /// The current row, once [`ResultSet::advance`] returned true.
    pub fn record(&self) -> Option<&Record> {
        self.row.as_ref()
    }

    /// Whether the last getter read a Null. Only valid immediately
    /// after a getter on the current row.
    pub fn was_null(&self) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::type_conversion("result set is closed"));
        }
        self.was_null
            .ok_or_else(|| DriverError::type_conversion("no column has been read on this row"))
    }

    /// Release the rest of the stream and close the cursor.
    pub async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.stream.discard().await?;
        self.row = None;
        self.was_null = None;
        self.closed = true;
        Ok(())
    }

    /// The terminal summary, when the stream has finished.
    pub fn summary(&self) -> Option<&ResultSummary> {
        self.stream.summary()
    }

    /// Boolean column; Null reads as false.
    pub fn get_boolean(&mut self, col: impl ColumnIndex) -> DriverResult<bool> {
        let value = self.current_value(&col)?;
        if value.is_null() {
            self.was_null = Some(true);
            return Ok(false);
        }
        let result = coerce::to_bool(&value)?;
        self.was_null = Some(false);
        Ok(result)
    }

    /// 8-bit integer column; Null reads as 0.
    pub fn get_byte(&mut self, col: impl ColumnIndex) -> DriverResult<i8> {
        let value = self.current_value(&col)?;
        if value.is_null() {
            self.was_null = Some(true);
            return Ok(0);
        }
        let result = coerce::to_i8(&value)?;
        self.was_null = Some(false);
        Ok(result)
    }

    /// 16-bit integer column; Null reads as 0.
    pub fn get_short(&mut self, col: impl ColumnIndex) -> DriverResult<i16> {
        let value = self.current_value(&col)?;
        if value.is_null() {
            self.was_null = Some(true);
            return Ok(0);
        }
        let result = coerce::to_i16(&value)?;
        self.was_null = Some(false);
        Ok(result)
    }

    /// 32-bit integer column; Null reads as 0.
    pub fn get_int(&mut self, col: impl ColumnIndex) -> DriverResult<i32> {
        let value = self.current_value(&col)?;
        if value.is_null() {
            self.was_null = Some(true);
            return Ok(0);
        }
        let result = coerce::to_i32(&value)?;
        self.was_null = Some(false);
        Ok(result)
    }

    /// 64-bit integer column; Null reads as 0.
    pub fn get_long(&mut self, col: impl ColumnIndex) -> DriverResult<i64> {
        let value = self.current_value(&col)?;
        if value.is_null() {
            self.was_null = Some(true);
            return Ok(0);
        }
        let result = coerce::to_i64(&value)?;
        self.was_null = Some(false);
        Ok(result)
    }

    /// Single-precision float column; Null reads as 0.0.
    pub fn get_float(&mut self, col: impl ColumnIndex) -> DriverResult<f32> {
        self.get_double(col).map(|v| v as f32)
    }

    /// Float column; Null reads as 0.0.
    pub fn get_double(&mut self, col: impl ColumnIndex) -> DriverResult<f64> {
        let value = self.current_value(&col)?;
        if value.is_null() {
            self.was_null = Some(true);
            return Ok(0.0);
        }
        let result = coerce::to_f64(&value)?;
        self.was_null = Some(false);
        Ok(result)
    }

    /// String column; Null reads as None.
    pub fn get_string(&mut self, col: impl ColumnIndex) -> DriverResult<Option<String>> {
        let value = self.current_value(&col)?;
        if value.is_null() {
            self.was_null = Some(true);
            return Ok(None);
        }
        let result = coerce::to_string(&value)?;
        self.was_null = Some(false);
        Ok(Some(result))
    }

    /// Bytes column; Null reads as None.
    pub fn get_bytes(&mut self, col: impl ColumnIndex) -> DriverResult<Option<Vec<u8>>> {
        let value = self.current_value(&col)?;
        if value.is_null() {
            self.was_null = Some(true);
            return Ok(None);
        }
        let result = coerce::to_bytes(&value)?;
        self.was_null = Some(false);
        Ok(Some(result))
    }

    /// Raw column value.
    pub fn get_value(&mut self, col: impl ColumnIndex) -> DriverResult<Value> {
        let value = self.current_value(&col)?;
        self.was_null = Some(value.is_null());
        Ok(value)
    }

    fn current_value(&self, col: &impl ColumnIndex) -> DriverResult<Value> {
        if self.closed {
            return Err(DriverError::type_conversion("result set is closed"));
        }
        let row = self
            .row
            .as_ref()
            .ok_or_else(|| DriverError::type_conversion("the cursor is not on a row"))?;
        let index = col.resolve(row)?;
        Ok(row.get_by_index(index).cloned().unwrap_or(Value::Null))
    }
}

impl<S> std::fmt::Debug for ResultSet<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("closed", &self.closed)
            .field("on_row", &self.row.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::codec::ChunkedCodec;
    use crate::bolt::message::{BoltResponse, FailureMessage, RecordMessage, SuccessMessage};
    use crate::bolt::packstream::PackStreamValue;
    use crate::bolt::{AuthToken, BOLT_MAGIC};
    use bytes::BytesMut;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio_util::codec::Encoder as _;

    fn response_bytes(responses: &[BoltResponse]) -> BytesMut {
        let mut codec = ChunkedCodec::new();
        let mut buf = BytesMut::new();
        for response in responses {
            codec
                .encode(
                    PackStreamValue::Structure(response.to_structure()),
                    &mut buf,
                )
                .unwrap();
        }
        buf
    }

    fn run_success(fields: &[&str]) -> BoltResponse {
        let mut msg = SuccessMessage::new();
        msg.add(
            "fields",
            PackStreamValue::List(
                fields
                    .iter()
                    .map(|f| PackStreamValue::String(f.to_string()))
                    .collect(),
            ),
        );
        BoltResponse::Success(msg)
    }

    fn stream_success(has_more: bool) -> BoltResponse {
        let mut msg = SuccessMessage::new();
        if has_more {
            msg.add("has_more", PackStreamValue::Boolean(true));
        }
        BoltResponse::Success(msg)
    }

    fn record(values: Vec<PackStreamValue>) -> BoltResponse {
        BoltResponse::Record(RecordMessage::new(values))
    }

    async fn statement_with_script(
        responses: Vec<BoltResponse>,
    ) -> (Statement<DuplexStream>, DuplexStream) {
        let (client_io, mut server) = duplex(1 << 16);
        let mut client = BoltClient::new(client_io);

        let hello = response_bytes(&[BoltResponse::Success(SuccessMessage::new())]);
        let scripted = response_bytes(&responses);

        let server_task = tokio::spawn(async move {
            let mut handshake = [0u8; 20];
            server.read_exact(&mut handshake).await.unwrap();
            assert_eq!(&handshake[0..4], &BOLT_MAGIC);
            server.write_all(&[0, 0, 5, 0]).await.unwrap();
            server.write_all(&hello).await.unwrap();
            server.write_all(&scripted).await.unwrap();
            server
        });

        client.hello(AuthToken::none()).await.unwrap();
        let server = server_task.await.unwrap();
        (Statement::new(client), server)
    }

    #[tokio::test]
    async fn query_streams_rows() {
        let (mut statement, _server) = statement_with_script(vec![
            run_success(&["name", "age"]),
            record(vec![
                PackStreamValue::String("Alice".into()),
                PackStreamValue::Integer(30),
            ]),
            record(vec![
                PackStreamValue::String("Bob".into()),
                PackStreamValue::Null,
            ]),
            stream_success(false),
        ])
        .await;

        let mut rows = statement
            .execute_query("MATCH (p:Person) RETURN p.name AS name, p.age AS age", IndexMap::new())
            .await
            .unwrap();

        assert_eq!(rows.keys(), &["name", "age"]);

        assert!(rows.advance().await.unwrap());
        assert_eq!(rows.get_string("name").unwrap().as_deref(), Some("Alice"));
        assert_eq!(rows.get_long("age").unwrap(), 30);
        assert_eq!(rows.get_long(1).unwrap(), 30);

        assert!(rows.advance().await.unwrap());
        assert_eq!(rows.get_string(0).unwrap().as_deref(), Some("Bob"));

        assert!(!rows.advance().await.unwrap());
    }

    #[tokio::test]
    async fn multi_pull_streaming() {
        let (statement, _server) = statement_with_script(vec![
            run_success(&["n"]),
            record(vec![PackStreamValue::Integer(1)]),
            record(vec![PackStreamValue::Integer(2)]),
            stream_success(true),
            record(vec![PackStreamValue::Integer(3)]),
            stream_success(false),
        ])
        .await;

        let mut statement = statement.with_fetch_size(2);

        let mut rows = statement
            .execute_query("RETURN n", IndexMap::new())
            .await
            .unwrap();
        let mut seen = Vec::new();
        while rows.advance().await.unwrap() {
            seen.push(rows.get_long("n").unwrap());
        }
        assert_eq!(seen, [1, 2, 3]);
    }

    #[tokio::test]
    async fn max_rows_discards_remainder() {
        let (statement, _server) = statement_with_script(vec![
            run_success(&["n"]),
            record(vec![PackStreamValue::Integer(1)]),
            stream_success(true), // server reports more available
            stream_success(false), // reply to DISCARD
        ])
        .await;
        let mut statement = statement.with_max_rows(1).with_fetch_size(1);

        let mut rows = statement
            .execute_query("RETURN n", IndexMap::new())
            .await
            .unwrap();
        assert!(rows.advance().await.unwrap());
        assert_eq!(rows.get_long(0).unwrap(), 1);
        assert!(!rows.advance().await.unwrap());
    }

    #[tokio::test]
    async fn null_coercion_and_was_null() {
        let (mut statement, _server) = statement_with_script(vec![
            run_success(&["v"]),
            record(vec![PackStreamValue::Null]),
            record(vec![PackStreamValue::String("1".into())]),
            record(vec![PackStreamValue::Integer(128)]),
            stream_success(false),
        ])
        .await;

        let mut rows = statement
            .execute_query("RETURN v", IndexMap::new())
            .await
            .unwrap();

        // was_null before any read fails.
        assert!(rows.was_null().is_err());

        // Null row: defaults plus the flag.
        assert!(rows.advance().await.unwrap());
        assert!(rows.was_null().is_err());
        assert_eq!(rows.get_long("v").unwrap(), 0);
        assert!(rows.was_null().unwrap());
        assert!(!rows.get_boolean("v").unwrap());
        assert!(rows.was_null().unwrap());
        assert_eq!(rows.get_string("v").unwrap(), None);
        assert!(rows.was_null().unwrap());

        // "1" coerces to true; "2" would not.
        assert!(rows.advance().await.unwrap());
        assert!(rows.was_null().is_err(), "flag must reset on advance");
        assert!(rows.get_boolean("v").unwrap());
        assert!(!rows.was_null().unwrap());

        // 128 does not fit a byte.
        assert!(rows.advance().await.unwrap());
        assert!(matches!(
            rows.get_byte("v").unwrap_err(),
            DriverError::TypeConversion(_)
        ));
        assert_eq!(rows.get_short("v").unwrap(), 128);
    }

    #[tokio::test]
    async fn string_bool_rejects_other_values() {
        let (mut statement, _server) = statement_with_script(vec![
            run_success(&["v"]),
            record(vec![PackStreamValue::String("2".into())]),
            stream_success(false),
        ])
        .await;

        let mut rows = statement
            .execute_query("RETURN v", IndexMap::new())
            .await
            .unwrap();
        rows.advance().await.unwrap();
        assert!(matches!(
            rows.get_boolean("v").unwrap_err(),
            DriverError::TypeConversion(_)
        ));
    }

    #[tokio::test]
    async fn was_null_after_close_fails() {
        let (mut statement, _server) = statement_with_script(vec![
            run_success(&["v"]),
            record(vec![PackStreamValue::Integer(1)]),
            stream_success(false),
        ])
        .await;

        let mut rows = statement
            .execute_query("RETURN v", IndexMap::new())
            .await
            .unwrap();
        rows.advance().await.unwrap();
        rows.get_long("v").unwrap();
        assert!(!rows.was_null().unwrap());

        rows.close().await.unwrap();
        assert!(rows.was_null().is_err());
        assert!(rows.get_long("v").is_err());
        assert!(rows.advance().await.is_err());
    }

    #[tokio::test]
    async fn execute_returns_counters() {
        let mut terminal = SuccessMessage::new();
        let mut stats = indexmap::IndexMap::new();
        stats.insert("nodes-created".to_string(), PackStreamValue::Integer(1));
        stats.insert("properties-set".to_string(), PackStreamValue::Integer(1));
        terminal.add("stats", PackStreamValue::Map(stats));

        let (mut statement, _server) = statement_with_script(vec![
            run_success(&[]),
            BoltResponse::Success(terminal),
        ])
        .await;

        let summary = statement
            .execute("CREATE (p:Person {name: 'Ada'})", IndexMap::new())
            .await
            .unwrap();
        assert_eq!(summary.counters.nodes_created, 1);
        assert!(summary.counters.contains_updates());
    }

    #[tokio::test]
    async fn malformed_structure_fails_and_poisons_connection() {
        use crate::bolt::packstream::PackStreamStructure;
        use crate::driver::bolt::ConnectionState;
        use crate::driver::sig;

        // A Date structure with two fields instead of one.
        let bad_date = PackStreamValue::Structure(PackStreamStructure::new(
            sig::DATE,
            vec![PackStreamValue::Integer(1), PackStreamValue::Integer(2)],
        ));

        let (mut statement, _server) = statement_with_script(vec![
            run_success(&["d"]),
            record(vec![bad_date]),
            stream_success(false),
        ])
        .await;

        let mut rows = statement
            .execute_query("RETURN d", IndexMap::new())
            .await
            .unwrap();
        let err = rows.advance().await.unwrap_err();
        assert!(matches!(err, DriverError::Protocol(_)));
        drop(rows);
        assert_eq!(statement.client().state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn server_failure_surfaces() {
        let (mut statement, _server) = statement_with_script(vec![BoltResponse::Failure(
            FailureMessage::new("Neo.ClientError.Statement.SyntaxError", "bad"),
        )])
        .await;

        let err = statement
            .execute_query("NOT A QUERY", IndexMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Server { .. }));
    }

    #[tokio::test]
    async fn translator_rewrites_sql_text() {
        use crate::translator::TranslatorConfig;

        let (statement, _server) = statement_with_script(vec![]).await;
        let config = TranslatorConfig::builder()
            .with_pretty_print(false)
            .with_always_escape_names(false)
            .build();
        let statement = statement.with_translator(Arc::new(SqlTranslator::new(Arc::new(config))));

        assert_eq!(
            statement.prepare_text("SELECT p.name FROM Person p").unwrap(),
            "MATCH (p:Person) RETURN p.name AS name"
        );

        // The pragma bypasses translation verbatim.
        let forced = "/*+ NEO4J FORCE_CYPHER */ MATCH (n) RETURN n";
        assert_eq!(statement.prepare_text(forced).unwrap(), forced);

        // Without a translator the text passes through.
        let (bare, _server) = statement_with_script(vec![]).await;
        assert_eq!(bare.prepare_text("anything").unwrap(), "anything");
    }

    #[tokio::test(start_paused = true)]
    async fn query_timeout_cancels_and_reports() {
        let (client_io, mut server) = duplex(1 << 16);
        let mut client = BoltClient::new(client_io);

        let hello = response_bytes(&[BoltResponse::Success(SuccessMessage::new())]);
        // RUN's reply arrives only after the deadline; then RESET SUCCESS.
        let late = response_bytes(&[
            run_success(&["n"]),
            BoltResponse::Success(SuccessMessage::new()),
        ]);

        let server_task = tokio::spawn(async move {
            let mut handshake = [0u8; 20];
            server.read_exact(&mut handshake).await.unwrap();
            server.write_all(&[0, 0, 5, 0]).await.unwrap();
            server.write_all(&hello).await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            server.write_all(&late).await.unwrap();
            server
        });

        client.hello(AuthToken::none()).await.unwrap();
        let mut statement =
            Statement::new(client).with_query_timeout(Duration::from_millis(50));

        let err = statement
            .execute_query("RETURN slow()", IndexMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Timeout(_)));

        // The connection recovered; it is usable again.
        use crate::driver::bolt::ConnectionState;
        assert_eq!(statement.client().state(), ConnectionState::Ready);
        server_task.await.unwrap();
    }
}
