//! Lazy record streaming.
//!
//! A [`RecordStream`] is the client side of an open server stream:
//! finite, non-restartable, advanced by PULL requests of `fetch_size`
//! records at a time and bounded by an optional `max_rows` cap.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::bolt::message::SuccessMessage;
use crate::bolt::packstream::PackStreamValue;
use indexmap::IndexMap;

use super::bolt::BoltClient;
use super::error::DriverResult;
use super::record::Record;
use super::unpacker::ValueUnpacker;

/// Default records fetched per PULL.
pub const DEFAULT_FETCH_SIZE: i64 = 1000;

/// Update counters from a terminal summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    /// Nodes created
    pub nodes_created: i64,
    /// Nodes deleted
    pub nodes_deleted: i64,
    /// Relationships created
    pub relationships_created: i64,
    /// Relationships deleted
    pub relationships_deleted: i64,
    /// Properties set
    pub properties_set: i64,
    /// Labels added
    pub labels_added: i64,
    /// Labels removed
    pub labels_removed: i64,
}

impl Counters {
    /// Extract counters from the summary `stats` map.
    pub fn from_stats(stats: &IndexMap<String, PackStreamValue>) -> Self {
        let get = |key: &str| stats.get(key).and_then(|v| v.as_int()).unwrap_or(0);
        Self {
            nodes_created: get("nodes-created"),
            nodes_deleted: get("nodes-deleted"),
            relationships_created: get("relationships-created"),
            relationships_deleted: get("relationships-deleted"),
            properties_set: get("properties-set"),
            labels_added: get("labels-added"),
            labels_removed: get("labels-removed"),
        }
    }

    /// Whether anything was written.
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
            || self.labels_added > 0
            || self.labels_removed > 0
    }
}

/// What a finished stream reports.
#[derive(Debug, Clone, Default)]
pub struct ResultSummary {
    /// Update counters
    pub counters: Counters,
    /// Bookmark for causal chaining
    pub bookmark: Option<String>,
    /// Database the query ran against
    pub database: Option<String>,
}

impl ResultSummary {
    fn from_success(summary: &SuccessMessage) -> Self {
        Self {
            counters: summary.stats().map(Counters::from_stats).unwrap_or_default(),
            bookmark: summary.bookmark().map(str::to_string),
            database: summary.db().map(str::to_string),
        }
    }
}

/// A lazy, finite, non-restartable stream of records.
pub struct RecordStream<'c, S> {
    client: &'c mut BoltClient<S>,
    keys: Arc<Vec<String>>,
    qid: Option<i64>,
    fetch_size: i64,
    max_rows: usize,
    buffer: VecDeque<Record>,
    yielded: usize,
    open: bool,
    summary: Option<ResultSummary>,
}

impl<'c, S: AsyncRead + AsyncWrite + Unpin> RecordStream<'c, S> {
    /// Attach to the stream a successful RUN opened.
    ///
    /// `max_rows` of zero means unbounded.
    pub fn open(
        client: &'c mut BoltClient<S>,
        run_summary: &SuccessMessage,
        fetch_size: i64,
        max_rows: usize,
    ) -> Self {
        let keys = Arc::new(run_summary.fields().unwrap_or_default());
        let qid = run_summary.qid();
        let fetch_size = if fetch_size <= 0 {
            DEFAULT_FETCH_SIZE
        } else {
            fetch_size
        };
        Self {
            client,
            keys,
            qid,
            fetch_size,
            max_rows,
            buffer: VecDeque::new(),
            yielded: 0,
            open: true,
            summary: None,
        }
    }

    /// Declared field names.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The terminal summary, once the stream is finished.
    pub fn summary(&self) -> Option<&ResultSummary> {
        self.summary.as_ref()
    }

    /// The next record, pulling from the server as needed. `None` when
    /// the stream is exhausted or the row cap was reached.
    pub async fn next(&mut self) -> DriverResult<Option<Record>> {
        loop {
            if self.max_rows > 0 && self.yielded >= self.max_rows {
                // Row cap reached: release whatever the server still has.
                self.discard().await?;
                return Ok(None);
            }

            if let Some(record) = self.buffer.pop_front() {
                self.yielded += 1;
                return Ok(Some(record));
            }

            if !self.open {
                return Ok(None);
            }

            self.fill_buffer().await?;
        }
    }

    /// Drain the whole stream into memory.
    pub async fn collect_all(mut self) -> DriverResult<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Release the rest of the stream without materialising it.
    pub async fn discard(&mut self) -> DriverResult<()> {
        self.buffer.clear();
        if !self.open {
            return Ok(());
        }
        let summary = self.client.discard(self.qid).await?;
        self.summary = Some(ResultSummary::from_success(&summary));
        self.open = false;
        debug!(yielded = self.yielded, "stream discarded");
        Ok(())
    }

    /// Discard the remainder and return the terminal summary.
    pub async fn consume(mut self) -> DriverResult<ResultSummary> {
        self.discard().await?;
        Ok(self.summary.unwrap_or_default())
    }

    /// Whether the server-side stream is still open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    async fn fill_buffer(&mut self) -> DriverResult<()> {
        // Never ask for more rows than the cap still allows.
        let n = if self.max_rows > 0 {
            let left = (self.max_rows - self.yielded) as i64;
            left.min(self.fetch_size)
        } else {
            self.fetch_size
        };

        let unpacker = ValueUnpacker::new(self.client.utc_patch_enabled());
        let reply = self.client.pull(n, self.qid).await?;

        for record in reply.records {
            let mut values = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                match unpacker.unpack(field) {
                    Ok(value) => values.push(value),
                    Err(e) => {
                        // A malformed structure poisons the exchange;
                        // the connection needs a RESET.
                        self.client.mark_failed();
                        self.open = false;
                        return Err(e);
                    }
                }
            }
            self.buffer
                .push_back(Record::with_keys(Arc::clone(&self.keys), values));
        }

        if !reply.summary.has_more() {
            self.summary = Some(ResultSummary::from_success(&reply.summary));
            self.open = false;
        }
        Ok(())
    }
}

impl<S> std::fmt::Debug for RecordStream<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("keys", &self.keys)
            .field("yielded", &self.yielded)
            .field("open", &self.open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_from_stats() {
        let mut stats = IndexMap::new();
        stats.insert("nodes-created".to_string(), PackStreamValue::Integer(3));
        stats.insert("properties-set".to_string(), PackStreamValue::Integer(5));

        let counters = Counters::from_stats(&stats);
        assert_eq!(counters.nodes_created, 3);
        assert_eq!(counters.properties_set, 5);
        assert_eq!(counters.nodes_deleted, 0);
        assert!(counters.contains_updates());

        assert!(!Counters::default().contains_updates());
    }

    #[test]
    fn summary_from_success() {
        let mut msg = SuccessMessage::new();
        msg.add("bookmark", PackStreamValue::String("bm:7".into()));
        msg.add("db", PackStreamValue::String("graph".into()));
        let summary = ResultSummary::from_success(&msg);
        assert_eq!(summary.bookmark.as_deref(), Some("bm:7"));
        assert_eq!(summary.database.as_deref(), Some("graph"));
    }

    // Streaming behaviour against a scripted server is covered in the
    // statement tests, which exercise RecordStream through ResultSet.
}
