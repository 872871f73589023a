//! Explicit transactions.
//!
//! A [`Transaction`] scopes RUNs inside a caller-managed BEGIN/COMMIT
//! window. Dropping an open transaction leaves the connection in
//! TxReady; the next statement-level operation will fail until the
//! caller commits, rolls back or resets.

use indexmap::IndexMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::bolt::message::{BeginMessage, RunMessage};

use super::bolt::BoltClient;
use super::error::{DriverError, DriverResult};
use super::record::Record;
use super::stream::RecordStream;
use super::unpacker::ValuePacker;
use super::value::Value;

/// Transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting work
    Active,
    /// Committed
    Committed,
    /// Rolled back
    RolledBack,
}

/// An explicit transaction over a borrowed connection.
pub struct Transaction<'c, S> {
    client: &'c mut BoltClient<S>,
    state: TransactionState,
    fetch_size: i64,
    bookmark: Option<String>,
}

impl<'c, S: AsyncRead + AsyncWrite + Unpin> Transaction<'c, S> {
    /// Send BEGIN and construct the guard.
    pub(crate) async fn begin(
        client: &'c mut BoltClient<S>,
        database: Option<String>,
        fetch_size: i64,
    ) -> DriverResult<Self> {
        let mut message = BeginMessage::new();
        if let Some(ref db) = database {
            message = message.with_database(db);
        }
        client.begin(message).await?;
        debug!("transaction open");
        Ok(Self {
            client,
            state: TransactionState::Active,
            fetch_size,
            bookmark: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Bookmark received on commit.
    pub fn bookmark(&self) -> Option<&str> {
        self.bookmark.as_deref()
    }

    /// Run a query inside the transaction and materialise its rows.
    pub async fn run(
        &mut self,
        query: &str,
        parameters: IndexMap<String, Value>,
    ) -> DriverResult<Vec<Record>> {
        self.require_active()?;

        let packer = ValuePacker::new(self.client.utc_patch_enabled());
        let mut packed = IndexMap::with_capacity(parameters.len());
        for (key, value) in parameters {
            packed.insert(key, packer.pack(&value)?);
        }

        let summary = self
            .client
            .run(RunMessage::new(query).with_parameters(packed))
            .await?;
        RecordStream::open(self.client, &summary, self.fetch_size, 0)
            .collect_all()
            .await
    }

    /// Commit the transaction.
    pub async fn commit(mut self) -> DriverResult<Option<String>> {
        self.require_active()?;
        let bookmark = self.client.commit().await?;
        self.state = TransactionState::Committed;
        self.bookmark = bookmark.clone();
        debug!(bookmark = ?bookmark, "transaction committed");
        Ok(bookmark)
    }

    /// Roll the transaction back.
    pub async fn rollback(mut self) -> DriverResult<()> {
        self.require_active()?;
        self.client.rollback().await?;
        self.state = TransactionState::RolledBack;
        debug!("transaction rolled back");
        Ok(())
    }

    fn require_active(&self) -> DriverResult<()> {
        if self.state == TransactionState::Active {
            Ok(())
        } else {
            Err(DriverError::protocol(format!(
                "transaction is {:?}",
                self.state
            )))
        }
    }
}

impl<S> std::fmt::Debug for Transaction<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::codec::ChunkedCodec;
    use crate::bolt::message::{BoltResponse, RecordMessage, SuccessMessage};
    use crate::bolt::packstream::PackStreamValue;
    use crate::bolt::{AuthToken, BOLT_MAGIC};
    use crate::driver::statement::Statement;
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

    #[tokio::test]
    async fn commit_flow() {
        let (mut statement, _server) = statement_with_script(vec![
            BoltResponse::Success(SuccessMessage::new()), // BEGIN
            run_success(&["n"]),
            BoltResponse::Record(RecordMessage::new(vec![PackStreamValue::Integer(1)])),
            BoltResponse::Success(SuccessMessage::new()), // PULL
            BoltResponse::Success({
                let mut msg = SuccessMessage::new();
                msg.add("bookmark", PackStreamValue::String("bm:1".into()));
                msg
            }), // COMMIT
        ])
        .await;

        let mut tx = statement.begin().await.unwrap();
        assert_eq!(tx.state(), TransactionState::Active);

        let records = tx.run("RETURN 1 AS n", IndexMap::new()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_as::<i64>("n").unwrap(), 1);

        let bookmark = tx.commit().await.unwrap();
        assert_eq!(bookmark.as_deref(), Some("bm:1"));
    }

    #[tokio::test]
    async fn rollback_flow() {
        let (mut statement, _server) = statement_with_script(vec![
            BoltResponse::Success(SuccessMessage::new()), // BEGIN
            BoltResponse::Success(SuccessMessage::new()), // ROLLBACK
        ])
        .await;

        let tx = statement.begin().await.unwrap();
        tx.rollback().await.unwrap();
    }
}
