//! The per-connection request/response state machine.
//!
//! One logical request is outstanding at a time from the caller's view;
//! [`BoltClient::pipeline`] may put several messages on the wire before
//! the first reply arrives, but replies are matched to requests in
//! strict send order and a failure poisons everything queued behind it.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::bolt::message::{
    BeginMessage, BoltRequest, BoltResponse, DiscardMessage, FailureMessage, HelloMessage,
    PullMessage, RecordMessage, RunMessage, SuccessMessage,
};
use crate::bolt::{AuthToken, BoltError, BoltVersion};

use super::connection::BoltConnection;
use super::CLIENT_USER_AGENT;
use crate::driver::error::{DriverError, DriverResult};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport
    Disconnected,
    /// Transport open, handshake not yet complete or HELLO not sent
    Connected,
    /// Authenticated, no work in flight
    Ready,
    /// An auto-commit result stream is open
    Streaming,
    /// Inside an explicit transaction, no open stream
    TxReady,
    /// Inside an explicit transaction with an open stream
    TxStreaming,
    /// The server reported a failure; RESET required
    Failed,
    /// A RESET is in flight, pending replies are being drained
    Interrupted,
    /// The connection is unusable
    Defunct,
}

/// Records plus the terminal summary of one request.
#[derive(Debug)]
pub struct ServerReply {
    /// RECORD messages that preceded the summary
    pub records: Vec<RecordMessage>,
    /// The SUCCESS summary
    pub summary: SuccessMessage,
}

enum ReplyOutcome {
    Success(ServerReply),
    Failure(FailureMessage),
    Ignored,
}

/// A Bolt client connection: transport plus protocol state.
pub struct BoltClient<S> {
    connection: BoltConnection<S>,
    state: ConnectionState,
    version: Option<BoltVersion>,
    server_agent: Option<String>,
    /// Requests written whose terminal reply has not been read yet.
    /// Cancellation uses this to drain the right number of replies.
    in_flight: usize,
}

impl BoltClient<TcpStream> {
    /// Open a TCP transport. The connection is usable after
    /// [`BoltClient::hello`].
    pub async fn connect(address: &str) -> DriverResult<Self> {
        let connection = BoltConnection::connect(address).await?;
        Ok(Self::from_connection(connection))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> BoltClient<S> {
    /// Wrap an already-open transport.
    pub fn new(stream: S) -> Self {
        Self::from_connection(BoltConnection::new(stream))
    }

    fn from_connection(connection: BoltConnection<S>) -> Self {
        Self {
            connection,
            state: ConnectionState::Connected,
            version: None,
            server_agent: None,
            in_flight: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Negotiated protocol version.
    pub fn version(&self) -> Option<BoltVersion> {
        self.version
    }

    /// Server agent string from the HELLO summary.
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    /// Whether the UTC temporal encodings are active.
    pub fn utc_patch_enabled(&self) -> bool {
        self.version.map(BoltVersion::utc_datetime).unwrap_or(false)
    }

    /// Handshake and authenticate. Drives Connected to Ready.
    pub async fn hello(&mut self, auth: AuthToken) -> DriverResult<()> {
        self.require_state(&[ConnectionState::Connected], "HELLO")?;

        let version = match self.connection.handshake().await {
            Ok(v) => v,
            Err(e) => {
                self.state = ConnectionState::Defunct;
                return Err(e.into());
            }
        };
        self.version = Some(version);

        let hello = HelloMessage::new(CLIENT_USER_AGENT, auth);
        self.send(BoltRequest::Hello(hello)).await?;
        match self.read_reply().await? {
            ReplyOutcome::Success(reply) => {
                self.server_agent = reply.summary.server().map(str::to_string);
                self.state = ConnectionState::Ready;
                debug!(version = %version, server = ?self.server_agent, "connection ready");
                Ok(())
            }
            ReplyOutcome::Failure(failure) => {
                self.state = ConnectionState::Failed;
                Err(failure.into())
            }
            ReplyOutcome::Ignored => {
                self.state = ConnectionState::Defunct;
                Err(DriverError::protocol("HELLO was ignored by the server"))
            }
        }
    }

    /// Execute a RUN. Drives Ready to Streaming, or TxReady to
    /// TxStreaming. Returns the RUN summary (field names, qid).
    pub async fn run(&mut self, message: RunMessage) -> DriverResult<SuccessMessage> {
        self.require_state(&[ConnectionState::Ready, ConnectionState::TxReady], "RUN")?;
        let in_tx = self.state == ConnectionState::TxReady;

        let reply = self.exchange(BoltRequest::Run(message)).await?;
        self.state = if in_tx {
            ConnectionState::TxStreaming
        } else {
            ConnectionState::Streaming
        };
        Ok(reply.summary)
    }

    /// Fetch up to `n` records from the open stream. The stream stays
    /// open while the summary reports `has_more`.
    pub async fn pull(&mut self, n: i64, qid: Option<i64>) -> DriverResult<ServerReply> {
        self.require_state(
            &[ConnectionState::Streaming, ConnectionState::TxStreaming],
            "PULL",
        )?;
        let in_tx = self.state == ConnectionState::TxStreaming;

        let mut message = PullMessage::with_n(n);
        if let Some(qid) = qid {
            message = message.with_qid(qid);
        }
        let reply = self.exchange(BoltRequest::Pull(message)).await?;
        if !reply.summary.has_more() {
            self.state = if in_tx {
                ConnectionState::TxReady
            } else {
                ConnectionState::Ready
            };
        }
        Ok(reply)
    }

    /// Release the rest of the open stream without materialising it.
    pub async fn discard(&mut self, qid: Option<i64>) -> DriverResult<SuccessMessage> {
        self.require_state(
            &[ConnectionState::Streaming, ConnectionState::TxStreaming],
            "DISCARD",
        )?;
        let in_tx = self.state == ConnectionState::TxStreaming;

        let mut message = DiscardMessage::all();
        if let Some(qid) = qid {
            message = message.with_qid(qid);
        }
        let reply = self.exchange(BoltRequest::Discard(message)).await?;
        self.state = if in_tx {
            ConnectionState::TxReady
        } else {
            ConnectionState::Ready
        };
        Ok(reply.summary)
    }

    /// Open an explicit transaction. Drives Ready to TxReady.
    pub async fn begin(&mut self, message: BeginMessage) -> DriverResult<()> {
        self.require_state(&[ConnectionState::Ready], "BEGIN")?;
        self.exchange(BoltRequest::Begin(message)).await?;
        self.state = ConnectionState::TxReady;
        Ok(())
    }

    /// Commit the explicit transaction. Returns the bookmark, if any.
    pub async fn commit(&mut self) -> DriverResult<Option<String>> {
        self.require_state(&[ConnectionState::TxReady], "COMMIT")?;
        let reply = self.exchange(BoltRequest::Commit).await?;
        self.state = ConnectionState::Ready;
        Ok(reply.summary.bookmark().map(str::to_string))
    }

    /// Roll back the explicit transaction.
    pub async fn rollback(&mut self) -> DriverResult<()> {
        self.require_state(&[ConnectionState::TxReady], "ROLLBACK")?;
        self.exchange(BoltRequest::Rollback).await?;
        self.state = ConnectionState::Ready;
        Ok(())
    }

    /// Reset the connection to Ready. This is the recovery path out of
    /// Failed; a failed RESET leaves the connection Defunct.
    pub async fn reset(&mut self) -> DriverResult<()> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Connected => {
                return Err(DriverError::protocol("cannot RESET before authentication"))
            }
            ConnectionState::Defunct => return Err(DriverError::ConnectionClosed),
            _ => {}
        }
        self.drain_and_reset().await
    }

    /// Cancel in-flight work: issue RESET, drain the replies still owed
    /// to earlier requests (the server acknowledges them as IGNORED),
    /// and return to Ready.
    pub async fn cancel(&mut self) -> DriverResult<()> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Connected => {
                return Err(DriverError::protocol("nothing to cancel"))
            }
            ConnectionState::Defunct => return Err(DriverError::ConnectionClosed),
            _ => {}
        }
        self.state = ConnectionState::Interrupted;
        self.drain_and_reset().await
    }

    /// Send RESET, skip the `in_flight` replies owed to earlier
    /// requests, then require SUCCESS for the RESET itself.
    async fn drain_and_reset(&mut self) -> DriverResult<()> {
        if let Err(e) = self.connection.send(BoltRequest::Reset).await {
            self.state = ConnectionState::Defunct;
            self.in_flight = 0;
            return Err(e.into());
        }

        let mut pending = self.in_flight;
        loop {
            match self.connection.recv().await {
                // Records from a stream that was mid-reply when the
                // interrupt landed.
                Ok(BoltResponse::Record(_)) => continue,
                Ok(BoltResponse::Success(_)) if pending == 0 => {
                    self.in_flight = 0;
                    self.state = ConnectionState::Ready;
                    debug!("connection reset");
                    return Ok(());
                }
                Ok(_) if pending > 0 => {
                    pending -= 1;
                }
                Ok(_) | Err(_) => {
                    // The RESET itself did not succeed.
                    self.in_flight = 0;
                    self.state = ConnectionState::Defunct;
                    return Err(DriverError::ConnectionClosed);
                }
            }
        }
    }

    /// Say GOODBYE and drop to Disconnected. Legal from any state; the
    /// write is best effort.
    pub async fn goodbye(&mut self) -> DriverResult<()> {
        if self.state != ConnectionState::Disconnected && self.state != ConnectionState::Defunct {
            let _ = self.connection.send(BoltRequest::Goodbye).await;
        }
        self.connection.shutdown().await;
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    /// Send a batch of requests in one flush and match replies in send
    /// order.
    ///
    /// If an earlier request fails, the server acknowledges the ones
    /// behind it as IGNORED; their slots complete with a clone of the
    /// original failure.
    pub async fn pipeline(
        &mut self,
        requests: Vec<BoltRequest>,
    ) -> DriverResult<Vec<DriverResult<ServerReply>>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        // Validate the whole batch against the state machine before
        // anything touches the transport.
        let mut simulated = self.state;
        for request in &requests {
            simulated = expected_after(simulated, request)?;
        }

        let kinds: Vec<RequestKind> = requests.iter().map(RequestKind::of).collect();
        self.send_all(requests).await?;

        let mut results = Vec::with_capacity(kinds.len());
        let mut first_failure: Option<FailureMessage> = None;

        for kind in kinds {
            if let Some(ref failure) = first_failure {
                // Everything after a failure must come back IGNORED.
                match self.read_reply().await? {
                    ReplyOutcome::Ignored => {
                        results.push(Err(failure.clone().into()));
                    }
                    ReplyOutcome::Failure(other) => {
                        // Servers answer IGNORED here; tolerate a
                        // FAILURE and keep draining in order.
                        warn!(code = %other.code, "unexpected FAILURE after pipeline failure");
                        results.push(Err(other.into()));
                    }
                    ReplyOutcome::Success(_) => {
                        self.state = ConnectionState::Defunct;
                        return Err(DriverError::protocol(
                            "server answered SUCCESS to a request that must be IGNORED",
                        ));
                    }
                }
                continue;
            }

            match self.read_reply().await? {
                ReplyOutcome::Success(reply) => {
                    self.apply_transition(kind, &reply.summary);
                    results.push(Ok(reply));
                }
                ReplyOutcome::Failure(failure) => {
                    self.state = ConnectionState::Failed;
                    results.push(Err(failure.clone().into()));
                    first_failure = Some(failure);
                }
                ReplyOutcome::Ignored => {
                    self.state = ConnectionState::Failed;
                    results.push(Err(DriverError::protocol(
                        "request ignored without a preceding failure",
                    )));
                }
            }
        }

        Ok(results)
    }

    fn apply_transition(&mut self, kind: RequestKind, summary: &SuccessMessage) {
        let in_tx = matches!(
            self.state,
            ConnectionState::TxReady | ConnectionState::TxStreaming
        );
        self.state = match kind {
            RequestKind::Hello => ConnectionState::Ready,
            RequestKind::Begin => ConnectionState::TxReady,
            RequestKind::Run => {
                if in_tx {
                    ConnectionState::TxStreaming
                } else {
                    ConnectionState::Streaming
                }
            }
            RequestKind::Pull => {
                if summary.has_more() {
                    self.state
                } else if in_tx {
                    ConnectionState::TxReady
                } else {
                    ConnectionState::Ready
                }
            }
            RequestKind::Discard => {
                if in_tx {
                    ConnectionState::TxReady
                } else {
                    ConnectionState::Ready
                }
            }
            RequestKind::Commit | RequestKind::Rollback => ConnectionState::Ready,
            RequestKind::Reset => ConnectionState::Ready,
            RequestKind::Goodbye => ConnectionState::Disconnected,
        };
    }

    async fn exchange(&mut self, request: BoltRequest) -> DriverResult<ServerReply> {
        self.send(request).await?;
        match self.read_reply().await? {
            ReplyOutcome::Success(reply) => Ok(reply),
            ReplyOutcome::Failure(failure) => {
                self.state = ConnectionState::Failed;
                Err(failure.into())
            }
            ReplyOutcome::Ignored => {
                self.state = ConnectionState::Failed;
                Err(DriverError::protocol(
                    "request ignored without a preceding failure",
                ))
            }
        }
    }

    async fn send(&mut self, request: BoltRequest) -> DriverResult<()> {
        self.connection
            .send(request)
            .await
            .map_err(|e| self.fail_transport(e))?;
        self.in_flight += 1;
        Ok(())
    }

    async fn send_all(&mut self, requests: Vec<BoltRequest>) -> DriverResult<()> {
        let count = requests.len();
        self.connection
            .send_all(requests)
            .await
            .map_err(|e| self.fail_transport(e))?;
        self.in_flight += count;
        Ok(())
    }

    /// Read one reply: RECORDs up to and including a terminal message.
    async fn read_reply(&mut self) -> DriverResult<ReplyOutcome> {
        let mut records = Vec::new();
        loop {
            let response = match self.connection.recv().await {
                Ok(r) => r,
                Err(e) => return Err(self.fail_transport(e)),
            };
            match response {
                BoltResponse::Record(record) => records.push(record),
                BoltResponse::Success(summary) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    return Ok(ReplyOutcome::Success(ServerReply { records, summary }));
                }
                BoltResponse::Failure(failure) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    return Ok(ReplyOutcome::Failure(failure));
                }
                BoltResponse::Ignored => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    return Ok(ReplyOutcome::Ignored);
                }
            }
        }
    }

    /// Classify a transport-layer error: codec trouble poisons the
    /// current exchange (Failed), transport trouble kills the
    /// connection (Defunct).
    fn fail_transport(&mut self, err: BoltError) -> DriverError {
        match &err {
            BoltError::PackStream(_) | BoltError::Protocol(_) => {
                self.state = ConnectionState::Failed;
            }
            _ => {
                self.state = ConnectionState::Defunct;
            }
        }
        err.into()
    }

    /// Mark the connection Failed after a value-layer violation in a
    /// server reply. RESET is the way back to Ready.
    pub(crate) fn mark_failed(&mut self) {
        if self.state != ConnectionState::Defunct {
            self.state = ConnectionState::Failed;
        }
    }

    fn require_state(&self, allowed: &[ConnectionState], op: &str) -> DriverResult<()> {
        if self.state == ConnectionState::Defunct {
            return Err(DriverError::ConnectionClosed);
        }
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(DriverError::protocol(format!(
                "cannot {op} in state {:?}",
                self.state
            )))
        }
    }
}

impl<S> std::fmt::Debug for BoltClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoltClient")
            .field("state", &self.state)
            .field("version", &self.version)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum RequestKind {
    Hello,
    Run,
    Pull,
    Discard,
    Begin,
    Commit,
    Rollback,
    Reset,
    Goodbye,
}

impl RequestKind {
    fn of(request: &BoltRequest) -> Self {
        match request {
            BoltRequest::Hello(_) => RequestKind::Hello,
            BoltRequest::Run(_) => RequestKind::Run,
            BoltRequest::Pull(_) => RequestKind::Pull,
            BoltRequest::Discard(_) => RequestKind::Discard,
            BoltRequest::Begin(_) => RequestKind::Begin,
            BoltRequest::Commit => RequestKind::Commit,
            BoltRequest::Rollback => RequestKind::Rollback,
            BoltRequest::Reset => RequestKind::Reset,
            BoltRequest::Goodbye => RequestKind::Goodbye,
        }
    }
}

/// The state a successful `request` leaves the machine in when issued
/// from `state`, or a protocol error when the pairing is illegal.
/// PULL is simulated as ending its stream.
fn expected_after(state: ConnectionState, request: &BoltRequest) -> DriverResult<ConnectionState> {
    use ConnectionState::*;

    if state == Defunct {
        return Err(DriverError::ConnectionClosed);
    }

    let next = match (request, state) {
        (BoltRequest::Hello(_), Connected) => Ready,
        (BoltRequest::Run(_), Ready) => Streaming,
        (BoltRequest::Run(_), TxReady) => TxStreaming,
        (BoltRequest::Pull(_), Streaming) => Ready,
        (BoltRequest::Pull(_), TxStreaming) => TxReady,
        (BoltRequest::Discard(_), Streaming) => Ready,
        (BoltRequest::Discard(_), TxStreaming) => TxReady,
        (BoltRequest::Begin(_), Ready) => TxReady,
        (BoltRequest::Commit, TxReady) => Ready,
        (BoltRequest::Rollback, TxReady) => Ready,
        (BoltRequest::Reset, _) => Ready,
        (BoltRequest::Goodbye, _) => Disconnected,
        (request, state) => {
            return Err(DriverError::protocol(format!(
                "cannot {} in state {state:?}",
                request.name()
            )))
        }
    };
    Ok(next)
}
