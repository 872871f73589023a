//! Framed Bolt transport.
//!
//! Owns the byte stream, performs the version handshake and moves whole
//! messages in and out through the chunked codec. The transport is
//! generic so tests can drive the protocol over an in-memory duplex
//! pipe instead of a TCP socket.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::bolt::codec::BoltClientCodec;
use crate::bolt::handshake::{build_handshake, parse_response, HANDSHAKE_RESPONSE_SIZE};
use crate::bolt::{BoltError, BoltRequest, BoltResponse, BoltResult, BoltVersion};

use super::PROPOSED_VERSIONS;

/// A framed, handshake-capable Bolt transport.
pub struct BoltConnection<S> {
    stream: S,
    codec: BoltClientCodec,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    version: Option<BoltVersion>,
}

impl BoltConnection<TcpStream> {
    /// Open a TCP connection to a Bolt server.
    pub async fn connect(address: &str) -> BoltResult<Self> {
        let stream = TcpStream::connect(address).await.map_err(|e| {
            BoltError::Connection(format!("failed to connect to {address}: {e}"))
        })?;
        stream.set_nodelay(true).ok();
        debug!(address, "transport connected");
        Ok(Self::new(stream))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> BoltConnection<S> {
    /// Wrap an already-open transport.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            codec: BoltClientCodec::new(),
            read_buffer: BytesMut::with_capacity(8192),
            write_buffer: BytesMut::with_capacity(8192),
            version: None,
        }
    }

    /// Perform the version handshake.
    ///
    /// Sends the magic preamble and four proposals, reads the server's
    /// pick. Versions 5.0 and later switch the temporal encodings to
    /// their UTC forms.
    pub async fn handshake(&mut self) -> BoltResult<BoltVersion> {
        let request = build_handshake(&PROPOSED_VERSIONS);
        self.stream
            .write_all(&request)
            .await
            .map_err(|e| BoltError::Connection(format!("handshake write failed: {e}")))?;

        let mut response = [0u8; HANDSHAKE_RESPONSE_SIZE];
        self.stream
            .read_exact(&mut response)
            .await
            .map_err(|e| BoltError::Connection(format!("handshake read failed: {e}")))?;

        let version = parse_response(response)?;
        debug!(%version, "handshake negotiated");
        self.version = Some(version);
        Ok(version)
    }

    /// The negotiated protocol version, once handshaken.
    pub fn version(&self) -> Option<BoltVersion> {
        self.version
    }

    /// Send a single request and flush.
    pub async fn send(&mut self, request: BoltRequest) -> BoltResult<()> {
        self.write_buffer.clear();
        self.codec.encode(request, &mut self.write_buffer)?;
        self.flush_write_buffer().await
    }

    /// Send a batch of requests with a single flush. The server sees
    /// them in order; replies come back in the same order.
    pub async fn send_all(&mut self, requests: Vec<BoltRequest>) -> BoltResult<()> {
        self.write_buffer.clear();
        for request in requests {
            self.codec.encode(request, &mut self.write_buffer)?;
        }
        self.flush_write_buffer().await
    }

    async fn flush_write_buffer(&mut self) -> BoltResult<()> {
        self.stream
            .write_all(&self.write_buffer)
            .await
            .map_err(|e| BoltError::Connection(format!("send failed: {e}")))?;
        self.stream
            .flush()
            .await
            .map_err(|e| BoltError::Connection(format!("flush failed: {e}")))?;
        Ok(())
    }

    /// Receive the next response message.
    pub async fn recv(&mut self) -> BoltResult<BoltResponse> {
        loop {
            if let Some(response) = self.codec.decode(&mut self.read_buffer)? {
                return Ok(response);
            }

            let n = self
                .stream
                .read_buf(&mut self.read_buffer)
                .await
                .map_err(|e| BoltError::Connection(format!("read failed: {e}")))?;
            if n == 0 {
                return Err(BoltError::ConnectionClosed);
            }
        }
    }

    /// Shut the transport down. Best effort.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

impl<S> std::fmt::Debug for BoltConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoltConnection")
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::message::SuccessMessage;
    use crate::bolt::packstream::PackStreamValue;
    use crate::bolt::BOLT_MAGIC;
    use bytes::BufMut;
    use tokio::io::{duplex, DuplexStream};
    use tokio_util::codec::Encoder as _;

    /// Encode a server-side response into raw chunked bytes.
    fn server_bytes(response: BoltResponse) -> BytesMut {
        let mut codec = crate::bolt::codec::ChunkedCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(PackStreamValue::Structure(response.to_structure()), &mut buf)
            .unwrap();
        buf
    }

    async fn serve_handshake(server: &mut DuplexStream, pick: [u8; 4]) {
        let mut request = [0u8; 20];
        server.read_exact(&mut request).await.unwrap();
        assert_eq!(&request[0..4], &BOLT_MAGIC);
        server.write_all(&pick).await.unwrap();
    }

    #[tokio::test]
    async fn handshake_negotiates_version() {
        let (client_io, mut server) = duplex(4096);
        let mut conn = BoltConnection::new(client_io);

        let server_task = tokio::spawn(async move {
            serve_handshake(&mut server, [0, 0, 5, 0]).await;
            server
        });

        let version = conn.handshake().await.unwrap();
        assert_eq!(version, BoltVersion::V5_0);
        assert_eq!(conn.version(), Some(BoltVersion::V5_0));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn handshake_proposals_on_wire() {
        let (client_io, mut server) = duplex(4096);
        let mut conn = BoltConnection::new(client_io);

        let server_task = tokio::spawn(async move {
            let mut request = [0u8; 20];
            server.read_exact(&mut request).await.unwrap();
            // magic, then 5.0 / 4.4 / 4.3 / 4.2
            assert_eq!(&request[0..4], &[0x60, 0x60, 0xB0, 0x17]);
            assert_eq!(&request[4..8], &[0, 0, 5, 0]);
            assert_eq!(&request[8..12], &[0, 0, 4, 4]);
            assert_eq!(&request[12..16], &[0, 0, 4, 3]);
            assert_eq!(&request[16..20], &[0, 0, 4, 2]);
            server.write_all(&[0, 0, 4, 4]).await.unwrap();
        });

        assert_eq!(conn.handshake().await.unwrap(), BoltVersion::V4_4);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn handshake_rejection() {
        let (client_io, mut server) = duplex(4096);
        let mut conn = BoltConnection::new(client_io);

        let server_task = tokio::spawn(async move {
            serve_handshake(&mut server, [0, 0, 0, 0]).await;
        });

        assert!(matches!(
            conn.handshake().await.unwrap_err(),
            BoltError::Handshake(_)
        ));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn send_and_recv() {
        let (client_io, mut server) = duplex(65536);
        let mut conn = BoltConnection::new(client_io);

        let server_task = tokio::spawn(async move {
            // Swallow whatever the client wrote, answer with SUCCESS.
            let mut scratch = [0u8; 1024];
            let _ = server.read(&mut scratch).await.unwrap();
            let mut success = SuccessMessage::new();
            success.add("server", PackStreamValue::String("TestServer/1.0".into()));
            let bytes = server_bytes(BoltResponse::Success(success));
            server.write_all(&bytes).await.unwrap();
        });

        conn.send(BoltRequest::Reset).await.unwrap();
        let response = conn.recv().await.unwrap();
        assert!(response.is_success());
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn recv_on_closed_transport() {
        let (client_io, server) = duplex(4096);
        drop(server);
        let mut conn = BoltConnection::new(client_io);

        assert!(matches!(
            conn.recv().await.unwrap_err(),
            BoltError::ConnectionClosed
        ));
    }

    #[tokio::test]
    async fn recv_reassembles_split_chunks() {
        let (client_io, mut server) = duplex(4096);
        let mut conn = BoltConnection::new(client_io);

        let mut success = SuccessMessage::new();
        success.add("fields", PackStreamValue::List(vec![]));
        let bytes = server_bytes(BoltResponse::Success(success));

        // Dribble the bytes a few at a time.
        let server_task = tokio::spawn(async move {
            for chunk in bytes.chunks(3) {
                server.write_all(chunk).await.unwrap();
                server.flush().await.unwrap();
                tokio::task::yield_now().await;
            }
            server
        });

        let response = conn.recv().await.unwrap();
        assert!(response.is_success());
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn noop_frames_are_skipped() {
        let (client_io, mut server) = duplex(4096);
        let mut conn = BoltConnection::new(client_io);

        let server_task = tokio::spawn(async move {
            let mut buf = BytesMut::new();
            buf.put_slice(&[0x00, 0x00]); // NOOP keepalive
            buf.extend_from_slice(&server_bytes(BoltResponse::Ignored));
            server.write_all(&buf).await.unwrap();
        });

        let response = conn.recv().await.unwrap();
        assert!(matches!(response, BoltResponse::Ignored));
        server_task.await.unwrap();
    }
}
