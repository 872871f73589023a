//! Chunked message framing for the Bolt transport.
//!
//! Each message is a sequence of chunks, every chunk a 2-byte big-endian
//! length followed by that many payload bytes, terminated by a zero
//! length. A zero length with no accumulated payload is a NOOP keepalive
//! and is skipped.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::message::{BoltRequest, BoltResponse};
use super::packstream::{decode, encode, PackStreamValue};
use super::BoltError;

/// Maximum payload carried by a single chunk (16 KiB).
pub const MAX_CHUNK_SIZE: usize = 16384;

/// End-of-message marker.
pub const END_MARKER: [u8; 2] = [0x00, 0x00];

/// Default cap on a reassembled message (16 MiB).
const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Framing codec: PackStream values in, chunked bytes out and back.
#[derive(Debug)]
pub struct ChunkedCodec {
    max_message_size: usize,
    message_buffer: BytesMut,
}

impl ChunkedCodec {
    /// Create a codec with the default message size limit.
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a codec with a custom message size limit.
    pub fn with_max_size(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            message_buffer: BytesMut::with_capacity(4096),
        }
    }

    fn encode_chunked(&self, data: &[u8], dst: &mut BytesMut) {
        let mut offset = 0;
        while offset < data.len() {
            let chunk = (data.len() - offset).min(MAX_CHUNK_SIZE);
            dst.put_u16(chunk as u16);
            dst.put_slice(&data[offset..offset + chunk]);
            offset += chunk;
        }
        dst.put_slice(&END_MARKER);
    }
}

impl Default for ChunkedCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedCodec {
    type Item = PackStreamValue;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }

            let chunk_size = u16::from_be_bytes([src[0], src[1]]) as usize;

            if chunk_size == 0 {
                src.advance(2);

                if self.message_buffer.is_empty() {
                    // NOOP keepalive
                    continue;
                }

                let message = self.message_buffer.split();
                let value = decode(&message).map_err(BoltError::PackStream)?;
                return Ok(Some(value));
            }

            if src.len() < 2 + chunk_size {
                return Ok(None);
            }

            if self.message_buffer.len() + chunk_size > self.max_message_size {
                return Err(BoltError::MessageTooLarge {
                    size: self.message_buffer.len() + chunk_size,
                    max: self.max_message_size,
                });
            }

            src.advance(2);
            self.message_buffer.extend_from_slice(&src[..chunk_size]);
            src.advance(chunk_size);
        }
    }
}

impl Encoder<PackStreamValue> for ChunkedCodec {
    type Error = BoltError;

    fn encode(&mut self, item: PackStreamValue, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let encoded = encode(&item).map_err(BoltError::PackStream)?;
        self.encode_chunked(&encoded, dst);
        Ok(())
    }
}

/// Client-side codec: encodes requests, decodes responses.
#[derive(Debug, Default)]
pub struct BoltClientCodec {
    inner: ChunkedCodec,
}

impl BoltClientCodec {
    /// Create a new client codec.
    pub fn new() -> Self {
        Self {
            inner: ChunkedCodec::new(),
        }
    }
}

impl Decoder for BoltClientCodec {
    type Item = BoltResponse;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(value) => {
                let structure = value
                    .as_structure()
                    .ok_or_else(|| BoltError::Protocol("expected a message structure".into()))?;
                let response =
                    BoltResponse::from_structure(structure).map_err(BoltError::PackStream)?;
                Ok(Some(response))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<BoltRequest> for BoltClientCodec {
    type Error = BoltError;

    fn encode(&mut self, item: BoltRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let value = PackStreamValue::Structure(item.to_structure());
        self.inner.encode(value, dst)
    }
}
