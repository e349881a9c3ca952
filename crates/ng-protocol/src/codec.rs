//! Tokio codec for whole chunks
//!
//! Useful where a chunk can be buffered in full: scripted servers in tests,
//! request capture, tooling. The client's response path streams large output
//! payloads instead and reads headers directly (see `ng-client`).

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::chunk::ChunkType;
use crate::error::ProtocolError;
use crate::frame::{ChunkHeader, HEADER_SIZE};

/// Default cap on a decoded payload (16 MiB)
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// A complete chunk with type and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk type
    pub chunk_type: ChunkType,
    /// Raw payload bytes
    pub payload: Bytes,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(chunk_type: ChunkType, payload: impl Into<Bytes>) -> Self {
        Self {
            chunk_type,
            payload: payload.into(),
        }
    }

    /// Create a chunk with an empty payload
    pub fn empty(chunk_type: ChunkType) -> Self {
        Self::new(chunk_type, Bytes::new())
    }

    /// Payload as UTF-8 text, lossily
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Codec for encoding/decoding whole chunks
#[derive(Debug)]
pub struct ChunkCodec {
    /// Current header being decoded (if any)
    pending_header: Option<(ChunkType, usize)>,
    /// Largest payload accepted by the decoder
    max_payload: usize,
}

impl ChunkCodec {
    /// Create a new codec with the default payload cap
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Create a codec with a custom payload cap
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            pending_header: None,
            max_payload,
        }
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkCodec {
    type Item = Chunk;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (chunk_type, payload_len) = match self.pending_header.take() {
            Some(pending) => pending,
            None => {
                let header = match ChunkHeader::peek(src) {
                    Some(h) => h,
                    None => return Ok(None),
                };
                let chunk_type = header.chunk_type()?;
                let payload_len = header.payload_length as usize;
                if payload_len > self.max_payload {
                    tracing::warn!(
                        "Rejecting {} chunk of {} bytes (cap {})",
                        chunk_type,
                        payload_len,
                        self.max_payload
                    );
                    return Err(ProtocolError::PayloadTooLarge {
                        size: payload_len,
                        max: self.max_payload,
                    });
                }
                src.advance(HEADER_SIZE);
                (chunk_type, payload_len)
            }
        };

        if src.len() < payload_len {
            src.reserve(payload_len - src.len());
            self.pending_header = Some((chunk_type, payload_len));
            return Ok(None);
        }

        let payload = src.split_to(payload_len).freeze();
        Ok(Some(Chunk {
            chunk_type,
            payload,
        }))
    }
}

impl Encoder<Chunk> for ChunkCodec {
    type Error = ProtocolError;

    fn encode(&mut self, chunk: Chunk, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let header = ChunkHeader::for_payload(chunk.chunk_type, &chunk.payload)?;
        header.encode(dst);
        dst.extend_from_slice(&chunk.payload);
        Ok(())
    }
}
