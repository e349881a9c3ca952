//! Chunk header encoding/decoding
//!
//! The frame format uses a 5-byte header:
//! - payload_length: 4 bytes (u32, big-endian)
//! - chunk_type: 1 byte (ASCII tag)
//!
//! The payload follows immediately; frames are sent back to back with no
//! padding or delimiter.

use bytes::{BufMut, BytesMut};

use crate::chunk::ChunkType;
use crate::error::ProtocolError;

/// Size of the frame header in bytes
pub const HEADER_SIZE: usize = 5;

/// Largest payload the 32-bit length field can describe
pub const MAX_CHUNK_PAYLOAD: usize = u32::MAX as usize;

/// Frame header: payload length and the raw tag byte.
///
/// The tag is kept raw so a reader can report unrecognized tags instead of
/// failing inside the header parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Length of the payload in bytes
    pub payload_length: u32,
    /// Raw tag byte
    pub tag: u8,
}

impl ChunkHeader {
    /// Create a header for a known chunk type
    pub fn new(chunk_type: ChunkType, payload_length: u32) -> Self {
        Self {
            payload_length,
            tag: chunk_type.as_u8(),
        }
    }

    /// Create a header for a payload, rejecting lengths the wire cannot carry
    pub fn for_payload(chunk_type: ChunkType, payload: &[u8]) -> Result<Self, ProtocolError> {
        let payload_length =
            u32::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_CHUNK_PAYLOAD,
            })?;
        Ok(Self::new(chunk_type, payload_length))
    }

    /// Resolve the tag into a chunk type
    pub fn chunk_type(&self) -> Result<ChunkType, ProtocolError> {
        ChunkType::from_u8(self.tag).ok_or(ProtocolError::UnknownChunkType(self.tag))
    }

    /// Serialize the header into its wire form
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let len = self.payload_length.to_be_bytes();
        [len[0], len[1], len[2], len[3], self.tag]
    }

    /// Parse a header from exactly [`HEADER_SIZE`] bytes. Pure, no I/O.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            payload_length: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            tag: bytes[4],
        }
    }

    /// Encode the header into a byte buffer
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32(self.payload_length);
        dst.put_u8(self.tag);
    }

    /// Decode a header from the front of a buffer without consuming it
    ///
    /// Returns None if there aren't enough bytes in the buffer.
    pub fn peek(src: &[u8]) -> Option<Self> {
        let bytes: &[u8; HEADER_SIZE] = src.get(..HEADER_SIZE)?.try_into().ok()?;
        Some(Self::from_bytes(bytes))
    }
}

/// Encode a complete frame (header followed by payload)
pub fn encode_chunk(chunk_type: ChunkType, payload: &[u8]) -> Result<BytesMut, ProtocolError> {
    let header = ChunkHeader::for_payload(chunk_type, payload)?;
    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    header.encode(&mut frame);
    frame.extend_from_slice(payload);
    Ok(frame)
}
