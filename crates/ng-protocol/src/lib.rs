//! ng-protocol: Chunk framing for the nailgun protocol
//!
//! Every frame on the wire is a 4-byte big-endian payload length, a 1-byte
//! ASCII tag and the payload. This crate holds the tag set, the header codec
//! and a tokio codec for whole chunks; it does no socket I/O of its own.

pub mod chunk;
pub mod codec;
pub mod error;
pub mod frame;

pub use chunk::{ChunkType, Direction};
pub use codec::{Chunk, ChunkCodec, DEFAULT_MAX_PAYLOAD};
pub use error::ProtocolError;
pub use frame::{encode_chunk, ChunkHeader, HEADER_SIZE, MAX_CHUNK_PAYLOAD};
