//! Protocol error types

use thiserror::Error;

use crate::chunk::ChunkType;

/// Errors that can occur during protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Tag byte outside the protocol's tag set
    #[error("Unknown chunk type: {tag:?} (0x{0:02x})", tag = char::from(*.0))]
    UnknownChunkType(u8),

    /// Known tag arriving from the wrong side of the connection
    #[error("Unexpected chunk type from server: {0}")]
    UnexpectedChunk(ChunkType),

    /// Start-input signal carrying a payload
    #[error("Expected empty start-input chunk, got {0} bytes")]
    NonEmptyStartInput(u32),

    /// Exit chunk payload is not a decimal integer
    #[error("Invalid exit code payload: {0:?}")]
    InvalidExitCode(String),

    /// Payload exceeds maximum size
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
