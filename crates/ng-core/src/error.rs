//! Core error types for the nailgun client

use ng_protocol::ProtocolError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of the byte stream itself
#[derive(Error, Debug)]
pub enum TransportError {
    /// Stream ended before the requested bytes arrived
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Stream accepted zero bytes while a frame was being written
    #[error("Short write: failed to deliver {expected}-byte frame")]
    ShortWrite { expected: usize },

    /// Any other socket failure (reset, refused, broken pipe)
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end (or accompany) a session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Network or socket failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Server sent something the protocol does not allow
    #[error("Protocol violation: {0}")]
    Protocol(ProtocolError),

    /// Reading local standard input failed
    #[error("Failed to read local input: {0}")]
    LocalInput(#[source] std::io::Error),

    /// Writing forwarded output to a local sink failed
    #[error("Failed to write to {sink}: {source}")]
    Sink {
        sink: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Session exceeded its deadline
    #[error("Session timed out after {0:?}")]
    TimedOut(Duration),
}

impl SessionError {
    /// Whether the failure came from the network rather than the server
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether the server misbehaved
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            // Codec plumbing surfaces socket failures as ProtocolError::Io
            ProtocolError::Io(io) => Self::Transport(TransportError::Io(io)),
            other => Self::Protocol(other),
        }
    }
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Every connection attempt failed
    #[error("Unable to connect to nailgun server at {address} after {attempts} attempt(s): {source}")]
    Unreachable {
        address: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// Address could not be parsed
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    /// Address kind not available on this platform
    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Port value out of range or not numeric
    #[error("Invalid port: {0}")]
    InvalidPort(String),
}
