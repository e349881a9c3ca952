//! Server address resolution

use std::fmt;
use std::path::PathBuf;

use crate::error::ConnectionError;

/// Prefix that selects a local domain socket instead of TCP
pub const LOCAL_PREFIX: &str = "local:";

/// Where the nailgun server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAddress {
    /// TCP host and port
    Tcp { host: String, port: u16 },
    /// Local domain socket path
    Local(PathBuf),
}

impl ServerAddress {
    /// Resolve a configured server string and port.
    ///
    /// `local:<path>` selects a domain socket and ignores the port; anything
    /// else is a TCP host name or IP literal.
    pub fn resolve(server: &str, port: u16) -> Result<Self, ConnectionError> {
        let server = server.trim();
        if let Some(path) = server.strip_prefix(LOCAL_PREFIX) {
            if path.is_empty() {
                return Err(ConnectionError::InvalidAddress(server.to_string()));
            }
            return Ok(Self::Local(PathBuf::from(path)));
        }
        if server.is_empty() {
            return Err(ConnectionError::InvalidAddress(server.to_string()));
        }
        Ok(Self::Tcp {
            host: server.to_string(),
            port,
        })
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Bracket bare IPv6 literals so the port stays unambiguous
            Self::Tcp { host, port } if host.contains(':') => write!(f, "[{}]:{}", host, port),
            Self::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Self::Local(path) => write!(f, "{}{}", LOCAL_PREFIX, path.display()),
        }
    }
}
