//! Transport to the nailgun server
//!
//! Produces one open duplex byte stream for a [`ServerAddress`]. Retrying
//! belongs here, before a session exists; a session never redials.

mod backoff;

pub use backoff::ExponentialBackoff;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::config::{RetryConfig, ServerAddress};
use crate::error::ConnectionError;

/// A connected duplex byte stream
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Boxed transport handed to a session
pub type BoxedTransport = Box<dyn Transport>;

/// Opens connections to a server address
#[async_trait]
pub trait Connector: Send + Sync {
    /// Make a single connection attempt
    async fn connect(&self, address: &ServerAddress) -> std::io::Result<BoxedTransport>;
}

/// Connector for TCP and local domain sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketConnector;

#[async_trait]
impl Connector for SocketConnector {
    async fn connect(&self, address: &ServerAddress) -> std::io::Result<BoxedTransport> {
        match address {
            ServerAddress::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port)).await?;
                stream.set_nodelay(true)?;
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            ServerAddress::Local(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok(Box::new(stream))
            }
            #[cfg(not(unix))]
            ServerAddress::Local(path) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("local sockets are not supported here: {}", path.display()),
            )),
        }
    }
}

/// Connect with a bounded number of attempts.
///
/// Sleeps according to the backoff between failed attempts and returns the
/// last error once `policy.attempts` is exhausted.
pub async fn connect_with_retry(
    connector: &dyn Connector,
    address: &ServerAddress,
    policy: &RetryConfig,
) -> Result<BoxedTransport, ConnectionError> {
    let attempts = policy.attempts.max(1);
    let mut backoff = ExponentialBackoff::from_config(policy);

    loop {
        let attempt = backoff.retries() + 1;
        match connector.connect(address).await {
            Ok(stream) => {
                tracing::debug!(%address, attempt, "Connected to nailgun server");
                return Ok(stream);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Unsupported => {
                return Err(ConnectionError::UnsupportedTransport(e.to_string()));
            }
            Err(e) if attempt >= attempts => {
                return Err(ConnectionError::Unreachable {
                    address: address.to_string(),
                    attempts,
                    source: e,
                });
            }
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::debug!(
                    %address,
                    attempt,
                    max_attempts = attempts,
                    ?delay,
                    "Connection attempt failed: {}",
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
