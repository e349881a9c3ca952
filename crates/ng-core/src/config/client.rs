//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::address::ServerAddress;
use super::serde_utils::{duration_millis, option_duration_secs};
use crate::error::{ConfigError, ConnectionError};

/// Default server host
pub const DEFAULT_SERVER: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 2113;

/// Largest accepted stdin block or read buffer (16 MiB)
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Environment variable overriding the server host (or `local:<path>`)
pub const SERVER_ENV: &str = "NAILGUN_SERVER";

/// Environment variable overriding the server port
pub const PORT_ENV: &str = "NAILGUN_PORT";

/// Configuration for one client invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host, or `local:<path>` for a domain socket
    pub server: String,

    /// Server TCP port
    pub port: u16,

    /// Deadline for the whole response phase (None = wait forever)
    #[serde(with = "option_duration_secs", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Size of each stdin block forwarded to the server
    pub stdin_block_size: usize,

    /// Largest single read when forwarding server output
    pub read_buffer_size: usize,

    /// Hold stdin until the server sends its first start-input chunk
    pub wait_for_start_input: bool,

    /// Connection retry policy
    pub connect: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            timeout: None,
            stdin_block_size: 8 * 1024,
            read_buffer_size: 16 * 1024,
            wait_for_start_input: false,
            connect: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Resolve the configured server into an address
    pub fn address(&self) -> Result<ServerAddress, ConnectionError> {
        ServerAddress::resolve(&self.server, self.port)
    }

    /// Apply `NAILGUN_SERVER` / `NAILGUN_PORT` style overrides.
    ///
    /// Empty values are ignored, matching an unset variable.
    pub fn apply_overrides(
        &mut self,
        server: Option<&str>,
        port: Option<&str>,
    ) -> Result<(), ConfigError> {
        if let Some(server) = server.filter(|s| !s.trim().is_empty()) {
            self.server = server.trim().to_string();
        }
        if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;
        }
        Ok(())
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, size) in [
            ("stdin_block_size", self.stdin_block_size),
            ("read_buffer_size", self.read_buffer_size),
        ] {
            if !(1..=MAX_BUFFER_SIZE).contains(&size) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 1 and {} bytes",
                    name, MAX_BUFFER_SIZE
                )));
            }
        }
        if self.connect.attempts == 0 {
            return Err(ConfigError::Invalid("connect.attempts must be > 0".into()));
        }
        if self.connect.multiplier < 1.0 {
            return Err(ConfigError::Invalid("connect.multiplier must be >= 1.0".into()));
        }
        if !(0.0..=1.0).contains(&self.connect.jitter) {
            return Err(ConfigError::Invalid(
                "connect.jitter must be between 0.0 and 1.0".into(),
            ));
        }
        Ok(())
    }
}

/// Connection retry configuration
///
/// The defaults reproduce a fixed policy: ten attempts, 50 ms apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total connection attempts (including the first)
    pub attempts: u32,

    /// Delay after the first failed attempt
    #[serde(with = "duration_millis")]
    pub initial_delay: Duration,

    /// Upper bound on the delay
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,

    /// Multiplier applied after each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(50),
            multiplier: 1.0,
            jitter: 0.0,
        }
    }
}
