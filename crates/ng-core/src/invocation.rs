//! Snapshot of the command invocation sent to the server

use std::ffi::OsString;
use std::path::PathBuf;

/// Name of the synthetic environment entry carrying the file separator
pub const FILE_SEPARATOR_VAR: &str = "NAILGUN_FILESEPARATOR";

/// Name of the synthetic environment entry carrying the path separator
pub const PATH_SEPARATOR_VAR: &str = "NAILGUN_PATHSEPARATOR";

/// Everything the server needs to run one command.
///
/// Captured once by the entry point and handed to the request encoder, so
/// the protocol engine never reads process-global state. Strings are kept
/// as the platform hands them over; payloads carry their raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command (class or alias) the server should run
    pub command: OsString,
    /// Arguments forwarded to the command, in order
    pub args: Vec<OsString>,
    /// Environment entries as name/value pairs, in enumeration order
    pub env: Vec<(OsString, OsString)>,
    /// Absolute working directory
    pub working_dir: PathBuf,
}

impl Invocation {
    /// Create an invocation with an empty environment
    pub fn new(command: impl Into<OsString>, args: Vec<OsString>, working_dir: PathBuf) -> Self {
        Self {
            command: command.into(),
            args,
            env: Vec::new(),
            working_dir,
        }
    }

    /// Capture the current process environment and working directory
    pub fn capture(command: impl Into<OsString>, args: Vec<OsString>) -> std::io::Result<Self> {
        Ok(Self {
            command: command.into(),
            args,
            env: std::env::vars_os().collect(),
            working_dir: std::env::current_dir()?,
        })
    }

    /// Replace the environment snapshot
    pub fn with_env(mut self, env: Vec<(OsString, OsString)>) -> Self {
        self.env = env;
        self
    }

    /// Command name for log output
    pub fn command_name(&self) -> std::borrow::Cow<'_, str> {
        self.command.to_string_lossy()
    }

    /// Environment entries as `NAME=VALUE` bytes
    pub fn env_entries(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.env.iter().map(|(name, value)| {
            let mut entry = Vec::with_capacity(name.len() + value.len() + 1);
            entry.extend_from_slice(name.as_encoded_bytes());
            entry.push(b'=');
            entry.extend_from_slice(value.as_encoded_bytes());
            entry
        })
    }
}

/// The two synthetic separator entries appended after the real environment.
///
/// Values are single-character literals quoted like `':'`. The
/// file-separator entry carries the path-list separator and the
/// path-separator entry the path component separator, which is what
/// existing servers have always received.
pub fn separator_entries() -> [String; 2] {
    let list_separator = if cfg!(windows) { ';' } else { ':' };
    [
        format!("{}={}", FILE_SEPARATOR_VAR, quote_char(list_separator)),
        format!(
            "{}={}",
            PATH_SEPARATOR_VAR,
            quote_char(std::path::MAIN_SEPARATOR)
        ),
    ]
}

/// Quote a character as a single-character literal (`'\\'` for backslash)
pub fn quote_char(c: char) -> String {
    format!("'{}'", c.escape_default())
}
