//! ng-core: Configuration, transport and error types for the nailgun client
//!
//! Everything around the protocol engine lives here: where the server is,
//! how to reach it, what the invocation looks like, and how failures are
//! classified.

pub mod config;
pub mod error;
pub mod invocation;
pub mod transport;

pub use error::{ConfigError, ConnectionError, SessionError, TransportError};
pub use invocation::Invocation;
