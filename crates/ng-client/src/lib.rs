//! ng-client: Nailgun protocol client
//!
//! Runs a command on a long-lived nailgun server: the request is written,
//! local stdin is relayed while the server's stdout and stderr are streamed
//! back, and the server's exit status becomes the result.

pub mod output;
pub mod session;

pub use session::{ExitResult, Session, SessionOptions, SESSION_FAILURE_EXIT_CODE};
