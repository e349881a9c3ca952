//! Standard input relay

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use ng_core::SessionError;
use ng_protocol::ChunkType;

use super::wire::send_chunk;

/// Default size of each forwarded stdin block
pub const DEFAULT_STDIN_BLOCK_SIZE: usize = 8 * 1024;

/// How the relay stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Local input reached end of file and the end marker was sent
    Finished { bytes: u64 },
    /// The session ended first
    Cancelled,
}

/// Forwards local input to the server as stdin chunks
pub struct StdinRelay<I> {
    input: I,
    block_size: usize,
    start_gate: Option<Arc<Notify>>,
}

impl<I: AsyncRead + Unpin> StdinRelay<I> {
    pub fn new(input: I) -> Self {
        Self {
            input,
            block_size: DEFAULT_STDIN_BLOCK_SIZE,
            start_gate: None,
        }
    }

    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size.max(1);
        self
    }

    /// Do not touch local input until `gate` is notified
    pub fn wait_for(mut self, gate: Arc<Notify>) -> Self {
        self.start_gate = Some(gate);
        self
    }

    /// Relay until end of input or cancellation.
    ///
    /// Cancellation wins over any pending read or write, and a write that
    /// fails after cancellation is not an error.
    pub async fn run<W>(
        mut self,
        writer: &mut W,
        cancel: &CancellationToken,
    ) -> Result<RelayOutcome, SessionError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if let Some(gate) = self.start_gate.take() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(RelayOutcome::Cancelled),
                _ = gate.notified() => tracing::debug!("Server requested input"),
            }
        }

        let mut buf = vec![0u8; self.block_size];
        let mut total: u64 = 0;

        loop {
            let n = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(RelayOutcome::Cancelled),
                read = self.input.read(&mut buf) => read,
            };
            let n = match n {
                Ok(n) => n,
                Err(e) => {
                    // Let a server blocked on stdin see end of input
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {}
                        sent = send_chunk(writer, ChunkType::StdinEof, &[]) => {
                            if let Err(send_err) = sent {
                                tracing::debug!("Failed to send end of input: {}", send_err);
                            }
                        }
                    }
                    return Err(SessionError::LocalInput(e));
                }
            };

            let chunk_type = if n == 0 {
                ChunkType::StdinEof
            } else {
                ChunkType::Stdin
            };
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(RelayOutcome::Cancelled),
                sent = send_chunk(writer, chunk_type, &buf[..n]) => sent,
            };
            if let Err(e) = sent {
                if cancel.is_cancelled() {
                    return Ok(RelayOutcome::Cancelled);
                }
                return Err(e);
            }

            if n == 0 {
                tracing::debug!(bytes = total, "Local input finished");
                return Ok(RelayOutcome::Finished { bytes: total });
            }
            total += n as u64;
        }
    }
}
