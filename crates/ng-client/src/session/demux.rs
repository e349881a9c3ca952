//! Response demultiplexing
//!
//! The server interleaves stdout, stderr and control chunks on one stream.
//! The demultiplexer reads one header at a time and either streams the
//! payload to the matching sink or handles the control chunk, until the exit
//! chunk ends the exchange.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;

use ng_core::{SessionError, TransportError};
use ng_protocol::{ChunkHeader, ChunkType, Direction, ProtocolError, HEADER_SIZE};

use super::wire::read_full;

/// Default largest single read when forwarding output
pub const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;

/// Longest exit payload accepted; an i32 needs at most 11 characters
pub const MAX_EXIT_PAYLOAD: u32 = 32;

/// Routes server chunks to the output and error sinks
pub struct Demultiplexer<R, O, E> {
    reader: R,
    stdout: O,
    stderr: E,
    buffer: Vec<u8>,
    start_input: Option<Arc<Notify>>,
}

impl<R, O, E> Demultiplexer<R, O, E>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    /// Create a demultiplexer over a reader and two sinks
    pub fn new(reader: R, stdout: O, stderr: E) -> Self {
        Self {
            reader,
            stdout,
            stderr,
            buffer: vec![0; DEFAULT_READ_BUFFER_SIZE],
            start_input: None,
        }
    }

    /// Bound each socket read to `size` bytes
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer = vec![0; size.max(1)];
        self
    }

    /// Notify `signal` whenever the server sends a start-input chunk
    pub fn with_start_input_signal(mut self, signal: Arc<Notify>) -> Self {
        self.start_input = Some(signal);
        self
    }

    /// Read chunks until the exit chunk, returning the exit code.
    ///
    /// Output already forwarded stays forwarded when a later chunk fails.
    pub async fn run(&mut self) -> Result<i32, SessionError> {
        loop {
            let mut raw = [0u8; HEADER_SIZE];
            read_full(&mut self.reader, &mut raw).await?;
            let header = ChunkHeader::from_bytes(&raw);
            let chunk_type = header.chunk_type()?;
            let length = header.payload_length;

            tracing::trace!(%chunk_type, length, "Received chunk");

            if chunk_type.direction() != Direction::ServerToClient {
                return Err(ProtocolError::UnexpectedChunk(chunk_type).into());
            }
            if chunk_type.requires_empty_payload() && length != 0 {
                return Err(ProtocolError::NonEmptyStartInput(length).into());
            }

            match chunk_type {
                ChunkType::Stdout => {
                    forward(
                        &mut self.reader,
                        &mut self.stdout,
                        &mut self.buffer,
                        length,
                        "stdout",
                    )
                    .await?
                }
                ChunkType::Stderr => {
                    forward(
                        &mut self.reader,
                        &mut self.stderr,
                        &mut self.buffer,
                        length,
                        "stderr",
                    )
                    .await?
                }
                ChunkType::StartInput => {
                    if let Some(signal) = &self.start_input {
                        signal.notify_one();
                    }
                }
                ChunkType::Exit => {
                    if length > MAX_EXIT_PAYLOAD {
                        return Err(ProtocolError::PayloadTooLarge {
                            size: length as usize,
                            max: MAX_EXIT_PAYLOAD as usize,
                        }
                        .into());
                    }
                    let mut payload = vec![0u8; length as usize];
                    read_full(&mut self.reader, &mut payload).await?;
                    let code = parse_exit_code(&payload)?;
                    tracing::debug!(code, "Received exit status");
                    return Ok(code);
                }
                other => return Err(ProtocolError::UnexpectedChunk(other).into()),
            }
        }
    }
}

/// Stream `length` payload bytes to `sink`, one bounded read at a time
async fn forward<R, W>(
    reader: &mut R,
    sink: &mut W,
    buffer: &mut [u8],
    length: u32,
    sink_name: &'static str,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let expected = length as usize;
    let mut remaining = expected;

    while remaining > 0 {
        let want = remaining.min(buffer.len());
        let n = reader
            .read(&mut buffer[..want])
            .await
            .map_err(TransportError::Io)?;
        if n == 0 {
            return Err(TransportError::ShortRead {
                expected,
                actual: expected - remaining,
            }
            .into());
        }

        let sink_error = |source| SessionError::Sink {
            sink: sink_name,
            source,
        };
        sink.write_all(&buffer[..n]).await.map_err(sink_error)?;
        sink.flush().await.map_err(sink_error)?;
        remaining -= n;
    }
    Ok(())
}

/// Parse an exit payload: optional `-`, then ASCII digits only
pub fn parse_exit_code(payload: &[u8]) -> Result<i32, ProtocolError> {
    let invalid = || ProtocolError::InvalidExitCode(String::from_utf8_lossy(payload).into_owned());

    let text = std::str::from_utf8(payload).map_err(|_| invalid())?;
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    text.parse().map_err(|_| invalid())
}
