//! Nailgun session engine
//!
//! One session drives one connection through its whole life:
//!
//! 1. The request (arguments, environment, working directory, command) is
//!    written in order.
//! 2. The stdin relay and the response demultiplexer then run side by side
//!    on the two halves of the connection.
//! 3. When the demultiplexer stops, the relay is cancelled, the halves are
//!    rejoined and the connection is shut down once.

mod demux;
mod request;
mod stdin;
mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use demux::{parse_exit_code, Demultiplexer, DEFAULT_READ_BUFFER_SIZE, MAX_EXIT_PAYLOAD};
pub use request::RequestEncoder;
pub use stdin::{RelayOutcome, StdinRelay, DEFAULT_STDIN_BLOCK_SIZE};

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, Stderr, Stdout};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use ng_core::config::ClientConfig;
use ng_core::{Invocation, SessionError};

/// Process exit code when the server never sent an exit status
pub const SESSION_FAILURE_EXIT_CODE: i32 = 2;

/// Tunables for a single session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub stdin_block_size: usize,
    pub read_buffer_size: usize,
    /// Deadline for the response phase
    pub timeout: Option<Duration>,
    pub wait_for_start_input: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            stdin_block_size: DEFAULT_STDIN_BLOCK_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            timeout: None,
            wait_for_start_input: false,
        }
    }
}

impl From<&ClientConfig> for SessionOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            stdin_block_size: config.stdin_block_size,
            read_buffer_size: config.read_buffer_size,
            timeout: config.timeout,
            wait_for_start_input: config.wait_for_start_input,
        }
    }
}

/// Outcome of a finished session
#[derive(Debug)]
pub struct ExitResult {
    /// Exit status reported by the server, if one arrived
    pub exit_code: Option<i32>,
    /// Fatal transport or protocol failure
    pub error: Option<SessionError>,
    /// Failure of the stdin relay, reported alongside the exit status
    pub input_error: Option<SessionError>,
}

impl ExitResult {
    fn failed(error: SessionError) -> Self {
        Self {
            exit_code: None,
            error: Some(error),
            input_error: None,
        }
    }

    /// True when the server reported exit status 0
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.exit_code == Some(0)
    }

    /// Exit code for the client process
    pub fn process_exit_code(&self) -> i32 {
        self.exit_code.unwrap_or(SESSION_FAILURE_EXIT_CODE)
    }
}

/// A single command execution over an open connection
pub struct Session<S, O = Stdout, E = Stderr> {
    stream: S,
    stdout: O,
    stderr: E,
    options: SessionOptions,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session that writes to the process stdout and stderr
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            stdout: tokio::io::stdout(),
            stderr: tokio::io::stderr(),
            options: SessionOptions::default(),
        }
    }
}

impl<S, O, E> Session<S, O, E>
where
    S: AsyncRead + AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Route server output to other sinks
    pub fn with_sinks<O2, E2>(self, stdout: O2, stderr: E2) -> Session<S, O2, E2> {
        Session {
            stream: self.stream,
            stdout,
            stderr,
            options: self.options,
        }
    }

    /// Run the invocation to completion, relaying `input` as stdin.
    ///
    /// Never panics on peer misbehaviour; every failure ends up in the
    /// returned [`ExitResult`].
    pub async fn run<I>(self, invocation: &Invocation, input: I) -> ExitResult
    where
        I: AsyncRead + Unpin,
    {
        let Session {
            mut stream,
            stdout,
            stderr,
            options,
        } = self;

        if let Err(e) = RequestEncoder::new(invocation).send(&mut stream).await {
            tracing::warn!("Failed to send request: {}", e);
            close(&mut stream).await;
            return ExitResult::failed(e);
        }

        let (mut reader, mut writer) = tokio::io::split(stream);
        let cancel = CancellationToken::new();

        let mut relay = StdinRelay::new(input).with_block_size(options.stdin_block_size);
        let mut demux = Demultiplexer::new(&mut reader, stdout, stderr)
            .with_buffer_size(options.read_buffer_size);
        if options.wait_for_start_input {
            let gate = Arc::new(Notify::new());
            relay = relay.wait_for(gate.clone());
            demux = demux.with_start_input_signal(gate);
        }

        let response = async {
            let result = match options.timeout {
                Some(limit) => tokio::time::timeout(limit, demux.run())
                    .await
                    .unwrap_or(Err(SessionError::TimedOut(limit))),
                None => demux.run().await,
            };
            // The exit chunk or a fatal error ends the session either way
            cancel.cancel();
            result
        };
        let (relayed, response) = tokio::join!(relay.run(&mut writer, &cancel), response);
        drop(demux);

        let mut stream = reader.unsplit(writer);
        close(&mut stream).await;

        let input_error = match relayed {
            Ok(RelayOutcome::Finished { bytes }) => {
                tracing::debug!(bytes, "Relayed local input");
                None
            }
            Ok(RelayOutcome::Cancelled) => None,
            Err(e) if e.is_transport() && response.is_ok() => {
                tracing::debug!("Ignoring relay failure after exit status: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Input relay failed: {}", e);
                Some(e)
            }
        };

        match response {
            Ok(code) => {
                tracing::info!(command = %invocation.command_name(), code, "Command finished");
                ExitResult {
                    exit_code: Some(code),
                    error: None,
                    input_error,
                }
            }
            Err(e) => {
                tracing::warn!(command = %invocation.command_name(), "Session failed: {}", e);
                ExitResult {
                    exit_code: None,
                    error: Some(e),
                    input_error,
                }
            }
        }
    }
}

async fn close<S: AsyncWrite + Unpin>(stream: &mut S) {
    if let Err(e) = stream.shutdown().await {
        tracing::debug!("Connection shutdown failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::testing::frame;
    use super::*;
    use futures::StreamExt;
    use ng_core::TransportError;
    use ng_protocol::{Chunk, ChunkCodec, ChunkType};
    use std::path::PathBuf;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
    use tokio_util::codec::FramedRead;

    type ServerReader = FramedRead<ReadHalf<DuplexStream>, ChunkCodec>;

    fn invocation() -> Invocation {
        Invocation::new(
            "com.example.Echo",
            vec!["--flag".into(), "value".into()],
            PathBuf::from("/work"),
        )
        .with_env(vec![("LANG".into(), "C".into())])
    }

    fn server(stream: DuplexStream) -> (ServerReader, WriteHalf<DuplexStream>) {
        let (read, write) = tokio::io::split(stream);
        (FramedRead::new(read, ChunkCodec::new()), write)
    }

    /// Read chunks up to and including the command chunk
    async fn read_request(reader: &mut ServerReader) -> Vec<Chunk> {
        let mut request = Vec::new();
        while let Some(chunk) = reader.next().await {
            let chunk = chunk.unwrap();
            let done = chunk.chunk_type == ChunkType::Command;
            request.push(chunk);
            if done {
                break;
            }
        }
        request
    }

    /// Read stdin chunks up to the end marker, returning the bytes
    async fn read_stdin(reader: &mut ServerReader) -> Vec<u8> {
        let mut data = Vec::new();
        while let Some(chunk) = reader.next().await {
            let chunk = chunk.unwrap();
            match chunk.chunk_type {
                ChunkType::Stdin => data.extend_from_slice(&chunk.payload),
                ChunkType::StdinEof => break,
                other => panic!("unexpected chunk from client: {other}"),
            }
        }
        data
    }

    #[tokio::test]
    async fn test_session_runs_to_exit_status() {
        let (client, server_end) = tokio::io::duplex(1024);
        let mut out = Vec::new();
        let mut err = Vec::new();

        let server_task = async move {
            let (mut reader, mut writer) = server(server_end);
            let request = read_request(&mut reader).await;
            let script = [
                frame(ChunkType::Stdout, b"hello"),
                frame(ChunkType::Stderr, b"oops"),
                frame(ChunkType::Exit, b"3"),
            ]
            .concat();
            writer.write_all(&script).await.unwrap();
            request
        };
        let input: &[u8] = b"";
        let invocation = invocation();
        let session = Session::new(client)
            .with_sinks(&mut out, &mut err)
            .run(&invocation, input);

        let (result, request) = tokio::join!(session, server_task);

        assert_eq!(result.exit_code, Some(3));
        assert!(result.error.is_none());
        assert!(result.input_error.is_none());
        assert!(!result.is_success());
        assert_eq!(result.process_exit_code(), 3);
        assert_eq!(out, b"hello");
        assert_eq!(err, b"oops");

        assert_eq!(request[0].chunk_type, ChunkType::Argument);
        assert_eq!(request[0].payload_str(), "--flag");
        assert_eq!(
            request.last().map(|c| c.chunk_type),
            Some(ChunkType::Command)
        );
    }

    #[tokio::test]
    async fn test_session_forwards_stdin() {
        let (client, server_end) = tokio::io::duplex(1024);
        let mut out = Vec::new();

        let server_task = async move {
            let (mut reader, mut writer) = server(server_end);
            read_request(&mut reader).await;
            let received = read_stdin(&mut reader).await;
            let script = [
                frame(ChunkType::Stdout, &received),
                frame(ChunkType::Exit, b"0"),
            ]
            .concat();
            writer.write_all(&script).await.unwrap();
        };
        let input: &[u8] = b"piped input";
        let options = SessionOptions {
            stdin_block_size: 3,
            ..Default::default()
        };
        let invocation = invocation();
        let session = Session::new(client)
            .with_options(options)
            .with_sinks(&mut out, tokio::io::sink())
            .run(&invocation, input);

        let (result, ()) = tokio::join!(session, server_task);

        assert!(result.is_success());
        assert_eq!(out, b"piped input");
    }

    #[tokio::test]
    async fn test_exit_cancels_pending_input_without_error() {
        let (client, server_end) = tokio::io::duplex(1024);
        // Never written to, so the relay stays blocked on input
        let (_keep, input) = tokio::io::duplex(64);

        let server_task = async move {
            let (mut reader, mut writer) = server(server_end);
            read_request(&mut reader).await;
            writer.write_all(&frame(ChunkType::Exit, b"0")).await.unwrap();
            reader
        };
        let invocation = invocation();
        let session = Session::new(client)
            .with_sinks(tokio::io::sink(), tokio::io::sink())
            .run(&invocation, input);

        let (result, mut reader) = tokio::join!(session, server_task);

        assert_eq!(result.exit_code, Some(0));
        assert!(result.error.is_none());
        assert!(result.input_error.is_none());
        // The client shut its side down without sending stdin
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_request_failure_skips_response_phase() {
        let (client, server_end) = tokio::io::duplex(64);
        drop(server_end);

        let input: &[u8] = b"";
        let invocation = invocation();
        let result = Session::new(client)
            .with_sinks(tokio::io::sink(), tokio::io::sink())
            .run(&invocation, input)
            .await;

        assert!(result.exit_code.is_none());
        assert!(result.error.as_ref().is_some_and(SessionError::is_transport));
        assert_eq!(result.process_exit_code(), SESSION_FAILURE_EXIT_CODE);
    }

    #[tokio::test]
    async fn test_protocol_violation_ends_session() {
        let (client, server_end) = tokio::io::duplex(1024);
        let mut out = Vec::new();

        let server_task = async move {
            let (mut reader, mut writer) = server(server_end);
            read_request(&mut reader).await;
            let mut script = frame(ChunkType::Stdout, b"partial");
            script.extend_from_slice(&[0, 0, 0, 1, b'Z', b'!']);
            writer.write_all(&script).await.unwrap();
            (reader, writer)
        };
        let input: &[u8] = b"";
        let invocation = invocation();
        let session = Session::new(client)
            .with_sinks(&mut out, tokio::io::sink())
            .run(&invocation, input);

        let (result, _server) = tokio::join!(session, server_task);

        assert!(result.exit_code.is_none());
        assert!(result
            .error
            .as_ref()
            .is_some_and(SessionError::is_protocol_violation));
        assert_eq!(result.process_exit_code(), SESSION_FAILURE_EXIT_CODE);
        assert_eq!(out, b"partial");
    }

    #[tokio::test]
    async fn test_server_hangup_is_transport_error() {
        let (client, server_end) = tokio::io::duplex(1024);

        let server_task = async move {
            let (mut reader, writer) = server(server_end);
            read_request(&mut reader).await;
            drop(writer);
            drop(reader);
        };
        let (_keep, input) = tokio::io::duplex(64);
        let invocation = invocation();
        let session = Session::new(client)
            .with_sinks(tokio::io::sink(), tokio::io::sink())
            .run(&invocation, input);

        let (result, ()) = tokio::join!(session, server_task);

        assert!(matches!(
            result.error,
            Some(SessionError::Transport(TransportError::ShortRead {
                expected: 5,
                actual: 0
            }))
        ));
        assert!(result.input_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_timeout() {
        let (client, server_end) = tokio::io::duplex(1024);
        let (_keep, input) = tokio::io::duplex(64);

        let server_task = async move {
            let (mut reader, writer) = server(server_end);
            read_request(&mut reader).await;
            (reader, writer)
        };
        let options = SessionOptions {
            timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let invocation = invocation();
        let session = Session::new(client)
            .with_options(options)
            .with_sinks(tokio::io::sink(), tokio::io::sink())
            .run(&invocation, input);

        let (result, _server) = tokio::join!(session, server_task);

        assert!(matches!(
            result.error,
            Some(SessionError::TimedOut(d)) if d == Duration::from_secs(5)
        ));
        assert_eq!(result.process_exit_code(), SESSION_FAILURE_EXIT_CODE);
    }

    #[tokio::test]
    async fn test_start_input_gate_releases_relay() {
        let (client, server_end) = tokio::io::duplex(1024);

        let server_task = async move {
            let (mut reader, mut writer) = server(server_end);
            read_request(&mut reader).await;
            writer
                .write_all(&frame(ChunkType::StartInput, b""))
                .await
                .unwrap();
            let received = read_stdin(&mut reader).await;
            writer.write_all(&frame(ChunkType::Exit, b"0")).await.unwrap();
            received
        };
        let input: &[u8] = b"after start";
        let options = SessionOptions {
            wait_for_start_input: true,
            ..Default::default()
        };
        let invocation = invocation();
        let session = Session::new(client)
            .with_options(options)
            .with_sinks(tokio::io::sink(), tokio::io::sink())
            .run(&invocation, input);

        let (result, received) = tokio::join!(session, server_task);

        assert!(result.is_success());
        assert_eq!(received, b"after start");
    }

    #[test]
    fn test_options_from_config() {
        let config = ClientConfig {
            stdin_block_size: 1024,
            timeout: Some(Duration::from_secs(30)),
            wait_for_start_input: true,
            ..Default::default()
        };
        let options = SessionOptions::from(&config);
        assert_eq!(options.stdin_block_size, 1024);
        assert_eq!(options.read_buffer_size, config.read_buffer_size);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert!(options.wait_for_start_input);
    }
}
