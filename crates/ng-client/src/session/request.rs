//! Request encoding: arguments, environment, working directory, command

use std::ffi::OsStr;

use bytes::Bytes;
use tokio::io::AsyncWrite;

use ng_core::invocation::separator_entries;
use ng_core::{Invocation, SessionError};
use ng_protocol::{Chunk, ChunkType};

use super::wire::send_chunk;

/// Builds and sends the request phase of a session
pub struct RequestEncoder<'a> {
    invocation: &'a Invocation,
}

impl<'a> RequestEncoder<'a> {
    /// Create an encoder for an invocation snapshot
    pub fn new(invocation: &'a Invocation) -> Self {
        Self { invocation }
    }

    /// The request chunks, in wire order.
    ///
    /// The command chunk is always last: the server starts executing as soon
    /// as it arrives.
    pub fn chunks(&self) -> Vec<Chunk> {
        let invocation = self.invocation;
        let mut chunks =
            Vec::with_capacity(invocation.args.len() + invocation.env.len() + 4);

        chunks.extend(
            invocation
                .args
                .iter()
                .map(|arg| Chunk::new(ChunkType::Argument, os_payload(arg))),
        );
        chunks.extend(
            invocation
                .env_entries()
                .chain(separator_entries().map(String::into_bytes))
                .map(|entry| Chunk::new(ChunkType::Environment, Bytes::from(entry))),
        );
        chunks.push(Chunk::new(
            ChunkType::WorkingDirectory,
            os_payload(invocation.working_dir.as_os_str()),
        ));
        chunks.push(Chunk::new(
            ChunkType::Command,
            os_payload(&invocation.command),
        ));
        chunks
    }

    /// Write the whole request.
    ///
    /// Stops at the first failed write; the connection is unusable afterwards
    /// and the caller must discard it. Returns the number of chunks sent.
    pub async fn send<W>(&self, writer: &mut W) -> Result<usize, SessionError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let chunks = self.chunks();
        for chunk in &chunks {
            send_chunk(writer, chunk.chunk_type, &chunk.payload).await?;
        }

        tracing::debug!(
            command = %self.invocation.command_name(),
            args = self.invocation.args.len(),
            env = self.invocation.env.len(),
            "Sent request"
        );
        Ok(chunks.len())
    }
}

/// Payload bytes of an OS string, unchanged
fn os_payload(s: &OsStr) -> Bytes {
    Bytes::copy_from_slice(s.as_encoded_bytes())
}
