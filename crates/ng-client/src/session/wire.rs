//! Socket helpers shared by the request, relay and response paths

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use ng_core::{SessionError, TransportError};
use ng_protocol::{encode_chunk, ChunkType};

/// Write one complete frame and flush it.
///
/// `write_all` loops over partial writes; a write that accepts zero bytes is
/// reported as a short write rather than retried forever.
pub(crate) async fn send_chunk<W>(
    writer: &mut W,
    chunk_type: ChunkType,
    payload: &[u8],
) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode_chunk(chunk_type, payload)?;
    writer.write_all(&frame).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::WriteZero {
            TransportError::ShortWrite {
                expected: frame.len(),
            }
        } else {
            TransportError::Io(e)
        }
    })?;
    writer.flush().await.map_err(TransportError::Io)?;

    tracing::trace!(%chunk_type, length = payload.len(), "Sent chunk");
    Ok(())
}

/// Fill `buf` completely, accumulating partial reads.
///
/// End of stream before the buffer is full is a short read carrying how many
/// bytes did arrive.
pub(crate) async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(TransportError::ShortRead {
                expected: buf.len(),
                actual: filled,
            });
        }
        filled += n;
    }
    Ok(())
}
