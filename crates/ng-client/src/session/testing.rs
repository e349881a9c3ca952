//! In-memory stream helpers for session tests

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use ng_protocol::{encode_chunk, ChunkType};

/// Encode one frame into a plain byte vector
pub(crate) fn frame(chunk_type: ChunkType, payload: &[u8]) -> Vec<u8> {
    encode_chunk(chunk_type, payload).unwrap().to_vec()
}

/// Reader that hands out at most `max` bytes per read
pub(crate) struct TrickleReader {
    data: Vec<u8>,
    pos: usize,
    max: usize,
    reads: usize,
}

impl TrickleReader {
    pub(crate) fn new(data: Vec<u8>, max: usize) -> Self {
        Self {
            data,
            pos: 0,
            max: max.max(1),
            reads: 0,
        }
    }

    /// Number of reads that returned data
    pub(crate) fn reads(&self) -> usize {
        self.reads
    }
}

impl AsyncRead for TrickleReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let remaining = self.data.len() - self.pos;
        let n = remaining.min(self.max).min(buf.remaining());
        if n > 0 {
            let start = self.pos;
            buf.put_slice(&self.data[start..start + n]);
            self.pos += n;
            self.reads += 1;
        }
        Poll::Ready(Ok(()))
    }
}
