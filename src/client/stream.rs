//! Incremental decoding of the streamed response.
//!
//! The daemon sends one JSON object per generated fragment. Objects are
//! usually newline-delimited but may arrive back to back, and a network
//! chunk can end anywhere inside an object. `ChunkDecoder` buffers just
//! enough to complete the next object; `emit_stream` writes each fragment
//! out as soon as it is decoded.

use crate::error::{Error, Result};
use crate::protocol::GenerationChunk;
use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};

/// Splits a byte stream into `GenerationChunk`s.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buf: BytesMut,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes received from the network.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Decode the next complete chunk, or `None` if more input is needed.
    pub fn next_chunk(&mut self) -> std::result::Result<Option<GenerationChunk>, serde_json::Error> {
        let (next, consumed) = {
            let mut iter =
                serde_json::Deserializer::from_slice(&self.buf).into_iter::<GenerationChunk>();
            let next = iter.next();
            (next, iter.byte_offset())
        };

        match next {
            Some(Ok(chunk)) => {
                self.buf.advance(consumed);
                Ok(Some(chunk))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => Err(e),
            None => {
                // Only whitespace is buffered.
                self.buf.clear();
                Ok(None)
            }
        }
    }

    /// Check for a truncated object once the input has ended.
    ///
    /// Only meaningful after `next_chunk` has returned `None`.
    pub fn finish(&mut self) -> std::result::Result<(), serde_json::Error> {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        let partial = self.buf.split();
        serde_json::from_slice::<GenerationChunk>(&partial).map(|_| ())
    }
}

/// Why the emit loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// A chunk with `done=true` arrived.
    Done,
    /// The body ended without a final chunk.
    Closed,
    /// Decoding or reading the body failed; output so far was kept.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub chunks: usize,
    pub bytes: usize,
    pub end: StreamEnd,
}

/// Write every chunk's text to `out`, in arrival order, until `done`.
///
/// The stream is consumed and dropped before returning. Decode and read
/// failures end the loop and are logged; only write failures are errors.
pub async fn emit_stream<S, E, W>(stream: S, out: &mut W) -> Result<StreamOutcome>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
    W: AsyncWrite + Unpin,
{
    let mut stream = Box::pin(stream);
    let mut decoder = ChunkDecoder::new();
    let mut outcome = StreamOutcome {
        chunks: 0,
        bytes: 0,
        end: StreamEnd::Closed,
    };

    'read: loop {
        loop {
            match decoder.next_chunk() {
                Ok(Some(chunk)) => {
                    write_fragment(out, &chunk.response).await?;
                    outcome.chunks += 1;
                    outcome.bytes += chunk.response.len();
                    if chunk.done {
                        outcome.end = StreamEnd::Done;
                        break 'read;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("failed to decode JSON from stream: {}", e);
                    outcome.end = StreamEnd::Failed(e.to_string());
                    break 'read;
                }
            }
        }

        match stream.next().await {
            Some(Ok(bytes)) => decoder.push(&bytes),
            Some(Err(e)) => {
                error!("failed to read response stream: {}", e);
                outcome.end = StreamEnd::Failed(e.to_string());
                break;
            }
            None => {
                if let Err(e) = decoder.finish() {
                    error!("failed to decode JSON from stream: {}", e);
                    outcome.end = StreamEnd::Failed(e.to_string());
                }
                break;
            }
        }
    }

    drop(stream);
    debug!(
        "Stream ended ({:?}) after {} chunks, {} bytes",
        outcome.end, outcome.chunks, outcome.bytes
    );
    Ok(outcome)
}

async fn write_fragment<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    out.write_all(text.as_bytes()).await.map_err(Error::Output)?;
    out.flush().await.map_err(Error::Output)
}
