//! Async stream wiring for the framed codec.
//!
//! The serve loop owns a [`FramedReader`]; responses are written
//! through a cloneable [`MessageWriter`] so that concurrently
//! completing tool calls never interleave their bytes.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, Stdin, Stdout};
use tokio::sync::Mutex;

use flymcp_protocol::JsonRpcMessage;
use flymcp_protocol::logging::{targets, trace};

use crate::codec::{Codec, CodecError};

/// Read chunk size.
const READ_BUF_SIZE: usize = 8 * 1024;

/// Transport error types.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying I/O failure.
    Io(std::io::Error),
    /// Framing or JSON decode failure (non-fatal to the session).
    Codec(CodecError),
    /// The stream closed; the session is over.
    Closed,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "I/O error: {e}"),
            TransportError::Codec(e) => write!(f, "codec error: {e}"),
            TransportError::Closed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(e) => Some(e),
            TransportError::Codec(e) => Some(e),
            TransportError::Closed => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err)
    }
}

impl From<CodecError> for TransportError {
    fn from(err: CodecError) -> Self {
        TransportError::Codec(err)
    }
}

/// Reads framed messages from an async byte stream.
pub struct FramedReader<R> {
    reader: R,
    codec: Codec,
    chunk: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    /// Creates a reader with the given body size limit.
    #[must_use]
    pub fn new(reader: R, max_message_size: usize) -> Self {
        Self {
            reader,
            codec: Codec::with_max_message_size(max_message_size),
            chunk: vec![0u8; READ_BUF_SIZE],
        }
    }

    /// Receives the next complete message.
    ///
    /// Suspends only while waiting for more bytes. Codec errors are
    /// returned per-frame and do not terminate the stream; EOF yields
    /// [`TransportError::Closed`].
    pub async fn recv(&mut self) -> Result<JsonRpcMessage, TransportError> {
        loop {
            match self.codec.next_message() {
                Ok(Some(message)) => {
                    trace!(target: targets::TRANSPORT, "received message");
                    return Ok(message);
                }
                Ok(None) => {}
                Err(err) => return Err(TransportError::Codec(err)),
            }

            let n = self.reader.read(&mut self.chunk).await?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
            self.codec.push(&self.chunk[..n]);
        }
    }
}

/// Writes framed messages, one message's bytes at a time.
///
/// Cloneable; all clones share one writer behind an async mutex, so a
/// message is always emitted atomically relative to other messages.
pub struct MessageWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for MessageWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    /// Wraps a writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Encodes and sends a message, flushing the stream.
    pub async fn send(&self, message: &JsonRpcMessage) -> Result<(), TransportError> {
        let bytes = Codec::encode(message)?;
        let mut writer = self.inner.lock().await;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Creates the production stdio transport pair.
#[must_use]
pub fn stdio(max_message_size: usize) -> (FramedReader<Stdin>, MessageWriter<Stdout>) {
    (
        FramedReader::new(tokio::io::stdin(), max_message_size),
        MessageWriter::new(tokio::io::stdout()),
    )
}
