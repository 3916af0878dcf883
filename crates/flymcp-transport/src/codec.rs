//! Incremental codec for Content-Length framed messages.
//!
//! Wire format: `Content-Length: <n>\r\n\r\n<n bytes of UTF-8 JSON>`.
//! Additional header lines before the blank line are ignored. The
//! decoder buffers arbitrary partial arrivals and only ever suspends
//! at "need more bytes"; a failed parse consumes the offending frame
//! so the session can continue.

use flymcp_protocol::JsonRpcMessage;

/// Threshold for compacting the buffer (bytes consumed before the
/// read position are dropped once it grows past this).
const COMPACT_THRESHOLD: usize = 4096;

/// Header block terminator.
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Codec for encoding/decoding framed JSON-RPC messages.
#[derive(Debug)]
pub struct Codec {
    /// Buffer for incomplete frames.
    buffer: Vec<u8>,
    /// Read position in buffer (data before this has been consumed).
    read_pos: usize,
    /// Remaining body bytes of an oversized frame still to discard.
    pending_skip: usize,
    /// Maximum allowed body size in bytes.
    max_message_size: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    /// Default body size limit (10MB).
    pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

    /// Creates a codec with the default size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_message_size(Self::DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Creates a codec with a custom body size limit.
    #[must_use]
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            read_pos: 0,
            pending_skip: 0,
            max_message_size,
        }
    }

    /// Returns the maximum allowed body size in bytes.
    #[must_use]
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Encodes a message with its framing header.
    ///
    /// The length header counts encoded body bytes, not characters.
    pub fn encode(message: &JsonRpcMessage) -> Result<Vec<u8>, CodecError> {
        let body = serde_json::to_vec(message)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        let mut bytes = Vec::with_capacity(header.len() + body.len());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Feeds raw bytes into the decode buffer.
    pub fn push(&mut self, data: &[u8]) {
        let mut data = data;

        // Discard the tail of an oversized frame first.
        if self.pending_skip > 0 {
            let n = self.pending_skip.min(data.len());
            self.pending_skip -= n;
            data = &data[n..];
        }

        if self.read_pos >= COMPACT_THRESHOLD {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }

        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next complete message.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A malformed
    /// header or body yields an error after consuming the offending
    /// frame, so the next call resumes at the following frame.
    pub fn next_message(&mut self) -> Result<Option<JsonRpcMessage>, CodecError> {
        let unread = &self.buffer[self.read_pos..];

        let Some(header_len) = find_subsequence(unread, HEADER_END) else {
            // Everything unread is header bytes; a header longer than
            // the body limit cannot be legitimate.
            if unread.len() > self.max_message_size {
                let len = unread.len();
                self.clear();
                return Err(CodecError::MessageTooLarge(len));
            }
            return Ok(None);
        };

        let body_start = self.read_pos + header_len + HEADER_END.len();

        let length = match parse_content_length(&unread[..header_len]) {
            Ok(length) => length,
            Err(err) => {
                // Resync at the byte after the blank line.
                self.read_pos = body_start;
                return Err(err);
            }
        };

        if length > self.max_message_size {
            // Skip the declared body without ever buffering it.
            let available = self.buffer.len() - body_start;
            if available >= length {
                self.read_pos = body_start + length;
            } else {
                self.pending_skip = length - available;
                self.buffer.truncate(body_start);
                self.read_pos = body_start;
            }
            return Err(CodecError::MessageTooLarge(length));
        }

        if self.buffer.len() - body_start < length {
            // Body incomplete; the header is re-parsed next call.
            return Ok(None);
        }

        let body = &self.buffer[body_start..body_start + length];
        let parsed = serde_json::from_slice(body);
        self.read_pos = body_start + length;

        match parsed {
            Ok(message) => Ok(Some(message)),
            Err(err) => Err(CodecError::Json(err)),
        }
    }

    /// Clears all buffered state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
        self.pending_skip = 0;
    }
}

/// Extracts the Content-Length value from a header block.
fn parse_content_length(header: &[u8]) -> Result<usize, CodecError> {
    let text = std::str::from_utf8(header)
        .map_err(|_| CodecError::InvalidHeader("header is not valid UTF-8".to_owned()))?;

    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            return value.trim().parse::<usize>().map_err(|_| {
                CodecError::InvalidHeader(format!("non-numeric Content-Length: {}", value.trim()))
            });
        }
    }

    Err(CodecError::InvalidHeader(
        "missing Content-Length header".to_owned(),
    ))
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Codec error types.
#[derive(Debug)]
pub enum CodecError {
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Missing or non-numeric length header.
    InvalidHeader(String),
    /// Declared or buffered size exceeds the limit.
    MessageTooLarge(usize),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Json(e) => write!(f, "JSON error: {e}"),
            CodecError::InvalidHeader(detail) => write!(f, "invalid frame header: {detail}"),
            CodecError::MessageTooLarge(size) => write!(f, "message too large: {size} bytes"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Json(e) => Some(e),
            CodecError::InvalidHeader(_) | CodecError::MessageTooLarge(_) => None,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Json(err)
    }
}
