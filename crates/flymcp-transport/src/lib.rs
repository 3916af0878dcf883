//! Transport layer for the fly-mcp server.
//!
//! Messages are framed with a `Content-Length` header block terminated
//! by a blank line, followed by the UTF-8 JSON body. The [`Codec`]
//! recovers message boundaries from arbitrarily chunked byte arrivals;
//! [`FramedReader`] and [`MessageWriter`] wire it onto async streams.

#![forbid(unsafe_code)]

mod codec;
mod stdio;

pub use codec::{Codec, CodecError};
pub use stdio::{FramedReader, MessageWriter, TransportError, stdio};
