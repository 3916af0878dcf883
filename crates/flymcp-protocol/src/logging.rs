//! Logging support for the fly-mcp crates.
//!
//! All crates in this workspace log through the standard [`log`]
//! facade; the binary picks the backend (env_logger). Targets are
//! hierarchical so `RUST_LOG=flymcp::supervisor=debug` works.

pub use log::{debug, error, info, trace, warn};

pub use log::{Level, LevelFilter};

/// Log targets used by fly-mcp components.
pub mod targets {
    /// Root target.
    pub const FLYMCP: &str = "flymcp";

    /// Server lifecycle and the serve loop.
    pub const SERVER: &str = "flymcp::server";

    /// Framing and stdio transport.
    pub const TRANSPORT: &str = "flymcp::transport";

    /// Method dispatch.
    pub const ROUTER: &str = "flymcp::router";

    /// Concurrency admission, timeouts, cancellation.
    pub const SUPERVISOR: &str = "flymcp::supervisor";

    /// Path sandbox decisions.
    pub const SANDBOX: &str = "flymcp::sandbox";
}
