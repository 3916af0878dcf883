//! Protocol error taxonomy.
//!
//! Every failure surfaced to the client maps to one [`ErrorCode`].
//! All of them except [`ErrorCode::ParseError`] are correlated to a
//! request id; parse errors have no id to echo and are reported with a
//! null id as a best-effort diagnostic.

use serde_json::Value;

/// Well-known error codes.
///
/// The `-327xx` range follows JSON-RPC 2.0; the remainder are
/// server-defined codes in the reserved implementation range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed framing or JSON.
    ParseError,
    /// Unknown method name.
    MethodNotFound,
    /// Well-formed but semantically invalid parameters.
    InvalidParams,
    /// Unexpected handler failure.
    InternalError,
    /// Request arrived before `initialize` completed.
    NotInitialized,
    /// `tools/call` named an unregistered tool.
    ToolNotFound,
    /// No resource strategy matched the requested URI.
    ResourceNotFound,
    /// Path outside the sandbox root or disallowed by policy.
    SandboxViolation,
    /// Admission wait queue is full.
    Overloaded,
    /// Call exceeded its deadline.
    Timeout,
    /// Call was cancelled by the client.
    Cancelled,
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::ParseError => -32700,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::NotInitialized => -32002,
            ErrorCode::ToolNotFound => -32010,
            ErrorCode::ResourceNotFound => -32011,
            ErrorCode::SandboxViolation => -32012,
            ErrorCode::Overloaded => -32013,
            ErrorCode::Timeout => -32014,
            ErrorCode::Cancelled => -32800,
        }
    }
}

/// A structured protocol error.
///
/// Converted into a [`crate::JsonRpcError`] when building the response.
#[derive(Debug, Clone)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Additional structured data.
    pub data: Option<Value>,
}

/// Result alias used throughout the server crates.
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// Creates an error with the given code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Malformed framing or JSON.
    #[must_use]
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, detail)
    }

    /// Unknown method.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorCode::MethodNotFound, format!("method not found: {method}"))
    }

    /// Invalid parameters.
    #[must_use]
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, detail)
    }

    /// Unexpected internal failure.
    #[must_use]
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, detail)
    }

    /// Request before `initialize`.
    #[must_use]
    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            "server not initialized; send 'initialize' first",
        )
    }

    /// Unregistered tool name.
    #[must_use]
    pub fn tool_not_found(name: &str) -> Self {
        Self::new(ErrorCode::ToolNotFound, format!("tool not found: {name}"))
    }

    /// No strategy matched the URI, or the target does not exist.
    #[must_use]
    pub fn resource_not_found(uri: &str) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("resource not found: {uri}"),
        )
    }

    /// Path rejected by the sandbox.
    #[must_use]
    pub fn sandbox_violation(path: &str) -> Self {
        Self::new(
            ErrorCode::SandboxViolation,
            format!("path outside sandbox or not permitted: {path}"),
        )
    }

    /// Admission queue overflow.
    #[must_use]
    pub fn overloaded(tool: &str) -> Self {
        Self::new(
            ErrorCode::Overloaded,
            format!("too many queued calls for '{tool}'"),
        )
    }

    /// Deadline exceeded.
    #[must_use]
    pub fn timeout(tool: &str, secs: f64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("tool '{tool}' timed out after {secs:.1}s"),
        )
    }

    /// Client-requested cancellation.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "request cancelled")
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, i32::from(self.code))
    }
}

impl std::error::Error for ServerError {}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_error(format!("serialization failed: {err}"))
    }
}
