//! Handler traits for tools and resource strategies.
//!
//! Handlers return boxed futures so implementations can be async
//! without a macro layer; simple handlers wrap their body in
//! `Box::pin(async move { .. })`.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use flymcp_protocol::{
    CallToolResult, ListResourcesParams, ListResourcesResult, ReadResourceParams,
    ReadResourceResult, RequestId, ResourceInfo, ServerResult, ToolDefinition,
};

/// A boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-call context handed to tool handlers.
///
/// Carries the request id and the cooperative cancellation signal. A
/// handler that never observes the signal is still timed out from the
/// client's perspective; observing it just lets the work stop early.
#[derive(Debug, Clone)]
pub struct CallContext {
    request_id: RequestId,
    cancel: CancellationToken,
}

impl CallContext {
    /// Builds a context. Outside the supervisor this is mostly useful
    /// for exercising handlers in tests.
    #[must_use]
    pub fn new(request_id: RequestId, cancel: CancellationToken) -> Self {
        Self { request_id, cancel }
    }

    /// The JSON-RPC id of the call.
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Returns true once cancellation or timeout has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when cancellation or timeout is signalled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

/// Handler for a tool.
pub trait ToolHandler: Send + Sync {
    /// Returns the tool definition, including any timeout or
    /// concurrency overrides.
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool with the given arguments.
    ///
    /// Tool-level failures should be reported via
    /// [`CallToolResult::failure`]; a returned `Err` becomes a
    /// protocol error response.
    fn call<'a>(
        &'a self,
        ctx: &'a CallContext,
        arguments: serde_json::Value,
    ) -> BoxFuture<'a, ServerResult<CallToolResult>>;
}

/// Strategy for one URI scheme prefix.
///
/// Strategies needing filesystem access hold an `Arc` to the sandbox,
/// configured once at startup.
pub trait ResourceStrategy: Send + Sync {
    /// Returns the strategy description.
    fn definition(&self) -> ResourceInfo;

    /// Lists a page of entries in stable lexicographic URI order.
    fn list<'a>(
        &'a self,
        params: &'a ListResourcesParams,
    ) -> BoxFuture<'a, ServerResult<ListResourcesResult>>;

    /// Reads content plus byte-range metadata.
    fn read<'a>(
        &'a self,
        params: &'a ReadResourceParams,
    ) -> BoxFuture<'a, ServerResult<ReadResourceResult>>;
}
