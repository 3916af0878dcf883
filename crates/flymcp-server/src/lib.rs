//! MCP-style server over framed stdio JSON-RPC.
//!
//! A [`Server`] owns immutable tool/resource/prompt registries, a
//! supervisor that enforces concurrency caps and timeouts, and a path
//! sandbox for filesystem resources. The serve loop reads framed
//! requests, answers cheap methods inline, and runs tool calls off the
//! loop so a slow tool never blocks `ping`.
//!
//! ```no_run
//! use flymcp_server::{Sandbox, ServerBuilder, WorkspaceResources};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let sandbox = Arc::new(Sandbox::new(".", &[], &[])?);
//! let server = ServerBuilder::new("fly-mcp", env!("CARGO_PKG_VERSION"))
//!     .resource(WorkspaceResources::new(sandbox))
//!     .build();
//! server.run_stdio().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod builder;
pub mod config;
mod handler;
mod prompts;
mod registry;
mod router;
pub mod sandbox;
mod session;
mod supervisor;
mod workspace;


pub use builder::ServerBuilder;
pub use config::ServerConfig;
pub use handler::{BoxFuture, CallContext, ResourceStrategy, ToolHandler};
pub use sandbox::{Sandbox, SandboxError};
pub use workspace::{WorkspaceResources, DEFAULT_PAGE_SIZE, WORKSPACE_SCHEME};

pub use flymcp_protocol as protocol;
pub use flymcp_transport as transport;
pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use flymcp_protocol::logging::{debug, info, targets, warn};
use flymcp_protocol::{
    JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, RequestId, ServerError,
};
use flymcp_transport::{stdio, FramedReader, MessageWriter, TransportError};

use router::Router;

/// A fully built server, ready to serve one client connection.
pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    pub(crate) fn from_parts(router: Arc<Router>, config: ServerConfig) -> Self {
        Self { router, config }
    }

    /// Serves stdin/stdout until the client closes the stream.
    pub async fn run_stdio(&self) -> Result<(), TransportError> {
        let (reader, writer) = stdio(self.config.max_message_size);
        self.serve(reader, writer).await
    }

    /// Serves an arbitrary byte stream pair. Used by tests and by
    /// embedders that own the transport.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.serve(
            FramedReader::new(reader, self.config.max_message_size),
            MessageWriter::new(writer),
        )
        .await
    }

    async fn serve<R, W>(
        &self,
        mut reader: FramedReader<R>,
        writer: MessageWriter<W>,
    ) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!(target: targets::SERVER, "serving");
        loop {
            match reader.recv().await {
                Ok(JsonRpcMessage::Request(request)) => {
                    self.handle_request(request, &writer).await?;
                }
                Ok(JsonRpcMessage::Response(_)) => {
                    debug!(target: targets::SERVER, "ignoring unexpected response frame");
                }
                Err(TransportError::Closed) => {
                    info!(target: targets::SERVER, "client closed the stream");
                    return Ok(());
                }
                // A frame that failed to decode poisons only itself;
                // the stream stays usable and the client gets a parse
                // error with a null id.
                Err(TransportError::Codec(err)) => {
                    warn!(target: targets::SERVER, "undecodable frame: {err}");
                    let response =
                        JsonRpcResponse::error(None, ServerError::parse_error(err.to_string()));
                    writer.send(&JsonRpcMessage::Response(response)).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn handle_request<W>(
        &self,
        request: JsonRpcRequest,
        writer: &MessageWriter<W>,
    ) -> Result<(), TransportError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        if request.is_notification() {
            if request.method == "$/cancel" {
                self.router.handle_cancel(request.params);
            } else {
                debug!(
                    target: targets::SERVER,
                    "ignoring notification '{}'", request.method
                );
            }
            return Ok(());
        }
        let Some(id) = request.id.clone() else {
            return Ok(());
        };

        if !Router::is_lifecycle(&request.method) {
            if let Err(err) = self.router.ensure_initialized() {
                return respond(writer, id, Err(err)).await;
            }
        }

        if Router::is_supervised(&request.method) {
            // Parameter problems are answered inline; only a valid
            // call is worth a task of its own.
            let params = match self.router.parse_call_params(request.params) {
                Ok(params) => params,
                Err(err) => return respond(writer, id, Err(err)).await,
            };
            let router = Arc::clone(&self.router);
            let writer = writer.clone();
            tokio::spawn(async move {
                let result = router
                    .handle_tools_call(id.clone(), params)
                    .await
                    .and_then(|result| {
                        serde_json::to_value(result).map_err(|err| {
                            ServerError::internal_error(format!("serialize result: {err}"))
                        })
                    });
                let response = match result {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(err) => JsonRpcResponse::error(Some(id), err),
                };
                if let Err(err) = writer.send(&JsonRpcMessage::Response(response)).await {
                    warn!(target: targets::SERVER, "dropping tool result: {err}");
                }
            });
            return Ok(());
        }

        let result = self.router.dispatch(&request).await;
        respond(writer, id, result).await
    }
}

async fn respond<W>(
    writer: &MessageWriter<W>,
    id: RequestId,
    result: Result<serde_json::Value, ServerError>,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let response = match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(err) => JsonRpcResponse::error(Some(id), err),
    };
    writer.send(&JsonRpcMessage::Response(response)).await
}
