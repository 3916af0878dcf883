//! Protocol types for the fly-mcp server.
//!
//! This crate defines the wire-level vocabulary shared by the transport
//! and server crates:
//! - JSON-RPC 2.0 envelopes ([`JsonRpcRequest`], [`JsonRpcResponse`])
//! - The protocol error taxonomy ([`ServerError`], [`ErrorCode`])
//! - Request parameter and result types for every method
//! - Definitions for tools, resources, and prompts

#![forbid(unsafe_code)]

mod error;
mod jsonrpc;
pub mod logging;
mod messages;
mod types;

pub use error::{ErrorCode, ServerError, ServerResult};
pub use jsonrpc::{JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use messages::{
    CallToolParams, CallToolResult, CancelParams, ClientInfo, Content, GetPromptParams,
    GetPromptResult, InitializeParams, InitializeResult, ListPromptsResult, ListResourcesParams,
    ListResourcesResult, ListToolsResult, PROTOCOL_VERSION, ReadResourceParams,
    ReadResourceResult, ResourceEntry,
};
pub use types::{
    PromptDefinition, ResourceInfo, ResourcesCapability, ServerCapabilities, ServerInfo,
    ToolDefinition, VariableSpec,
};
