//! Request parameter and result types for every method.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::jsonrpc::RequestId;
use crate::types::{PromptDefinition, ServerCapabilities, ServerInfo, ToolDefinition};

/// Protocol version tag sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Lifecycle
// ============================================================================

/// Client information from `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

/// `initialize` request params.
///
/// The params are implementation-defined; everything is optional so
/// that minimal clients can connect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeParams {
    /// Protocol version requested.
    #[serde(rename = "protocolVersion", skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    /// Client info.
    #[serde(rename = "clientInfo", skip_serializing_if = "Option::is_none")]
    pub client_info: Option<ClientInfo>,
}

/// `initialize` response result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    /// Protocol version accepted.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server info.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    /// Advertised capabilities.
    pub capabilities: ServerCapabilities,
    /// Optional usage instructions for the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// ============================================================================
// Tools
// ============================================================================

/// `tools/list` response result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// All registered tools with their declared schemas.
    pub tools: Vec<ToolDefinition>,
}

/// `tools/call` request params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

/// Content item in a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Text content.
    Text {
        /// The text.
        text: String,
    },
}

/// `tools/call` response result.
///
/// Tool-level failures are reported as content with `isError: true`;
/// timeouts, cancellations, and admission failures remain protocol
/// errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Result content.
    pub content: Vec<Content>,
    /// Whether this result represents a tool-level failure.
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    /// A successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A tool-level failure result.
    #[must_use]
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }
}

// ============================================================================
// Resources
// ============================================================================

/// `resources/list` request params.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResourcesParams {
    /// Directory URI to list; defaults to the strategy's root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Zero-based page index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// Page size.
    #[serde(rename = "pageSize", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

/// One listed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Entry URI.
    pub uri: String,
    /// File or directory name.
    pub name: String,
    /// Whether the entry is a directory.
    pub directory: bool,
    /// Byte size for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// `resources/list` response result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourcesResult {
    /// Page of entries, ordered lexicographically by URI.
    pub items: Vec<ResourceEntry>,
    /// Total entry count across all pages.
    pub total: usize,
    /// Echoed page index.
    pub page: usize,
    /// Echoed page size.
    #[serde(rename = "pageSize")]
    pub page_size: usize,
}

/// `resources/read` request params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceParams {
    /// Resource URI.
    pub uri: String,
    /// Byte offset to start reading at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// Maximum number of bytes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

/// `resources/read` response result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    /// Slice content, `utf-8` text or base64.
    pub content: String,
    /// `utf-8` or `base64`.
    pub encoding: String,
    /// Full resource size in bytes.
    pub total: u64,
    /// Effective slice start.
    pub start: u64,
    /// Effective slice length in bytes.
    pub length: u64,
}

// ============================================================================
// Prompts
// ============================================================================

/// `prompts/list` response result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPromptsResult {
    /// All registered prompts.
    pub prompts: Vec<PromptDefinition>,
}

/// `prompts/get` request params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptParams {
    /// Prompt id.
    pub id: String,
    /// Variable values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, String>>,
}

/// `prompts/get` response result.
///
/// A missing required variable is not an error: the server answers
/// with the exact set of missing names so the client can re-prompt its
/// user and resubmit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GetPromptResult {
    /// Rendered prompt text.
    Text {
        /// The rendered text.
        text: String,
    },
    /// Required variables that were not supplied.
    VariablesNeeded {
        /// Missing variable names, in declaration order.
        #[serde(rename = "variablesNeeded")]
        variables_needed: Vec<String>,
    },
}

// ============================================================================
// Cancellation
// ============================================================================

/// `$/cancel` notification params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelParams {
    /// The request id to cancel.
    pub id: RequestId,
}
