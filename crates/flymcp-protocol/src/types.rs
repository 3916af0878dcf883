//! Definitions for tools, resources, and prompts.
//!
//! All of these are immutable after registration; the registries hand
//! out clones for `*/list` responses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server information advertised from `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

/// Capabilities advertised from `initialize`.
///
/// Flags reflect which registries are non-empty. `resources` is an
/// object carrying the registered scheme prefixes, or `null` when no
/// strategy is registered (serialized as an explicit null, not
/// omitted).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Whether any tools are registered.
    pub tools: bool,
    /// Resource capability, or null.
    pub resources: Option<ResourcesCapability>,
    /// Whether any prompts are registered.
    pub prompts: bool,
}

/// Resource capability detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesCapability {
    /// Registered URI scheme prefixes, e.g. `workspace://`.
    pub schemes: Vec<String>,
}

/// Tool definition.
///
/// The timeout and concurrency overrides are server-side policy and
/// never serialized to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human description.
    pub description: String,
    /// Declared input shape (JSON Schema).
    pub schema: serde_json::Value,
    /// Per-tool timeout override.
    #[serde(skip)]
    pub timeout: Option<Duration>,
    /// Per-tool concurrency cap; never looser than the global cap.
    #[serde(skip)]
    pub max_concurrency: Option<usize>,
}

impl ToolDefinition {
    /// Creates a definition with no per-tool overrides.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            timeout: None,
            max_concurrency: None,
        }
    }

    /// Sets a per-tool timeout override.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a per-tool concurrency cap.
    #[must_use]
    pub fn with_max_concurrency(mut self, cap: usize) -> Self {
        self.max_concurrency = Some(cap);
        self
    }
}

/// Resource strategy description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// URI scheme prefix, e.g. `workspace://`.
    pub scheme: String,
    /// Human description.
    pub description: String,
    /// Whether the strategy rejects writes.
    #[serde(rename = "readOnly")]
    pub read_only: bool,
}

/// Prompt definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt id.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Human description.
    pub description: String,
    /// Ordered variable specs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableSpec>,
}

/// A prompt variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Variable name.
    pub name: String,
    /// Whether the variable must be supplied (unless it has a default).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Default value applied when the variable is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl VariableSpec {
    /// A required variable with no default.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
        }
    }

    /// An optional variable with a default value.
    #[must_use]
    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: Some(default.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition_overrides_are_not_serialized() {
        let tool = ToolDefinition::new("fly_doctor", "Runs diagnostics", serde_json::json!({}))
            .with_timeout(Duration::from_secs(5))
            .with_max_concurrency(1);
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("\"schema\""));
        assert!(!json.contains("timeout"));
        assert!(!json.contains("concurrency"));
    }

    #[test]
    fn empty_resources_capability_serializes_as_null() {
        let caps = ServerCapabilities {
            tools: true,
            resources: None,
            prompts: false,
        };
        let json = serde_json::to_string(&caps).unwrap();
        assert!(json.contains("\"resources\":null"));
    }
}
