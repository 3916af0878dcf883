//! Immutable lookup tables for tools, resources, and prompts.
//!
//! Built once at server construction from the fixed set of registered
//! handlers; read-only afterwards, so lookups need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use flymcp_protocol::logging::{targets, warn};
use flymcp_protocol::{PromptDefinition, ToolDefinition};

use crate::handler::{ResourceStrategy, ToolHandler};
use crate::prompts::PromptEntry;

/// A registered tool with its immutable definition.
pub(crate) struct RegisteredTool {
    pub handler: Arc<dyn ToolHandler>,
    pub definition: ToolDefinition,
}

/// Name → tool lookup.
pub(crate) struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Builds the registry, clamping per-tool concurrency caps to the
    /// global cap (a per-tool cap can be stricter, never looser).
    pub fn new(handlers: Vec<Arc<dyn ToolHandler>>, global_cap: usize) -> Self {
        let mut tools = HashMap::new();
        for handler in handlers {
            let mut definition = handler.definition();
            if let Some(cap) = definition.max_concurrency {
                definition.max_concurrency = Some(cap.clamp(1, global_cap));
            }
            let name = definition.name.clone();
            if tools
                .insert(name.clone(), RegisteredTool { handler, definition })
                .is_some()
            {
                warn!(target: targets::ROUTER, "duplicate tool registration replaced: {name}");
            }
        }
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// All definitions, sorted by name for stable listings.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<_> = self
            .tools
            .values()
            .map(|tool| tool.definition.clone())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.values()
    }
}

/// URI-prefix → strategy lookup.
///
/// Lookup matches the longest registered prefix; registration order
/// only decides the default scheme for `resources/list` without a
/// `directory` param (first registered wins).
pub(crate) struct ResourceRegistry {
    /// Sorted by prefix length, longest first.
    strategies: Vec<(String, Arc<dyn ResourceStrategy>)>,
    default_scheme: Option<String>,
}

impl ResourceRegistry {
    pub fn new(strategies: Vec<Arc<dyn ResourceStrategy>>) -> Self {
        let default_scheme = strategies.first().map(|s| s.definition().scheme);
        let mut strategies: Vec<_> = strategies
            .into_iter()
            .map(|s| (s.definition().scheme, s))
            .collect();
        strategies.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            strategies,
            default_scheme,
        }
    }

    /// Resolves the strategy whose prefix is the longest match.
    pub fn resolve(&self, uri: &str) -> Option<&Arc<dyn ResourceStrategy>> {
        self.strategies
            .iter()
            .find(|(prefix, _)| uri.starts_with(prefix.as_str()))
            .map(|(_, strategy)| strategy)
    }

    /// The scheme used when `resources/list` omits `directory`.
    pub fn default_scheme(&self) -> Option<&str> {
        self.default_scheme.as_deref()
    }

    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<_> = self.strategies.iter().map(|(s, _)| s.clone()).collect();
        schemes.sort();
        schemes
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Id → prompt lookup.
pub(crate) struct PromptRegistry {
    prompts: HashMap<String, PromptEntry>,
}

impl PromptRegistry {
    pub fn new(entries: Vec<PromptEntry>) -> Self {
        let mut prompts = HashMap::new();
        for entry in entries {
            let id = entry.definition.id.clone();
            if prompts.insert(id.clone(), entry).is_some() {
                warn!(target: targets::ROUTER, "duplicate prompt registration replaced: {id}");
            }
        }
        Self { prompts }
    }

    pub fn get(&self, id: &str) -> Option<&PromptEntry> {
        self.prompts.get(id)
    }

    /// All definitions, sorted by id for stable listings.
    pub fn definitions(&self) -> Vec<PromptDefinition> {
        let mut definitions: Vec<_> = self
            .prompts
            .values()
            .map(|entry| entry.definition.clone())
            .collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        definitions
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxFuture, CallContext};
    use flymcp_protocol::{
        CallToolResult, ListResourcesParams, ListResourcesResult, ReadResourceParams,
        ReadResourceResult, ResourceInfo, ServerError, ServerResult,
    };

    struct NullTool(ToolDefinition);

    impl ToolHandler for NullTool {
        fn definition(&self) -> ToolDefinition {
            self.0.clone()
        }

        fn call<'a>(
            &'a self,
            _ctx: &'a CallContext,
            _arguments: serde_json::Value,
        ) -> BoxFuture<'a, ServerResult<CallToolResult>> {
            Box::pin(async { Ok(CallToolResult::text("ok")) })
        }
    }

    struct NullStrategy(&'static str);

    impl ResourceStrategy for NullStrategy {
        fn definition(&self) -> ResourceInfo {
            ResourceInfo {
                scheme: self.0.to_string(),
                description: String::new(),
                read_only: true,
            }
        }

        fn list<'a>(
            &'a self,
            _params: &'a ListResourcesParams,
        ) -> BoxFuture<'a, ServerResult<ListResourcesResult>> {
            Box::pin(async { Err(ServerError::internal_error("unused")) })
        }

        fn read<'a>(
            &'a self,
            _params: &'a ReadResourceParams,
        ) -> BoxFuture<'a, ServerResult<ReadResourceResult>> {
            Box::pin(async { Err(ServerError::internal_error("unused")) })
        }
    }

    #[test]
    fn per_tool_cap_is_clamped_to_global() {
        let def = ToolDefinition::new("t", "", serde_json::json!({})).with_max_concurrency(100);
        let registry = ToolRegistry::new(vec![Arc::new(NullTool(def))], 4);
        assert_eq!(
            registry.get("t").unwrap().definition.max_concurrency,
            Some(4)
        );
    }

    #[test]
    fn tool_definitions_are_sorted_by_name() {
        let registry = ToolRegistry::new(
            vec![
                Arc::new(NullTool(ToolDefinition::new("zeta", "", serde_json::json!({})))),
                Arc::new(NullTool(ToolDefinition::new("alpha", "", serde_json::json!({})))),
            ],
            4,
        );
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[test]
    fn longest_prefix_wins() {
        let registry = ResourceRegistry::new(vec![
            Arc::new(NullStrategy("workspace://")),
            Arc::new(NullStrategy("workspace://generated/")),
        ]);
        let resolved = registry.resolve("workspace://generated/a.dart").unwrap();
        assert_eq!(resolved.definition().scheme, "workspace://generated/");

        let resolved = registry.resolve("workspace://lib/a.dart").unwrap();
        assert_eq!(resolved.definition().scheme, "workspace://");

        assert!(registry.resolve("other://x").is_none());
    }

    #[test]
    fn default_scheme_is_first_registered() {
        let registry = ResourceRegistry::new(vec![
            Arc::new(NullStrategy("workspace://")),
            Arc::new(NullStrategy("templates://")),
        ]);
        assert_eq!(registry.default_scheme(), Some("workspace://"));
    }
}
