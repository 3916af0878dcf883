//! Server construction.

use std::sync::Arc;

use flymcp_protocol::logging::{info, targets};
use flymcp_protocol::{PromptDefinition, ServerInfo};

use crate::config::ServerConfig;
use crate::handler::{ResourceStrategy, ToolHandler};
use crate::prompts::PromptEntry;
use crate::registry::{PromptRegistry, ResourceRegistry, ToolRegistry};
use crate::router::Router;
use crate::supervisor::Supervisor;
use crate::Server;

/// Builder for a [`Server`].
///
/// Registration happens here and nowhere else; once `build` runs, the
/// registries are immutable for the life of the server.
///
/// ```no_run
/// use flymcp_server::ServerBuilder;
///
/// let server = ServerBuilder::new("fly-mcp", "0.1.0")
///     .instructions("Scaffolding helper for Fly projects.")
///     .build();
/// ```
pub struct ServerBuilder {
    info: ServerInfo,
    instructions: Option<String>,
    config: ServerConfig,
    tools: Vec<Arc<dyn ToolHandler>>,
    resources: Vec<Arc<dyn ResourceStrategy>>,
    prompts: Vec<PromptEntry>,
}

impl ServerBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            instructions: None,
            config: ServerConfig::default(),
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// Usage instructions surfaced from `initialize`.
    #[must_use]
    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.instructions = Some(text.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a tool. A duplicate name replaces the earlier
    /// handler, with a warning.
    #[must_use]
    pub fn tool(mut self, handler: impl ToolHandler + 'static) -> Self {
        self.tools.push(Arc::new(handler));
        self
    }

    /// Registers a resource strategy. The first registered scheme
    /// becomes the default for `resources/list`.
    #[must_use]
    pub fn resource(mut self, strategy: impl ResourceStrategy + 'static) -> Self {
        self.resources.push(Arc::new(strategy));
        self
    }

    /// Registers a prompt template.
    #[must_use]
    pub fn prompt(mut self, definition: PromptDefinition, template: impl Into<String>) -> Self {
        self.prompts.push(PromptEntry::new(definition, template));
        self
    }

    /// Builds the server. Infallible: registration problems (duplicate
    /// names, caps above the global cap) are fixed up with a warning
    /// rather than refused.
    #[must_use]
    pub fn build(self) -> Server {
        info!(
            target: targets::SERVER,
            "{} v{}: {} tools, {} resource schemes, {} prompts",
            self.info.name,
            self.info.version,
            self.tools.len(),
            self.resources.len(),
            self.prompts.len()
        );
        let tools = ToolRegistry::new(self.tools, self.config.max_concurrency);
        let supervisor = Supervisor::new(&self.config, &tools);
        let router = Router::new(
            self.info,
            self.instructions,
            tools,
            ResourceRegistry::new(self.resources),
            PromptRegistry::new(self.prompts),
            supervisor,
        );
        Server::from_parts(Arc::new(router), self.config)
    }
}
