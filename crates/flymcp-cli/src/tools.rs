//! Tools exposed by the fly-mcp binary.
//!
//! The server is a sidecar for Fly, a Flutter project scaffolding CLI.
//! Its tools answer the questions an agent asks before scaffolding:
//! what version is running, and does the project root look like a
//! Flutter project at all.

use std::sync::Arc;

use serde_json::json;

use flymcp_protocol::{CallToolResult, ServerResult, ToolDefinition};
use flymcp_server::sandbox::Sandbox;
use flymcp_server::{BoxFuture, CallContext, ToolHandler};

const DOCTOR_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// `fly_version`: server and protocol version report.
pub struct VersionTool;

impl ToolHandler for VersionTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "fly_version",
            "Report fly-mcp server and protocol versions",
            json!({"type": "object", "properties": {}}),
        )
    }

    fn call<'a>(
        &'a self,
        _ctx: &'a CallContext,
        _arguments: serde_json::Value,
    ) -> BoxFuture<'a, ServerResult<CallToolResult>> {
        Box::pin(async {
            let report = json!({
                "name": "fly-mcp",
                "version": env!("CARGO_PKG_VERSION"),
                "protocolVersion": flymcp_protocol::PROTOCOL_VERSION,
            });
            Ok(CallToolResult::text(report.to_string()))
        })
    }
}

/// `fly_doctor`: checks that the sandbox root is a Flutter project.
pub struct DoctorTool {
    sandbox: Arc<Sandbox>,
}

impl DoctorTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    fn run_checks(&self) -> (Vec<String>, bool) {
        // (path, required) pairs checked relative to the root.
        let checks = [
            ("pubspec.yaml", true),
            ("lib", true),
            ("test", false),
            ("analysis_options.yaml", false),
        ];

        let mut lines = Vec::new();
        let mut healthy = true;
        for (path, required) in checks {
            if self.sandbox.resolve(path).is_some() {
                lines.push(format!("[ok] {path}"));
            } else if required {
                healthy = false;
                lines.push(format!("[missing] {path} (required)"));
            } else {
                lines.push(format!("[missing] {path}"));
            }
        }
        (lines, healthy)
    }
}

impl ToolHandler for DoctorTool {
    fn definition(&self) -> ToolDefinition {
        // Diagnostics walk the filesystem; one at a time is plenty.
        ToolDefinition::new(
            "fly_doctor",
            "Diagnose whether the project root is a usable Flutter project",
            json!({"type": "object", "properties": {}}),
        )
        .with_timeout(DOCTOR_TIMEOUT)
        .with_max_concurrency(1)
    }

    fn call<'a>(
        &'a self,
        _ctx: &'a CallContext,
        _arguments: serde_json::Value,
    ) -> BoxFuture<'a, ServerResult<CallToolResult>> {
        Box::pin(async {
            let (lines, healthy) = self.run_checks();
            let mut report = format!("project root: {}\n", self.sandbox.root().display());
            report.push_str(&lines.join("\n"));
            if healthy {
                Ok(CallToolResult::text(report))
            } else {
                Ok(CallToolResult::failure(report))
            }
        })
    }
}
