//! fly-mcp: MCP-style stdio sidecar for the Fly scaffolding CLI.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::error;

use flymcp_server::{Sandbox, ServerBuilder, ServerConfig, WorkspaceResources};

mod prompts;
mod tools;

const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Serve Fly project scaffolding helpers over framed stdio JSON-RPC.
#[derive(Debug, Parser)]
#[command(name = "fly-mcp", version, about)]
struct Args {
    /// Project root the server is allowed to read.
    #[arg(long, default_value = ".", env = "FLY_MCP_ROOT")]
    root: PathBuf,

    /// Default tool timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Global cap on concurrently running tool calls.
    #[arg(long, default_value_t = 8)]
    max_concurrency: usize,

    /// Calls allowed to wait for a slot before being rejected.
    #[arg(long, default_value_t = 32)]
    max_queue: usize,

    /// Largest accepted frame body in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,

    /// Glob pattern (relative to the root) that reads must match.
    /// Repeatable; no pattern means everything under the root.
    #[arg(long)]
    allow: Vec<String>,

    /// Glob pattern (relative to the root) that reads must not match.
    /// Repeatable; defaults to build output and VCS internals.
    #[arg(long)]
    deny: Vec<String>,
}

fn default_deny() -> Vec<String> {
    ["build/**", "build", ".dart_tool/**", ".dart_tool", ".git/**", ".git"]
        .map(str::to_owned)
        .to_vec()
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let deny = if args.deny.is_empty() {
        default_deny()
    } else {
        args.deny
    };
    let sandbox = Arc::new(Sandbox::new(&args.root, &args.allow, &deny)?);

    let config = ServerConfig::default()
        .default_timeout(Duration::from_secs(args.timeout))
        .max_concurrency(args.max_concurrency)
        .max_queue_depth(args.max_queue)
        .max_message_size(args.max_message_size);

    let mut builder = ServerBuilder::new("fly-mcp", env!("CARGO_PKG_VERSION"))
        .instructions(
            "Scaffolding sidecar for Fly Flutter projects. Use fly_doctor to \
             verify the project, workspace:// resources to inspect it, and the \
             prompts to scaffold screens and services.",
        )
        .config(config)
        .tool(tools::VersionTool)
        .tool(tools::DoctorTool::new(Arc::clone(&sandbox)))
        .resource(WorkspaceResources::new(sandbox));
    for (definition, template) in prompts::scaffolding_prompts() {
        builder = builder.prompt(definition, template);
    }

    builder.build().run_stdio().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the protocol; all logging goes to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}
