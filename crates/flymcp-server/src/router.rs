//! Method dispatch.
//!
//! Maps JSON-RPC method names onto the registries and the supervisor.
//! Lifecycle methods (`initialize`, `ping`) work before the session is
//! initialized; everything else is gated. Registry lookups and
//! parameter validation happen here so the serve loop can stay a thin
//! read/dispatch/write cycle.

use std::sync::Mutex;

use serde::de::DeserializeOwned;

use flymcp_protocol::logging::{debug, info, targets};
use flymcp_protocol::{
    CallToolParams, CallToolResult, CancelParams, GetPromptParams, GetPromptResult,
    InitializeParams, InitializeResult, JsonRpcRequest, ListPromptsResult, ListResourcesParams,
    ListResourcesResult, ListToolsResult, PROTOCOL_VERSION, ReadResourceParams,
    ReadResourceResult, RequestId, ResourcesCapability, ServerCapabilities, ServerError,
    ServerInfo, ServerResult,
};

use crate::registry::{PromptRegistry, ResourceRegistry, ToolRegistry};
use crate::session::Session;
use crate::supervisor::Supervisor;

/// Server-side dispatch table plus the state it routes into.
pub(crate) struct Router {
    info: ServerInfo,
    instructions: Option<String>,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    supervisor: Supervisor,
    session: Mutex<Session>,
}

/// Parses typed params, mapping failures to `invalid_params`.
fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> ServerResult<T> {
    let value = params.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value)
        .map_err(|err| ServerError::invalid_params(format!("invalid params: {err}")))
}

/// Like [`parse_params`], but absent params mean defaults.
fn parse_params_or_default<T: DeserializeOwned + Default>(
    params: Option<serde_json::Value>,
) -> ServerResult<T> {
    match params {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::invalid_params(format!("invalid params: {err}"))),
    }
}

impl Router {
    pub fn new(
        info: ServerInfo,
        instructions: Option<String>,
        tools: ToolRegistry,
        resources: ResourceRegistry,
        prompts: PromptRegistry,
        supervisor: Supervisor,
    ) -> Self {
        Self {
            info,
            instructions,
            tools,
            resources,
            prompts,
            supervisor,
            session: Mutex::new(Session::default()),
        }
    }

    /// Rejects non-lifecycle methods until `initialize` has been seen.
    pub fn ensure_initialized(&self) -> ServerResult<()> {
        if self.session.lock().expect("session lock poisoned").is_initialized() {
            Ok(())
        } else {
            Err(ServerError::not_initialized())
        }
    }

    /// Whether this method may be called before `initialize`.
    pub fn is_lifecycle(method: &str) -> bool {
        matches!(method, "initialize" | "ping")
    }

    /// `tools/call` is the only supervised method; the serve loop
    /// runs it off the read loop so other requests keep flowing.
    pub fn is_supervised(method: &str) -> bool {
        method == "tools/call"
    }

    pub fn handle_initialize(
        &self,
        params: Option<serde_json::Value>,
    ) -> ServerResult<InitializeResult> {
        let params: InitializeParams = parse_params_or_default(params)?;

        let mut session = self.session.lock().expect("session lock poisoned");
        session.initialize(params.client_info);
        info!(
            target: targets::ROUTER,
            "initialized session for {}", session.client_name()
        );

        Ok(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_owned(),
            server_info: self.info.clone(),
            capabilities: ServerCapabilities {
                tools: !self.tools.is_empty(),
                resources: (!self.resources.is_empty()).then(|| ResourcesCapability {
                    schemes: self.resources.schemes(),
                }),
                prompts: !self.prompts.is_empty(),
            },
            instructions: self.instructions.clone(),
        })
    }

    pub fn handle_tools_list(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.tools.definitions(),
        }
    }

    /// Runs one tool call under the supervisor.
    ///
    /// Unknown tools are rejected before any slot is taken.
    pub async fn handle_tools_call(
        &self,
        id: RequestId,
        params: CallToolParams,
    ) -> ServerResult<CallToolResult> {
        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| ServerError::tool_not_found(&params.name))?;
        let arguments = params.arguments.unwrap_or(serde_json::json!({}));
        self.supervisor.execute(id, tool, arguments).await
    }

    pub fn parse_call_params(
        &self,
        params: Option<serde_json::Value>,
    ) -> ServerResult<CallToolParams> {
        parse_params(params)
    }

    pub async fn handle_resources_list(
        &self,
        params: Option<serde_json::Value>,
    ) -> ServerResult<ListResourcesResult> {
        let mut params: ListResourcesParams = parse_params_or_default(params)?;
        if params.directory.is_none() {
            params.directory = self.resources.default_scheme().map(str::to_owned);
        }
        let directory = params
            .directory
            .as_deref()
            .ok_or_else(|| ServerError::resource_not_found("(no resources registered)"))?;
        let strategy = self
            .resources
            .resolve(directory)
            .ok_or_else(|| ServerError::resource_not_found(directory))?;
        strategy.list(&params).await
    }

    pub async fn handle_resources_read(
        &self,
        params: Option<serde_json::Value>,
    ) -> ServerResult<ReadResourceResult> {
        let params: ReadResourceParams = parse_params(params)?;
        let strategy = self
            .resources
            .resolve(&params.uri)
            .ok_or_else(|| ServerError::resource_not_found(&params.uri))?;
        strategy.read(&params).await
    }

    pub fn handle_prompts_list(&self) -> ListPromptsResult {
        ListPromptsResult {
            prompts: self.prompts.definitions(),
        }
    }

    /// Renders a prompt template.
    ///
    /// An unknown id is a params error rather than a dedicated code;
    /// the registry is fixed at startup, so a bad id is always a
    /// caller bug.
    pub fn handle_prompts_get(
        &self,
        params: Option<serde_json::Value>,
    ) -> ServerResult<GetPromptResult> {
        let params: GetPromptParams = parse_params(params)?;
        let entry = self
            .prompts
            .get(&params.id)
            .ok_or_else(|| ServerError::invalid_params(format!("unknown prompt: {}", params.id)))?;
        Ok(entry.render(&params.variables.unwrap_or_default()))
    }

    /// `$/cancel` notification: best-effort, never answered.
    pub fn handle_cancel(&self, params: Option<serde_json::Value>) {
        match parse_params::<CancelParams>(params) {
            Ok(cancel) => {
                self.supervisor.cancel(&cancel.id);
            }
            Err(err) => {
                debug!(target: targets::ROUTER, "malformed $/cancel ignored: {}", err.message);
            }
        }
    }

    /// Dispatches every inline (non-supervised) request.
    pub async fn dispatch(&self, request: &JsonRpcRequest) -> ServerResult<serde_json::Value> {
        let params = request.params.clone();
        match request.method.as_str() {
            "initialize" => to_value(self.handle_initialize(params)?),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => to_value(self.handle_tools_list()),
            "resources/list" => to_value(self.handle_resources_list(params).await?),
            "resources/read" => to_value(self.handle_resources_read(params).await?),
            "prompts/list" => to_value(self.handle_prompts_list()),
            "prompts/get" => to_value(self.handle_prompts_get(params)?),
            other => Err(ServerError::method_not_found(other)),
        }
    }
}

fn to_value<T: serde::Serialize>(result: T) -> ServerResult<serde_json::Value> {
    serde_json::to_value(result)
        .map_err(|err| ServerError::internal_error(format!("serialize result: {err}")))
}
