//! Per-connection session state.

use flymcp_protocol::ClientInfo;

/// Lifecycle state for one client connection.
///
/// The transport is single-client, so there is exactly one session per
/// server run. Everything except lifecycle methods is rejected until
/// `initialize` has succeeded.
#[derive(Debug, Default)]
pub(crate) struct Session {
    initialized: bool,
    client_info: Option<ClientInfo>,
}

impl Session {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Marks the session initialized, keeping whatever the client
    /// said about itself for logging.
    pub fn initialize(&mut self, client_info: Option<ClientInfo>) {
        self.initialized = true;
        self.client_info = client_info;
    }

    pub fn client_name(&self) -> &str {
        self.client_info
            .as_ref()
            .map_or("unknown client", |info| info.name.as_str())
    }
}
