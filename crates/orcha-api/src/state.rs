//! Application state shared by the CLI and the REST API.

use orcha_infra::host::OrchestrationHost;
use orcha_types::config::EngineConfig;

#[derive(Clone)]
pub struct AppState {
    pub host: OrchestrationHost,
}

impl AppState {
    /// Wire an in-process host with the built-in activities.
    pub fn init(config: &EngineConfig) -> Self {
        let host = OrchestrationHost::with_builtin_activities(config);
        tracing::debug!(activities = ?host.activity_names(), "engine ready");
        Self { host }
    }
}
