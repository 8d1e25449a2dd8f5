//! Application state
//!
//! Shared state across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use wireframe_config::Settings;
use wireframe_session::SessionManager;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Settings>,
    /// The session engine.
    pub engine: Arc<SessionManager>,
    /// Prometheus render handle for `/metrics`.
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(config: Settings, engine: Arc<SessionManager>, metrics: PrometheusHandle) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            metrics,
        }
    }
}
