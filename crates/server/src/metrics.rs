//! Prometheus metrics endpoint

use axum::extract::State;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Render the current metric registry.
pub async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
