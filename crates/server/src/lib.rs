//! Wireframe Studio server
//!
//! Thin HTTP layer over the session engine. All error translation to
//! user-visible responses happens in one place ([`http::ApiError`]); the
//! handlers stay free of policy.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;
