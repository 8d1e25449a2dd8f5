//! Background janitor
//!
//! Periodic sweeper that expires TTL-elapsed sessions, compacts sessions
//! past the retention window and refreshes aggregate gauges. Runs until the
//! returned shutdown handle is flipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::manager::SessionManager;

/// Background sweeper bound to one session manager.
pub struct Janitor {
    manager: Arc<SessionManager>,
    interval: Duration,
}

impl Janitor {
    pub fn new(manager: Arc<SessionManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Start the sweep task.
    ///
    /// Returns a shutdown sender; send `true` to stop the task.
    pub fn start(self) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = self.manager;
        let interval = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        Self::sweep(&manager).await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("janitor shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    async fn sweep(manager: &SessionManager) {
        match manager.sweep_expired().await {
            Ok(removed) if removed > 0 => {
                tracing::info!(removed, "janitor expired sessions");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "janitor expiry sweep failed"),
        }

        match manager.compact_overflow().await {
            Ok(stripped) if stripped > 0 => {
                tracing::info!(stripped, "janitor compacted version bodies");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "janitor compaction sweep failed"),
        }

        let active = manager.session_count().await;
        metrics::gauge!("wireframe_active_sessions").set(active as f64);
    }
}
