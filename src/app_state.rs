// =============================================================================
// Shared Application State
// =============================================================================
//
// Handles the webhook router needs, shared via `Arc<AppState>`. Everything is
// immutable after startup except the activation flag, which carries its own
// lock.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use crate::activation::ActivationStore;
use crate::config::AppConfig;
use crate::service::ReportService;
use crate::telegram::MessageSink;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<ReportService>,
    pub sink: Arc<dyn MessageSink>,
    pub activation: Arc<ActivationStore>,
    /// Instant when the bot was started. Used for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        service: Arc<ReportService>,
        sink: Arc<dyn MessageSink>,
        activation: Arc<ActivationStore>,
    ) -> Self {
        Self {
            config,
            service,
            sink,
            activation,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
