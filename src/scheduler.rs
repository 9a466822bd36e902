// =============================================================================
// Scheduler — recurring report pushes
// =============================================================================
//
// One tokio interval loop per configured job. The first tick fires one full
// period after start. Each due tick checks the activation flag and, when
// active, spawns the cycle as its own task, so a slow cycle never delays the
// next tick and cycles of the same job may overlap.
// =============================================================================

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::activation::ActivationStore;
use crate::config::ScheduledJob;
use crate::service::ReportService;
use crate::telegram::MessageSink;

pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    service: Arc<ReportService>,
    sink: Arc<dyn MessageSink>,
    activation: Arc<ActivationStore>,
}

impl Scheduler {
    pub fn new(
        jobs: Vec<ScheduledJob>,
        service: Arc<ReportService>,
        sink: Arc<dyn MessageSink>,
        activation: Arc<ActivationStore>,
    ) -> Self {
        Self {
            jobs,
            service,
            sink,
            activation,
        }
    }

    /// Spawn every job loop. Abort the returned handles to stop them.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .map(|job| {
                let job = job.clone();
                let service = self.service.clone();
                let sink = self.sink.clone();
                let activation = self.activation.clone();

                info!(kind = %job.kind, every_secs = job.every_secs, "scheduled job registered");
                tokio::spawn(async move {
                    let period = job.period();
                    let mut ticker = interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                    loop {
                        ticker.tick().await;

                        if !activation.is_active() {
                            debug!(kind = %job.kind, "inactive, skipping scheduled report");
                            continue;
                        }

                        let service = service.clone();
                        let sink = sink.clone();
                        let kind = job.kind;
                        tokio::spawn(async move {
                            service.run_cycle(kind, sink.as_ref()).await;
                        });
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::{healthy_service, CollectorSink};
    use crate::types::ReportKind;

    fn scheduler(active: bool) -> (Scheduler, Arc<CollectorSink>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let activation = Arc::new(ActivationStore::load(dir.path().join("bot_state.json")));
        activation.set(active).unwrap();

        let sink = Arc::new(CollectorSink::default());
        let scheduler = Scheduler {
            jobs: vec![ScheduledJob {
                kind: ReportKind::Sentiment,
                every_secs: 1,
            }],
            service: Arc::new(healthy_service()),
            sink: sink.clone(),
            activation,
        };
        (scheduler, sink, dir)
    }

    #[tokio::test]
    async fn active_job_delivers_after_one_period() {
        let (scheduler, sink, _dir) = scheduler(true);
        let handles = scheduler.start();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(sink.messages().is_empty(), "first tick waits a full period");

        tokio::time::sleep(Duration::from_millis(1200)).await;
        for h in &handles {
            h.abort();
        }
        let messages = sink.messages();
        assert!(!messages.is_empty());
        assert!(messages[0].contains("*Fear & Greed Index*"));
    }

    #[tokio::test]
    async fn inactive_job_sends_nothing() {
        let (scheduler, sink, _dir) = scheduler(false);
        let handles = scheduler.start();

        tokio::time::sleep(Duration::from_millis(1300)).await;
        for h in &handles {
            h.abort();
        }
        assert!(sink.messages().is_empty());
    }
}
