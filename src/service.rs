// =============================================================================
// Report Service — fetch, compute, format, deliver
// =============================================================================
//
// `generate_report` is the pipeline entry point used by both the scheduler and
// the chat commands. It returns the finished text or a request-level error.
// `run_cycle` wraps it for a trigger: one span per cycle, a failed request
// turned into its one-line message, and the result handed to the sink. A sink
// failure is logged and dropped.
// =============================================================================

use chrono::{FixedOffset, Utc};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::aggregator::Aggregator;
use crate::error::ReportError;
use crate::report::{failure_message, render};
use crate::telegram::MessageSink;
use crate::types::{ReportKind, Timeframe};

pub struct ReportService {
    aggregator: Aggregator,
    offset: FixedOffset,
}

impl ReportService {
    pub fn new(aggregator: Aggregator, offset: FixedOffset) -> Self {
        Self { aggregator, offset }
    }

    pub async fn generate_report(&self, kind: ReportKind) -> Result<String, ReportError> {
        let timeframes = self.aggregator.matrix().rsi_timeframes.clone();
        self.generate(kind, &timeframes).await
    }

    /// RSI report restricted to `timeframes`.
    pub async fn generate_rsi_report(
        &self,
        timeframes: &[Timeframe],
    ) -> Result<String, ReportError> {
        self.generate(ReportKind::Rsi, timeframes).await
    }

    async fn generate(
        &self,
        kind: ReportKind,
        rsi_timeframes: &[Timeframe],
    ) -> Result<String, ReportError> {
        if kind.needs_rsi() && rsi_timeframes.is_empty() {
            return Err(ReportError::InvalidConfiguration(
                "no RSI timeframes requested".into(),
            ));
        }

        let generated_at = Utc::now().with_timezone(&self.offset);
        let data = self
            .aggregator
            .collect(kind, rsi_timeframes, generated_at)
            .await?;

        if data.has_no_data() {
            return Err(ReportError::NoData(kind));
        }
        Ok(render(kind, &data))
    }

    /// Build and deliver one scheduled or requested report.
    pub async fn run_cycle(&self, kind: ReportKind, sink: &dyn MessageSink) {
        let span = info_span!("report_cycle", cycle_id = %Uuid::new_v4(), %kind);
        async {
            let outcome = self.generate_report(kind).await;
            self.deliver(outcome, sink).await;
        }
        .instrument(span)
        .await
    }

    /// `run_cycle` for an RSI report on specific timeframes.
    pub async fn run_rsi_cycle(&self, timeframes: &[Timeframe], sink: &dyn MessageSink) {
        let span = info_span!(
            "report_cycle",
            cycle_id = %Uuid::new_v4(),
            kind = %ReportKind::Rsi,
            timeframes = ?timeframes
        );
        async {
            let outcome = self.generate_rsi_report(timeframes).await;
            self.deliver(outcome, sink).await;
        }
        .instrument(span)
        .await
    }

    async fn deliver(&self, outcome: Result<String, ReportError>, sink: &dyn MessageSink) {
        let text = match outcome {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "report generation failed");
                failure_message(&e)
            }
        };

        match sink.deliver(&text).await {
            Ok(()) => info!(chars = text.chars().count(), "report delivered"),
            Err(e) => error!(error = %e, "report dispatch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::testing::{aggregator, healthy_service, CollectorSink, FailingPrice, FakeSeries};

    #[tokio::test]
    async fn comprehensive_report_renders() {
        let text = healthy_service()
            .generate_report(ReportKind::Comprehensive)
            .await
            .unwrap();
        assert!(text.starts_with("📊 *Comprehensive Market Analysis*"));
        assert!(text.contains("BTC: 100.00"));
        assert!(text.contains("CoinMarketCap: N/A"));
        assert!(text.contains("premium +5.000%"));
    }

    #[tokio::test]
    async fn single_timeframe_rsi_report() {
        let text = healthy_service()
            .generate_rsi_report(&[Timeframe::H4])
            .await
            .unwrap();
        assert!(text.contains("4h: RSI6 🔴 100.00 RSI14 🔴 100.00"));
        assert!(!text.contains("1h:"));
    }

    #[tokio::test]
    async fn everything_missing_is_no_data() {
        let agg = aggregator(FakeSeries::rising(0), Arc::new(FailingPrice), Duration::from_secs(1));
        let service = ReportService::new(agg, FixedOffset::east_opt(0).unwrap());
        let err = service.generate_report(ReportKind::Ema).await.unwrap_err();
        assert!(matches!(err, ReportError::NoData(ReportKind::Ema)));
    }

    #[tokio::test]
    async fn unsupported_timeframe_reaches_the_chat() {
        let agg = aggregator(
            FakeSeries {
                failing: None,
                unsupported: Some(Timeframe::H8),
                len: 50,
            },
            Arc::new(FailingPrice),
            Duration::from_secs(1),
        );
        let service = ReportService::new(agg, FixedOffset::east_opt(0).unwrap());
        let sink = CollectorSink::default();
        service.run_rsi_cycle(&[Timeframe::H8], &sink).await;

        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("⚠️ Report generation failed: unsupported timeframe"));
    }

    #[tokio::test]
    async fn run_cycle_delivers_once() {
        let sink = CollectorSink::default();
        healthy_service().run_cycle(ReportKind::Sentiment, &sink).await;
        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Alternative.me: 15 (Extreme Fear)"));
    }

    #[tokio::test]
    async fn rejected_dispatch_does_not_panic() {
        let sink = CollectorSink::rejecting();
        healthy_service().run_cycle(ReportKind::Premium, &sink).await;
        assert!(sink.messages().is_empty());
    }
}
