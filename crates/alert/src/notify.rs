//! Best-effort fan-out of one alert to every configured sink.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::check::AnomalyCheck;
use crate::error::AlertError;
use crate::sink::{Notification, NotificationSink, Severity, SinkKind};

/// Who is raising the alert and how loudly.
#[derive(Debug, Clone)]
pub struct AlertOrigin {
    pub source: String,
    pub severity: Severity,
}

impl Default for AlertOrigin {
    fn default() -> Self {
        AlertOrigin {
            source: "costrecon".to_string(),
            severity: Severity::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub sink: SinkKind,
    pub destination: String,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NotifyReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl NotifyReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::Delivered)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.delivered()
    }

    /// One failed outcome per configured sink, for when none could be built.
    pub fn undeliverable(kinds: &[SinkKind], reason: &str) -> Self {
        let outcomes = kinds
            .iter()
            .map(|&sink| DeliveryOutcome {
                sink,
                destination: "unavailable".to_string(),
                status: DeliveryStatus::Failed { reason: reason.to_string() },
            })
            .collect();
        NotifyReport { outcomes }
    }
}

/// Deliver to each sink once, in order. Failures are recorded, never raised.
/// A check that did not exceed its threshold touches no sink.
pub fn notify(
    check: &AnomalyCheck,
    sinks: &[Box<dyn NotificationSink>],
    origin: &AlertOrigin,
) -> NotifyReport {
    if !check.exceeded {
        return NotifyReport::default();
    }
    let notification = Notification::from_check(check, &origin.source, origin.severity);
    let outcomes = sinks
        .iter()
        .map(|sink| deliver_one(sink.as_ref(), &notification))
        .collect();
    NotifyReport { outcomes }
}

/// Same contract as [`notify`], with each sink on its own scoped thread.
/// Outcomes keep sink order.
pub fn notify_parallel(
    check: &AnomalyCheck,
    sinks: &[Box<dyn NotificationSink>],
    origin: &AlertOrigin,
) -> NotifyReport {
    if !check.exceeded {
        return NotifyReport::default();
    }
    let notification = Notification::from_check(check, &origin.source, origin.severity);
    let outcomes = std::thread::scope(|scope| {
        let handles: Vec<_> = sinks
            .iter()
            .map(|sink| {
                let notification = &notification;
                let handle = scope.spawn(move || deliver_one(sink.as_ref(), notification));
                (sink, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(sink, handle)| {
                handle.join().unwrap_or_else(|_| {
                    warn!(sink = %sink.kind(), "notification sink panicked");
                    DeliveryOutcome {
                        sink: sink.kind(),
                        destination: sink.destination(),
                        status: DeliveryStatus::Failed {
                            reason: "sink panicked".to_string(),
                        },
                    }
                })
            })
            .collect()
    });
    NotifyReport { outcomes }
}

/// Notify sinks that may have failed to build. A build failure is folded
/// into the report as one failed outcome per `configured` sink, so it
/// never outranks the check result.
pub fn notify_built(
    check: &AnomalyCheck,
    built: Result<Vec<Box<dyn NotificationSink>>, AlertError>,
    configured: &[SinkKind],
    origin: &AlertOrigin,
    parallel: bool,
) -> NotifyReport {
    if !check.exceeded {
        return NotifyReport::default();
    }
    match built {
        Ok(sinks) if parallel => notify_parallel(check, &sinks, origin),
        Ok(sinks) => notify(check, &sinks, origin),
        Err(e) => {
            error!(error = %e, sinks = configured.len(), "cannot build notification sinks");
            NotifyReport::undeliverable(configured, &e.to_string())
        }
    }
}

fn deliver_one(sink: &dyn NotificationSink, notification: &Notification) -> DeliveryOutcome {
    let destination = sink.destination();
    let status = match sink.deliver(notification) {
        Ok(()) => {
            info!(sink = %sink.kind(), %destination, "alert delivered");
            DeliveryStatus::Delivered
        }
        Err(e) => {
            warn!(sink = %sink.kind(), %destination, error = %e, "alert delivery failed");
            DeliveryStatus::Failed { reason: e.to_string() }
        }
    };
    DeliveryOutcome {
        sink: sink.kind(),
        destination,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::evaluate;
    use crate::error::AlertError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink {
        kind: SinkKind,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CountingSink {
        fn boxed(kind: SinkKind, calls: &Arc<AtomicUsize>, fail: bool) -> Box<dyn NotificationSink> {
            Box::new(CountingSink { kind, calls: Arc::clone(calls), fail })
        }
    }

    impl NotificationSink for CountingSink {
        fn kind(&self) -> SinkKind {
            self.kind
        }

        fn destination(&self) -> String {
            format!("mock-{}", self.kind)
        }

        fn deliver(&self, _notification: &Notification) -> Result<(), AlertError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AlertError::Http { status: 500, body: "boom".into() })
            } else {
                Ok(())
            }
        }
    }

    struct PanickingSink;

    impl NotificationSink for PanickingSink {
        fn kind(&self) -> SinkKind {
            SinkKind::Webhook
        }

        fn destination(&self) -> String {
            "panics".into()
        }

        fn deliver(&self, _notification: &Notification) -> Result<(), AlertError> {
            panic!("sink blew up")
        }
    }

    #[test]
    fn not_exceeded_touches_no_sink() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sinks = vec![CountingSink::boxed(SinkKind::Metrics, &calls, false)];

        let report = notify(&evaluate("rmse", 1000.0, 1000.0), &sinks, &AlertOrigin::default());
        assert_eq!(report.attempted(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let third = Arc::new(AtomicUsize::new(0));
        let sinks = vec![
            CountingSink::boxed(SinkKind::Metrics, &first, false),
            CountingSink::boxed(SinkKind::PubSub, &second, true),
            CountingSink::boxed(SinkKind::Paging, &third, false),
        ];

        let report = notify(&evaluate("rmse", 1500.0, 1000.0), &sinks, &AlertOrigin::default());

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(third.load(Ordering::SeqCst), 1);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.delivered(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.outcomes[1].status,
            DeliveryStatus::Failed { reason: "HTTP 500: boom".into() }
        );
    }

    #[test]
    fn parallel_fan_out_keeps_order_and_isolates_failures() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let sinks = vec![
            CountingSink::boxed(SinkKind::Metrics, &a, true),
            Box::new(PanickingSink) as Box<dyn NotificationSink>,
            CountingSink::boxed(SinkKind::Paging, &b, false),
        ];

        let report = notify_parallel(&evaluate("rmse", 1500.0, 1000.0), &sinks, &AlertOrigin::default());

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        let kinds: Vec<SinkKind> = report.outcomes.iter().map(|o| o.sink).collect();
        assert_eq!(kinds, vec![SinkKind::Metrics, SinkKind::Webhook, SinkKind::Paging]);
        assert_eq!(report.delivered(), 1);
        assert_eq!(
            report.outcomes[1].status,
            DeliveryStatus::Failed { reason: "sink panicked".into() }
        );
    }

    #[test]
    fn no_sinks_is_empty_report() {
        let report = notify(&evaluate("rmse", 1500.0, 1000.0), &[], &AlertOrigin::default());
        assert_eq!(report.attempted(), 0);
    }

    #[test]
    fn report_serializes_flat_status() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sinks = vec![CountingSink::boxed(SinkKind::Webhook, &calls, true)];
        let report = notify(&evaluate("rmse", 1500.0, 1000.0), &sinks, &AlertOrigin::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["sink"], "webhook");
        assert_eq!(json["outcomes"][0]["status"], "failed");
        assert_eq!(json["outcomes"][0]["reason"], "HTTP 500: boom");
    }

    #[test]
    fn sink_build_failure_becomes_failed_outcomes() {
        let check = evaluate("val_rmse", 1500.0, 1000.0);
        let report = notify_built(
            &check,
            Err(AlertError::Network("TLS backend unavailable".into())),
            &[SinkKind::Webhook, SinkKind::Paging],
            &AlertOrigin::default(),
            false,
        );
        assert_eq!(report.attempted(), 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.outcomes[1].sink, SinkKind::Paging);
        match &report.outcomes[0].status {
            DeliveryStatus::Failed { reason } => assert!(reason.contains("TLS backend unavailable")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn built_sinks_are_notified() {
        let calls = Arc::new(AtomicUsize::new(0));
        let check = evaluate("val_rmse", 1500.0, 1000.0);
        let sinks = vec![CountingSink::boxed(SinkKind::Webhook, &calls, false)];
        let report = notify_built(&check, Ok(sinks), &[SinkKind::Webhook], &AlertOrigin::default(), true);
        assert_eq!(report.delivered(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
