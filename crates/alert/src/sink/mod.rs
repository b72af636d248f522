//! Notification channels.
//!
//! Each sink delivers one [`Notification`] to one external service. Sinks
//! are independent: the fan-out in [`crate::notify`] isolates failures so
//! one broken channel never blocks the others.

mod metrics;
mod paging;
mod pubsub;
mod webhook;

use serde::Serialize;

use crate::check::AnomalyCheck;
use crate::error::AlertError;

pub use metrics::{MetricsSink, DEFAULT_ALERT_METRIC};
pub use paging::{PagingSink, PAGERDUTY_EVENTS_URL};
pub use pubsub::PubSubSink;
pub use webhook::WebhookSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Metrics,
    PubSub,
    Webhook,
    Paging,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SinkKind::Metrics => "metrics",
            SinkKind::PubSub => "pubsub",
            SinkKind::Webhook => "webhook",
            SinkKind::Paging => "paging",
        };
        f.write_str(s)
    }
}

/// Paging severity. Values match the PagerDuty Events v2 vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    #[default]
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

/// Rendered alert, shared by every sink in one fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// One-line form for channels with short fields (paging, chat).
    pub summary: String,
    /// Emitting system, used as the paging `source`.
    pub source: String,
    pub severity: Severity,
    pub metric_name: String,
    pub metric_value: f64,
    pub threshold: f64,
}

impl Notification {
    pub fn from_check(check: &AnomalyCheck, source: &str, severity: Severity) -> Self {
        Notification {
            subject: format!("Model metric threshold exceeded: {}", check.metric_name),
            body: format!(
                "Model evaluation metric {} is {} which exceeds the threshold of {}.",
                check.metric_name, check.metric_value, check.threshold
            ),
            summary: check.describe(),
            source: source.to_string(),
            severity,
            metric_name: check.metric_name.clone(),
            metric_value: check.metric_value,
            threshold: check.threshold,
        }
    }
}

/// One outbound notification channel.
pub trait NotificationSink: Send + Sync {
    fn kind(&self) -> SinkKind;

    /// Human-readable target, safe to log (no secrets).
    fn destination(&self) -> String;

    fn deliver(&self, notification: &Notification) -> Result<(), AlertError>;
}
