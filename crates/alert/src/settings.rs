//! Alert settings file (TOML).
//!
//! Secrets are given inline or, preferably, by naming the environment
//! variable that holds them (`*_env` fields).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::AlertError;
use crate::http;
use crate::notify::AlertOrigin;
use crate::poll::Poller;
use crate::sink::{
    MetricsSink, NotificationSink, PagingSink, PubSubSink, Severity, SinkKind, WebhookSink,
    DEFAULT_ALERT_METRIC, PAGERDUTY_EVENTS_URL,
};

pub const DEFAULT_TOKEN_ENV: &str = "DATABRICKS_TOKEN";

// ---------------------------------------------------------------------------
// Settings types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertSettings {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub databricks: Option<DatabricksSettings>,
    pub metric: MetricSettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub sinks: SinkSettings,
}

fn default_source() -> String {
    "costrecon".to_string()
}

fn default_http_timeout() -> u64 {
    http::DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabricksSettings {
    pub host: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_env: Option<String>,
    /// Training job to trigger before reading the metric.
    #[serde(default)]
    pub job_id: Option<u64>,
    pub experiment_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSettings {
    pub name: String,
    pub threshold: f64,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollSettings {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

fn default_interval() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    120
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            interval_secs: default_interval(),
            max_attempts: default_max_attempts(),
            deadline_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkSettings {
    #[serde(default)]
    pub metrics: Option<MetricsSinkSettings>,
    #[serde(default)]
    pub pubsub: Option<PubSubSinkSettings>,
    #[serde(default)]
    pub webhook: Option<WebhookSinkSettings>,
    #[serde(default)]
    pub paging: Option<PagingSinkSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSinkSettings {
    pub endpoint: String,
    pub namespace: String,
    #[serde(default = "default_alert_metric")]
    pub metric_name: String,
    #[serde(default)]
    pub dimensions: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub token_env: Option<String>,
}

fn default_alert_metric() -> String {
    DEFAULT_ALERT_METRIC.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PubSubSinkSettings {
    pub endpoint: String,
    pub topic: String,
    #[serde(default)]
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSinkSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagingSinkSettings {
    #[serde(default = "default_paging_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub routing_key: Option<String>,
    #[serde(default)]
    pub routing_key_env: Option<String>,
}

fn default_paging_endpoint() -> String {
    PAGERDUTY_EVENTS_URL.to_string()
}

// ---------------------------------------------------------------------------
// Loading + validation
// ---------------------------------------------------------------------------

impl AlertSettings {
    pub fn from_toml(s: &str) -> Result<Self, AlertError> {
        let settings: AlertSettings =
            toml::from_str(s).map_err(|e| AlertError::SettingsParse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, AlertError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AlertError::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;
        Self::from_toml(&text)
    }

    /// `<config dir>/costrecon/alert.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("costrecon").join("alert.toml"))
    }

    pub fn validate(&self) -> Result<(), AlertError> {
        if self.metric.name.trim().is_empty() {
            return Err(AlertError::SettingsValidation("metric.name must not be empty".into()));
        }
        if !self.metric.threshold.is_finite() {
            return Err(AlertError::SettingsValidation(format!(
                "metric.threshold must be a finite number, got {}",
                self.metric.threshold
            )));
        }
        if self.poll.max_attempts == 0 {
            return Err(AlertError::SettingsValidation("poll.max_attempts must be at least 1".into()));
        }
        if self.http_timeout_secs == 0 {
            return Err(AlertError::SettingsValidation("http_timeout_secs must be at least 1".into()));
        }
        if let Some(db) = &self.databricks {
            if db.host.trim().is_empty() {
                return Err(AlertError::SettingsValidation("databricks.host must not be empty".into()));
            }
            if db.experiment_id.trim().is_empty() {
                return Err(AlertError::SettingsValidation(
                    "databricks.experiment_id must not be empty".into(),
                ));
            }
        }
        if let Some(webhook) = &self.sinks.webhook {
            if webhook.url.is_none() && webhook.url_env.is_none() {
                return Err(AlertError::SettingsValidation(
                    "sinks.webhook needs url or url_env".into(),
                ));
            }
        }
        if let Some(paging) = &self.sinks.paging {
            if paging.routing_key.is_none() && paging.routing_key_env.is_none() {
                return Err(AlertError::SettingsValidation(
                    "sinks.paging needs routing_key or routing_key_env".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poller(&self) -> Poller {
        let poller = Poller::new(
            Duration::from_secs(self.poll.interval_secs),
            self.poll.max_attempts,
        );
        match self.poll.deadline_secs {
            Some(secs) => poller.with_deadline(Duration::from_secs(secs)),
            None => poller,
        }
    }

    pub fn origin(&self) -> AlertOrigin {
        AlertOrigin {
            source: self.source.clone(),
            severity: self.metric.severity,
        }
    }

    /// Build every configured sink. A sink whose secret cannot be resolved
    /// is skipped with a warning; the remaining sinks are still returned.
    /// Kinds of every sink with a settings table, in fan-out order.
    pub fn configured_sinks(&self) -> Vec<SinkKind> {
        [
            (self.sinks.metrics.is_some(), SinkKind::Metrics),
            (self.sinks.pubsub.is_some(), SinkKind::PubSub),
            (self.sinks.webhook.is_some(), SinkKind::Webhook),
            (self.sinks.paging.is_some(), SinkKind::Paging),
        ]
        .into_iter()
        .filter_map(|(configured, kind)| configured.then_some(kind))
        .collect()
    }

    pub fn build_sinks(&self) -> Result<Vec<Box<dyn NotificationSink>>, AlertError> {
        let client = http::build_client(self.http_timeout())?;
        let mut sinks: Vec<Box<dyn NotificationSink>> = Vec::new();

        if let Some(cfg) = &self.sinks.metrics {
            let token = cfg
                .token_env
                .as_deref()
                .map(|var| resolve_env(var, "metrics sink token"))
                .transpose();
            match token {
                Ok(token) => {
                    let mut sink = MetricsSink::new(
                        client.clone(),
                        cfg.endpoint.clone(),
                        cfg.namespace.clone(),
                        cfg.metric_name.clone(),
                    )
                    .with_token(token);
                    for (name, value) in &cfg.dimensions {
                        sink = sink.with_dimension(name, value);
                    }
                    sinks.push(Box::new(sink));
                }
                Err(e) => skip(SinkKind::Metrics, &e),
            }
        }

        if let Some(cfg) = &self.sinks.pubsub {
            let token = cfg
                .token_env
                .as_deref()
                .map(|var| resolve_env(var, "pubsub sink token"))
                .transpose();
            match token {
                Ok(token) => sinks.push(Box::new(PubSubSink::new(
                    client.clone(),
                    cfg.endpoint.clone(),
                    cfg.topic.clone(),
                    token,
                ))),
                Err(e) => skip(SinkKind::PubSub, &e),
            }
        }

        if let Some(cfg) = &self.sinks.webhook {
            match resolve_secret(cfg.url.as_deref(), cfg.url_env.as_deref(), "webhook URL") {
                Ok(url) => sinks.push(Box::new(WebhookSink::new(client.clone(), url))),
                Err(e) => skip(SinkKind::Webhook, &e),
            }
        }

        if let Some(cfg) = &self.sinks.paging {
            match resolve_secret(
                cfg.routing_key.as_deref(),
                cfg.routing_key_env.as_deref(),
                "paging routing key",
            ) {
                Ok(key) => sinks.push(Box::new(PagingSink::with_endpoint(
                    client.clone(),
                    cfg.endpoint.clone(),
                    key,
                ))),
                Err(e) => skip(SinkKind::Paging, &e),
            }
        }

        Ok(sinks)
    }
}

impl DatabricksSettings {
    pub fn resolve_token(&self) -> Result<String, AlertError> {
        let env = self.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV);
        resolve_secret(self.token.as_deref(), Some(env), "Databricks token")
    }
}

fn skip(kind: SinkKind, err: &AlertError) {
    warn!(sink = %kind, error = %err, "notification sink not configured, skipping");
}

// ---------------------------------------------------------------------------
// Secret resolution
// ---------------------------------------------------------------------------

pub fn resolve_env(var_name: &str, label: &str) -> Result<String, AlertError> {
    let missing = || AlertError::MissingEnv {
        var: var_name.to_string(),
        label: label.to_string(),
    };
    let value = std::env::var(var_name).map_err(|_| missing())?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(missing());
    }
    Ok(trimmed.to_string())
}

/// Inline value wins; otherwise read the named variable.
fn resolve_secret(inline: Option<&str>, env: Option<&str>, label: &str) -> Result<String, AlertError> {
    if let Some(value) = inline.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(value.to_string());
    }
    match env {
        Some(var) => resolve_env(var, label),
        None => Err(AlertError::SettingsValidation(format!("no {label} configured"))),
    }
}
