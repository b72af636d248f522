use std::collections::BTreeMap;

use serde_json::json;

use super::{Notification, NotificationSink, SinkKind};
use crate::error::AlertError;
use crate::http;

pub const DEFAULT_ALERT_METRIC: &str = "ModelMetricThresholdExceeded";

/// Counter-increment sink: every alert adds 1 to a named metric.
pub struct MetricsSink {
    http: reqwest::blocking::Client,
    endpoint: String,
    namespace: String,
    metric_name: String,
    dimensions: BTreeMap<String, String>,
    token: Option<String>,
}

impl MetricsSink {
    pub fn new(
        http: reqwest::blocking::Client,
        endpoint: String,
        namespace: String,
        metric_name: String,
    ) -> Self {
        Self {
            http,
            endpoint,
            namespace,
            metric_name,
            dimensions: BTreeMap::new(),
            token: None,
        }
    }

    pub fn with_dimension(mut self, name: &str, value: &str) -> Self {
        self.dimensions.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn payload(&self, n: &Notification) -> serde_json::Value {
        let mut dimensions = self.dimensions.clone();
        dimensions.insert("metric".to_string(), n.metric_name.clone());
        json!({
            "namespace": self.namespace,
            "metric_name": self.metric_name,
            "value": 1,
            "unit": "Count",
            "dimensions": dimensions,
        })
    }
}

impl NotificationSink for MetricsSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Metrics
    }

    fn destination(&self) -> String {
        format!("{}/{}", self.namespace, self.metric_name)
    }

    fn deliver(&self, notification: &Notification) -> Result<(), AlertError> {
        http::post_json(
            &self.http,
            &self.endpoint,
            self.token.as_deref(),
            &self.payload(notification),
        )?;
        Ok(())
    }
}
