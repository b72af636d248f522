use serde_json::json;

use super::{Notification, NotificationSink, SinkKind};
use crate::error::AlertError;
use crate::http;

pub const PAGERDUTY_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

/// PagerDuty Events API v2 trigger.
pub struct PagingSink {
    http: reqwest::blocking::Client,
    endpoint: String,
    routing_key: String,
}

impl PagingSink {
    pub fn new(http: reqwest::blocking::Client, routing_key: String) -> Self {
        Self::with_endpoint(http, PAGERDUTY_EVENTS_URL.to_string(), routing_key)
    }

    pub fn with_endpoint(
        http: reqwest::blocking::Client,
        endpoint: String,
        routing_key: String,
    ) -> Self {
        Self { http, endpoint, routing_key }
    }

    fn payload(&self, n: &Notification) -> serde_json::Value {
        json!({
            "routing_key": self.routing_key,
            "event_action": "trigger",
            "payload": {
                "summary": n.summary,
                "source": n.source,
                "severity": n.severity.as_str(),
                "custom_details": {
                    "metric_name": n.metric_name,
                    "metric_value": n.metric_value,
                    "threshold": n.threshold,
                },
            },
        })
    }
}

impl NotificationSink for PagingSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Paging
    }

    fn destination(&self) -> String {
        http::redact_url(&self.endpoint)
    }

    fn deliver(&self, notification: &Notification) -> Result<(), AlertError> {
        http::post_json(&self.http, &self.endpoint, None, &self.payload(notification))?;
        Ok(())
    }
}
