use serde_json::json;

use super::{Notification, NotificationSink, SinkKind};
use crate::error::AlertError;
use crate::http;

/// Chat incoming-webhook sink. The URL itself is the secret.
pub struct WebhookSink {
    http: reqwest::blocking::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(http: reqwest::blocking::Client, url: String) -> Self {
        Self { http, url }
    }
}

impl NotificationSink for WebhookSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Webhook
    }

    fn destination(&self) -> String {
        http::redact_url(&self.url)
    }

    fn deliver(&self, notification: &Notification) -> Result<(), AlertError> {
        let text = format!(":rotating_light: *{}*\n{}", notification.subject, notification.body);
        http::post_json(&self.http, &self.url, None, &json!({ "text": text }))?;
        Ok(())
    }
}
