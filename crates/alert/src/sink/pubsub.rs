use serde_json::json;

use super::{Notification, NotificationSink, SinkKind};
use crate::error::AlertError;
use crate::http;

/// Publishes subject + body to a topic on an HTTP publish endpoint.
pub struct PubSubSink {
    http: reqwest::blocking::Client,
    endpoint: String,
    topic: String,
    token: Option<String>,
}

impl PubSubSink {
    pub fn new(
        http: reqwest::blocking::Client,
        endpoint: String,
        topic: String,
        token: Option<String>,
    ) -> Self {
        Self { http, endpoint, topic, token }
    }
}

impl NotificationSink for PubSubSink {
    fn kind(&self) -> SinkKind {
        SinkKind::PubSub
    }

    fn destination(&self) -> String {
        self.topic.clone()
    }

    fn deliver(&self, notification: &Notification) -> Result<(), AlertError> {
        let body = json!({
            "topic": self.topic,
            "subject": notification.subject,
            "message": notification.body,
        });
        http::post_json(&self.http, &self.endpoint, self.token.as_deref(), &body)?;
        Ok(())
    }
}
