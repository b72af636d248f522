use serde::Serialize;

/// Result of comparing one evaluation metric to its threshold.
///
/// Lives for a single evaluation cycle; nothing persists it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyCheck {
    pub metric_name: String,
    pub metric_value: f64,
    pub threshold: f64,
    pub exceeded: bool,
}

/// Strict greater-than comparison. NaN never exceeds.
pub fn evaluate(metric_name: &str, metric_value: f64, threshold: f64) -> AnomalyCheck {
    AnomalyCheck {
        metric_name: metric_name.to_string(),
        metric_value,
        threshold,
        exceeded: metric_value > threshold,
    }
}

impl AnomalyCheck {
    pub fn describe(&self) -> String {
        let verdict = if self.exceeded { "exceeds" } else { "within" };
        format!(
            "{} = {} {} threshold {}",
            self.metric_name, self.metric_value, verdict, self.threshold
        )
    }
}
