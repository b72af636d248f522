//! Single-shot batch entry point: (train) → read metric → check → notify.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::check::{evaluate, AnomalyCheck};
use crate::databricks::{ExperimentClient, JobClient, MetricReading};
use crate::error::AlertError;
use crate::notify::{notify_built, NotifyReport};
use crate::settings::AlertSettings;

pub const STATUS_OK: u16 = 200;
pub const STATUS_NOT_READY: u16 = 202;
pub const STATUS_FAILED: u16 = 500;

#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<AnomalyCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotifyReport>,
}

impl HandlerResponse {
    fn new(status_code: u16, message: String) -> Self {
        HandlerResponse {
            status_code,
            message,
            check: None,
            notifications: None,
        }
    }
}

enum Metric {
    Value(f64),
    NotReady(String),
}

/// Run one evaluation cycle. Never panics or returns an error: every
/// failure is logged and folded into a 500 response.
///
/// The event may carry `metric_value` (number) to skip the upstream
/// read entirely, and `skip_training` (bool) to read the metric without
/// triggering the configured job.
pub fn handle(event: &serde_json::Value, settings: &AlertSettings) -> HandlerResponse {
    match run(event, settings) {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "alert check failed");
            HandlerResponse::new(STATUS_FAILED, format!("alert check failed: {e}"))
        }
    }
}

fn run(event: &serde_json::Value, settings: &AlertSettings) -> Result<HandlerResponse, AlertError> {
    let metric_name = &settings.metric.name;

    let value = match event.get("metric_value").and_then(|v| v.as_f64()) {
        Some(value) => {
            info!(metric = %metric_name, value, "using metric value from event");
            value
        }
        None => {
            let skip_training = event
                .get("skip_training")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            match read_metric(settings, skip_training)? {
                Metric::Value(value) => value,
                Metric::NotReady(reason) => {
                    warn!(metric = %metric_name, %reason, "metric not ready");
                    return Ok(HandlerResponse::new(
                        STATUS_NOT_READY,
                        format!("metric not ready: {reason}"),
                    ));
                }
            }
        }
    };

    let check = evaluate(metric_name, value, settings.metric.threshold);
    info!(
        metric = %check.metric_name,
        value = check.metric_value,
        threshold = check.threshold,
        exceeded = check.exceeded,
        "metric evaluated"
    );

    if !check.exceeded {
        return Ok(HandlerResponse {
            status_code: STATUS_OK,
            message: format!("{}; no alert sent", check.describe()),
            check: Some(check),
            notifications: None,
        });
    }

    let report = notify_built(
        &check,
        settings.build_sinks(),
        &settings.configured_sinks(),
        &settings.origin(),
        false,
    );
    let message = format!(
        "{}; alert delivered to {}/{} sink(s)",
        check.describe(),
        report.delivered(),
        report.attempted()
    );
    Ok(HandlerResponse {
        status_code: STATUS_OK,
        message,
        check: Some(check),
        notifications: Some(report),
    })
}

fn read_metric(settings: &AlertSettings, skip_training: bool) -> Result<Metric, AlertError> {
    let db = settings.databricks.as_ref().ok_or_else(|| {
        AlertError::SettingsValidation(
            "no [databricks] settings and no metric_value in event".into(),
        )
    })?;
    let token = db.resolve_token()?;
    let timeout = settings.http_timeout();

    if let (Some(job_id), false) = (db.job_id, skip_training) {
        let jobs = JobClient::new(&db.host, token.clone(), timeout)?;
        let run_id = jobs.run_now(job_id)?;
        info!(job_id, run_id, "training run started");

        let state = settings
            .poller()
            .poll_until_ready(|| jobs.run_state(run_id), |s| s.is_in_progress())?;
        if !state.succeeded() {
            return Err(AlertError::JobFailed {
                run_id,
                state: state.describe(),
            });
        }
        info!(run_id, "training run succeeded");
    }

    let experiments = ExperimentClient::new(&db.host, token, timeout)?;
    Ok(
        match experiments.latest_metric(&db.experiment_id, &settings.metric.name)? {
            MetricReading::Available { run_id, value } => {
                info!(%run_id, value, "metric read");
                Metric::Value(value)
            }
            MetricReading::NotReady { reason } => Metric::NotReady(reason),
        },
    )
}
