//! Databricks Jobs 2.1 and MLflow tracking REST clients (blocking).
//!
//! Covers the training-check flow: trigger job → poll run state →
//! read the newest run's evaluation metric.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::error::AlertError;
use crate::http;

/// Life-cycle states in which a run has not reached a final answer.
pub const IN_PROGRESS_STATES: &[&str] = &[
    "PENDING",
    "QUEUED",
    "RUNNING",
    "TERMINATING",
    "BLOCKED",
    "WAITING_FOR_RETRY",
];

/// State of one job run (from `runs/get`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    pub life_cycle: String,
    pub result_state: Option<String>,
    pub state_message: Option<String>,
}

impl RunState {
    pub fn is_in_progress(&self) -> bool {
        IN_PROGRESS_STATES.contains(&self.life_cycle.as_str())
    }

    pub fn succeeded(&self) -> bool {
        self.life_cycle == "TERMINATED" && self.result_state.as_deref() == Some("SUCCESS")
    }

    pub fn describe(&self) -> String {
        match (&self.result_state, &self.state_message) {
            (Some(result), Some(msg)) if !msg.is_empty() => {
                format!("{}/{} ({})", self.life_cycle, result, msg)
            }
            (Some(result), _) => format!("{}/{}", self.life_cycle, result),
            (None, _) => self.life_cycle.clone(),
        }
    }
}

/// Latest value of an evaluation metric, or why there is none yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricReading {
    Available { run_id: String, value: f64 },
    NotReady { reason: String },
}

/// Jobs API client.
#[derive(Clone)]
pub struct JobClient {
    http: reqwest::blocking::Client,
    host: String,
    token: String,
}

impl JobClient {
    pub fn new(host: &str, token: String, timeout: Duration) -> Result<Self, AlertError> {
        Ok(Self {
            http: http::build_client(timeout)?,
            host: host.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Trigger a run of an existing job. Returns the new run id.
    pub fn run_now(&self, job_id: u64) -> Result<u64, AlertError> {
        let url = format!("{}/api/2.1/jobs/run-now", self.host);
        let resp = http::post_json(&self.http, &url, Some(&self.token), &json!({ "job_id": job_id }))?;
        let body = http::read_json(resp)?;
        let run_id = body["run_id"]
            .as_u64()
            .ok_or_else(|| AlertError::Parse("run-now response has no run_id".into()))?;
        debug!(job_id, run_id, "job run triggered");
        Ok(run_id)
    }

    pub fn run_state(&self, run_id: u64) -> Result<RunState, AlertError> {
        let url = format!("{}/api/2.1/jobs/runs/get", self.host);
        let req = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("run_id", run_id)]);
        let body = http::read_json(http::send(req)?)?;

        let state = &body["state"];
        let life_cycle = state["life_cycle_state"]
            .as_str()
            .ok_or_else(|| AlertError::Parse("runs/get response has no state.life_cycle_state".into()))?;
        Ok(RunState {
            life_cycle: life_cycle.to_string(),
            result_state: state["result_state"].as_str().map(String::from),
            state_message: state["state_message"].as_str().map(String::from),
        })
    }
}

/// MLflow tracking client.
#[derive(Clone)]
pub struct ExperimentClient {
    http: reqwest::blocking::Client,
    host: String,
    token: String,
}

impl ExperimentClient {
    pub fn new(host: &str, token: String, timeout: Duration) -> Result<Self, AlertError> {
        Ok(Self {
            http: http::build_client(timeout)?,
            host: host.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Read `metric_key` from the most recently started run of an experiment.
    pub fn latest_metric(&self, experiment_id: &str, metric_key: &str) -> Result<MetricReading, AlertError> {
        let url = format!("{}/api/2.0/mlflow/runs/search", self.host);
        let request = json!({
            "experiment_ids": [experiment_id],
            "max_results": 1,
            "order_by": ["attributes.start_time DESC"],
        });
        let body = http::read_json(http::post_json(&self.http, &url, Some(&self.token), &request)?)?;

        let Some(run) = body["runs"].as_array().and_then(|runs| runs.first()) else {
            return Ok(MetricReading::NotReady {
                reason: format!("experiment {experiment_id} has no runs"),
            });
        };
        let run_id = run["info"]["run_id"].as_str().unwrap_or_default().to_string();

        let value = run["data"]["metrics"]
            .as_array()
            .and_then(|metrics| metrics.iter().find(|m| m["key"].as_str() == Some(metric_key)))
            .and_then(|m| m["value"].as_f64());

        Ok(match value {
            Some(value) => MetricReading::Available { run_id, value },
            None => MetricReading::NotReady {
                reason: format!("run {run_id} has no metric {metric_key}"),
            },
        })
    }
}
