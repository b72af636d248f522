// End-to-end handler runs against mocked Databricks, MLflow and sink endpoints.

use httpmock::prelude::*;
use serde_json::json;

use costrecon_alert::handler::{STATUS_FAILED, STATUS_NOT_READY, STATUS_OK};
use costrecon_alert::notify::DeliveryStatus;
use costrecon_alert::{handle, AlertSettings, SinkKind};

fn settings(server: &MockServer, job: bool, threshold: f64) -> AlertSettings {
    let job_line = if job { "job_id = 42\n" } else { "" };
    let toml = format!(
        r#"
[databricks]
host = "{host}"
token = "dapi-test"
{job_line}experiment_id = "1234"

[metric]
name = "val_rmse"
threshold = {threshold:?}

[poll]
interval_secs = 0
max_attempts = 5

[sinks.webhook]
url = "{webhook}"

[sinks.paging]
endpoint = "{paging}"
routing_key = "R0UT1NG"
"#,
        host = server.base_url(),
        webhook = server.url("/hooks/alerts"),
        paging = server.url("/v2/enqueue"),
    );
    AlertSettings::from_toml(&toml).unwrap()
}

fn mock_metric(server: &MockServer, value: f64) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/2.0/mlflow/runs/search")
            .header("authorization", "Bearer dapi-test");
        then.status(200).json_body(json!({
            "runs": [{
                "info": { "run_id": "run-7" },
                "data": { "metrics": [{ "key": "val_rmse", "value": value }] }
            }]
        }));
    });
}

#[test]
fn metric_within_threshold_sends_nothing() {
    let server = MockServer::start();
    mock_metric(&server, 850.0);
    let hook = server.mock(|when, then| {
        when.method(POST).path("/hooks/alerts");
        then.status(200);
    });

    let resp = handle(&json!({}), &settings(&server, false, 1000.0));

    assert_eq!(resp.status_code, STATUS_OK, "{}", resp.message);
    assert!(!resp.check.unwrap().exceeded);
    hook.assert_calls(0);
}

#[test]
fn exceeded_metric_fans_out_past_failing_sink() {
    let server = MockServer::start();
    mock_metric(&server, 1500.0);
    let hook = server.mock(|when, then| {
        when.method(POST).path("/hooks/alerts");
        then.status(500).body("hook down");
    });
    let page = server.mock(|when, then| {
        when.method(POST)
            .path("/v2/enqueue")
            .json_body_includes(r#"{ "routing_key": "R0UT1NG", "event_action": "trigger" }"#);
        then.status(202);
    });

    let resp = handle(&json!({}), &settings(&server, false, 1000.0));

    assert_eq!(resp.status_code, STATUS_OK, "{}", resp.message);
    hook.assert();
    page.assert();

    let report = resp.notifications.unwrap();
    assert_eq!(report.outcomes[0].sink, SinkKind::Webhook);
    assert!(matches!(report.outcomes[0].status, DeliveryStatus::Failed { .. }));
    assert_eq!(report.outcomes[1].sink, SinkKind::Paging);
    assert_eq!(report.outcomes[1].status, DeliveryStatus::Delivered);
    assert!(resp.message.ends_with("alert delivered to 1/2 sink(s)"));
}

#[test]
fn no_runs_yet_is_202() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/2.0/mlflow/runs/search");
        then.status(200).json_body(json!({ "runs": [] }));
    });

    let resp = handle(&json!({}), &settings(&server, false, 1000.0));
    assert_eq!(resp.status_code, STATUS_NOT_READY);
    assert!(resp.message.contains("has no runs"));
}

#[test]
fn upstream_failure_is_500() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/2.0/mlflow/runs/search");
        then.status(503).body("temporarily unavailable");
    });

    let resp = handle(&json!({}), &settings(&server, false, 1000.0));
    assert_eq!(resp.status_code, STATUS_FAILED);
    assert!(resp.message.contains("HTTP 503"), "{}", resp.message);
}

#[test]
fn training_job_is_triggered_and_polled() {
    let server = MockServer::start();
    let run_now = server.mock(|when, then| {
        when.method(POST)
            .path("/api/2.1/jobs/run-now")
            .json_body(json!({ "job_id": 42 }));
        then.status(200).json_body(json!({ "run_id": 77 }));
    });
    let runs_get = server.mock(|when, then| {
        when.method(GET)
            .path("/api/2.1/jobs/runs/get")
            .query_param("run_id", "77");
        then.status(200).json_body(json!({
            "state": { "life_cycle_state": "TERMINATED", "result_state": "SUCCESS" }
        }));
    });
    mock_metric(&server, 999.0);

    let resp = handle(&json!({}), &settings(&server, true, 1000.0));

    assert_eq!(resp.status_code, STATUS_OK, "{}", resp.message);
    run_now.assert();
    runs_get.assert();
}

#[test]
fn failed_training_run_is_500() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/2.1/jobs/run-now");
        then.status(200).json_body(json!({ "run_id": 78 }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/2.1/jobs/runs/get");
        then.status(200).json_body(json!({
            "state": {
                "life_cycle_state": "INTERNAL_ERROR",
                "result_state": "FAILED",
                "state_message": "cluster terminated"
            }
        }));
    });

    let resp = handle(&json!({}), &settings(&server, true, 1000.0));
    assert_eq!(resp.status_code, STATUS_FAILED);
    assert!(resp.message.contains("job run 78 did not succeed"), "{}", resp.message);
}

#[test]
fn stuck_training_run_times_out() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/2.1/jobs/run-now");
        then.status(200).json_body(json!({ "run_id": 79 }));
    });
    let runs_get = server.mock(|when, then| {
        when.method(GET).path("/api/2.1/jobs/runs/get");
        then.status(200).json_body(json!({ "state": { "life_cycle_state": "RUNNING" } }));
    });

    let resp = handle(&json!({}), &settings(&server, true, 1000.0));
    assert_eq!(resp.status_code, STATUS_FAILED);
    assert!(resp.message.contains("timed out after 5 poll attempt(s)"), "{}", resp.message);
    runs_get.assert_calls(5);
}

#[test]
fn event_value_skips_upstream() {
    let server = MockServer::start();
    let search = server.mock(|when, then| {
        when.method(POST).path("/api/2.0/mlflow/runs/search");
        then.status(200).json_body(json!({ "runs": [] }));
    });
    let page = server.mock(|when, then| {
        when.method(POST).path("/v2/enqueue");
        then.status(202);
    });
    server.mock(|when, then| {
        when.method(POST).path("/hooks/alerts");
        then.status(200);
    });

    let resp = handle(&json!({ "metric_value": 1001.0 }), &settings(&server, true, 1000.0));

    assert_eq!(resp.status_code, STATUS_OK);
    search.assert_calls(0);
    page.assert();
}

#[test]
fn skip_training_reads_metric_only() {
    let server = MockServer::start();
    let run_now = server.mock(|when, then| {
        when.method(POST).path("/api/2.1/jobs/run-now");
        then.status(200).json_body(json!({ "run_id": 1 }));
    });
    mock_metric(&server, 10.0);

    let resp = handle(&json!({ "skip_training": true }), &settings(&server, true, 1000.0));
    assert_eq!(resp.status_code, STATUS_OK);
    run_now.assert_calls(0);
}
