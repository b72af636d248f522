//! `costrecon alert`: model-metric threshold check and notification.

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;
use tracing::debug;

use costrecon_alert::{evaluate, notify_built, AlertSettings, AnomalyCheck, NotifyReport};

use crate::exit_codes::{
    alert_exit_code, handler_exit_code, EXIT_ALERT_EXCEEDED, EXIT_ERROR, EXIT_USAGE,
};
use crate::CliError;

#[derive(Subcommand)]
pub enum AlertCommands {
    /// Compare a metric value to a threshold, optionally notifying sinks
    #[command(after_help = "\
Examples:
  costrecon alert check --value 1234.5 --threshold 1000
  costrecon alert check --value 1234.5 --config alert.toml --notify
  costrecon alert check --value 980 --config alert.toml --json

Exit codes:
  0   metric within threshold
  10  metric exceeded threshold (notifications are best-effort)")]
    Check {
        /// Observed metric value
        #[arg(long, allow_negative_numbers = true)]
        value: f64,

        /// Threshold (defaults to metric.threshold from settings)
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f64>,

        /// Metric name (defaults to metric.name from settings)
        #[arg(long)]
        metric: Option<String>,

        /// Alert settings file
        #[arg(long, env = "COSTRECON_ALERT_CONFIG")]
        config: Option<PathBuf>,

        /// Send notifications to the configured sinks when exceeded
        #[arg(long)]
        notify: bool,

        /// Deliver to all sinks concurrently
        #[arg(long, requires = "notify")]
        parallel: bool,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Run one full evaluation cycle (train, read metric, check, notify)
    #[command(after_help = "\
Examples:
  costrecon alert run
  costrecon alert run --config alert.toml
  costrecon alert run --event '{\"skip_training\": true}'
  costrecon alert run --event '{\"metric_value\": 1500}'

Prints the handler response as JSON on stdout.
Exit codes: 0 checked, 15 metric not ready, 13 failed.")]
    Run {
        /// Alert settings file (default: <config dir>/costrecon/alert.toml)
        #[arg(long, env = "COSTRECON_ALERT_CONFIG")]
        config: Option<PathBuf>,

        /// Invocation event as JSON
        #[arg(long, default_value = "{}")]
        event: String,
    },
}

pub fn cmd_alert(cmd: AlertCommands) -> Result<(), CliError> {
    match cmd {
        AlertCommands::Check { value, threshold, metric, config, notify, parallel, json } => {
            cmd_alert_check(value, threshold, metric, config, notify, parallel, json)
        }
        AlertCommands::Run { config, event } => cmd_alert_run(config, event),
    }
}

fn alert_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn load_settings(path: Option<PathBuf>) -> Result<AlertSettings, CliError> {
    let path = match path.or_else(AlertSettings::default_path) {
        Some(path) => path,
        None => {
            return Err(CliError {
                code: EXIT_USAGE,
                message: "no alert settings file given and no platform config directory".into(),
                hint: Some("pass --config <alert.toml>".into()),
            })
        }
    };
    debug!(settings = %path.display(), "loading alert settings");
    AlertSettings::load(&path).map_err(|e| CliError {
        code: alert_exit_code(&e),
        message: e.to_string(),
        hint: Some(format!("settings file: {}", path.display())),
    })
}

#[derive(Serialize)]
struct CheckOutput {
    check: AnomalyCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    notifications: Option<NotifyReport>,
}

fn cmd_alert_check(
    value: f64,
    threshold: Option<f64>,
    metric: Option<String>,
    config: Option<PathBuf>,
    send: bool,
    parallel: bool,
    json_output: bool,
) -> Result<(), CliError> {
    let settings = if config.is_some() || send || threshold.is_none() {
        Some(load_settings(config)?)
    } else {
        None
    };

    let metric_name = metric
        .or_else(|| settings.as_ref().map(|s| s.metric.name.clone()))
        .unwrap_or_else(|| "metric".to_string());
    let threshold = match (threshold, &settings) {
        (Some(t), _) => t,
        (None, Some(s)) => s.metric.threshold,
        (None, None) => return Err(alert_err(EXIT_USAGE, "--threshold is required without --config")),
    };

    let check = evaluate(&metric_name, value, threshold);

    let notifications = match (&settings, send && check.exceeded) {
        (Some(settings), true) => Some(notify_built(
            &check,
            settings.build_sinks(),
            &settings.configured_sinks(),
            &settings.origin(),
            parallel,
        )),
        _ => None,
    };

    if json_output {
        let output = CheckOutput { check: check.clone(), notifications: notifications.clone() };
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| alert_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    eprintln!("{}", check.describe());
    if let Some(report) = &notifications {
        eprintln!(
            "notified {}/{} sink(s)",
            report.delivered(),
            report.attempted(),
        );
        for outcome in &report.outcomes {
            if let costrecon_alert::notify::DeliveryStatus::Failed { reason } = &outcome.status {
                eprintln!("  {} ({}): {}", outcome.sink, outcome.destination, reason);
            }
        }
    }

    if check.exceeded {
        // Empty message: the summary above already says why
        return Err(alert_err(EXIT_ALERT_EXCEEDED, ""));
    }
    Ok(())
}

fn cmd_alert_run(config: Option<PathBuf>, event: String) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let event: serde_json::Value = serde_json::from_str(&event).map_err(|e| CliError {
        code: EXIT_USAGE,
        message: format!("--event is not valid JSON: {e}"),
        hint: Some("example: --event '{\"metric_value\": 1500}'".into()),
    })?;

    let response = costrecon_alert::handle(&event, &settings);

    let json_str = serde_json::to_string_pretty(&response)
        .map_err(|e| alert_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    println!("{json_str}");
    eprintln!("{}: {}", response.status_code, response.message);

    match handler_exit_code(response.status_code) {
        0 => Ok(()),
        code => Err(alert_err(code, "")),
    }
}
