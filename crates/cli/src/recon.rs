//! `costrecon recon`: research cost vs commission reconciliation.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Subcommand;
use rust_decimal::Decimal;
use tracing::{debug, info};

use costrecon_recon::model::{DataQualityIssue, ReconResult};
use costrecon_recon::output::write_rows_csv;
use costrecon_recon::{ReconConfig, Side};

use crate::exit_codes::{
    recon_exit_code, EXIT_RECON_DATA_QUALITY, EXIT_RECON_INPUT, EXIT_RECON_OUTPUT,
};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Run a reconciliation report from a TOML config file
    #[command(after_help = "\
Examples:
  costrecon recon run broker.recon.toml
  costrecon recon run broker.recon.toml --json
  costrecon recon run broker.recon.toml --output result.json --csv rows.csv
  costrecon recon run individual.recon.toml --today 2026-03-31")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of the row table
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write reconciled rows as CSV to file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Reference date for the default year-to-date range (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,

        /// Exit non-zero when negative sums or other data-quality issues are found
        #[arg(long)]
        fail_on_data_quality: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  costrecon recon validate broker.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, csv, today, fail_on_data_quality } => {
            cmd_recon_run(config, json, output, csv, today, fail_on_data_quality)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| CliError {
        code: EXIT_RECON_INPUT,
        message: format!("cannot read config {}: {e}", config_path.display()),
        hint: None,
    })?;
    ReconConfig::from_toml(&config_str).map_err(|e| recon_err(recon_exit_code(&e), e.to_string()))
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    csv_file: Option<PathBuf>,
    today: Option<NaiveDate>,
    fail_on_data_quality: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    debug!(config = %config_path.display(), name = %config.name, "loaded recon config");

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let input = costrecon_recon::load_input(&config, base_dir)
        .map_err(|e| recon_err(recon_exit_code(&e), e.to_string()))?;

    let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let result = costrecon_recon::run(&config, &input, today)
        .map_err(|e| recon_err(recon_exit_code(&e), e.to_string()))?;
    info!(rows = result.rows.len(), "reconciliation complete");

    // Output
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| recon_err(EXIT_RECON_OUTPUT, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RECON_OUTPUT, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = csv_file {
        let file = std::fs::File::create(path).map_err(|e| {
            recon_err(EXIT_RECON_OUTPUT, format!("cannot create {}: {e}", path.display()))
        })?;
        write_rows_csv(file, &result.meta.group_by, &result.rows)
            .map_err(|e| recon_err(EXIT_RECON_OUTPUT, format!("cannot write CSV: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    } else {
        print!("{}", render_table(&result));
    }

    print_summary(&result);

    let issues = result.summary.data_quality_issues.len();
    if fail_on_data_quality && issues > 0 {
        return Err(recon_err(
            EXIT_RECON_DATA_QUALITY,
            format!("{issues} data-quality issue(s) found"),
        ));
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    let m = &result.meta;
    eprintln!(
        "recon '{}': {} key(s) — {} both, {} cost-only, {} commission-only ({} join, {} to {})",
        m.config_name,
        s.total_keys,
        s.both,
        s.cost_only,
        s.commission_only,
        m.join,
        m.range.start,
        m.range.end,
    );
    eprintln!(
        "totals: research cost {}, commission {}, net delta {}",
        s.total_research_cost, s.total_commission, s.net_delta,
    );
    for (label, stats) in [("costs", &s.costs), ("commissions", &s.commissions)] {
        if stats.out_of_range + stats.unresolved + stats.broker_filter > 0 {
            eprintln!(
                "{label}: {} of {} row(s) kept ({} out of range, {} unresolved broker, {} other broker)",
                stats.kept, stats.loaded, stats.out_of_range, stats.unresolved, stats.broker_filter,
            );
        }
    }
    for issue in &s.data_quality_issues {
        match issue {
            DataQualityIssue::NegativeSum { side, key, amount } => {
                eprintln!("warning: negative {side} sum for {key}: {amount}");
            }
        }
    }
}

/// Fixed-width row table: dimension columns, then the three amounts.
fn render_table(result: &ReconResult) -> String {
    let mut header: Vec<String> = result.meta.group_by.iter().map(|d| d.to_string()).collect();
    header.extend(["research_cost", "commission", "delta"].map(String::from));

    let body: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            let mut cells = row.key.parts().to_vec();
            cells.extend([row.research_cost, row.commission, row.delta].map(|d: Decimal| d.to_string()));
            cells
        })
        .collect();

    let dims = result.meta.group_by.len();
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String]| -> String {
        let parts: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, &w))| {
                if i < dims {
                    format!("{cell:<w$}")
                } else {
                    format!("{cell:>w$}")
                }
            })
            .collect();
        format!("{}\n", parts.join("  ").trim_end())
    };

    let mut out = format_line(&header);
    for cells in &body {
        out.push_str(&format_line(cells));
    }
    out
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let group_by: Vec<String> = config.effective_group_by().iter().map(|d| d.to_string()).collect();
    let policy = config.effective_policy();
    eprintln!(
        "valid: recon '{}' grouped by [{}], {} join, unresolved marker \"{}\" excluded from {}",
        config.name,
        group_by.join(", "),
        config.join,
        policy.unresolved_marker,
        match (policy.exclude_from_costs, policy.exclude_from_commissions) {
            (true, true) => "both sides",
            (true, false) => "costs",
            (false, true) => "commissions",
            (false, false) => "neither side",
        },
    );
    for side in [Side::Costs, Side::Commissions] {
        if !config.maps_broker(side) {
            eprintln!(
                "note: sources.{side} maps no broker column; unresolved brokers cannot be excluded there"
            );
        }
    }
    Ok(())
}
