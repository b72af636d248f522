use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use costrecon_recon::config::ReconConfig;
use costrecon_recon::engine::{load_input, run};
use costrecon_recon::model::{Presence, ReconKey, ReconResult};
use costrecon_recon::output::write_rows_csv;
use costrecon_recon::{JoinDirection, ReconError};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn load_config(name: &str) -> ReconConfig {
    let path = fixtures_dir().join(name);
    let toml = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    ReconConfig::from_toml(&toml).unwrap()
}

fn load_and_run(config: &ReconConfig) -> ReconResult {
    let input = load_input(config, &fixtures_dir()).unwrap();
    run(config, &input, today()).unwrap()
}

fn row_for<'a>(result: &'a ReconResult, key: &[&str]) -> &'a costrecon_recon::ReconciliationRow {
    let key = ReconKey::new(key.iter().copied());
    result
        .rows
        .iter()
        .find(|r| r.key == key)
        .unwrap_or_else(|| panic!("no row for {key}"))
}

// -------------------------------------------------------------------------
// Broker-level report
// -------------------------------------------------------------------------

#[test]
fn broker_report_full_join() {
    let config = load_config("broker.recon.toml");
    let result = load_and_run(&config);

    assert_eq!(result.meta.join, JoinDirection::Full);
    assert_eq!(result.summary.total_keys, 5);
    assert_eq!(result.summary.both, 2);
    assert_eq!(result.summary.cost_only, 1);
    assert_eq!(result.summary.commission_only, 2);

    let acme = row_for(&result, &["Acme Securities"]);
    assert_eq!(acme.research_cost, dec!(2000.00));
    assert_eq!(acme.commission, dec!(1450.00));
    assert_eq!(acme.delta, dec!(-550.00));

    let birch = row_for(&result, &["Birch Capital"]);
    assert_eq!(birch.research_cost, dec!(870.50));
    assert_eq!(birch.delta, dec!(-220.00));

    // Unbilled research stays visible
    let cobalt = row_for(&result, &["Cobalt Partners"]);
    assert_eq!(cobalt.presence, Presence::CostOnly);
    assert_eq!(cobalt.commission, Decimal::ZERO);
    assert_eq!(cobalt.delta, dec!(-300.00));

    let delta_brokerage = row_for(&result, &["Delta Brokerage"]);
    assert_eq!(delta_brokerage.presence, Presence::CommissionOnly);
    assert_eq!(delta_brokerage.delta, dec!(125.00));

    assert_eq!(result.summary.total_research_cost, dec!(3170.50));
    assert_eq!(result.summary.total_commission, dec!(2285.50));
    assert_eq!(result.summary.net_delta, dec!(-885.00));
}

#[test]
fn broker_report_excludes_unresolved_costs_only() {
    let config = load_config("broker.recon.toml");
    let result = load_and_run(&config);

    assert_eq!(result.summary.costs.loaded, 9);
    assert_eq!(result.summary.costs.out_of_range, 2);
    assert_eq!(result.summary.costs.unresolved, 1);
    assert_eq!(result.summary.commissions.unresolved, 0);

    // The "Other" commission survives, its research cost does not
    let other = row_for(&result, &["Other"]);
    assert_eq!(other.research_cost, Decimal::ZERO);
    assert_eq!(other.commission, dec!(60.00));
}

#[test]
fn broker_report_sorted_by_key() {
    let config = load_config("broker.recon.toml");
    let result = load_and_run(&config);
    let keys: Vec<String> = result.rows.iter().map(|r| r.key.parts()[0].clone()).collect();
    assert_eq!(
        keys,
        vec!["Acme Securities", "Birch Capital", "Cobalt Partners", "Delta Brokerage", "Other"]
    );
}

#[test]
fn every_row_satisfies_delta_identity() {
    for name in ["broker.recon.toml", "individual.recon.toml", "single-broker.recon.toml"] {
        let config = load_config(name);
        let result = load_and_run(&config);
        for row in &result.rows {
            assert_eq!(row.delta, row.commission - row.research_cost, "{name}: {}", row.key);
        }
    }
}

// -------------------------------------------------------------------------
// Individual-level report (commission-side join)
// -------------------------------------------------------------------------

#[test]
fn individual_report_commission_join_drops_cost_only() {
    let config = load_config("individual.recon.toml");
    let result = load_and_run(&config);

    assert_eq!(result.meta.join, JoinDirection::Commissions);
    assert_eq!(result.summary.total_keys, 4);
    assert_eq!(result.summary.cost_only, 0);
    assert!(result
        .rows
        .iter()
        .all(|r| r.key != ReconKey::new(["Rates", "Priya Nair"])));

    // Individual variant keeps unresolved-broker research
    let dana = row_for(&result, &["Equity", "Dana Ruiz"]);
    assert_eq!(dana.research_cost, dec!(2199.00));
    assert_eq!(dana.commission, dec!(900.00));
    assert_eq!(dana.delta, dec!(-1299.00));

    // Split weight halves Sam's research cost
    let sam = row_for(&result, &["Equity", "Sam Okafor"]);
    assert_eq!(sam.research_cost, dec!(400));
    assert_eq!(sam.commission, dec!(160.00));
}

#[test]
fn individual_report_full_join_keeps_cost_only() {
    let mut config = load_config("individual.recon.toml");
    config.join = JoinDirection::Full;
    let result = load_and_run(&config);

    assert_eq!(result.summary.total_keys, 5);
    let priya = row_for(&result, &["Rates", "Priya Nair"]);
    assert_eq!(priya.presence, Presence::CostOnly);
    assert_eq!(priya.delta, dec!(-220.00));
}

// -------------------------------------------------------------------------
// Single-broker report
// -------------------------------------------------------------------------

#[test]
fn single_broker_report_by_team() {
    let config = load_config("single-broker.recon.toml");
    let result = load_and_run(&config);

    assert_eq!(result.meta.broker_filter.as_deref(), Some("Acme Securities"));
    assert_eq!(result.rows.len(), 2);

    let equity = row_for(&result, &["Equity"]);
    assert_eq!(equity.research_cost, dec!(1600.00));
    assert_eq!(equity.commission, dec!(1000.00));
    assert_eq!(equity.delta, dec!(-600.00));

    let rates = row_for(&result, &["Rates"]);
    assert_eq!(rates.delta, dec!(50.00));

    assert_eq!(result.summary.costs.unresolved, 1);
    assert_eq!(result.summary.costs.broker_filter, 3);
    assert_eq!(result.summary.commissions.broker_filter, 3);
}

// -------------------------------------------------------------------------
// Date range defaults + output
// -------------------------------------------------------------------------

#[test]
fn default_range_is_year_to_date() {
    let mut config = load_config("broker.recon.toml");
    config.range.start = None;
    config.range.end = None;
    let input = load_input(&config, &fixtures_dir()).unwrap();

    let result = run(&config, &input, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()).unwrap();
    assert_eq!(result.meta.range.start.to_string(), "2026-01-01");
    assert_eq!(result.meta.range.end.to_string(), "2026-03-31");
    // The 2026-04-01 and 2025-12-31 events fall outside
    assert_eq!(result.summary.costs.out_of_range, 2);

    let result = run(&config, &input, NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()).unwrap();
    assert_eq!(result.summary.costs.out_of_range, 1);
}

#[test]
fn missing_source_file_is_io_error() {
    let config = load_config("broker.recon.toml");
    let err = load_input(&config, &fixtures_dir().join("nowhere")).unwrap_err();
    assert!(err.to_string().contains("research_costs.csv"));
}

#[test]
fn csv_output_round_trips_to_file() {
    let config = load_config("broker.recon.toml");
    let result = load_and_run(&config);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broker.csv");
    let file = std::fs::File::create(&path).unwrap();
    write_rows_csv(file, &result.meta.group_by, &result.rows).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("broker,research_cost,commission,delta"));
    assert_eq!(lines.next(), Some("Acme Securities,2000.00,1450.00,-550.00"));
    assert_eq!(written.lines().count(), 6);
}

#[test]
fn json_output_shape() {
    let config = load_config("broker.recon.toml");
    let result = load_and_run(&config);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["meta"]["group_by"], serde_json::json!(["broker"]));
    assert_eq!(json["meta"]["join"], "full");
    assert_eq!(json["meta"]["range"]["start"], "2026-01-01");
    assert_eq!(json["rows"][0]["key"], serde_json::json!(["Acme Securities"]));
    assert_eq!(json["rows"][0]["presence"], "both");
    assert_eq!(json["rows"][2]["presence"], "cost_only");
    assert!(json["meta"].get("broker_filter").is_none());
}

// -------------------------------------------------------------------------
// Amount overflow
// -------------------------------------------------------------------------

const OVERFLOW_CONFIG: &str = r#"
name = "overflow"
variant = "broker"

[range]
start = "2026-01-01"
end = "2026-12-31"

[sources.costs]
file = "costs.csv"
[sources.costs.columns]
record_id = "id"
date      = "date"
amount    = "amount"
broker    = "broker"

[sources.commissions]
file = "commissions.csv"
[sources.commissions.columns]
date   = "date"
amount = "amount"
broker = "broker"
"#;

#[test]
fn summed_amounts_past_decimal_range_fail_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("costs.csv"),
        "id,date,broker,amount\n\
         c1,2026-01-10,A,70000000000000000000000000000\n\
         c2,2026-01-11,A,70000000000000000000000000000\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("commissions.csv"), "date,broker,amount\n2026-01-10,A,1\n").unwrap();

    let config = ReconConfig::from_toml(OVERFLOW_CONFIG).unwrap();
    let input = load_input(&config, dir.path()).unwrap();
    assert_eq!(input.costs.len(), 2);

    let err = run(&config, &input, today()).unwrap_err();
    assert!(matches!(err, ReconError::AmountOverflow { .. }), "{err:?}");
    assert_eq!(err.to_string(), "amount overflow summing costs for (A)");
}
