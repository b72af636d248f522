use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate_records, RecordFilter};
use crate::config::{ReconConfig, SourceConfig};
use crate::error::ReconError;
use crate::model::{RawRecord, ReconInput, ReconMeta, ReconResult, Side};
use crate::reconcile::{negative_sums, reconcile_allocations, round_rows};
use crate::summary::compute_summary;

/// Run reconciliation per config. `today` anchors the default date range.
pub fn run(config: &ReconConfig, input: &ReconInput, today: NaiveDate) -> Result<ReconResult, ReconError> {
    let group_by = config.effective_group_by();
    let policy = config.effective_policy();
    let range = config.range.resolve(today)?;

    let filter = RecordFilter {
        range,
        policy: &policy,
        broker: config.filter.broker.as_deref(),
    };

    let (cost_aggs, cost_stats) = aggregate_records(Side::Costs, &input.costs, &group_by, &filter)?;
    let (commission_aggs, commission_stats) =
        aggregate_records(Side::Commissions, &input.commissions, &group_by, &filter)?;

    for (side, stats) in [(Side::Costs, &cost_stats), (Side::Commissions, &commission_stats)] {
        debug!(
            %side,
            loaded = stats.loaded,
            kept = stats.kept,
            out_of_range = stats.out_of_range,
            unresolved = stats.unresolved,
            broker_filter = stats.broker_filter,
            "aggregated side"
        );
    }

    let mut issues = negative_sums(Side::Costs, &cost_aggs);
    issues.extend(negative_sums(Side::Commissions, &commission_aggs));
    for issue in &issues {
        warn!(?issue, "negative aggregated sum");
    }

    let mut rows = reconcile_allocations(&cost_aggs, &commission_aggs, config.join)?;
    if let Some(dp) = config.round_dp {
        round_rows(&mut rows, dp)?;
    }

    let summary = compute_summary(&rows, cost_stats, commission_stats, issues)?;

    info!(
        config = %config.name,
        keys = summary.total_keys,
        cost_only = summary.cost_only,
        commission_only = summary.commission_only,
        net_delta = %summary.net_delta,
        "reconciliation complete"
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            group_by,
            join: config.join,
            range,
            broker_filter: config.filter.broker.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        rows,
    })
}

/// Read both sides' CSV files, resolving paths relative to `base_dir`.
pub fn load_input(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, ReconError> {
    let mut input = ReconInput::default();
    for side in [Side::Costs, Side::Commissions] {
        let source = config.source(side);
        let csv_path = base_dir.join(&source.file);
        let csv_data = std::fs::read_to_string(&csv_path).map_err(|e| {
            ReconError::Io(std::io::Error::new(
                e.kind(),
                format!("cannot read {}: {e}", csv_path.display()),
            ))
        })?;
        let rows = load_csv_rows(side, &csv_data, source)?;
        debug!(%side, rows = rows.len(), path = %csv_path.display(), "loaded source");
        match side {
            Side::Costs => input.costs = rows,
            Side::Commissions => input.commissions = rows,
        }
    }
    Ok(input)
}

/// Load CSV rows into RawRecords, applying the column mapping.
pub fn load_csv_rows(
    side: Side,
    csv_data: &str,
    source: &SourceConfig,
) -> Result<Vec<RawRecord>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let col = &source.columns;

    let idx = |name: &str| -> Result<usize, ReconError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReconError::MissingColumn {
                side,
                column: name.into(),
            })
    };
    let opt_idx = |name: Option<&String>| -> Result<Option<usize>, ReconError> {
        name.map(|n| idx(n.as_str())).transpose()
    };

    let date_idx = idx(col.date.as_str())?;
    let amount_idx = idx(col.amount.as_str())?;
    let record_id_idx = opt_idx(col.record_id.as_ref())?;
    let broker_idx = opt_idx(col.broker.as_ref())?;
    let team_idx = opt_idx(col.team.as_ref())?;
    let individual_idx = opt_idx(col.individual.as_ref())?;
    let account_idx = opt_idx(col.account.as_ref())?;
    let weight_idx = opt_idx(col.weight.as_ref())?;

    let mut rows = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: Option<usize>| -> String {
            i.and_then(|i| record.get(i)).unwrap_or("").to_string()
        };

        // Header is line 1
        let record_id = match record_id_idx {
            Some(i) => record.get(i).unwrap_or("").to_string(),
            None => format!("line {}", line + 2),
        };

        let date_str = record.get(date_idx).unwrap_or("");
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
            ReconError::DateParse {
                side,
                record_id: record_id.clone(),
                value: date_str.into(),
            }
        })?;

        let amount_str = record.get(amount_idx).unwrap_or("");
        let amount = Decimal::from_str(amount_str).map_err(|_| ReconError::AmountParse {
            side,
            record_id: record_id.clone(),
            field: "amount",
            value: amount_str.into(),
        })?;

        let weight = match weight_idx.and_then(|i| record.get(i)) {
            None | Some("") => Decimal::ONE,
            Some(w) => Decimal::from_str(w).map_err(|_| ReconError::AmountParse {
                side,
                record_id: record_id.clone(),
                field: "weight",
                value: w.into(),
            })?,
        };

        rows.push(RawRecord {
            side,
            record_id,
            date,
            broker: field(broker_idx),
            team: field(team_idx),
            individual: field(individual_idx),
            account: field(account_idx),
            amount,
            weight,
        });
    }

    Ok(rows)
}
