use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::ReconError;
use crate::model::{AllocationRecord, Dimension, RawRecord, ReconKey, Side, SideStats};
use crate::policy::BrokerPolicy;
use crate::range::DateRange;

/// Row-level filters applied before summing.
#[derive(Debug, Clone)]
pub struct RecordFilter<'a> {
    pub range: DateRange,
    pub policy: &'a BrokerPolicy,
    /// Keep only this broker (single-broker report).
    pub broker: Option<&'a str>,
}

/// Group records by the `group_by` key, sum effective amounts.
///
/// Filters run in order: date range, unresolved-broker policy, broker
/// filter. Each dropped row is counted once, under the first filter that
/// rejected it. Output is sorted by key. Fails with
/// [`ReconError::AmountOverflow`] when a weighted amount or a key's sum
/// leaves the decimal range.
pub fn aggregate_records(
    side: Side,
    records: &[RawRecord],
    group_by: &[Dimension],
    filter: &RecordFilter<'_>,
) -> Result<(Vec<AllocationRecord>, SideStats), ReconError> {
    let mut groups: BTreeMap<ReconKey, Decimal> = BTreeMap::new();
    let mut stats = SideStats {
        loaded: records.len(),
        ..SideStats::default()
    };

    for record in records {
        if !filter.range.contains(record.date) {
            stats.out_of_range += 1;
            continue;
        }
        if filter.policy.excludes(side, &record.broker) {
            stats.unresolved += 1;
            continue;
        }
        if let Some(broker) = filter.broker {
            if record.broker.trim() != broker.trim() {
                stats.broker_filter += 1;
                continue;
            }
        }

        stats.kept += 1;
        let key = record.key(group_by);
        let amount = record.effective_amount().ok_or_else(|| ReconError::AmountOverflow {
            context: format!(
                "weighting {side} record '{}' ({} x {})",
                record.record_id, record.amount, record.weight
            ),
        })?;
        let sum = groups.entry(key).or_insert(Decimal::ZERO);
        *sum = sum.checked_add(amount).ok_or_else(|| ReconError::AmountOverflow {
            context: format!("summing {side} for {}", record.key(group_by)),
        })?;
    }

    let aggregates = groups
        .into_iter()
        .map(|(key, amount)| AllocationRecord { key, amount })
        .collect();

    Ok((aggregates, stats))
}
