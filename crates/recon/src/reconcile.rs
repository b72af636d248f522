use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::JoinDirection;
use crate::error::ReconError;
use crate::model::{AllocationRecord, DataQualityIssue, Presence, ReconKey, ReconciliationRow, Side};

/// Join cost and commission amounts by key.
///
/// Amounts repeated for a key are summed. Each surviving key yields exactly
/// one row; a key missing on one side reads as zero there. Rows come out
/// sorted ascending by key. Sums and deltas that leave the decimal range
/// fail with [`ReconError::AmountOverflow`].
pub fn reconcile<C, M>(
    costs: C,
    commissions: M,
    join: JoinDirection,
) -> Result<Vec<ReconciliationRow>, ReconError>
where
    C: IntoIterator<Item = (ReconKey, Decimal)>,
    M: IntoIterator<Item = (ReconKey, Decimal)>,
{
    let cost_map = sum_by_key(Side::Costs, costs)?;
    let commission_map = sum_by_key(Side::Commissions, commissions)?;

    let keys: BTreeSet<&ReconKey> = cost_map.keys().chain(commission_map.keys()).collect();

    let mut rows = Vec::with_capacity(keys.len());
    for key in keys {
        let cost = cost_map.get(key);
        let commission = commission_map.get(key);

        let presence = match (cost, commission) {
            (Some(_), Some(_)) => Presence::Both,
            (Some(_), None) => Presence::CostOnly,
            (None, Some(_)) => Presence::CommissionOnly,
            (None, None) => continue,
        };

        let keep = match join {
            JoinDirection::Full => true,
            JoinDirection::Costs => presence != Presence::CommissionOnly,
            JoinDirection::Commissions => presence != Presence::CostOnly,
        };
        if !keep {
            continue;
        }

        let row = ReconciliationRow::try_new(
            key.clone(),
            cost.copied().unwrap_or(Decimal::ZERO),
            commission.copied().unwrap_or(Decimal::ZERO),
            presence,
        )
        .ok_or_else(|| delta_overflow(key))?;
        rows.push(row);
    }

    Ok(rows)
}

/// [`reconcile`] over aggregated allocations.
pub fn reconcile_allocations(
    costs: &[AllocationRecord],
    commissions: &[AllocationRecord],
    join: JoinDirection,
) -> Result<Vec<ReconciliationRow>, ReconError> {
    reconcile(
        costs.iter().map(|a| (a.key.clone(), a.amount)),
        commissions.iter().map(|a| (a.key.clone(), a.amount)),
        join,
    )
}

fn sum_by_key<I>(side: Side, items: I) -> Result<BTreeMap<ReconKey, Decimal>, ReconError>
where
    I: IntoIterator<Item = (ReconKey, Decimal)>,
{
    let mut map: BTreeMap<ReconKey, Decimal> = BTreeMap::new();
    for (key, amount) in items {
        match map.get_mut(&key) {
            Some(sum) => {
                *sum = sum.checked_add(amount).ok_or_else(|| ReconError::AmountOverflow {
                    context: format!("summing {side} for {key}"),
                })?;
            }
            None => {
                map.insert(key, amount);
            }
        }
    }
    Ok(map)
}

fn delta_overflow(key: &ReconKey) -> ReconError {
    ReconError::AmountOverflow { context: format!("computing delta for {key}") }
}

/// Round cost and commission to `dp` places (midpoint away from zero) and
/// recompute delta from the rounded values.
pub fn round_rows(rows: &mut [ReconciliationRow], dp: u32) -> Result<(), ReconError> {
    for row in rows {
        row.research_cost = row
            .research_cost
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        row.commission = row
            .commission
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        row.delta = row
            .commission
            .checked_sub(row.research_cost)
            .ok_or_else(|| delta_overflow(&row.key))?;
    }
    Ok(())
}

/// Flag negative aggregated sums. Amounts are reported, never clamped.
pub fn negative_sums(side: Side, aggregates: &[AllocationRecord]) -> Vec<DataQualityIssue> {
    aggregates
        .iter()
        .filter(|a| a.amount.is_sign_negative() && !a.amount.is_zero())
        .map(|a| DataQualityIssue::NegativeSum {
            side,
            key: a.key.clone(),
            amount: a.amount,
        })
        .collect()
}
