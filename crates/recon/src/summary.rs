use rust_decimal::Decimal;

use crate::error::ReconError;
use crate::model::{DataQualityIssue, Presence, ReconSummary, ReconciliationRow, SideStats};

/// Compute summary statistics from reconciled rows.
pub fn compute_summary(
    rows: &[ReconciliationRow],
    costs: SideStats,
    commissions: SideStats,
    data_quality_issues: Vec<DataQualityIssue>,
) -> Result<ReconSummary, ReconError> {
    let mut both = 0;
    let mut cost_only = 0;
    let mut commission_only = 0;
    let mut total_research_cost = Decimal::ZERO;
    let mut total_commission = Decimal::ZERO;

    for row in rows {
        match row.presence {
            Presence::Both => both += 1,
            Presence::CostOnly => cost_only += 1,
            Presence::CommissionOnly => commission_only += 1,
        }
        total_research_cost = total_research_cost
            .checked_add(row.research_cost)
            .ok_or_else(|| total_overflow("research cost"))?;
        total_commission = total_commission
            .checked_add(row.commission)
            .ok_or_else(|| total_overflow("commission"))?;
    }
    let net_delta = total_commission
        .checked_sub(total_research_cost)
        .ok_or_else(|| total_overflow("net delta"))?;

    Ok(ReconSummary {
        total_keys: rows.len(),
        both,
        cost_only,
        commission_only,
        total_research_cost,
        total_commission,
        net_delta,
        costs,
        commissions,
        data_quality_issues,
    })
}

fn total_overflow(what: &str) -> ReconError {
    ReconError::AmountOverflow { context: format!("totalling {what}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReconKey;
    use rust_decimal_macros::dec;

    fn row(key: &str, cost: Decimal, commission: Decimal, presence: Presence) -> ReconciliationRow {
        ReconciliationRow::new(ReconKey::new([key]), cost, commission, presence)
    }

    #[test]
    fn summary_counts_and_totals() {
        let rows = vec![
            row("A", dec!(500), dec!(300), Presence::Both),
            row("B", dec!(200), dec!(0), Presence::CostOnly),
            row("C", dec!(0), dec!(50), Presence::CommissionOnly),
            row("D", dec!(10), dec!(10), Presence::Both),
        ];
        let summary = compute_summary(&rows, SideStats::default(), SideStats::default(), vec![]).unwrap();
        assert_eq!(summary.total_keys, 4);
        assert_eq!(summary.both, 2);
        assert_eq!(summary.cost_only, 1);
        assert_eq!(summary.commission_only, 1);
        assert_eq!(summary.total_research_cost, dec!(710));
        assert_eq!(summary.total_commission, dec!(360));
        assert_eq!(summary.net_delta, dec!(-350));
    }

    #[test]
    fn empty_summary() {
        let summary = compute_summary(&[], SideStats::default(), SideStats::default(), vec![]).unwrap();
        assert_eq!(summary.total_keys, 0);
        assert_eq!(summary.net_delta, Decimal::ZERO);
    }

    #[test]
    fn total_past_decimal_range_is_an_error() {
        let big = dec!(70000000000000000000000000000);
        let rows = vec![
            row("A", big, dec!(0), Presence::CostOnly),
            row("B", big, dec!(0), Presence::CostOnly),
        ];
        let err = compute_summary(&rows, SideStats::default(), SideStats::default(), vec![])
            .unwrap_err();
        assert_eq!(err.to_string(), "amount overflow totalling research cost");
    }
}
