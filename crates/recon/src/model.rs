use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::JoinDirection;
use crate::range::DateRange;

// ---------------------------------------------------------------------------
// Sides + dimensions
// ---------------------------------------------------------------------------

/// Which input set a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Costs,
    Commissions,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Costs => write!(f, "costs"),
            Self::Commissions => write!(f, "commissions"),
        }
    }
}

/// Categorical dimension a report can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Broker,
    Team,
    Individual,
    Account,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broker => "broker",
            Self::Team => "team",
            Self::Individual => "individual",
            Self::Account => "account",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciliation key: the record's values for the report's `group_by`
/// dimensions, in declared order. Ordering is lexicographic over the tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ReconKey(pub Vec<String>);

impl ReconKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for ReconKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single normalized transaction-level row from either side's CSV.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub side: Side,
    pub record_id: String,
    pub date: NaiveDate,
    pub broker: String,
    pub team: String,
    pub individual: String,
    pub account: String,
    pub amount: Decimal,
    /// Split weight from the allocation table. 1 when the source has none.
    pub weight: Decimal,
}

impl RawRecord {
    pub fn dimension(&self, dim: Dimension) -> &str {
        match dim {
            Dimension::Broker => &self.broker,
            Dimension::Team => &self.team,
            Dimension::Individual => &self.individual,
            Dimension::Account => &self.account,
        }
    }

    pub fn key(&self, group_by: &[Dimension]) -> ReconKey {
        ReconKey(group_by.iter().map(|d| self.dimension(*d).to_string()).collect())
    }

    /// Amount after applying the split weight. `None` on overflow.
    pub fn effective_amount(&self) -> Option<Decimal> {
        self.amount.checked_mul(self.weight)
    }
}

/// Pre-loaded raw records for both sides.
#[derive(Debug, Default)]
pub struct ReconInput {
    pub costs: Vec<RawRecord>,
    pub commissions: Vec<RawRecord>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Summed amount for one key on one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    pub key: ReconKey,
    pub amount: Decimal,
}

/// Row counts seen while aggregating one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SideStats {
    pub loaded: usize,
    pub kept: usize,
    pub out_of_range: usize,
    pub unresolved: usize,
    pub broker_filter: usize,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Both,
    CostOnly,
    CommissionOnly,
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Both => write!(f, "both"),
            Self::CostOnly => write!(f, "cost_only"),
            Self::CommissionOnly => write!(f, "commission_only"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationRow {
    pub key: ReconKey,
    pub research_cost: Decimal,
    pub commission: Decimal,
    pub delta: Decimal,
    pub presence: Presence,
}

impl ReconciliationRow {
    pub fn new(key: ReconKey, research_cost: Decimal, commission: Decimal, presence: Presence) -> Self {
        Self {
            key,
            research_cost,
            commission,
            delta: commission - research_cost,
            presence,
        }
    }

    /// Like [`ReconciliationRow::new`], but `None` when the delta overflows.
    pub fn try_new(
        key: ReconKey,
        research_cost: Decimal,
        commission: Decimal,
        presence: Presence,
    ) -> Option<Self> {
        let delta = commission.checked_sub(research_cost)?;
        Some(Self { key, research_cost, commission, delta, presence })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityIssue {
    /// Aggregated sum below zero. Kept as-is, never clamped.
    NegativeSum {
        side: Side,
        key: ReconKey,
        amount: Decimal,
    },
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub total_keys: usize,
    pub both: usize,
    pub cost_only: usize,
    pub commission_only: usize,
    pub total_research_cost: Decimal,
    pub total_commission: Decimal,
    pub net_delta: Decimal,
    pub costs: SideStats,
    pub commissions: SideStats,
    pub data_quality_issues: Vec<DataQualityIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub group_by: Vec<Dimension>,
    pub join: JoinDirection,
    pub range: DateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_filter: Option<String>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub rows: Vec<ReconciliationRow>,
}
