use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{Dimension, Side};
use crate::policy::BrokerPolicy;
use crate::range::DateRange;

/// Max decimal places a report may request.
pub const MAX_ROUND_DP: u32 = 10;

/// Max dimensions in a reconciliation key.
pub const MAX_GROUP_BY: usize = 3;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    /// Preset that supplies `group_by` and the default unresolved policy.
    #[serde(default)]
    pub variant: Option<ReportVariant>,
    /// Explicit grouping. Takes precedence over the variant's.
    #[serde(default)]
    pub group_by: Vec<Dimension>,
    #[serde(default)]
    pub join: JoinDirection,
    /// Decimal places for output amounts. `None` keeps full precision.
    #[serde(default)]
    pub round_dp: Option<u32>,
    #[serde(default)]
    pub range: RangeConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    pub sources: SourcesConfig,
}

// ---------------------------------------------------------------------------
// Join direction
// ---------------------------------------------------------------------------

/// Which keys survive the join.
///
/// `Full` keeps the union of both key sets. `Costs` keeps every cost key
/// and drops commission-only keys; `Commissions` is the mirror image (the
/// right-join shape some dashboard queries use).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinDirection {
    #[default]
    Full,
    Costs,
    Commissions,
}

impl std::fmt::Display for JoinDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Costs => write!(f, "costs"),
            Self::Commissions => write!(f, "commissions"),
        }
    }
}

// ---------------------------------------------------------------------------
// Report variants
// ---------------------------------------------------------------------------

/// Named report presets. They differ only in grouping granularity and in
/// whether unresolved brokers count toward research cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportVariant {
    Broker,
    BrokerTeam,
    Team,
    Individual,
    Account,
}

impl ReportVariant {
    pub fn group_by(&self) -> Vec<Dimension> {
        match self {
            Self::Broker => vec![Dimension::Broker],
            Self::BrokerTeam => vec![Dimension::Broker, Dimension::Team],
            Self::Team => vec![Dimension::Team],
            Self::Individual => vec![Dimension::Team, Dimension::Individual],
            Self::Account => vec![Dimension::Broker, Dimension::Account],
        }
    }

    /// Broker-level variants leave unresolved brokers out of research cost.
    pub fn excludes_unresolved_costs(&self) -> bool {
        matches!(self, Self::Broker | Self::BrokerTeam | Self::Account)
    }
}

// ---------------------------------------------------------------------------
// Range, filter, policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeConfig {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl RangeConfig {
    pub fn resolve(&self, today: NaiveDate) -> Result<DateRange, ReconError> {
        DateRange::resolve(self.start, self.end, today)
    }
}

/// Broker-identity parameter of the single-broker report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub broker: Option<String>,
}

/// Overrides for [`BrokerPolicy`]. Unset fields fall back to the variant
/// default, then to [`BrokerPolicy::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub unresolved_marker: Option<String>,
    #[serde(default)]
    pub exclude_from_costs: Option<bool>,
    #[serde(default)]
    pub exclude_from_commissions: Option<bool>,
}

// ---------------------------------------------------------------------------
// Sources + column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    pub costs: SourceConfig,
    pub commissions: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub file: String,
    pub columns: ColumnMapping,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    /// Row identifier used in error messages. Falls back to the line number.
    #[serde(default)]
    pub record_id: Option<String>,
    pub date: String,
    pub amount: String,
    #[serde(default)]
    pub broker: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub individual: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    /// Split weight column; effective amount = amount × weight.
    #[serde(default)]
    pub weight: Option<String>,
}

impl ColumnMapping {
    pub fn column_for(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Broker => self.broker.as_deref(),
            Dimension::Team => self.team.as_deref(),
            Dimension::Individual => self.individual.as_deref(),
            Dimension::Account => self.account.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Grouping in effect: explicit `group_by`, else the variant's.
    pub fn effective_group_by(&self) -> Vec<Dimension> {
        if !self.group_by.is_empty() {
            return self.group_by.clone();
        }
        self.variant.map(|v| v.group_by()).unwrap_or_default()
    }

    /// Policy in effect: `[policy]` overrides, else the variant default,
    /// else [`BrokerPolicy::default`]. A default exclusion only applies to a
    /// side that maps a broker column; without one no record can carry the
    /// marker.
    pub fn effective_policy(&self) -> BrokerPolicy {
        let base = BrokerPolicy::default();
        let variant_default = self
            .variant
            .map(|v| v.excludes_unresolved_costs())
            .unwrap_or(base.exclude_from_costs);

        BrokerPolicy {
            unresolved_marker: self
                .policy
                .unresolved_marker
                .as_deref()
                .map(|m| m.trim().to_string())
                .unwrap_or(base.unresolved_marker),
            exclude_from_costs: self
                .policy
                .exclude_from_costs
                .unwrap_or(variant_default && self.maps_broker(Side::Costs)),
            exclude_from_commissions: self
                .policy
                .exclude_from_commissions
                .unwrap_or(base.exclude_from_commissions && self.maps_broker(Side::Commissions)),
        }
    }

    /// Whether `side` maps a broker column.
    pub fn maps_broker(&self, side: Side) -> bool {
        self.source(side).columns.broker.is_some()
    }

    pub fn source(&self, side: Side) -> &SourceConfig {
        match side {
            Side::Costs => &self.sources.costs,
            Side::Commissions => &self.sources.commissions,
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let group_by = self.effective_group_by();

        if group_by.is_empty() {
            return Err(ReconError::ConfigValidation(
                "either `variant` or a non-empty `group_by` is required".into(),
            ));
        }

        if group_by.len() > MAX_GROUP_BY {
            return Err(ReconError::ConfigValidation(format!(
                "group_by allows at most {MAX_GROUP_BY} dimensions, got {}",
                group_by.len()
            )));
        }

        let mut seen = HashSet::new();
        for dim in &group_by {
            if !seen.insert(*dim) {
                return Err(ReconError::ConfigValidation(format!(
                    "group_by lists '{dim}' more than once"
                )));
            }
        }

        // Every grouped dimension must be mapped on both sides
        for side in [Side::Costs, Side::Commissions] {
            let columns = &self.source(side).columns;
            for dim in &group_by {
                if columns.column_for(*dim).is_none() {
                    return Err(ReconError::ConfigValidation(format!(
                        "sources.{side}: group_by dimension '{dim}' has no column mapping"
                    )));
                }
            }
            if self.filter.broker.is_some() && columns.broker.is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "sources.{side}: filter.broker requires a broker column mapping"
                )));
            }
            let explicit_exclusion = match side {
                Side::Costs => self.policy.exclude_from_costs,
                Side::Commissions => self.policy.exclude_from_commissions,
            };
            if explicit_exclusion == Some(true) && columns.broker.is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "sources.{side}: policy.exclude_from_{side} requires a broker column mapping"
                )));
            }
        }

        if let (Some(start), Some(end)) = (self.range.start, self.range.end) {
            if start > end {
                return Err(ReconError::InvalidRange { start, end });
            }
        }

        if let Some(dp) = self.round_dp {
            if dp > MAX_ROUND_DP {
                return Err(ReconError::ConfigValidation(format!(
                    "round_dp must be at most {MAX_ROUND_DP}, got {dp}"
                )));
            }
        }

        if self.policy.unresolved_marker.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "policy.unresolved_marker must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
