//! Unresolved-broker policy.
//!
//! Records whose broker could not be mapped to a known parent broker carry
//! a sentinel value (`"Other"` in the upstream warehouse). Every report
//! variant consults this one policy instead of comparing literals inline.

use serde::{Deserialize, Serialize};

use crate::model::Side;

pub const DEFAULT_UNRESOLVED_MARKER: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerPolicy {
    /// Sentinel broker value meaning "unresolved".
    pub unresolved_marker: String,
    /// Drop unresolved records before summing research costs.
    pub exclude_from_costs: bool,
    /// Drop unresolved records before summing commissions.
    pub exclude_from_commissions: bool,
}

impl Default for BrokerPolicy {
    fn default() -> Self {
        Self {
            unresolved_marker: DEFAULT_UNRESOLVED_MARKER.to_string(),
            exclude_from_costs: true,
            exclude_from_commissions: false,
        }
    }
}

impl BrokerPolicy {
    /// Policy that keeps unresolved records on both sides.
    pub fn include_all() -> Self {
        Self {
            exclude_from_costs: false,
            exclude_from_commissions: false,
            ..Self::default()
        }
    }

    pub fn is_unresolved(&self, broker: &str) -> bool {
        broker.trim() == self.unresolved_marker.trim()
    }

    /// Whether a record on `side` with this broker should be dropped.
    pub fn excludes(&self, side: Side, broker: &str) -> bool {
        let applies = match side {
            Side::Costs => self.exclude_from_costs,
            Side::Commissions => self.exclude_from_commissions,
        };
        applies && self.is_unresolved(broker)
    }
}
