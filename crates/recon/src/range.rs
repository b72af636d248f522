use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ReconError;

/// Inclusive date range: a record is in range when `start <= date <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReconError> {
        if start > end {
            return Err(ReconError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Fill missing bounds: start defaults to January 1 of `today`'s year,
    /// end defaults to `today`.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, ReconError> {
        let start = start.unwrap_or_else(|| start_of_year(today));
        let end = end.unwrap_or(today);
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn start_of_year(today: NaiveDate) -> NaiveDate {
    // Jan 1 exists for every year chrono can represent.
    NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
}
