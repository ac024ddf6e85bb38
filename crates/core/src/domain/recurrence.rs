// Recurrence - next due date from a schedule's frequency

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Recurrence cadence of a maintenance schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    #[serde(rename = "Semi-Annual")]
    SemiAnnual,
    Annual,
    Custom,
}

impl Frequency {
    pub const ALL: [Frequency; 7] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::SemiAnnual,
        Frequency::Annual,
        Frequency::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::SemiAnnual => "Semi-Annual",
            Frequency::Annual => "Annual",
            Frequency::Custom => "Custom",
        }
    }

    /// Fixed offset for this cadence, `None` for `Custom`
    fn offset(&self) -> Option<Offset> {
        match self {
            Frequency::Daily => Some(Offset::Days(1)),
            Frequency::Weekly => Some(Offset::Days(7)),
            Frequency::Monthly => Some(Offset::Months(1)),
            Frequency::Quarterly => Some(Offset::Months(3)),
            Frequency::SemiAnnual => Some(Offset::Months(6)),
            Frequency::Annual => Some(Offset::Months(12)),
            // No interval is defined for custom cadences yet.
            Frequency::Custom => None,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Frequency::ALL
            .into_iter()
            .find(|freq| freq.as_str() == s)
            .ok_or_else(|| DomainError::InvalidFrequency(s.to_string()))
    }
}

enum Offset {
    Days(u64),
    Months(u32),
}

/// Compute the next occurrence after `scheduled_date` for `frequency`.
///
/// Calendar-month offsets keep the day of month and clamp to the last day
/// of a shorter target month (Jan 31 + 1 month = Feb 28/29). Annual is
/// twelve calendar months, so Feb 29 rolls to Feb 28 in a common year.
///
/// Returns `Ok(None)` for `Frequency::Custom`.
pub fn next_occurrence(
    scheduled_date: DateTime<Utc>,
    frequency: Frequency,
) -> Result<Option<DateTime<Utc>>> {
    let next = match frequency.offset() {
        None => return Ok(None),
        Some(Offset::Days(days)) => scheduled_date.checked_add_days(Days::new(days)),
        Some(Offset::Months(months)) => scheduled_date.checked_add_months(Months::new(months)),
    };

    next.map(Some).ok_or_else(|| {
        DomainError::DateOutOfRange(format!(
            "{} + {} is not representable",
            scheduled_date.to_rfc3339(),
            frequency
        ))
    })
}
