// Schedule Status & Overdue Derivation

use crate::domain::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Schedule status. Serialized as the exact stored strings ("In Progress", ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Scheduled,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Overdue,
    Cancelled,
}

impl ScheduleStatus {
    pub const ALL: [ScheduleStatus; 5] = [
        ScheduleStatus::Scheduled,
        ScheduleStatus::InProgress,
        ScheduleStatus::Completed,
        ScheduleStatus::Overdue,
        ScheduleStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "Scheduled",
            ScheduleStatus::InProgress => "In Progress",
            ScheduleStatus::Completed => "Completed",
            ScheduleStatus::Overdue => "Overdue",
            ScheduleStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScheduleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::InvalidStatus(s.to_string()))
    }
}

/// Derive the status a schedule should report at `now`.
///
/// A `Scheduled` item whose due date is strictly in the past reads as
/// `Overdue`; every other status is returned unchanged. Pure: the caller
/// decides whether to persist the result.
pub fn derive_status(
    status: ScheduleStatus,
    scheduled_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ScheduleStatus {
    if status == ScheduleStatus::Scheduled && scheduled_date < now {
        ScheduleStatus::Overdue
    } else {
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_scheduled_in_past_is_overdue() {
        let due = now() - Duration::minutes(1);
        assert_eq!(
            derive_status(ScheduleStatus::Scheduled, due, now()),
            ScheduleStatus::Overdue
        );
    }

    #[test]
    fn test_scheduled_in_future_unchanged() {
        let due = now() + Duration::days(2);
        assert_eq!(
            derive_status(ScheduleStatus::Scheduled, due, now()),
            ScheduleStatus::Scheduled
        );
    }

    #[test]
    fn test_due_exactly_now_is_not_overdue() {
        assert_eq!(
            derive_status(ScheduleStatus::Scheduled, now(), now()),
            ScheduleStatus::Scheduled
        );
    }

    #[test]
    fn test_other_statuses_ignore_date() {
        let past = now() - Duration::days(30);
        for status in [
            ScheduleStatus::InProgress,
            ScheduleStatus::Completed,
            ScheduleStatus::Overdue,
            ScheduleStatus::Cancelled,
        ] {
            assert_eq!(derive_status(status, past, now()), status);
        }
    }

    #[test]
    fn test_derivation_is_stable() {
        let due = now() - Duration::hours(3);
        let first = derive_status(ScheduleStatus::Scheduled, due, now());
        let second = derive_status(ScheduleStatus::Scheduled, due, now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_wire_strings() {
        assert_eq!(
            serde_json::to_string(&ScheduleStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(
            "Overdue".parse::<ScheduleStatus>().unwrap(),
            ScheduleStatus::Overdue
        );
        assert!(matches!(
            "OVERDUE".parse::<ScheduleStatus>(),
            Err(DomainError::InvalidStatus(_))
        ));
    }
}
