// Schedule Repository Port (Interface)

use crate::domain::{MachineId, MaintenanceSchedule, ScheduleId, ScheduleStatus, UserId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Sort order on `scheduled_date`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Query predicate over stored schedules. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleFilter {
    /// Stored status (not the derived one)
    pub status: Option<ScheduleStatus>,
    pub machine: Option<MachineId>,
    pub assigned_to: Option<UserId>,
    /// Inclusive lower bound on `scheduled_date`
    pub scheduled_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `scheduled_date`
    pub scheduled_to: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `scheduled_date`
    pub scheduled_before: Option<DateTime<Utc>>,
    pub order: SortOrder,
}

impl ScheduleFilter {
    /// Stored `Scheduled` items due strictly before `now`
    pub fn overdue(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(ScheduleStatus::Scheduled),
            scheduled_before: Some(now),
            ..Default::default()
        }
    }

    /// Stored `Scheduled` items due within `[now, now + horizon_days]`
    pub fn upcoming(now: DateTime<Utc>, horizon_days: u32) -> Self {
        Self {
            status: Some(ScheduleStatus::Scheduled),
            scheduled_from: Some(now),
            scheduled_to: Some(now + Duration::days(i64::from(horizon_days))),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: ScheduleStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// In-process evaluation of the predicate (used by in-memory stores)
    pub fn matches(&self, schedule: &MaintenanceSchedule) -> bool {
        let date = schedule.scheduled_date;

        self.status.map_or(true, |s| schedule.status == s)
            && self
                .machine
                .as_ref()
                .map_or(true, |m| &schedule.machine == m)
            && self
                .assigned_to
                .as_ref()
                .map_or(true, |u| schedule.assigned_to.as_ref() == Some(u))
            && self.scheduled_from.map_or(true, |from| date >= from)
            && self.scheduled_to.map_or(true, |to| date <= to)
            && self.scheduled_before.map_or(true, |before| date < before)
    }
}

/// Repository interface for MaintenanceSchedule persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Insert a new schedule
    async fn insert(&self, schedule: &MaintenanceSchedule) -> Result<()>;

    /// Find schedule by ID
    async fn find_by_id(&self, id: &ScheduleId) -> Result<Option<MaintenanceSchedule>>;

    /// Write the whole document back.
    ///
    /// Succeeds only if the stored `version` equals `schedule.version`; the
    /// stored copy gets `version + 1` and a fresh `updated_at`, and is
    /// returned.
    ///
    /// # Errors
    /// - `AppError::NotFound` if the id does not exist
    /// - `AppError::Conflict` if the stored version moved on
    async fn update(&self, schedule: &MaintenanceSchedule) -> Result<MaintenanceSchedule>;

    /// Find schedules matching `filter`, ordered by `scheduled_date` then id
    async fn query(&self, filter: &ScheduleFilter) -> Result<Vec<MaintenanceSchedule>>;

    /// Count schedules, optionally restricted to one stored status
    async fn count(&self, status: Option<ScheduleStatus>) -> Result<i64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::TimeProvider;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// In-memory ScheduleRepository with the same version semantics as SQLite
    pub struct InMemoryScheduleRepository {
        rows: Mutex<BTreeMap<ScheduleId, MaintenanceSchedule>>,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl InMemoryScheduleRepository {
        pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                rows: Mutex::new(BTreeMap::new()),
                time_provider,
            }
        }

        /// Raw stored copy, bypassing any status derivation
        pub fn stored(&self, id: &str) -> Option<MaintenanceSchedule> {
            self.rows.lock().unwrap().get(id).cloned()
        }

        pub fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl ScheduleRepository for InMemoryScheduleRepository {
        async fn insert(&self, schedule: &MaintenanceSchedule) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&schedule.id) {
                return Err(AppError::Database(format!(
                    "Unique constraint violation: {}",
                    schedule.id
                )));
            }
            rows.insert(schedule.id.clone(), schedule.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &ScheduleId) -> Result<Option<MaintenanceSchedule>> {
            Ok(self.rows.lock().unwrap().get(id).cloned())
        }

        async fn update(&self, schedule: &MaintenanceSchedule) -> Result<MaintenanceSchedule> {
            let mut rows = self.rows.lock().unwrap();
            let stored = rows
                .get_mut(&schedule.id)
                .ok_or_else(|| AppError::schedule_not_found(&schedule.id))?;

            if stored.version != schedule.version {
                return Err(AppError::Conflict(format!(
                    "Maintenance schedule {} was modified (version {} != {})",
                    schedule.id, stored.version, schedule.version
                )));
            }

            let mut next = schedule.clone();
            next.version += 1;
            next.updated_at = crate::port::time_provider::to_stored_precision(self.time_provider.now());
            *stored = next.clone();
            Ok(next)
        }

        async fn query(&self, filter: &ScheduleFilter) -> Result<Vec<MaintenanceSchedule>> {
            let rows = self.rows.lock().unwrap();
            let mut found: Vec<MaintenanceSchedule> =
                rows.values().filter(|s| filter.matches(s)).cloned().collect();

            found.sort_by(|a, b| {
                a.scheduled_date
                    .cmp(&b.scheduled_date)
                    .then_with(|| a.id.cmp(&b.id))
            });
            if filter.order == SortOrder::Descending {
                found.reverse();
            }
            Ok(found)
        }

        async fn count(&self, status: Option<ScheduleStatus>) -> Result<i64> {
            let rows = self.rows.lock().unwrap();
            let n = rows
                .values()
                .filter(|s| status.map_or(true, |st| s.status == st))
                .count();
            Ok(n as i64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;
    use chrono::TimeZone;

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 10, 0, 0).unwrap()
    }

    fn schedule(date: DateTime<Utc>) -> MaintenanceSchedule {
        MaintenanceSchedule::new("s", at(1), "m-1", "Lubricate", Frequency::Weekly, date, 1.0)
    }

    #[test]
    fn test_overdue_filter_is_strict() {
        let filter = ScheduleFilter::overdue(at(10));
        assert!(filter.matches(&schedule(at(9))));
        assert!(!filter.matches(&schedule(at(10))));
    }

    #[test]
    fn test_upcoming_filter_bounds_are_inclusive() {
        let filter = ScheduleFilter::upcoming(at(10), 7);
        assert!(filter.matches(&schedule(at(10))));
        assert!(filter.matches(&schedule(at(17))));
        assert!(!filter.matches(&schedule(at(18))));
        assert!(!filter.matches(&schedule(at(9))));
    }

    #[test]
    fn test_filters_ignore_other_statuses() {
        let mut s = schedule(at(9));
        s.status = ScheduleStatus::Cancelled;
        assert!(!ScheduleFilter::overdue(at(10)).matches(&s));
    }

    #[test]
    fn test_assigned_to_filter() {
        let mut s = schedule(at(9));
        let filter = ScheduleFilter {
            assigned_to: Some("tech-3".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&s));
        s.assigned_to = Some("tech-3".to_string());
        assert!(filter.matches(&s));
    }
}
