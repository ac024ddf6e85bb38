// Schedule Service - maintenance schedule lifecycle use cases

pub mod create;
pub mod update;

pub use create::{validate_request, CreateScheduleRequest};
pub use update::ScheduleUpdate;

use crate::application::constants::MAX_UPCOMING_HORIZON_DAYS;
use crate::domain::{MaintenanceSchedule, ScheduleId, ScheduleStatus, Version};
use crate::error::{AppError, Result};
use crate::port::time_provider::to_stored_precision;
use crate::port::{IdProvider, ScheduleFilter, ScheduleRepository, SortOrder, TimeProvider};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Completion rollup across all schedules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub completed: i64,
    pub total: i64,
    /// Percentage, two decimals
    pub completion_rate: f64,
}

impl CompletionStats {
    pub fn new(completed: i64, total: i64) -> Self {
        let completion_rate = if total > 0 {
            let pct = completed as f64 / total as f64 * 100.0;
            (pct * 100.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            completed,
            total,
            completion_rate,
        }
    }
}

/// Maintenance schedule lifecycle service
///
/// Every read reports the derived status; every write folds the derived
/// status into the record before it is persisted. Writes are version-checked
/// by the repository and never retried here.
pub struct ScheduleService {
    repo: Arc<dyn ScheduleRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ScheduleService {
    pub fn new(
        repo: Arc<dyn ScheduleRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            repo,
            id_provider,
            time_provider,
        }
    }

    /// Create a new schedule
    pub async fn create(&self, mut req: CreateScheduleRequest) -> Result<MaintenanceSchedule> {
        validate_request(&req)?;
        req.scheduled_date = to_stored_precision(req.scheduled_date);

        let now = self.now();
        let mut schedule = create::build(self.id_provider.generate_id(), now, req);
        schedule.refresh_status(now);

        self.repo.insert(&schedule).await?;

        info!(
            schedule_id = %schedule.id,
            machine = %schedule.machine,
            frequency = %schedule.frequency,
            status = %schedule.status,
            "Maintenance schedule created"
        );
        Ok(schedule)
    }

    /// Fetch one schedule
    pub async fn get(&self, id: &str) -> Result<MaintenanceSchedule> {
        let mut schedule = self.load(id, None).await?;
        schedule.refresh_status(self.now());
        Ok(schedule)
    }

    /// List schedules matching `filter`.
    ///
    /// `filter.status` is matched against the derived status, so `Overdue`
    /// also returns past-due items still stored as `Scheduled`.
    pub async fn list(&self, filter: ScheduleFilter) -> Result<Vec<MaintenanceSchedule>> {
        let now = self.now();
        let wanted = filter.status;

        let mut rows = match wanted {
            Some(ScheduleStatus::Overdue) => {
                let mut rows = self.repo.query(&filter).await?;
                let stale = ScheduleFilter {
                    status: Some(ScheduleStatus::Scheduled),
                    scheduled_before: Some(
                        filter.scheduled_before.map_or(now, |before| before.min(now)),
                    ),
                    ..filter.clone()
                };
                rows.extend(self.repo.query(&stale).await?);
                sort_rows(&mut rows, filter.order);
                rows
            }
            _ => self.repo.query(&filter).await?,
        };

        for row in rows.iter_mut() {
            row.refresh_status(now);
        }
        if let Some(wanted) = wanted {
            rows.retain(|row| row.status == wanted);
        }

        debug!(count = rows.len(), status = ?wanted, "Listed maintenance schedules");
        Ok(rows)
    }

    /// Full-document edit with merge semantics
    pub async fn update(&self, id: &str, changes: ScheduleUpdate) -> Result<MaintenanceSchedule> {
        changes.validate()?;

        let mut schedule = self.load(id, changes.expected_version).await?;
        changes.apply(&mut schedule);

        let saved = self.save(schedule).await?;
        info!(schedule_id = %saved.id, version = saved.version, "Maintenance schedule updated");
        Ok(saved)
    }

    /// Single-field status patch
    pub async fn set_status(
        &self,
        id: &str,
        status: ScheduleStatus,
        expected_version: Option<Version>,
    ) -> Result<MaintenanceSchedule> {
        let mut schedule = self.load(id, expected_version).await?;
        let from = schedule.status;
        schedule.set_status(status, self.now())?;

        let saved = self.save(schedule).await?;
        info!(
            schedule_id = %saved.id,
            from = %from,
            to = %saved.status,
            "Maintenance schedule status changed"
        );
        Ok(saved)
    }

    /// Mark a schedule completed by `completed_by`.
    ///
    /// Completion fields and the next due date are all derived from the one
    /// loaded snapshot and the one `now`. The next occurrence is recorded on
    /// the schedule only; no follow-on record is created.
    pub async fn complete(
        &self,
        id: &str,
        completed_by: &str,
        expected_version: Option<Version>,
    ) -> Result<MaintenanceSchedule> {
        if completed_by.trim().is_empty() {
            return Err(AppError::Validation(
                "completing user must not be empty".to_string(),
            ));
        }

        let mut schedule = self.load(id, expected_version).await?;
        let now = self.now();
        schedule.complete(completed_by, now)?;

        let saved = self.save(schedule).await?;
        info!(
            schedule_id = %saved.id,
            completed_by = %completed_by,
            next_scheduled_date = ?saved.next_scheduled_date,
            "Maintenance schedule completed"
        );
        Ok(saved)
    }

    /// Patch one checklist item by zero-based `index`.
    ///
    /// Negative or past-the-end indices fail with
    /// `DomainError::ChecklistIndexOutOfRange` and nothing is written.
    pub async fn update_checklist_item(
        &self,
        id: &str,
        index: i64,
        completed: bool,
        notes: Option<String>,
        expected_version: Option<Version>,
    ) -> Result<MaintenanceSchedule> {
        let mut schedule = self.load(id, expected_version).await?;

        let position = usize::try_from(index).map_err(|_| {
            crate::domain::DomainError::ChecklistIndexOutOfRange {
                index,
                len: schedule.checklist.len(),
            }
        })?;
        schedule.update_checklist_item(position, completed, notes)?;

        let saved = self.save(schedule).await?;
        debug!(
            schedule_id = %saved.id,
            index = index,
            completed = completed,
            "Checklist item updated"
        );
        Ok(saved)
    }

    /// Past-due work, whether already stored as `Overdue` or still stored
    /// as `Scheduled`. Every row is reported as `Overdue`.
    pub async fn find_overdue(&self) -> Result<Vec<MaintenanceSchedule>> {
        self.list(ScheduleFilter::default().with_status(ScheduleStatus::Overdue))
            .await
    }

    /// `Scheduled` work due within the next `horizon_days`
    pub async fn find_upcoming(&self, horizon_days: u32) -> Result<Vec<MaintenanceSchedule>> {
        if horizon_days > MAX_UPCOMING_HORIZON_DAYS {
            return Err(AppError::Validation(format!(
                "horizon_days must be at most {}",
                MAX_UPCOMING_HORIZON_DAYS
            )));
        }
        let now = self.now();
        let mut rows = self
            .repo
            .query(&ScheduleFilter::upcoming(now, horizon_days))
            .await?;
        for row in rows.iter_mut() {
            row.refresh_status(now);
        }
        Ok(rows)
    }

    /// Everything due in the given calendar month (UTC)
    pub async fn calendar(&self, year: i32, month: u32) -> Result<Vec<MaintenanceSchedule>> {
        let (start, end) = month_bounds(year, month)?;
        let filter = ScheduleFilter {
            scheduled_from: Some(start),
            scheduled_before: Some(end),
            ..Default::default()
        };
        self.list(filter).await
    }

    /// Completed vs. total schedules
    pub async fn completion_stats(&self) -> Result<CompletionStats> {
        let completed = self.repo.count(Some(ScheduleStatus::Completed)).await?;
        let total = self.repo.count(None).await?;
        Ok(CompletionStats::new(completed, total))
    }

    async fn load(&self, id: &str, expected_version: Option<Version>) -> Result<MaintenanceSchedule> {
        let id: ScheduleId = id.to_string();
        let schedule = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::schedule_not_found(&id))?;

        if let Some(expected) = expected_version {
            if expected != schedule.version {
                return Err(AppError::Conflict(format!(
                    "Maintenance schedule {} is at version {}, expected {}",
                    id, schedule.version, expected
                )));
            }
        }
        Ok(schedule)
    }

    fn now(&self) -> DateTime<Utc> {
        to_stored_precision(self.time_provider.now())
    }

    async fn save(&self, mut schedule: MaintenanceSchedule) -> Result<MaintenanceSchedule> {
        schedule.refresh_status(self.now());
        self.repo.update(&schedule).await
    }
}

fn sort_rows(rows: &mut [MaintenanceSchedule], order: SortOrder) {
    rows.sort_by(|a, b| {
        a.scheduled_date
            .cmp(&b.scheduled_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    if order == SortOrder::Descending {
        rows.reverse();
    }
}

/// `[first instant of month, first instant of next month)`
fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || AppError::Validation(format!("invalid calendar month {}-{}", year, month));

    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(invalid)?;
    let (next_year, next_month) = if start.month() == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(invalid)?;
    Ok((start, end))
}
