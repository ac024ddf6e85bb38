// SQLite ScheduleRepository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use upkeep_core::domain::{
    ChecklistItem, MaintenanceSchedule, PartUsage, ScheduleId, ScheduleStatus,
};
use upkeep_core::error::{AppError, Result};
use upkeep_core::port::{ScheduleFilter, ScheduleRepository, SortOrder, TimeProvider};

// Helper to convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => AppError::Database(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "5" => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| AppError::Database(format!("Timestamp out of range: {}", ms)))
}

fn from_millis_opt(ms: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    ms.map(from_millis).transpose()
}

/// Parse a stored column. Bad stored data is a storage fault, not bad input.
fn parse_column<T>(id: &str, column: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| AppError::Database(format!("Corrupt {} on schedule {}: {}", column, id, e)))
}

fn json_column<T: DeserializeOwned>(id: &str, column: &str, value: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| AppError::Database(format!("Corrupt {} on schedule {}: {}", column, id, e)))
}

fn millis(ts: Option<DateTime<Utc>>) -> Option<i64> {
    ts.map(|t| t.timestamp_millis())
}

pub struct SqliteScheduleRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteScheduleRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    async fn current_version(&self, id: &str) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT version FROM maintenance_schedules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ScheduleRepository for SqliteScheduleRepository {
    async fn insert(&self, schedule: &MaintenanceSchedule) -> Result<()> {
        let checklist = serde_json::to_string(&schedule.checklist)?;
        let parts_used = serde_json::to_string(&schedule.parts_used)?;

        sqlx::query(
            r#"
            INSERT INTO maintenance_schedules (
                id, machine, title, description, schedule_type,
                frequency, scheduled_date, estimated_duration, assigned_to,
                status, priority, checklist,
                actual_start_time, actual_end_time, notes, reminder_sent,
                completed_by, completed_at, next_scheduled_date,
                parts_used, total_cost,
                version, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&schedule.id)
        .bind(&schedule.machine)
        .bind(&schedule.title)
        .bind(&schedule.description)
        .bind(schedule.schedule_type.as_str())
        .bind(schedule.frequency.as_str())
        .bind(schedule.scheduled_date.timestamp_millis())
        .bind(schedule.estimated_duration)
        .bind(&schedule.assigned_to)
        .bind(schedule.status.as_str())
        .bind(schedule.priority.as_str())
        .bind(&checklist)
        // Execution
        .bind(millis(schedule.actual_start_time))
        .bind(millis(schedule.actual_end_time))
        .bind(&schedule.notes)
        .bind(schedule.reminder_sent)
        // Completion
        .bind(&schedule.completed_by)
        .bind(millis(schedule.completed_at))
        .bind(millis(schedule.next_scheduled_date))
        // Costs
        .bind(&parts_used)
        .bind(schedule.total_cost)
        .bind(schedule.version)
        .bind(schedule.created_at.timestamp_millis())
        .bind(schedule.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(schedule_id = %schedule.id, "Inserted maintenance schedule");
        Ok(())
    }

    async fn find_by_id(&self, id: &ScheduleId) -> Result<Option<MaintenanceSchedule>> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            "SELECT * FROM maintenance_schedules WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(ScheduleRow::into_schedule).transpose()
    }

    async fn update(&self, schedule: &MaintenanceSchedule) -> Result<MaintenanceSchedule> {
        let checklist = serde_json::to_string(&schedule.checklist)?;
        let parts_used = serde_json::to_string(&schedule.parts_used)?;
        let now_ms = self.time_provider.now_millis();

        // Conditional write: only from the version the caller read
        let result = sqlx::query(
            r#"
            UPDATE maintenance_schedules
            SET machine = ?, title = ?, description = ?, schedule_type = ?,
                frequency = ?, scheduled_date = ?, estimated_duration = ?, assigned_to = ?,
                status = ?, priority = ?, checklist = ?,
                actual_start_time = ?, actual_end_time = ?, notes = ?, reminder_sent = ?,
                completed_by = ?, completed_at = ?, next_scheduled_date = ?,
                parts_used = ?, total_cost = ?,
                version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&schedule.machine)
        .bind(&schedule.title)
        .bind(&schedule.description)
        .bind(schedule.schedule_type.as_str())
        .bind(schedule.frequency.as_str())
        .bind(schedule.scheduled_date.timestamp_millis())
        .bind(schedule.estimated_duration)
        .bind(&schedule.assigned_to)
        .bind(schedule.status.as_str())
        .bind(schedule.priority.as_str())
        .bind(&checklist)
        .bind(millis(schedule.actual_start_time))
        .bind(millis(schedule.actual_end_time))
        .bind(&schedule.notes)
        .bind(schedule.reminder_sent)
        .bind(&schedule.completed_by)
        .bind(millis(schedule.completed_at))
        .bind(millis(schedule.next_scheduled_date))
        .bind(&parts_used)
        .bind(schedule.total_cost)
        .bind(now_ms)
        .bind(&schedule.id)
        .bind(schedule.version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            // Either gone or someone else wrote first
            return match self.current_version(&schedule.id).await? {
                None => Err(AppError::schedule_not_found(&schedule.id)),
                Some(stored) => Err(AppError::Conflict(format!(
                    "Maintenance schedule {} was modified (version {} != {})",
                    schedule.id, stored, schedule.version
                ))),
            };
        }

        let mut saved = schedule.clone();
        saved.version += 1;
        saved.updated_at = from_millis(now_ms)?;
        Ok(saved)
    }

    async fn query(&self, filter: &ScheduleFilter) -> Result<Vec<MaintenanceSchedule>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM maintenance_schedules WHERE 1 = 1");

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(machine) = &filter.machine {
            qb.push(" AND machine = ").push_bind(machine.as_str());
        }
        if let Some(assigned_to) = &filter.assigned_to {
            qb.push(" AND assigned_to = ").push_bind(assigned_to.as_str());
        }
        if let Some(from) = filter.scheduled_from {
            qb.push(" AND scheduled_date >= ")
                .push_bind(from.timestamp_millis());
        }
        if let Some(to) = filter.scheduled_to {
            qb.push(" AND scheduled_date <= ").push_bind(to.timestamp_millis());
        }
        if let Some(before) = filter.scheduled_before {
            qb.push(" AND scheduled_date < ")
                .push_bind(before.timestamp_millis());
        }
        qb.push(match filter.order {
            SortOrder::Ascending => " ORDER BY scheduled_date ASC, id ASC",
            SortOrder::Descending => " ORDER BY scheduled_date DESC, id DESC",
        });

        let rows: Vec<ScheduleRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(count = rows.len(), "Queried maintenance schedules");
        rows.into_iter().map(ScheduleRow::into_schedule).collect()
    }

    async fn count(&self, status: Option<ScheduleStatus>) -> Result<i64> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM maintenance_schedules WHERE status = ?")
                    .bind(status.as_str())
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM maintenance_schedules")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        Ok(count)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct ScheduleRow {
    id: String,
    machine: String,
    title: String,
    description: Option<String>,
    schedule_type: String,
    frequency: String,
    scheduled_date: i64,
    estimated_duration: f64,
    assigned_to: Option<String>,
    status: String,
    priority: String,
    checklist: String, // JSON

    actual_start_time: Option<i64>,
    actual_end_time: Option<i64>,
    notes: Option<String>,
    reminder_sent: bool,

    completed_by: Option<String>,
    completed_at: Option<i64>,
    next_scheduled_date: Option<i64>,

    parts_used: String, // JSON
    total_cost: f64,

    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl ScheduleRow {
    /// Stored strings go through the same parsers as API input; an unknown
    /// value is reported as a database error instead of a default.
    fn into_schedule(self) -> Result<MaintenanceSchedule> {
        let id = self.id.as_str();
        let checklist: Vec<ChecklistItem> = json_column(id, "checklist", &self.checklist)?;
        let parts_used: Vec<PartUsage> = json_column(id, "parts_used", &self.parts_used)?;
        let schedule_type = parse_column(id, "type", &self.schedule_type)?;
        let frequency = parse_column(id, "frequency", &self.frequency)?;
        let status = parse_column(id, "status", &self.status)?;
        let priority = parse_column(id, "priority", &self.priority)?;

        Ok(MaintenanceSchedule {
            id: self.id,
            machine: self.machine,
            title: self.title,
            description: self.description,
            schedule_type,
            frequency,
            scheduled_date: from_millis(self.scheduled_date)?,
            estimated_duration: self.estimated_duration,
            assigned_to: self.assigned_to,
            status,
            priority,
            checklist,

            actual_start_time: from_millis_opt(self.actual_start_time)?,
            actual_end_time: from_millis_opt(self.actual_end_time)?,
            notes: self.notes,
            reminder_sent: self.reminder_sent,

            completed_by: self.completed_by,
            completed_at: from_millis_opt(self.completed_at)?,
            next_scheduled_date: from_millis_opt(self.next_scheduled_date)?,

            parts_used,
            total_cost: self.total_cost,

            version: self.version,
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use chrono::TimeZone;
    use upkeep_core::domain::{Frequency, Priority};
    use upkeep_core::port::time_provider::mocks::FixedTimeProvider;

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, d, 8, 0, 0).unwrap()
    }

    async fn setup_test_repo() -> (SqliteScheduleRepository, Arc<FixedTimeProvider>) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let clock = Arc::new(FixedTimeProvider::new(at(1)));
        (SqliteScheduleRepository::new(pool, clock.clone()), clock)
    }

    fn schedule(id: &str, machine: &str, due: DateTime<Utc>) -> MaintenanceSchedule {
        let mut s = MaintenanceSchedule::new(
            id,
            at(1),
            machine,
            "Conveyor belt tension",
            Frequency::Monthly,
            due,
            1.5,
        );
        s.checklist = vec![ChecklistItem::new("Measure sag"), ChecklistItem::new("Adjust")];
        s.parts_used = vec![PartUsage {
            part_name: "Tensioner".to_string(),
            quantity: 1,
            cost: 80.0,
        }];
        s.recompute_total_cost();
        s
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (repo, _) = setup_test_repo().await;
        let mut s = schedule("s-1", "conv-1", at(10));
        s.priority = Priority::High;
        s.assigned_to = Some("tech-2".to_string());
        s.checklist[1].notes = Some("use torque wrench".to_string());

        repo.insert(&s).await.unwrap();

        let found = repo.find_by_id(&"s-1".to_string()).await.unwrap();
        assert_eq!(found, Some(s));
    }

    #[tokio::test]
    async fn test_find_missing() {
        let (repo, _) = setup_test_repo().await;
        assert!(repo.find_by_id(&"nope".to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_fails() {
        let (repo, _) = setup_test_repo().await;
        let s = schedule("s-1", "conv-1", at(10));
        repo.insert(&s).await.unwrap();
        let err = repo.insert(&s).await.unwrap_err();
        assert!(err.to_string().contains("Unique constraint"));
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let (repo, clock) = setup_test_repo().await;
        let mut s = schedule("s-1", "conv-1", at(10));
        repo.insert(&s).await.unwrap();

        clock.set(at(3));
        s.complete("tech-2", at(3)).unwrap();
        let saved = repo.update(&s).await.unwrap();

        assert_eq!(saved.version, 2);
        assert_eq!(saved.updated_at, at(3));

        let stored = repo.find_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(stored, saved);
        assert_eq!(stored.status, ScheduleStatus::Completed);
        assert_eq!(
            stored.next_scheduled_date,
            Some(Utc.with_ymd_and_hms(2024, 10, 10, 8, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let (repo, _) = setup_test_repo().await;
        let s = schedule("s-1", "conv-1", at(10));
        repo.insert(&s).await.unwrap();

        let mut first = s.clone();
        let mut second = s.clone();
        first.complete("tech-a", at(2)).unwrap();
        second.complete("tech-b", at(2)).unwrap();

        repo.update(&first).await.unwrap();
        let err = repo.update(&second).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = repo.find_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(stored.completed_by.as_deref(), Some("tech-a"));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (repo, _) = setup_test_repo().await;
        let s = schedule("ghost", "conv-1", at(10));
        assert!(matches!(
            repo.update(&s).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_query_filters_and_order() {
        let (repo, _) = setup_test_repo().await;
        repo.insert(&schedule("c", "conv-1", at(12))).await.unwrap();
        repo.insert(&schedule("a", "conv-1", at(5))).await.unwrap();
        repo.insert(&schedule("b", "conv-2", at(8))).await.unwrap();
        let mut done = schedule("d", "conv-1", at(2));
        done.status = ScheduleStatus::Completed;
        repo.insert(&done).await.unwrap();

        let ids = |rows: Vec<MaintenanceSchedule>| -> Vec<String> {
            rows.into_iter().map(|s| s.id).collect()
        };

        let all = repo.query(&ScheduleFilter::default()).await.unwrap();
        assert_eq!(ids(all), vec!["d", "a", "b", "c"]);

        let machine = ScheduleFilter {
            machine: Some("conv-1".to_string()),
            order: SortOrder::Descending,
            ..Default::default()
        };
        assert_eq!(ids(repo.query(&machine).await.unwrap()), vec!["c", "a", "d"]);

        let overdue = repo.query(&ScheduleFilter::overdue(at(9))).await.unwrap();
        assert_eq!(ids(overdue), vec!["a", "b"]);

        let upcoming = repo
            .query(&ScheduleFilter::upcoming(at(5), 7))
            .await
            .unwrap();
        assert_eq!(ids(upcoming), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_count() {
        let (repo, _) = setup_test_repo().await;
        repo.insert(&schedule("a", "conv-1", at(5))).await.unwrap();
        let mut done = schedule("b", "conv-1", at(6));
        done.status = ScheduleStatus::Completed;
        repo.insert(&done).await.unwrap();

        assert_eq!(repo.count(None).await.unwrap(), 2);
        assert_eq!(repo.count(Some(ScheduleStatus::Completed)).await.unwrap(), 1);
        assert_eq!(repo.count(Some(ScheduleStatus::Overdue)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_stored_frequency_is_an_error() {
        let (repo, _) = setup_test_repo().await;
        repo.insert(&schedule("a", "conv-1", at(5))).await.unwrap();
        sqlx::query("UPDATE maintenance_schedules SET frequency = 'Hourly' WHERE id = 'a'")
            .execute(&repo.pool)
            .await
            .unwrap();

        let err = repo.find_by_id(&"a".to_string()).await.unwrap_err();
        match err {
            AppError::Database(msg) => assert!(msg.contains("frequency"), "{}", msg),
            other => panic!("expected database error, got {:?}", other),
        }
    }
}
