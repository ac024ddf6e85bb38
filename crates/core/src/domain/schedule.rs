// Maintenance Schedule Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::recurrence::{next_occurrence, Frequency};
use crate::domain::status::{derive_status, ScheduleStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Schedule ID (UUID v4)
pub type ScheduleId = String;

/// Reference to a Machine record (not owned)
pub type MachineId = String;

/// Reference to a User record (not owned)
pub type UserId = String;

/// Optimistic-concurrency counter, bumped by every successful write
pub type Version = i64;

/// Kind of maintenance work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceType {
    Preventive,
    Predictive,
    Corrective,
    Emergency,
}

impl MaintenanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceType::Preventive => "Preventive",
            MaintenanceType::Predictive => "Predictive",
            MaintenanceType::Corrective => "Corrective",
            MaintenanceType::Emergency => "Emergency",
        }
    }
}

impl std::fmt::Display for MaintenanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaintenanceType {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Preventive" => Ok(MaintenanceType::Preventive),
            "Predictive" => Ok(MaintenanceType::Predictive),
            "Corrective" => Ok(MaintenanceType::Corrective),
            "Emergency" => Ok(MaintenanceType::Emergency),
            other => Err(DomainError::InvalidScheduleType(other.to_string())),
        }
    }
}

/// Work priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            "Critical" => Ok(Priority::Critical),
            other => Err(DomainError::InvalidPriority(other.to_string())),
        }
    }
}

/// One task in a schedule's checklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub task: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ChecklistItem {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            completed: false,
            notes: None,
        }
    }
}

/// A part consumed by the work. `cost` is per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUsage {
    pub part_name: String,
    pub quantity: u32,
    pub cost: f64,
}

impl PartUsage {
    pub fn line_cost(&self) -> f64 {
        self.quantity as f64 * self.cost
    }
}

/// Maintenance Schedule Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSchedule {
    pub id: ScheduleId,
    pub machine: MachineId,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub schedule_type: MaintenanceType,
    pub frequency: Frequency,
    pub scheduled_date: DateTime<Utc>,
    pub estimated_duration: f64, // hours
    pub assigned_to: Option<UserId>,
    pub status: ScheduleStatus,
    pub priority: Priority,
    pub checklist: Vec<ChecklistItem>,

    // Execution
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub reminder_sent: bool,

    // Completion (set together, once)
    pub completed_by: Option<UserId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub next_scheduled_date: Option<DateTime<Utc>>,

    // Costs
    pub parts_used: Vec<PartUsage>,
    pub total_cost: f64,

    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceSchedule {
    /// Create a new schedule
    ///
    /// # Arguments
    ///
    /// * `id` - Unique schedule ID (injected, not generated)
    /// * `created_at` - Creation time (injected, not system time)
    /// * `machine` - Machine the work is planned for
    /// * `title` - Short description of the work
    /// * `frequency` - Recurrence cadence
    /// * `scheduled_date` - Due date
    /// * `estimated_duration` - Planned effort in hours
    pub fn new(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        machine: impl Into<String>,
        title: impl Into<String>,
        frequency: Frequency,
        scheduled_date: DateTime<Utc>,
        estimated_duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            machine: machine.into(),
            title: title.into(),
            description: None,
            schedule_type: MaintenanceType::Preventive,
            frequency,
            scheduled_date,
            estimated_duration,
            assigned_to: None,
            status: ScheduleStatus::Scheduled,
            priority: Priority::Medium,
            checklist: Vec::new(),
            actual_start_time: None,
            actual_end_time: None,
            notes: None,
            reminder_sent: false,
            completed_by: None,
            completed_at: None,
            next_scheduled_date: None,
            parts_used: Vec::new(),
            total_cost: 0.0,
            version: 1,
            created_at,
            updated_at: created_at,
        }
    }

    /// Status as it should be reported at `now`
    pub fn derived_status(&self, now: DateTime<Utc>) -> ScheduleStatus {
        derive_status(self.status, self.scheduled_date, now)
    }

    /// Fold the derived status into the record. Returns true if it changed.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        let derived = self.derived_status(now);
        let changed = derived != self.status;
        self.status = derived;
        changed
    }

    /// Mark the work as completed by `completed_by` at `now`.
    ///
    /// Allowed from any status. The next occurrence is computed from the
    /// current `scheduled_date` and `frequency` before any field changes, so
    /// a failure leaves the record untouched. `next_scheduled_date` is left
    /// as is when the frequency has no next occurrence.
    pub fn complete(&mut self, completed_by: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        let next = next_occurrence(self.scheduled_date, self.frequency)?;

        self.status = ScheduleStatus::Completed;
        self.completed_by = Some(completed_by.into());
        self.completed_at = Some(now);
        self.actual_end_time = Some(now);
        if let Some(next) = next {
            self.next_scheduled_date = Some(next);
        }
        Ok(())
    }

    /// Patch one checklist item in place.
    ///
    /// `notes` of `None` keeps the item's current notes.
    pub fn update_checklist_item(
        &mut self,
        index: usize,
        completed: bool,
        notes: Option<String>,
    ) -> Result<()> {
        let len = self.checklist.len();
        let item = self
            .checklist
            .get_mut(index)
            .ok_or(DomainError::ChecklistIndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                len,
            })?;

        item.completed = completed;
        if let Some(notes) = notes {
            item.notes = Some(notes);
        }
        Ok(())
    }

    /// Single-field status change (`Scheduled`, `In Progress`, `Cancelled`).
    ///
    /// `Completed` is owned by [`MaintenanceSchedule::complete`] and `Overdue`
    /// is only ever derived. Entering `In Progress` stamps the actual start
    /// time if none was recorded.
    pub fn set_status(&mut self, status: ScheduleStatus, now: DateTime<Utc>) -> Result<()> {
        match status {
            ScheduleStatus::Completed | ScheduleStatus::Overdue => {
                Err(DomainError::InvalidStatusTransition {
                    from: self.status.to_string(),
                    to: status.to_string(),
                })
            }
            ScheduleStatus::InProgress => {
                self.status = status;
                self.actual_start_time.get_or_insert(now);
                Ok(())
            }
            ScheduleStatus::Scheduled | ScheduleStatus::Cancelled => {
                self.status = status;
                Ok(())
            }
        }
    }

    /// Recompute `total_cost` from `parts_used`
    pub fn recompute_total_cost(&mut self) {
        self.total_cost = self.parts_used.iter().map(PartUsage::line_cost).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn schedule(frequency: Frequency, scheduled_date: DateTime<Utc>) -> MaintenanceSchedule {
        let mut s = MaintenanceSchedule::new(
            "sched-1",
            at(2024, 1, 1),
            "machine-7",
            "Replace hydraulic filter",
            frequency,
            scheduled_date,
            2.5,
        );
        s.checklist = vec![
            ChecklistItem::new("Isolate power"),
            ChecklistItem::new("Drain reservoir"),
            ChecklistItem::new("Swap filter"),
        ];
        s
    }

    #[test]
    fn test_new_defaults() {
        let s = schedule(Frequency::Monthly, at(2024, 2, 1));
        assert_eq!(s.status, ScheduleStatus::Scheduled);
        assert_eq!(s.schedule_type, MaintenanceType::Preventive);
        assert_eq!(s.priority, Priority::Medium);
        assert_eq!(s.version, 1);
        assert_eq!(s.created_at, s.updated_at);
        assert!(s.completed_at.is_none());
    }

    #[test]
    fn test_complete_weekly() {
        let mut s = schedule(Frequency::Weekly, at(2024, 3, 1));
        let now = at(2024, 3, 2) + Duration::hours(5);

        s.complete("user-42", now).unwrap();

        assert_eq!(s.status, ScheduleStatus::Completed);
        assert_eq!(s.completed_by.as_deref(), Some("user-42"));
        assert_eq!(s.completed_at, Some(now));
        assert_eq!(s.actual_end_time, Some(now));
        assert_eq!(s.next_scheduled_date, Some(at(2024, 3, 8)));
    }

    #[test]
    fn test_complete_custom_leaves_next_date_unset() {
        let mut s = schedule(Frequency::Custom, at(2024, 3, 1));
        s.complete("user-1", at(2024, 3, 1)).unwrap();
        assert_eq!(s.status, ScheduleStatus::Completed);
        assert!(s.next_scheduled_date.is_none());
    }

    #[test]
    fn test_complete_allowed_from_cancelled() {
        let mut s = schedule(Frequency::Daily, at(2024, 3, 1));
        s.status = ScheduleStatus::Cancelled;
        s.complete("user-1", at(2024, 3, 1)).unwrap();
        assert_eq!(s.status, ScheduleStatus::Completed);
        assert_eq!(s.next_scheduled_date, Some(at(2024, 3, 2)));
    }

    #[test]
    fn test_complete_failure_leaves_record_untouched() {
        let mut s = schedule(Frequency::Daily, DateTime::<Utc>::MAX_UTC);
        let before = s.clone();
        assert!(s.complete("user-1", at(2024, 3, 1)).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn test_checklist_out_of_range_mutates_nothing() {
        let mut s = schedule(Frequency::Weekly, at(2024, 3, 1));
        let before = s.clone();

        let err = s
            .update_checklist_item(5, true, Some("ok".to_string()))
            .unwrap_err();

        assert_eq!(err, DomainError::ChecklistIndexOutOfRange { index: 5, len: 3 });
        assert_eq!(s, before);
    }

    #[test]
    fn test_checklist_partial_update_keeps_notes() {
        let mut s = schedule(Frequency::Weekly, at(2024, 3, 1));
        s.checklist[0].notes = Some("breaker 4B".to_string());

        s.update_checklist_item(0, true, None).unwrap();
        let once = s.clone();
        s.update_checklist_item(0, true, None).unwrap();

        assert!(s.checklist[0].completed);
        assert_eq!(s.checklist[0].notes.as_deref(), Some("breaker 4B"));
        assert_eq!(s, once);
    }

    #[test]
    fn test_checklist_notes_replaced_when_given() {
        let mut s = schedule(Frequency::Weekly, at(2024, 3, 1));
        s.update_checklist_item(2, false, Some("filter backordered".to_string()))
            .unwrap();
        assert!(!s.checklist[2].completed);
        assert_eq!(s.checklist[2].notes.as_deref(), Some("filter backordered"));
        assert_eq!(s.checklist.len(), 3);
    }

    #[test]
    fn test_refresh_status() {
        let mut s = schedule(Frequency::Weekly, at(2024, 3, 1));
        assert!(!s.refresh_status(at(2024, 2, 28)));
        assert_eq!(s.status, ScheduleStatus::Scheduled);
        assert!(s.refresh_status(at(2024, 3, 2)));
        assert_eq!(s.status, ScheduleStatus::Overdue);
    }

    #[test]
    fn test_set_status_in_progress_stamps_start_once() {
        let mut s = schedule(Frequency::Weekly, at(2024, 3, 1));
        s.set_status(ScheduleStatus::InProgress, at(2024, 3, 1)).unwrap();
        s.set_status(ScheduleStatus::InProgress, at(2024, 3, 5)).unwrap();
        assert_eq!(s.status, ScheduleStatus::InProgress);
        assert_eq!(s.actual_start_time, Some(at(2024, 3, 1)));
    }

    #[test]
    fn test_set_status_rejects_completed_and_overdue() {
        let mut s = schedule(Frequency::Weekly, at(2024, 3, 1));
        assert!(matches!(
            s.set_status(ScheduleStatus::Completed, at(2024, 3, 1)),
            Err(DomainError::InvalidStatusTransition { .. })
        ));
        assert!(matches!(
            s.set_status(ScheduleStatus::Overdue, at(2024, 3, 1)),
            Err(DomainError::InvalidStatusTransition { .. })
        ));
        assert_eq!(s.status, ScheduleStatus::Scheduled);
    }

    #[test]
    fn test_total_cost() {
        let mut s = schedule(Frequency::Weekly, at(2024, 3, 1));
        s.parts_used = vec![
            PartUsage {
                part_name: "Filter".to_string(),
                quantity: 2,
                cost: 12.5,
            },
            PartUsage {
                part_name: "Seal kit".to_string(),
                quantity: 1,
                cost: 40.0,
            },
        ];
        s.recompute_total_cost();
        assert_eq!(s.total_cost, 65.0);
    }

    #[test]
    fn test_serialized_field_names() {
        let s = schedule(Frequency::SemiAnnual, at(2024, 3, 1));
        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(value["type"], "Preventive");
        assert_eq!(value["frequency"], "Semi-Annual");
        assert_eq!(value["status"], "Scheduled");
        assert_eq!(value["machine"], "machine-7");
        assert!(value.get("scheduledDate").is_some());
        assert!(value.get("estimatedDuration").is_some());

        let back: MaintenanceSchedule = serde_json::from_value(value).unwrap();
        assert_eq!(back, s);
    }
}
