//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results. Enum fields travel
//! as their display strings and are parsed by the handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use upkeep_core::application::schedule::update::clearable;
use upkeep_core::domain::{MaintenanceSchedule, PartUsage};

/// maintenance.create.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub machine: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub schedule_type: Option<String>,
    pub frequency: String,
    pub scheduled_date: DateTime<Utc>,
    pub estimated_duration: f64,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub checklist: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub parts_used: Vec<PartUsage>,
}

/// maintenance.get.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequest {
    pub id: String,
}

/// maintenance.list.v1 - every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub machine: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Inclusive
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Inclusive
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    /// "asc" (default) or "desc"
    #[serde(default)]
    pub order: Option<String>,
}

/// maintenance.update.v1
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub id: String,
    #[serde(default)]
    pub machine: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub description: Option<Option<String>>,
    #[serde(default, rename = "type")]
    pub schedule_type: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_duration: Option<f64>,
    #[serde(default, deserialize_with = "clearable")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub parts_used: Option<Vec<PartUsage>>,
    #[serde(default)]
    pub reminder_sent: Option<bool>,
    #[serde(default)]
    pub actual_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// maintenance.status.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// maintenance.complete.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub id: String,
    pub completed_by: String,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// maintenance.checklist.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistRequest {
    pub id: String,
    /// Zero-based; signed so negative input reaches the range check
    pub index: i64,
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// maintenance.upcoming.v1
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingRequest {
    #[serde(default)]
    pub horizon_days: Option<u32>,
}

/// maintenance.calendar.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarRequest {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

/// Result of the list-style methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleListResponse {
    pub count: usize,
    pub schedules: Vec<MaintenanceSchedule>,
}

impl From<Vec<MaintenanceSchedule>> for ScheduleListResponse {
    fn from(schedules: Vec<MaintenanceSchedule>) -> Self {
        Self {
            count: schedules.len(),
            schedules,
        }
    }
}
