// Create Use Case

use crate::application::constants::MAX_TITLE_LEN;
use crate::domain::{
    ChecklistItem, Frequency, MaintenanceSchedule, MaintenanceType, PartUsage, Priority,
};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Create request (enums already parsed by the API surface)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub machine: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub schedule_type: Option<MaintenanceType>,
    pub frequency: Frequency,
    pub scheduled_date: DateTime<Utc>,
    pub estimated_duration: f64,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Checklist task texts, in order. Fixed for the life of the schedule.
    #[serde(default)]
    pub checklist: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub parts_used: Vec<PartUsage>,
}

/// Validate a create request
pub fn validate_request(req: &CreateScheduleRequest) -> Result<()> {
    if req.machine.trim().is_empty() {
        return Err(AppError::Validation("machine must not be empty".to_string()));
    }
    validate_title(&req.title)?;
    validate_duration(req.estimated_duration)?;

    if let Some(pos) = req.checklist.iter().position(|t| t.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "checklist task {} is empty",
            pos
        )));
    }

    validate_parts(&req.parts_used)
}

pub(crate) fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title too long (max {} characters)",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

pub(crate) fn validate_duration(hours: f64) -> Result<()> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(AppError::Validation(format!(
            "estimatedDuration must be a positive number of hours, got {}",
            hours
        )));
    }
    Ok(())
}

pub(crate) fn validate_parts(parts: &[PartUsage]) -> Result<()> {
    for part in parts {
        if part.part_name.trim().is_empty() {
            return Err(AppError::Validation("partName must not be empty".to_string()));
        }
        if !part.cost.is_finite() || part.cost < 0.0 {
            return Err(AppError::Validation(format!(
                "cost of part '{}' must be a non-negative number",
                part.part_name
            )));
        }
    }
    Ok(())
}

/// Build the entity from a validated request
pub(crate) fn build(id: String, now: DateTime<Utc>, req: CreateScheduleRequest) -> MaintenanceSchedule {
    let mut schedule = MaintenanceSchedule::new(
        id,
        now,
        req.machine,
        req.title,
        req.frequency,
        req.scheduled_date,
        req.estimated_duration,
    );

    if let Some(schedule_type) = req.schedule_type {
        schedule.schedule_type = schedule_type;
    }
    if let Some(priority) = req.priority {
        schedule.priority = priority;
    }
    schedule.description = req.description;
    schedule.assigned_to = req.assigned_to;
    schedule.notes = req.notes;
    schedule.checklist = req.checklist.into_iter().map(ChecklistItem::new).collect();
    schedule.parts_used = req.parts_used;
    schedule.recompute_total_cost();

    schedule
}
