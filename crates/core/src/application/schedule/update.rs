// Full-document Update Use Case

use crate::application::schedule::create::{validate_duration, validate_parts, validate_title};
use crate::domain::{
    Frequency, MaintenanceSchedule, MaintenanceType, PartUsage, Priority, Version,
};
use crate::error::{AppError, Result};
use crate::port::time_provider::to_stored_precision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Editable fields. `None` keeps the stored value.
///
/// `description`, `assignedTo` and `notes` can also be cleared: an explicit
/// JSON `null` arrives as `Some(None)`.
///
/// Status, checklist shape and completion fields are not editable here;
/// they have dedicated operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdate {
    pub machine: Option<String>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type")]
    pub schedule_type: Option<MaintenanceType>,
    pub frequency: Option<Frequency>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub estimated_duration: Option<f64>,
    #[serde(default, deserialize_with = "clearable")]
    pub assigned_to: Option<Option<String>>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "clearable")]
    pub notes: Option<Option<String>>,
    pub parts_used: Option<Vec<PartUsage>>,
    pub reminder_sent: Option<bool>,
    pub actual_start_time: Option<DateTime<Utc>>,
    /// Reject the update if the stored record is at another version
    pub expected_version: Option<Version>,
}

impl ScheduleUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(machine) = &self.machine {
            if machine.trim().is_empty() {
                return Err(AppError::Validation("machine must not be empty".to_string()));
            }
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(hours) = self.estimated_duration {
            validate_duration(hours)?;
        }
        if let Some(parts) = &self.parts_used {
            validate_parts(parts)?;
        }
        Ok(())
    }

    /// Merge into `schedule` and keep `total_cost` in step with the parts
    pub fn apply(self, schedule: &mut MaintenanceSchedule) {
        if let Some(v) = self.machine {
            schedule.machine = v;
        }
        if let Some(v) = self.title {
            schedule.title = v;
        }
        if let Some(v) = self.description {
            schedule.description = v;
        }
        if let Some(v) = self.schedule_type {
            schedule.schedule_type = v;
        }
        if let Some(v) = self.frequency {
            schedule.frequency = v;
        }
        if let Some(v) = self.scheduled_date {
            schedule.scheduled_date = to_stored_precision(v);
        }
        if let Some(v) = self.estimated_duration {
            schedule.estimated_duration = v;
        }
        if let Some(v) = self.assigned_to {
            schedule.assigned_to = v;
        }
        if let Some(v) = self.priority {
            schedule.priority = v;
        }
        if let Some(v) = self.notes {
            schedule.notes = v;
        }
        if let Some(v) = self.parts_used {
            schedule.parts_used = v;
        }
        if let Some(v) = self.reminder_sent {
            schedule.reminder_sent = v;
        }
        if let Some(v) = self.actual_start_time {
            schedule.actual_start_time = Some(to_stored_precision(v));
        }
        schedule.recompute_total_cost();
    }
}

/// Tell an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Pair with `#[serde(default)]`.
pub fn clearable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_apply_merges_and_recomputes_cost() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut s = MaintenanceSchedule::new(
            "s-1",
            now,
            "lathe-2",
            "Spindle check",
            Frequency::Monthly,
            now,
            1.0,
        );

        ScheduleUpdate {
            priority: Some(Priority::Critical),
            parts_used: Some(vec![PartUsage {
                part_name: "Bearing".to_string(),
                quantity: 4,
                cost: 9.5,
            }]),
            ..Default::default()
        }
        .apply(&mut s);

        assert_eq!(s.priority, Priority::Critical);
        assert_eq!(s.title, "Spindle check");
        assert_eq!(s.total_cost, 38.0);
    }

    #[test]
    fn test_null_clears_and_absent_keeps() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut s = MaintenanceSchedule::new(
            "s-1",
            now,
            "lathe-2",
            "Spindle check",
            Frequency::Monthly,
            now,
            1.0,
        );
        s.assigned_to = Some("tech-1".to_string());
        s.notes = Some("bring ladder".to_string());
        s.description = Some("yearly".to_string());

        let update: ScheduleUpdate =
            serde_json::from_str(r#"{"assignedTo": null, "notes": "no ladder"}"#).unwrap();
        assert_eq!(update.assigned_to, Some(None));
        assert_eq!(update.description, None);
        update.apply(&mut s);

        assert_eq!(s.assigned_to, None);
        assert_eq!(s.notes.as_deref(), Some("no ladder"));
        assert_eq!(s.description.as_deref(), Some("yearly"));
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let update = ScheduleUpdate {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(AppError::Validation(_))));
    }
}
