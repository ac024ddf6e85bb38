// Domain Layer - Pure business logic and entities

pub mod error;
pub mod recurrence;
pub mod schedule;
pub mod status;

// Re-exports
pub use error::DomainError;
pub use recurrence::{next_occurrence, Frequency};
pub use schedule::{
    ChecklistItem, MachineId, MaintenanceSchedule, MaintenanceType, PartUsage, Priority,
    ScheduleId, UserId, Version,
};
pub use status::{derive_status, ScheduleStatus};
