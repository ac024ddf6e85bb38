// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod schedule_repository;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use schedule_repository::{ScheduleFilter, ScheduleRepository, SortOrder};
pub use time_provider::TimeProvider;
