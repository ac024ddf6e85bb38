// Upkeep Infrastructure - SQLite Adapter
// Implements: ScheduleRepository

mod connection;
mod migration;
mod schedule_repository;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use schedule_repository::SqliteScheduleRepository;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
