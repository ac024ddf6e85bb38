// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod overdue_sweep;
pub mod schedule;
pub mod shutdown;

// Re-exports
pub use overdue_sweep::{OverdueSweeper, SweepReport};
pub use schedule::{CompletionStats, CreateScheduleRequest, ScheduleService, ScheduleUpdate};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
