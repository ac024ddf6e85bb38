// Application constants (No magic values)
use std::time::Duration;

/// Default look-ahead window for upcoming work (days)
pub const DEFAULT_UPCOMING_HORIZON_DAYS: u32 = 7;

/// Longest look-ahead window accepted from callers (days)
pub const MAX_UPCOMING_HORIZON_DAYS: u32 = 366;

/// Default period between overdue sweeps (15 minutes)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Maximum schedule title length (characters)
pub const MAX_TITLE_LEN: usize = 200;
