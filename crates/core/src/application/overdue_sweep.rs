// Overdue Sweeper - periodic re-evaluation of past-due schedules
//
// Reads and writes already derive the overdue status lazily. The sweeper
// additionally persists it, so that stored data and store-side queries
// catch up without waiting for the next touch of each record.

use crate::application::shutdown::ShutdownToken;
use crate::error::{AppError, Result};
use crate::port::{ScheduleFilter, ScheduleRepository, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// Outcome of one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Schedules whose stored status became `Overdue`
    pub marked: usize,
    /// Schedules changed concurrently, left for the next pass
    pub conflicted: usize,
}

pub struct OverdueSweeper {
    repo: Arc<dyn ScheduleRepository>,
    time_provider: Arc<dyn TimeProvider>,
    interval: Duration,
}

impl OverdueSweeper {
    /// # Arguments
    /// * `repo` - Schedule repository
    /// * `time_provider` - Clock
    /// * `interval` - Time between passes
    pub fn new(
        repo: Arc<dyn ScheduleRepository>,
        time_provider: Arc<dyn TimeProvider>,
        interval: Duration,
    ) -> Self {
        Self {
            repo,
            time_provider,
            interval,
        }
    }

    /// One pass: persist `Overdue` for every stale `Scheduled` record
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let now = self.time_provider.now();
        let stale = self.repo.query(&ScheduleFilter::overdue(now)).await?;

        let mut report = SweepReport::default();
        for mut schedule in stale {
            if !schedule.refresh_status(now) {
                continue;
            }
            match self.repo.update(&schedule).await {
                Ok(_) => report.marked += 1,
                Err(AppError::Conflict(msg)) => {
                    warn!(schedule_id = %schedule.id, reason = %msg, "Skipping overdue mark");
                    report.conflicted += 1;
                }
                Err(AppError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Run until `shutdown` fires. Should be spawned in tokio::spawn
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Overdue sweeper started"
        );

        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("Overdue sweeper stopped");
                    return;
                }
                _ = tick.tick() => {
                    match self.sweep_once().await {
                        Ok(report) if report.marked > 0 || report.conflicted > 0 => {
                            info!(
                                marked = report.marked,
                                conflicted = report.conflicted,
                                "Overdue sweep completed"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = ?e, "Overdue sweep failed"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::{Frequency, MaintenanceSchedule, ScheduleStatus};
    use crate::port::schedule_repository::mocks::InMemoryScheduleRepository;
    use crate::port::schedule_repository::MockScheduleRepository;
    use crate::port::time_provider::mocks::FixedTimeProvider;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, d, 12, 0, 0).unwrap()
    }

    fn schedule(id: &str, due: DateTime<Utc>) -> MaintenanceSchedule {
        MaintenanceSchedule::new(id, at(1), "m-1", "Grease bearings", Frequency::Weekly, due, 0.5)
    }

    #[tokio::test]
    async fn test_sweep_marks_only_past_due_scheduled() {
        let clock = Arc::new(FixedTimeProvider::new(at(10)));
        let repo = Arc::new(InMemoryScheduleRepository::new(clock.clone()));

        repo.insert(&schedule("past", at(5))).await.unwrap();
        repo.insert(&schedule("future", at(20))).await.unwrap();
        let mut cancelled = schedule("cancelled", at(5));
        cancelled.status = ScheduleStatus::Cancelled;
        repo.insert(&cancelled).await.unwrap();

        let sweeper = OverdueSweeper::new(repo.clone(), clock, Duration::from_secs(60));
        let report = sweeper.sweep_once().await.unwrap();

        assert_eq!(report, SweepReport { marked: 1, conflicted: 0 });
        assert_eq!(repo.stored("past").unwrap().status, ScheduleStatus::Overdue);
        assert_eq!(repo.stored("past").unwrap().version, 2);
        assert_eq!(repo.stored("future").unwrap().status, ScheduleStatus::Scheduled);
        assert_eq!(
            repo.stored("cancelled").unwrap().status,
            ScheduleStatus::Cancelled
        );

        // Second pass has nothing left to do.
        assert_eq!(sweeper.sweep_once().await.unwrap(), SweepReport::default());
    }

    #[tokio::test]
    async fn test_sweep_skips_conflicts() {
        let stale = schedule("s-1", at(5));
        let mut repo = MockScheduleRepository::new();
        repo.expect_query()
            .returning(move |_| Ok(vec![stale.clone()]));
        repo.expect_update()
            .returning(|_| Err(AppError::Conflict("version moved".to_string())));

        let sweeper = OverdueSweeper::new(
            Arc::new(repo),
            Arc::new(FixedTimeProvider::new(at(10))),
            Duration::from_secs(60),
        );
        let report = sweeper.sweep_once().await.unwrap();
        assert_eq!(report, SweepReport { marked: 0, conflicted: 1 });
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let clock = Arc::new(FixedTimeProvider::new(at(10)));
        let repo = Arc::new(InMemoryScheduleRepository::new(clock.clone()));
        repo.insert(&schedule("past", at(5))).await.unwrap();

        let (tx, token) = shutdown_channel();
        let sweeper = OverdueSweeper::new(repo.clone(), clock, Duration::from_millis(10));
        let handle = tokio::spawn(sweeper.run(token));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(repo.stored("past").unwrap().status, ScheduleStatus::Overdue);
    }
}
