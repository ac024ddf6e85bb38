//! Concurrent writers against a file-backed SQLite database
//!
//! Version-checked writes must let exactly one of several racing writers
//! through and report the rest as conflicts.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use upkeep_core::application::{CreateScheduleRequest, OverdueSweeper, ScheduleService};
use upkeep_core::domain::{Frequency, ScheduleStatus};
use upkeep_core::error::AppError;
use upkeep_core::port::id_provider::mocks::SequentialIdProvider;
use upkeep_core::port::time_provider::mocks::FixedTimeProvider;
use upkeep_core::port::ScheduleRepository;
use upkeep_infra_sqlite::{create_pool, run_migrations, SqliteScheduleRepository};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 1, 6, 0, 0).unwrap()
}

fn db_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("upkeep-{}-{}.db", name, std::process::id()));
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
    path
}

async fn setup(
    name: &str,
) -> (
    Arc<ScheduleService>,
    Arc<SqliteScheduleRepository>,
    Arc<FixedTimeProvider>,
) {
    let path = db_file(name);
    let pool = create_pool(path.to_str().unwrap()).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let clock = Arc::new(FixedTimeProvider::new(start()));
    let repo = Arc::new(SqliteScheduleRepository::new(pool, clock.clone()));
    let service = Arc::new(ScheduleService::new(
        repo.clone(),
        Arc::new(SequentialIdProvider::new(name)),
        clock.clone(),
    ));
    (service, repo, clock)
}

fn request(date: DateTime<Utc>) -> CreateScheduleRequest {
    CreateScheduleRequest {
        machine: "chiller-2".to_string(),
        title: "Condenser coil cleaning".to_string(),
        description: None,
        schedule_type: None,
        frequency: Frequency::Monthly,
        scheduled_date: date,
        estimated_duration: 4.0,
        assigned_to: None,
        priority: None,
        checklist: vec!["Isolate".to_string(), "Clean coils".to_string()],
        notes: None,
        parts_used: vec![],
    }
}

#[tokio::test]
async fn test_racing_completions_have_one_winner() {
    let (service, repo, _) = setup("race").await;
    let created = service
        .create(request(start() + Duration::days(2)))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for worker in 0..8 {
        let service = service.clone();
        let id = created.id.clone();
        handles.push(tokio::spawn(async move {
            let user = format!("tech-{}", worker);
            let result = service.complete(&id, &user, Some(1)).await;
            (user, result)
        }));
    }

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        let (user, result) = handle.await.unwrap();
        match result {
            Ok(_) => winners.push(user),
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one completion must win");
    assert_eq!(conflicts, 7);

    let stored = repo.find_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ScheduleStatus::Completed);
    assert_eq!(stored.completed_by.as_deref(), Some(winners[0].as_str()));
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_stale_snapshot_write_is_rejected() {
    let (service, repo, _) = setup("stale").await;
    let created = service
        .create(request(start() + Duration::days(2)))
        .await
        .unwrap();

    service
        .update_checklist_item(&created.id, 0, true, None, Some(1))
        .await
        .unwrap();

    // A writer still holding version 1 loses, and its change is not applied
    let mut stale = created.clone();
    stale.checklist[1].completed = true;
    assert!(matches!(
        repo.update(&stale).await,
        Err(AppError::Conflict(_))
    ));

    let stored = repo.find_by_id(&created.id).await.unwrap().unwrap();
    assert!(stored.checklist[0].completed);
    assert!(!stored.checklist[1].completed);
}

#[tokio::test]
async fn test_sweeper_persists_overdue_once() {
    let (service, repo, clock) = setup("sweep").await;
    for days in [1, 2, 20] {
        service
            .create(request(start() + Duration::days(days)))
            .await
            .unwrap();
    }

    clock.advance(Duration::days(3));
    let sweeper = OverdueSweeper::new(
        repo.clone(),
        clock.clone(),
        std::time::Duration::from_secs(60),
    );

    let first = sweeper.sweep_once().await.unwrap();
    assert_eq!(first.marked, 2);
    assert_eq!(first.conflicted, 0);
    assert_eq!(
        repo.count(Some(ScheduleStatus::Overdue)).await.unwrap(),
        2
    );

    let second = sweeper.sweep_once().await.unwrap();
    assert_eq!(second.marked, 0);

    // The service view agrees with what the sweeper stored
    let overdue = service.find_overdue().await.unwrap();
    assert_eq!(overdue.len(), 2);
}
