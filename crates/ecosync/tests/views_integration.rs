//! Weekly aggregate refreshes on SQLite.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

mod common;

use std::sync::Arc;

use common::{FakePlatform, setup_test_db, test_options, ts};
use ecosync::entity::prelude::*;
use ecosync::platform::{PlatformAuthor, PlatformCommit};
use ecosync::store::{self, TrackRequest};
use ecosync::sync::{RefreshPolicy, Shutdown, SyncEngine, SyncOptions};
use ecosync::views::{View, ViewError, ViewRefresher};
use sea_orm::{DatabaseConnection, EntityTrait};

fn commit(hash: &str, author: Option<(i64, &str)>, day: u32, hour: u32) -> PlatformCommit {
    PlatformCommit {
        hash: hash.to_string(),
        author: author.map(|(id, login)| PlatformAuthor {
            id,
            login: login.to_string(),
            avatar_url: None,
        }),
        author_name: "someone".to_string(),
        committed_at: ts(day, hour),
    }
}

/// Two ISO weeks of commits; 2024-01-01 is a Monday.
async fn seed_commits(db: &DatabaseConnection) {
    let commits = vec![
        commit("w1a", Some((1, "alice")), 1, 9),
        commit("w1b", Some((1, "alice")), 2, 9),
        commit("w1c", Some((2, "bob")), 3, 9),
        commit("w2a", Some((1, "alice")), 9, 9),
        commit("w2b", None, 10, 9),
        commit("w2c", Some((3, "carol")), 14, 12),
    ];
    store::insert_commits(db, "eco", "core", "main", &commits)
        .await
        .unwrap();
}

async fn commit_totals(db: &DatabaseConnection) -> Vec<(String, i64, i64)> {
    let mut rows: Vec<_> = WeeklyCommitTotal::find()
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.week_start, r.commits, r.cumulative_commits))
        .collect();
    rows.sort();
    rows
}

async fn developer_totals(db: &DatabaseConnection) -> Vec<(String, i64, i64)> {
    let mut rows: Vec<_> = WeeklyDeveloperTotal::find()
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.week_start, r.new_developers, r.cumulative_developers))
        .collect();
    rows.sort();
    rows
}

#[tokio::test]
async fn refresh_builds_weekly_totals() {
    let db = setup_test_db().await;
    seed_commits(&db).await;
    let refresher = ViewRefresher::new(Arc::clone(&db));

    let refreshed = refresher.refresh(&[]).await.unwrap();
    assert_eq!(refreshed, View::ALL.to_vec());

    assert_eq!(
        commit_totals(&db).await,
        vec![
            ("2024-01-01".to_string(), 3, 3),
            ("2024-01-08".to_string(), 3, 6),
        ]
    );
    assert_eq!(
        developer_totals(&db).await,
        vec![
            ("2024-01-01".to_string(), 2, 2),
            ("2024-01-08".to_string(), 1, 3),
        ]
    );
}

#[tokio::test]
async fn refresh_replaces_previous_contents() {
    let db = setup_test_db().await;
    seed_commits(&db).await;
    let refresher = ViewRefresher::new(Arc::clone(&db));
    refresher.refresh(&["weekly_commit_totals"]).await.unwrap();

    store::insert_commits(&db, "eco", "core", "dev", &[commit("w2d", None, 11, 0)])
        .await
        .unwrap();
    refresher.refresh(&["weekly_commit_totals"]).await.unwrap();
    refresher.refresh(&["weekly_commit_totals"]).await.unwrap();

    assert_eq!(
        commit_totals(&db).await,
        vec![
            ("2024-01-01".to_string(), 3, 3),
            ("2024-01-08".to_string(), 4, 7),
        ]
    );
    assert!(developer_totals(&db).await.is_empty());
}

#[tokio::test]
async fn unknown_view_rejects_the_whole_request() {
    let db = setup_test_db().await;
    seed_commits(&db).await;
    let refresher = ViewRefresher::new(Arc::clone(&db));

    let err = refresher
        .refresh(&["weekly_commit_totals", "monthly_totals"])
        .await
        .unwrap_err();
    assert!(matches!(err, ViewError::UnknownView(name) if name == "monthly_totals"));
    assert!(commit_totals(&db).await.is_empty());
}

#[tokio::test]
async fn concurrent_refreshes_of_one_view_serialize() {
    let db = setup_test_db().await;
    seed_commits(&db).await;
    let refresher = ViewRefresher::new(Arc::clone(&db));

    let (a, b) = tokio::join!(
        refresher.refresh_one(View::WeeklyCommitTotals),
        refresher.refresh_one(View::WeeklyCommitTotals),
    );
    assert_eq!(a.unwrap(), 2);
    assert_eq!(b.unwrap(), 2);
    assert_eq!(commit_totals(&db).await.len(), 2);
}

#[tokio::test]
async fn pass_refreshes_views_after_writes() {
    let db = setup_test_db().await;
    let platform = Arc::new(FakePlatform::new());
    platform.add_repo("eco", "core", ts(2, 0));
    platform.push_commit("eco", "core", "main", "a", Some((1, "alice")), ts(2, 0));
    store::track(&db, TrackRequest::new("eco", "core")).await.unwrap();

    let engine = SyncEngine::new(Arc::clone(&platform), Arc::clone(&db), test_options());
    let first = engine.run_pass(&Shutdown::never()).await.unwrap();
    assert_eq!(
        first.refreshed,
        vec!["weekly_commit_totals", "weekly_developer_totals"]
    );
    assert_eq!(commit_totals(&db).await, vec![("2024-01-01".to_string(), 1, 1)]);

    let idle = engine.run_pass(&Shutdown::never()).await.unwrap();
    assert_eq!(idle.unchanged, 1);
    assert!(idle.refreshed.is_empty());
}

#[tokio::test]
async fn per_repository_policy_refreshes_without_pass_refresh() {
    let db = setup_test_db().await;
    let platform = Arc::new(FakePlatform::new());
    platform.add_repo("eco", "core", ts(2, 0));
    platform.push_commit("eco", "core", "main", "a", None, ts(8, 0));
    store::track(&db, TrackRequest::new("eco", "core")).await.unwrap();

    let options = SyncOptions {
        refresh: RefreshPolicy::PerRepository,
        ..test_options()
    };
    let engine = SyncEngine::new(Arc::clone(&platform), Arc::clone(&db), options);
    let report = engine.run_pass(&Shutdown::never()).await.unwrap();

    assert!(report.refreshed.is_empty());
    assert_eq!(commit_totals(&db).await, vec![("2024-01-08".to_string(), 1, 1)]);
}
