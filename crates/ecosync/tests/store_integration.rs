//! Storage operations against an in-memory SQLite database.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

mod common;

use std::sync::Arc;

use common::{setup_test_db, ts};
use ecosync::entity::prelude::*;
use ecosync::platform::{PlatformAuthor, PlatformCommit, PlatformRepo};
use ecosync::store::{self, StoreError, TrackRequest};
use ecosync::watermark::{DbWatermarkStore, WatermarkStore};
use sea_orm::{EntityTrait, PaginatorTrait};

fn commit(hash: &str, author: Option<(i64, &str)>, day: u32) -> PlatformCommit {
    PlatformCommit {
        hash: hash.to_string(),
        author: author.map(|(id, login)| PlatformAuthor {
            id,
            login: login.to_string(),
            avatar_url: None,
        }),
        author_name: "someone".to_string(),
        committed_at: ts(day, 0),
    }
}

#[tokio::test]
async fn track_rejects_blank_names() {
    let db = setup_test_db().await;

    let err = store::track(&db, TrackRequest::new("eco", "  ")).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput { .. }));
    assert!(store::list_tracked(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn retracking_updates_classification_only() {
    let db = setup_test_db().await;
    let tracked = store::track(
        &db,
        TrackRequest::new("eco", "core").with_dependencies(vec!["eco/base".to_string()]),
    )
    .await
    .unwrap();
    assert_eq!(tracked.repo_type, RepoType::Whitelisted);
    assert_eq!(tracked.dependency_list(), vec!["eco/base".to_string()]);

    let snapshot = PlatformRepo {
        organization: "eco".to_string(),
        name: "core".to_string(),
        default_branch: "trunk".to_string(),
        is_fork: false,
        stars: Some(10),
        forks: Some(2),
        owner_type: Some("Organization".to_string()),
        created_at: Some(ts(1, 0)),
        updated_at: Some(ts(2, 0)),
        pushed_at: Some(ts(3, 0)),
    };
    store::persist_metadata(&db, &tracked, &snapshot, ts(4, 0))
        .await
        .unwrap();

    let retracked = store::track(&db, TrackRequest::new("eco", "core").with_type(RepoType::Fork))
        .await
        .unwrap();
    assert_eq!(retracked.repo_type, RepoType::Fork);
    assert!(retracked.dependency_list().is_empty());
    assert_eq!(retracked.default_branch, "trunk");
    assert_eq!(retracked.stars, Some(10));
    assert_eq!(
        retracked.synced_at.map(|t| t.with_timezone(&chrono::Utc)),
        Some(ts(4, 0))
    );
}

#[tokio::test]
async fn list_tracked_is_ordered() {
    let db = setup_test_db().await;
    for (organization, name) in [("zeta", "a"), ("alpha", "z"), ("alpha", "b")] {
        store::track(&db, TrackRequest::new(organization, name)).await.unwrap();
    }

    let names: Vec<String> = store::list_tracked(&db)
        .await
        .unwrap()
        .iter()
        .map(|r| r.full_name())
        .collect();
    assert_eq!(names, vec!["alpha/b", "alpha/z", "zeta/a"]);
}

#[tokio::test]
async fn insert_commits_ignores_known_hashes() {
    let db = setup_test_db().await;
    let page = vec![
        commit("a", Some((1, "alice")), 1),
        commit("b", None, 2),
    ];

    assert_eq!(store::insert_commits(&db, "eco", "core", "main", &page).await.unwrap(), 2);
    assert_eq!(store::insert_commits(&db, "eco", "core", "main", &page).await.unwrap(), 0);

    // The same hash seen from another branch keeps its first branch.
    let again = vec![commit("a", Some((1, "alice")), 1), commit("c", None, 3)];
    assert_eq!(store::insert_commits(&db, "eco", "core", "dev", &again).await.unwrap(), 1);

    let a = Commit::find_by_id(("eco".to_string(), "core".to_string(), "a".to_string()))
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a.branch, "main");
    assert_eq!(a.author_id, Some(1));
    assert_eq!(Commit::find().count(&*db).await.unwrap(), 3);
}

#[tokio::test]
async fn developers_are_last_write_wins() {
    let db = setup_test_db().await;
    let authors = [
        PlatformAuthor {
            id: 1,
            login: "alice".to_string(),
            avatar_url: None,
        },
        PlatformAuthor {
            id: 1,
            login: "alice-renamed".to_string(),
            avatar_url: Some("https://avatars.example/1".to_string()),
        },
    ];

    store::upsert_developers(&db, authors.iter()).await.unwrap();

    let alice = Developer::find_by_id(1).one(&*db).await.unwrap().unwrap();
    assert_eq!(alice.login, "alice-renamed");
    assert_eq!(alice.avatar_url.as_deref(), Some("https://avatars.example/1"));
    assert_eq!(Developer::find().count(&*db).await.unwrap(), 1);
}

#[tokio::test]
async fn stored_watermarks_never_move_backwards() {
    let db = setup_test_db().await;
    let store = DbWatermarkStore::new(Arc::clone(&db));

    assert_eq!(store.get("eco", "core", "main").await.unwrap(), None);

    store.set("eco", "core", "main", ts(5, 0)).await.unwrap();
    store.set("eco", "core", "main", ts(2, 0)).await.unwrap();
    assert_eq!(store.get("eco", "core", "main").await.unwrap(), Some(ts(5, 0)));

    store.set("eco", "core", "main", ts(5, 0)).await.unwrap();
    store.set("eco", "core", "main", ts(6, 12)).await.unwrap();
    assert_eq!(store.get("eco", "core", "main").await.unwrap(), Some(ts(6, 12)));

    assert_eq!(store.get("eco", "core", "dev").await.unwrap(), None);
    assert_eq!(Branch::find().count(&*db).await.unwrap(), 1);
}
