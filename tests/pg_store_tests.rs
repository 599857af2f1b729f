// tests/pg_store_tests.rs
//
// Runs against a live PostgreSQL when DATABASE_URL is set; skipped otherwise.

use std::time::Duration;

use party_quiz::{
    error::AppError,
    models::{
        question::QuestionRecord,
        room::{GameMode, RoomPatch, RoomStatus},
    },
    store::{PgStore, RoomDefaults, RoomStore, transact},
};
use sqlx::postgres::PgPoolOptions;

async fn pg_store() -> Option<PgStore> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL store test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate the database");

    Some(PgStore::new(
        pool,
        RoomDefaults {
            mode: GameMode::MultiRound,
            time_per_round: 60,
        },
        8,
    ))
}

fn unique_room() -> String {
    format!("pg_{}", &uuid::Uuid::new_v4().to_string()[..8])
}

#[tokio::test]
async fn unknown_room_is_created_on_first_write() {
    let Some(store) = pg_store().await else { return };
    let room = unique_room();

    let fresh = store.load(&room).await.unwrap();
    assert_eq!(fresh.state, RoomStatus::Settings);
    assert_eq!(fresh.version, 0);

    let committed = store
        .write(
            &room,
            RoomPatch {
                subject: Some("History".to_string()),
                ..Default::default()
            },
            Some(0),
        )
        .await
        .unwrap();
    assert_eq!(committed.version, 1);
    assert_eq!(store.load(&room).await.unwrap(), committed);
}

#[tokio::test]
async fn stale_version_conflicts() {
    let Some(store) = pg_store().await else { return };
    let room = unique_room();

    let patch = RoomPatch {
        time_left: Some(30),
        ..Default::default()
    };
    store.write(&room, patch.clone(), Some(0)).await.unwrap();

    let err = store.write(&room, patch, Some(0)).await.unwrap_err();
    assert!(matches!(err, AppError::VersionConflict(_)));
}

#[tokio::test]
async fn disjoint_fields_both_survive() {
    let Some(store) = pg_store().await else { return };
    let room = unique_room();

    store
        .write(
            &room,
            RoomPatch {
                time_left: Some(42),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    let after = store
        .write(
            &room,
            RoomPatch {
                subject: Some("Geography".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(after.time_left, 42);
    assert_eq!(after.subject, "Geography");
    assert_eq!(after.version, 2);
}

#[tokio::test]
async fn transact_retries_to_completion() {
    let Some(store) = pg_store().await else { return };
    let room = unique_room();

    let (applied, snapshot) = transact(&store, &room, 3, |state| {
        state.time_left = 7;
        Ok(true)
    })
    .await
    .unwrap();
    assert!(applied);
    assert_eq!(snapshot.time_left, 7);
    assert_eq!(snapshot.version, 1);
}

#[tokio::test]
async fn pool_replace_round_trips() {
    let Some(store) = pg_store().await else { return };

    let records: Vec<QuestionRecord> = (1..=1200)
        .map(|id| QuestionRecord {
            id,
            term: format!("Term {}", id),
            book: "Book 1".to_string(),
            category: "Qing & Britain".to_string(),
            keywords: String::new(),
        })
        .collect();

    assert_eq!(store.replace_pool(records.clone()).await.unwrap(), 1200);
    assert_eq!(store.read_pool().await.unwrap(), records);

    assert_eq!(store.replace_pool(records[..2].to_vec()).await.unwrap(), 2);
    assert_eq!(store.read_pool().await.unwrap(), records[..2].to_vec());
}
