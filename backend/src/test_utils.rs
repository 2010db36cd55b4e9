//! Fixtures for database-backed unit tests.

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::services::houses as house_service;
use shared::House;

/// In-memory database with the real migrations applied.
///
/// One connection only: every new SQLite memory connection is a fresh,
/// empty database.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    pool
}

pub async fn seed_house(pool: &SqlitePool) -> House {
    let mut conn = pool.acquire().await.unwrap();
    house_service::insert_house(&mut conn, "Test House").await.unwrap()
}

pub async fn seed_member(pool: &SqlitePool, house_id: &Uuid, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO members (id, house_id, name, join_date, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'active', ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(house_id.to_string())
    .bind(name)
    .bind(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// A manager account with placeholder hashes; only usable as a record author
pub async fn seed_manager(pool: &SqlitePool, house_id: &Uuid) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, role, house_id, member_id,
                           security_question, security_answer_hash, created_at, updated_at)
        VALUES (?, ?, ?, 'x', 'manager', ?, NULL, 'q', 'x', ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(format!("manager-{}", id))
    .bind(format!("{}@example.com", id))
    .bind(house_id.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
