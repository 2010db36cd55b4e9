use chrono::Utc;
use rand::Rng;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::HouseRow;
use shared::{House, UpdateHouseRequest};

const HOUSE_CODE_LENGTH: usize = 6;
const HOUSE_CODE_ATTEMPTS: usize = 5;
/// No 0/O or 1/I, codes get read out loud
const HOUSE_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Error)]
pub enum HouseError {
    #[error("House not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Could not generate a unique house code")]
    CodeExhausted,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub fn generate_house_code() -> String {
    let mut rng = rand::thread_rng();
    (0..HOUSE_CODE_LENGTH)
        .map(|_| HOUSE_CODE_CHARSET[rng.gen_range(0..HOUSE_CODE_CHARSET.len())] as char)
        .collect()
}

/// Insert a house on an open connection so callers can wrap it in a transaction
pub async fn insert_house(conn: &mut SqliteConnection, name: &str) -> Result<House, HouseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HouseError::Validation("House name is required".to_string()));
    }

    let mut code = None;
    for _ in 0..HOUSE_CODE_ATTEMPTS {
        let candidate = generate_house_code();
        let taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM houses WHERE code = ?")
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;
        if taken == 0 {
            code = Some(candidate);
            break;
        }
    }
    let code = code.ok_or(HouseError::CodeExhausted)?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO houses (id, name, code, is_active, created_at, updated_at)
        VALUES (?, ?, ?, TRUE, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(&code)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(House {
        id,
        name: name.to_string(),
        code,
        is_active: true,
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_house(pool: &SqlitePool, house_id: &Uuid) -> Result<Option<House>, HouseError> {
    let house: Option<HouseRow> = sqlx::query_as("SELECT * FROM houses WHERE id = ?")
        .bind(house_id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(house.map(|h| h.to_shared()))
}

pub async fn update_house(
    pool: &SqlitePool,
    house_id: &Uuid,
    request: &UpdateHouseRequest,
) -> Result<House, HouseError> {
    let mut house: HouseRow = sqlx::query_as("SELECT * FROM houses WHERE id = ?")
        .bind(house_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(HouseError::NotFound)?;

    if let Some(ref name) = request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(HouseError::Validation("House name cannot be empty".to_string()));
        }
        house.name = name.to_string();
    }

    let now = Utc::now();
    house.updated_at = now;

    sqlx::query("UPDATE houses SET name = ?, updated_at = ? WHERE id = ?")
        .bind(&house.name)
        .bind(now)
        .bind(house_id.to_string())
        .execute(pool)
        .await?;

    Ok(house.to_shared())
}
