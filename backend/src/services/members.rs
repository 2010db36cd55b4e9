use std::collections::HashSet;

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::MemberRow;
use shared::{CreateMemberRequest, JoinTokenResponse, Member, MemberStatus, UpdateMemberRequest};

#[derive(Debug, Error)]
pub enum MemberError {
    #[error("Member not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Member already has an account")]
    AlreadyHasAccount,
    #[error("Member is inactive")]
    Inactive,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// 32 random bytes, hex encoded
pub fn generate_join_token() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Only the hash of a join token is stored
pub fn hash_join_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.trim().as_bytes()))
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub async fn create_member(
    pool: &SqlitePool,
    house_id: &Uuid,
    request: &CreateMemberRequest,
) -> Result<Member, MemberError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(MemberError::Validation("Member name is required".to_string()));
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    let join_date = request.join_date.unwrap_or_else(|| now.date_naive());

    sqlx::query(
        r#"
        INSERT INTO members (id, house_id, name, phone, email, join_date, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'active', ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(house_id.to_string())
    .bind(name)
    .bind(clean(&request.phone))
    .bind(clean(&request.email))
    .bind(join_date)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Member {
        id,
        house_id: *house_id,
        name: name.to_string(),
        phone: clean(&request.phone),
        email: clean(&request.email),
        join_date,
        status: MemberStatus::Active,
        has_account: false,
        join_token_expires_at: None,
        created_at: now,
        updated_at: now,
    })
}

/// Fetch a member, scoped to the house; a member of another house is "not found"
pub async fn get_member_row(
    pool: &SqlitePool,
    house_id: &Uuid,
    member_id: &Uuid,
) -> Result<Option<MemberRow>, MemberError> {
    let member: Option<MemberRow> =
        sqlx::query_as("SELECT * FROM members WHERE id = ? AND house_id = ?")
            .bind(member_id.to_string())
            .bind(house_id.to_string())
            .fetch_optional(pool)
            .await?;

    Ok(member)
}

pub async fn has_account(pool: &SqlitePool, member_id: &Uuid) -> Result<bool, MemberError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE member_id = ?")
        .bind(member_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

pub async fn get_member(pool: &SqlitePool, house_id: &Uuid, member_id: &Uuid) -> Result<Member, MemberError> {
    let row = get_member_row(pool, house_id, member_id)
        .await?
        .ok_or(MemberError::NotFound)?;
    let has_account = has_account(pool, member_id).await?;

    Ok(row.to_shared(has_account))
}

/// Members of the house ordered by name, inactive ones included
pub async fn list_member_rows(pool: &SqlitePool, house_id: &Uuid) -> Result<Vec<MemberRow>, MemberError> {
    let members: Vec<MemberRow> =
        sqlx::query_as("SELECT * FROM members WHERE house_id = ? ORDER BY name COLLATE NOCASE ASC")
            .bind(house_id.to_string())
            .fetch_all(pool)
            .await?;

    Ok(members)
}

pub async fn list_members(pool: &SqlitePool, house_id: &Uuid) -> Result<Vec<Member>, MemberError> {
    let members = list_member_rows(pool, house_id).await?;

    let with_accounts: HashSet<String> = sqlx::query_scalar::<_, String>(
        "SELECT member_id FROM users WHERE house_id = ? AND member_id IS NOT NULL",
    )
    .bind(house_id.to_string())
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    Ok(members
        .iter()
        .map(|m| m.to_shared(with_accounts.contains(&m.id)))
        .collect())
}

pub async fn update_member(
    pool: &SqlitePool,
    house_id: &Uuid,
    member_id: &Uuid,
    request: &UpdateMemberRequest,
) -> Result<Member, MemberError> {
    let mut member = get_member_row(pool, house_id, member_id)
        .await?
        .ok_or(MemberError::NotFound)?;

    if let Some(ref name) = request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(MemberError::Validation("Member name cannot be empty".to_string()));
        }
        member.name = name.to_string();
    }
    if request.phone.is_some() {
        member.phone = clean(&request.phone);
    }
    if request.email.is_some() {
        member.email = clean(&request.email);
    }
    if let Some(status) = request.status {
        member.status = status.as_str().to_string();
        if status == MemberStatus::Inactive {
            // An inactive member cannot claim an account
            member.join_token_hash = None;
            member.join_token_expires_at = None;
        }
    }

    let now = Utc::now();
    member.updated_at = now;

    sqlx::query(
        r#"
        UPDATE members
        SET name = ?, phone = ?, email = ?, status = ?, join_token_hash = ?, join_token_expires_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&member.name)
    .bind(&member.phone)
    .bind(&member.email)
    .bind(&member.status)
    .bind(&member.join_token_hash)
    .bind(member.join_token_expires_at)
    .bind(now)
    .bind(member_id.to_string())
    .execute(pool)
    .await?;

    let has_account = has_account(pool, member_id).await?;
    Ok(member.to_shared(has_account))
}

/// Issue a fresh join token, replacing any earlier one
pub async fn issue_join_token(
    pool: &SqlitePool,
    house_id: &Uuid,
    member_id: &Uuid,
    expiry_hours: i64,
) -> Result<JoinTokenResponse, MemberError> {
    let member = get_member_row(pool, house_id, member_id)
        .await?
        .ok_or(MemberError::NotFound)?;

    if !member.is_active() {
        return Err(MemberError::Inactive);
    }
    if has_account(pool, member_id).await? {
        return Err(MemberError::AlreadyHasAccount);
    }

    let token = generate_join_token();
    let now = Utc::now();
    let expires_at = now + Duration::hours(expiry_hours);

    sqlx::query(
        "UPDATE members SET join_token_hash = ?, join_token_expires_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(hash_join_token(&token))
    .bind(expires_at)
    .bind(now)
    .bind(member_id.to_string())
    .execute(pool)
    .await?;

    log::info!("Join token issued for member {} (expires {})", member_id, expires_at);

    Ok(JoinTokenResponse {
        member_id: *member_id,
        token,
        expires_at,
    })
}
