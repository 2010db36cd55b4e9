use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{MemberRow, UserRow};
use crate::services::houses::{insert_house, HouseError};
use crate::services::members::hash_join_token;
use shared::{
    ChangePasswordRequest, JoinRequest, LoginRequest, RegisterManagerRequest, ResetPasswordRequest, Role,
    SecurityQuestionResponse, User,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username or email already taken")]
    UserAlreadyExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Invalid join token")]
    InvalidJoinToken,
    #[error("Join token has expired")]
    ExpiredJoinToken,
    #[error("Member already has an account")]
    MemberAlreadyRegistered,
    #[error("Account is not attached to a house")]
    NoHouse,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Password hashing error")]
    HashingError,
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<HouseError> for AuthError {
    fn from(err: HouseError) -> Self {
        match err {
            HouseError::DatabaseError(e) => AuthError::DatabaseError(e),
            other => AuthError::Validation(other.to_string()),
        }
    }
}

/// Unique constraint failures on `users` mean the username or email is taken
fn map_insert_error(err: sqlx::Error) -> AuthError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => AuthError::UserAlreadyExists,
        other => AuthError::DatabaseError(other),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub house_id: String,
    pub member_id: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|_| AuthError::HashingError)?
        .to_string())
}

fn verify_secret(secret: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Security answers compare case-insensitively, ignoring surrounding whitespace
fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn validate_account(
    username: &str,
    email: &str,
    password: &str,
    question: &str,
    answer: &str,
) -> Result<(), AuthError> {
    if username.trim().is_empty() {
        return Err(AuthError::Validation("Username is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AuthError::Validation("A valid email is required".to_string()));
    }
    if question.trim().is_empty() || answer.trim().is_empty() {
        return Err(AuthError::Validation("Security question and answer are required".to_string()));
    }
    validate_password(password)
}

struct NewUser<'a> {
    username: &'a str,
    email: &'a str,
    password_hash: String,
    role: Role,
    house_id: Uuid,
    member_id: Option<Uuid>,
    security_question: &'a str,
    security_answer_hash: String,
}

async fn insert_user(conn: &mut SqliteConnection, new_user: NewUser<'_>) -> Result<User, AuthError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, role, house_id, member_id,
                           security_question, security_answer_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(new_user.username)
    .bind(new_user.email)
    .bind(&new_user.password_hash)
    .bind(new_user.role.as_str())
    .bind(new_user.house_id.to_string())
    .bind(new_user.member_id.map(|m| m.to_string()))
    .bind(new_user.security_question)
    .bind(&new_user.security_answer_hash)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(map_insert_error)?;

    Ok(User {
        id,
        username: new_user.username.to_string(),
        email: new_user.email.to_string(),
        role: new_user.role,
        house_id: Some(new_user.house_id),
        member_id: new_user.member_id,
        created_at: now,
        updated_at: now,
    })
}

/// Create a house together with its manager account
pub async fn register_manager(pool: &SqlitePool, request: &RegisterManagerRequest) -> Result<User, AuthError> {
    let username = request.username.trim();
    let email = request.email.trim();
    validate_account(
        username,
        email,
        &request.password,
        &request.security_question,
        &request.security_answer,
    )?;

    let password_hash = hash_secret(&request.password)?;
    let security_answer_hash = hash_secret(&normalize_answer(&request.security_answer))?;

    let mut tx = pool.begin().await?;
    let house = insert_house(&mut tx, &request.house_name).await?;
    let user = insert_user(
        &mut tx,
        NewUser {
            username,
            email,
            password_hash,
            role: Role::Manager,
            house_id: house.id,
            member_id: None,
            security_question: request.security_question.trim(),
            security_answer_hash,
        },
    )
    .await?;
    tx.commit().await?;

    log::info!("House {} registered by manager {}", house.code, user.username);
    Ok(user)
}

/// Claim a member record with a join token.
///
/// Clearing the token and creating the account happen in one transaction;
/// any failure leaves the token usable.
pub async fn join_house(pool: &SqlitePool, request: &JoinRequest) -> Result<User, AuthError> {
    let username = request.username.trim();
    let email = request.email.trim();
    validate_account(
        username,
        email,
        &request.password,
        &request.security_question,
        &request.security_answer,
    )?;

    let token_hash = hash_join_token(&request.token);
    let member: MemberRow = sqlx::query_as("SELECT * FROM members WHERE join_token_hash = ?")
        .bind(&token_hash)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidJoinToken)?;

    if !member.is_active() {
        return Err(AuthError::InvalidJoinToken);
    }
    match member.join_token_expires_at {
        Some(expires_at) if expires_at > Utc::now() => {}
        _ => return Err(AuthError::ExpiredJoinToken),
    }

    let claimed = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE member_id = ?")
        .bind(&member.id)
        .fetch_one(pool)
        .await?;
    if claimed > 0 {
        return Err(AuthError::MemberAlreadyRegistered);
    }

    let member_id = Uuid::parse_str(&member.id).map_err(|_| AuthError::InvalidJoinToken)?;
    let house_id = Uuid::parse_str(&member.house_id).map_err(|_| AuthError::InvalidJoinToken)?;
    let password_hash = hash_secret(&request.password)?;
    let security_answer_hash = hash_secret(&normalize_answer(&request.security_answer))?;

    let mut tx = pool.begin().await?;

    let cleared = sqlx::query(
        "UPDATE members SET join_token_hash = NULL, join_token_expires_at = NULL, updated_at = ? WHERE id = ? AND join_token_hash = ?",
    )
    .bind(Utc::now())
    .bind(&member.id)
    .bind(&token_hash)
    .execute(&mut *tx)
    .await?;
    if cleared.rows_affected() != 1 {
        return Err(AuthError::InvalidJoinToken);
    }

    let user = insert_user(
        &mut tx,
        NewUser {
            username,
            email,
            password_hash,
            role: Role::Member,
            house_id,
            member_id: Some(member_id),
            security_question: request.security_question.trim(),
            security_answer_hash,
        },
    )
    .await?;
    tx.commit().await?;

    log::info!("Member {} joined house {} as {}", member_id, house_id, user.username);
    Ok(user)
}

async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<UserRow>, AuthError> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(username.trim())
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn login_user(pool: &SqlitePool, request: &LoginRequest) -> Result<User, AuthError> {
    let user = find_by_username(pool, &request.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_secret(&request.password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user.to_shared())
}

pub async fn get_user_by_id(pool: &SqlitePool, user_id: &Uuid) -> Result<Option<User>, AuthError> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(user.map(|u| u.to_shared()))
}

pub async fn get_security_question(pool: &SqlitePool, username: &str) -> Result<SecurityQuestionResponse, AuthError> {
    let user = find_by_username(pool, username)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(SecurityQuestionResponse {
        username: user.username,
        question: user.security_question,
    })
}

pub async fn reset_password(pool: &SqlitePool, request: &ResetPasswordRequest) -> Result<(), AuthError> {
    validate_password(&request.new_password)?;

    let user = find_by_username(pool, &request.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_secret(&normalize_answer(&request.security_answer), &user.security_answer_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    set_password(pool, &user.id, &request.new_password).await?;
    log::info!("Password reset via security question for {}", user.username);
    Ok(())
}

pub async fn change_password(
    pool: &SqlitePool,
    user_id: &Uuid,
    request: &ChangePasswordRequest,
) -> Result<(), AuthError> {
    validate_password(&request.new_password)?;

    let user: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if !verify_secret(&request.current_password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    set_password(pool, &user.id, &request.new_password).await
}

async fn set_password(pool: &SqlitePool, user_id: &str, password: &str) -> Result<(), AuthError> {
    let password_hash = hash_secret(password)?;

    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub fn create_jwt(user: &User, secret: &str, expiration_hours: i64) -> Result<String, AuthError> {
    let house_id = user.house_id.ok_or(AuthError::NoHouse)?;
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.as_str().to_string(),
        house_id: house_id.to_string(),
        member_id: user.member_id.map(|m| m.to_string()),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}
