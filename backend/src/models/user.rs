use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for login accounts
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub house_id: Option<String>,
    pub member_id: Option<String>,
    pub security_question: String,
    pub security_answer_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn to_shared(&self) -> shared::User {
        shared::User {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.parse().unwrap_or(shared::Role::Member),
            house_id: self.house_id.as_deref().and_then(|id| Uuid::parse_str(id).ok()),
            member_id: self.member_id.as_deref().and_then(|id| Uuid::parse_str(id).ok()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
