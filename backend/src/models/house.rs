use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for houses
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HouseRow {
    pub id: String,
    pub name: String,
    pub code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HouseRow {
    pub fn to_shared(&self) -> shared::House {
        shared::House {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            name: self.name.clone(),
            code: self.code.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
