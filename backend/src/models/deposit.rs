use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::parse_decimal;

/// Database model for money paid into the house fund
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DepositRow {
    pub id: String,
    pub member_id: String,
    pub house_id: String,
    pub date: NaiveDate,
    pub amount: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DepositRow {
    pub fn to_shared(&self) -> shared::Deposit {
        shared::Deposit {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            member_id: Uuid::parse_str(&self.member_id).unwrap_or_default(),
            house_id: Uuid::parse_str(&self.house_id).unwrap_or_default(),
            date: self.date,
            amount: parse_decimal(&self.amount),
            description: self.description.clone(),
            created_at: self.created_at,
        }
    }
}
