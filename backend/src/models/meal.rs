use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::parse_decimal;

/// Database model for daily meal counts
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MealRow {
    pub id: String,
    pub member_id: String,
    pub house_id: String,
    pub date: NaiveDate,
    pub meal_count: String,
    pub created_at: DateTime<Utc>,
}

impl MealRow {
    pub fn to_shared(&self) -> shared::MealRecord {
        shared::MealRecord {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            member_id: Uuid::parse_str(&self.member_id).unwrap_or_default(),
            house_id: Uuid::parse_str(&self.house_id).unwrap_or_default(),
            date: self.date,
            meal_count: parse_decimal(&self.meal_count),
            created_at: self.created_at,
        }
    }
}
