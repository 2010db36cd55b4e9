use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::parse_decimal;

/// Database model for house expenses
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExpenseRow {
    pub id: String,
    pub house_id: String,
    pub date: NaiveDate,
    pub category: String,
    pub amount: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ExpenseRow {
    pub fn category(&self) -> shared::ExpenseCategory {
        self.category
            .parse()
            .unwrap_or(shared::ExpenseCategory::Others)
    }

    pub fn to_shared(&self) -> shared::Expense {
        shared::Expense {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            house_id: Uuid::parse_str(&self.house_id).unwrap_or_default(),
            date: self.date,
            category: self.category(),
            amount: parse_decimal(&self.amount),
            description: self.description.clone(),
            created_by: Uuid::parse_str(&self.created_by).unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}
