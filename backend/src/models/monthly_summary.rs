use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::parse_decimal;

/// Month close snapshot for a house
#[derive(Debug, Clone, FromRow)]
pub struct MonthlySummaryRow {
    pub id: String,
    pub house_id: String,
    pub month_year: String,
    pub total_meals: String,
    pub total_expenses: String,
    pub meal_rate: String,
    pub closed_by: String,
    pub closed_at: DateTime<Utc>,
}

/// Per-member line of a month close snapshot, joined with the member's name
#[derive(Debug, Clone, FromRow)]
pub struct MonthlyMemberDetailRow {
    pub member_id: String,
    pub member_name: String,
    pub total_meals: String,
    pub total_deposits: String,
    pub total_cost: String,
    pub previous_balance: String,
    pub balance: String,
}

impl MonthlySummaryRow {
    pub fn to_shared(&self, members: Vec<shared::MonthlyMemberDetail>) -> shared::MonthlySummary {
        shared::MonthlySummary {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            house_id: Uuid::parse_str(&self.house_id).unwrap_or_default(),
            month_year: self.month_year.clone(),
            total_meals: parse_decimal(&self.total_meals),
            total_expenses: parse_decimal(&self.total_expenses),
            meal_rate: parse_decimal(&self.meal_rate),
            closed_by: Uuid::parse_str(&self.closed_by).unwrap_or_default(),
            closed_at: self.closed_at,
            members,
        }
    }
}

impl MonthlyMemberDetailRow {
    pub fn to_shared(&self) -> shared::MonthlyMemberDetail {
        shared::MonthlyMemberDetail {
            member_id: Uuid::parse_str(&self.member_id).unwrap_or_default(),
            member_name: self.member_name.clone(),
            total_meals: parse_decimal(&self.total_meals),
            total_deposits: parse_decimal(&self.total_deposits),
            total_cost: parse_decimal(&self.total_cost),
            previous_balance: parse_decimal(&self.previous_balance),
            balance: parse_decimal(&self.balance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_detail_row_to_shared_keeps_negative_balance() {
        let row = MonthlyMemberDetailRow {
            member_id: Uuid::new_v4().to_string(),
            member_name: "Karim".to_string(),
            total_meals: "40".to_string(),
            total_deposits: "2500".to_string(),
            total_cost: "2000".to_string(),
            previous_balance: "-600".to_string(),
            balance: "-100".to_string(),
        };

        let shared = row.to_shared();
        assert_eq!(shared.balance, Decimal::new(-100, 0));
        assert_eq!(shared.previous_balance, Decimal::new(-600, 0));
    }
}
