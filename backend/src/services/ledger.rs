use rust_decimal::Decimal;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{parse_decimal, DepositRow, ExpenseRow, MealRow, MemberRow};
use crate::services::settlement::{
    fits_record_scale, DepositEntry, ExpenseEntry, HouseLedger, MealEntry, Period, MAX_AMOUNT, RECORD_SCALE,
};

/// Errors shared by the meal, deposit and expense services
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Record not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Member not found in this house")]
    MemberNotFound,
    #[error("Member is inactive")]
    InactiveMember,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Deposit and expense amounts: positive, bounded, at most two decimal places
pub fn validate_amount(amount: Decimal, what: &str) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!("{} amount must be greater than zero", what)));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::Validation(format!("{} amount cannot exceed {}", what, MAX_AMOUNT)));
    }
    if !fits_record_scale(amount) {
        return Err(LedgerError::Validation(format!(
            "{} amount can have at most {} decimal places",
            what, RECORD_SCALE
        )));
    }
    Ok(())
}

/// New records may only be written for active members of the same house
pub async fn require_active_member(
    pool: &SqlitePool,
    house_id: &Uuid,
    member_id: &Uuid,
) -> Result<(), LedgerError> {
    let member: MemberRow = sqlx::query_as("SELECT * FROM members WHERE id = ? AND house_id = ?")
        .bind(member_id.to_string())
        .bind(house_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(LedgerError::MemberNotFound)?;

    if !member.is_active() {
        return Err(LedgerError::InactiveMember);
    }
    Ok(())
}

pub async fn fetch_meal_rows(pool: &SqlitePool, house_id: &Uuid, period: Period) -> Result<Vec<MealRow>, LedgerError> {
    let rows: Vec<MealRow> = sqlx::query_as(
        "SELECT * FROM meals WHERE house_id = ? AND date >= ? AND date < ? ORDER BY date ASC, created_at ASC",
    )
    .bind(house_id.to_string())
    .bind(period.start)
    .bind(period.end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn fetch_deposit_rows(
    pool: &SqlitePool,
    house_id: &Uuid,
    period: Period,
) -> Result<Vec<DepositRow>, LedgerError> {
    let rows: Vec<DepositRow> = sqlx::query_as(
        "SELECT * FROM deposits WHERE house_id = ? AND date >= ? AND date < ? ORDER BY date ASC, created_at ASC",
    )
    .bind(house_id.to_string())
    .bind(period.start)
    .bind(period.end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn fetch_expense_rows(
    pool: &SqlitePool,
    house_id: &Uuid,
    period: Period,
) -> Result<Vec<ExpenseRow>, LedgerError> {
    let rows: Vec<ExpenseRow> = sqlx::query_as(
        "SELECT * FROM expenses WHERE house_id = ? AND date >= ? AND date < ? ORDER BY date ASC, created_at ASC",
    )
    .bind(house_id.to_string())
    .bind(period.start)
    .bind(period.end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Load every meal, deposit and expense of the house inside the period
pub async fn load_ledger(pool: &SqlitePool, house_id: &Uuid, period: Period) -> Result<HouseLedger, LedgerError> {
    let meals = fetch_meal_rows(pool, house_id, period).await?;
    let deposits = fetch_deposit_rows(pool, house_id, period).await?;
    let expenses = fetch_expense_rows(pool, house_id, period).await?;

    Ok(HouseLedger {
        meals: meals
            .iter()
            .map(|m| MealEntry {
                member_id: Uuid::parse_str(&m.member_id).unwrap_or_default(),
                date: m.date,
                meal_count: parse_decimal(&m.meal_count),
            })
            .collect(),
        deposits: deposits
            .iter()
            .map(|d| DepositEntry {
                member_id: Uuid::parse_str(&d.member_id).unwrap_or_default(),
                date: d.date,
                amount: parse_decimal(&d.amount),
            })
            .collect(),
        expenses: expenses
            .iter()
            .map(|e| ExpenseEntry {
                date: e.date,
                category: e.category(),
                amount: parse_decimal(&e.amount),
            })
            .collect(),
    })
}
