use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{MonthlyMemberDetailRow, MonthlySummaryRow};
use crate::services::carry_forward::{adjusted_balance, get_previous_balance};
use crate::services::ledger::{load_ledger, LedgerError};
use crate::services::members::{list_member_rows, MemberError};
use crate::services::settlement::{
    compute_house_totals, compute_meal_rate, compute_member_settlement, compute_member_totals, round_money, MonthKey,
    SettlementError,
};
use shared::MonthlySummary;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Monthly summary not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

impl From<LedgerError> for SummaryError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DatabaseError(e) => SummaryError::DatabaseError(e),
            other => SummaryError::Validation(other.to_string()),
        }
    }
}

impl From<MemberError> for SummaryError {
    fn from(err: MemberError) -> Self {
        match err {
            MemberError::DatabaseError(e) => SummaryError::DatabaseError(e),
            other => SummaryError::Validation(other.to_string()),
        }
    }
}

fn money(value: Decimal) -> String {
    round_money(value).to_string()
}

/// Snapshot every member's settlement for the month.
///
/// The stored `balance` is the carried (adjusted) balance, so the next
/// month's previous balance is read straight from it. Closing a month
/// again overwrites the snapshot.
pub async fn close_month(
    pool: &SqlitePool,
    house_id: &Uuid,
    closed_by: &Uuid,
    key: MonthKey,
    today: NaiveDate,
) -> Result<MonthlySummary, SummaryError> {
    if key.period().start > today {
        return Err(SummaryError::Validation(format!("Cannot close {} before it has started", key)));
    }

    let period = key.period();
    let ledger = load_ledger(pool, house_id, period).await?;
    let members = list_member_rows(pool, house_id).await?;

    let totals = compute_house_totals(&ledger, period)?;
    let meal_rate = compute_meal_rate(totals.total_expenses, totals.total_meals)?;

    // Previous balances are read before the transaction holds the connection
    let mut lines = Vec::with_capacity(members.len());
    for member in &members {
        let member_id = Uuid::parse_str(&member.id).unwrap_or_default();
        let (meals, deposits) = compute_member_totals(&ledger, &member_id, period)?;
        if !member.is_active() && meals.is_zero() && deposits.is_zero() {
            continue;
        }
        let settlement = compute_member_settlement(meals, deposits, meal_rate)?;
        let previous_balance = match key.previous() {
            Some(previous) => get_previous_balance(pool, house_id, &member_id, previous).await?,
            None => Decimal::ZERO,
        };
        let carried = adjusted_balance(settlement.balance, previous_balance)?;
        lines.push((member_id, settlement, previous_balance, carried));
    }

    let month_year = key.to_string();
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO monthly_summary (id, house_id, month_year, total_meals, total_expenses, meal_rate, closed_by, closed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(house_id, month_year) DO UPDATE SET
            total_meals = excluded.total_meals,
            total_expenses = excluded.total_expenses,
            meal_rate = excluded.meal_rate,
            closed_by = excluded.closed_by,
            closed_at = excluded.closed_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(house_id.to_string())
    .bind(&month_year)
    .bind(money(totals.total_meals))
    .bind(money(totals.total_expenses))
    .bind(money(meal_rate))
    .bind(closed_by.to_string())
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let summary_id = sqlx::query_scalar::<_, String>(
        "SELECT id FROM monthly_summary WHERE house_id = ? AND month_year = ?",
    )
    .bind(house_id.to_string())
    .bind(&month_year)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM monthly_member_details WHERE summary_id = ?")
        .bind(&summary_id)
        .execute(&mut *tx)
        .await?;

    for (member_id, settlement, previous_balance, carried) in &lines {
        sqlx::query(
            r#"
            INSERT INTO monthly_member_details (id, summary_id, house_id, month_year, member_id,
                                                total_meals, total_deposits, total_cost, previous_balance, balance)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&summary_id)
        .bind(house_id.to_string())
        .bind(&month_year)
        .bind(member_id.to_string())
        .bind(money(settlement.meals))
        .bind(money(settlement.deposits))
        .bind(money(settlement.cost))
        .bind(money(*previous_balance))
        .bind(money(*carried))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    log::info!(
        "Month {} closed for house {} by {} ({} members)",
        month_year,
        house_id,
        closed_by,
        lines.len()
    );

    get_summary(pool, house_id, key).await
}

async fn fetch_details(pool: &SqlitePool, summary_id: &str) -> Result<Vec<MonthlyMemberDetailRow>, SummaryError> {
    let rows: Vec<MonthlyMemberDetailRow> = sqlx::query_as(
        r#"
        SELECT d.member_id, m.name AS member_name, d.total_meals, d.total_deposits,
               d.total_cost, d.previous_balance, d.balance
        FROM monthly_member_details d
        JOIN members m ON m.id = d.member_id
        WHERE d.summary_id = ?
        ORDER BY m.name COLLATE NOCASE ASC
        "#,
    )
    .bind(summary_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_summary(pool: &SqlitePool, house_id: &Uuid, key: MonthKey) -> Result<MonthlySummary, SummaryError> {
    let summary: MonthlySummaryRow =
        sqlx::query_as("SELECT * FROM monthly_summary WHERE house_id = ? AND month_year = ?")
            .bind(house_id.to_string())
            .bind(key.to_string())
            .fetch_optional(pool)
            .await?
            .ok_or(SummaryError::NotFound)?;

    let details = fetch_details(pool, &summary.id).await?;
    Ok(summary.to_shared(details.iter().map(|d| d.to_shared()).collect()))
}

/// Closed months of the house, latest first
pub async fn list_summaries(pool: &SqlitePool, house_id: &Uuid) -> Result<Vec<MonthlySummary>, SummaryError> {
    let summaries: Vec<MonthlySummaryRow> =
        sqlx::query_as("SELECT * FROM monthly_summary WHERE house_id = ? ORDER BY month_year DESC")
            .bind(house_id.to_string())
            .fetch_all(pool)
            .await?;

    let mut result = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        let details = fetch_details(pool, &summary.id).await?;
        result.push(summary.to_shared(details.iter().map(|d| d.to_shared()).collect()));
    }
    Ok(result)
}
