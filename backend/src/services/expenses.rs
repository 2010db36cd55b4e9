use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::services::ledger::{fetch_expense_rows, validate_amount, LedgerError};
use crate::services::settlement::Period;
use shared::{CreateExpenseRequest, Expense};

pub async fn create_expense(
    pool: &SqlitePool,
    house_id: &Uuid,
    created_by: &Uuid,
    request: &CreateExpenseRequest,
) -> Result<Expense, LedgerError> {
    validate_amount(request.amount, "Expense")?;

    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO expenses (id, house_id, date, category, amount, description, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(house_id.to_string())
    .bind(request.date)
    .bind(request.category.as_str())
    .bind(request.amount.normalize().to_string())
    .bind(&description)
    .bind(created_by.to_string())
    .bind(now)
    .execute(pool)
    .await?;

    log::info!("{} expense of {} recorded for house {}", request.category.as_str(), request.amount, house_id);

    Ok(Expense {
        id,
        house_id: *house_id,
        date: request.date,
        category: request.category,
        amount: request.amount,
        description,
        created_by: *created_by,
        created_at: now,
    })
}

/// Expenses in the period, newest first
pub async fn list_expenses(pool: &SqlitePool, house_id: &Uuid, period: Period) -> Result<Vec<Expense>, LedgerError> {
    let rows = fetch_expense_rows(pool, house_id, period).await?;
    Ok(rows.iter().rev().map(|row| row.to_shared()).collect())
}

pub async fn delete_expense(pool: &SqlitePool, house_id: &Uuid, expense_id: &Uuid) -> Result<(), LedgerError> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = ? AND house_id = ?")
        .bind(expense_id.to_string())
        .bind(house_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::NotFound);
    }
    Ok(())
}
