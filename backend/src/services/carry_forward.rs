//! Balances carried from one period into the next.
//!
//! The previous balance is read from the snapshot written when a month is
//! closed. A month that was never closed contributes nothing.

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::parse_decimal;
use crate::services::settlement::{MonthKey, SettlementError};
use shared::ReportView;

/// Month whose closing balance feeds the requested period.
///
/// Monthly reports look at the previous calendar month, yearly reports at
/// December of the previous year.
pub fn previous_period_key(view: ReportView, year: i32, month: u32) -> Option<MonthKey> {
    match view {
        ReportView::Monthly => MonthKey::new(year, month)?.previous(),
        ReportView::Yearly => MonthKey::new(year - 1, 12),
    }
}

pub async fn get_previous_balance(
    pool: &SqlitePool,
    house_id: &Uuid,
    member_id: &Uuid,
    key: MonthKey,
) -> Result<Decimal, sqlx::Error> {
    let stored = sqlx::query_scalar::<_, String>(
        "SELECT balance FROM monthly_member_details WHERE house_id = ? AND month_year = ? AND member_id = ?",
    )
    .bind(house_id.to_string())
    .bind(key.to_string())
    .bind(member_id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(stored.map(|b| parse_decimal(&b)).unwrap_or(Decimal::ZERO))
}

pub fn adjusted_balance(current: Decimal, previous: Decimal) -> Result<Decimal, SettlementError> {
    current.checked_add(previous).ok_or(SettlementError::Overflow)
}
