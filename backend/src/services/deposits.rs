use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::services::ledger::{fetch_deposit_rows, require_active_member, validate_amount, LedgerError};
use crate::services::settlement::Period;
use shared::{CreateDepositRequest, Deposit};

pub async fn create_deposit(
    pool: &SqlitePool,
    house_id: &Uuid,
    request: &CreateDepositRequest,
) -> Result<Deposit, LedgerError> {
    validate_amount(request.amount, "Deposit")?;
    require_active_member(pool, house_id, &request.member_id).await?;

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
        INSERT INTO deposits (id, member_id, house_id, date, amount, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(request.member_id.to_string())
    .bind(house_id.to_string())
    .bind(request.date)
    .bind(request.amount.normalize().to_string())
    .bind(&description)
    .bind(now)
    .execute(pool)
    .await?;

    log::info!("Deposit of {} recorded for member {}", request.amount, request.member_id);

    Ok(Deposit {
        id,
        member_id: request.member_id,
        house_id: *house_id,
        date: request.date,
        amount: request.amount,
        description,
        created_at: now,
    })
}

/// Deposits in the period, newest first; `member_id` narrows to one member
pub async fn list_deposits(
    pool: &SqlitePool,
    house_id: &Uuid,
    period: Period,
    member_id: Option<&Uuid>,
) -> Result<Vec<Deposit>, LedgerError> {
    let rows = fetch_deposit_rows(pool, house_id, period).await?;
    let member_id = member_id.map(|id| id.to_string());

    Ok(rows
        .iter()
        .rev()
        .filter(|row| member_id.as_ref().map_or(true, |id| &row.member_id == id))
        .map(|row| row.to_shared())
        .collect())
}

pub async fn delete_deposit(pool: &SqlitePool, house_id: &Uuid, deposit_id: &Uuid) -> Result<(), LedgerError> {
    let result = sqlx::query("DELETE FROM deposits WHERE id = ? AND house_id = ?")
        .bind(deposit_id.to_string())
        .bind(house_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::settlement::MonthKey;
    use rust_decimal::Decimal;
    use crate::test_utils::{date, seed_house, seed_member, setup_test_db};

    fn request(member_id: Uuid, amount: Decimal) -> CreateDepositRequest {
        CreateDepositRequest {
            member_id,
            date: date(2024, 3, 1),
            amount,
            description: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_deposits() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let karim = seed_member(&pool, &house.id, "Karim").await;
        let rahim = seed_member(&pool, &house.id, "Rahim").await;

        let deposit = create_deposit(&pool, &house.id, &request(karim, Decimal::new(250050, 2)))
            .await
            .unwrap();
        assert!(deposit.description.is_none());
        create_deposit(&pool, &house.id, &request(rahim, Decimal::new(1000, 0)))
            .await
            .unwrap();

        let march = MonthKey::new(2024, 3).unwrap().period();
        let all = list_deposits(&pool, &house.id, march, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let own = list_deposits(&pool, &house.id, march, Some(&karim)).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].amount, Decimal::new(250050, 2));

        let april = MonthKey::new(2024, 4).unwrap().period();
        assert!(list_deposits(&pool, &house.id, april, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deposit_amount_must_be_positive() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let karim = seed_member(&pool, &house.id, "Karim").await;

        for amount in [Decimal::ZERO, Decimal::new(-5, 0)] {
            let result = create_deposit(&pool, &house.id, &request(karim, amount)).await;
            assert!(matches!(result, Err(LedgerError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_deposit_amount_limits() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let karim = seed_member(&pool, &house.id, "Karim").await;

        for amount in [Decimal::new(1_000_000_001, 0), Decimal::new(10_005, 3), Decimal::new(1, 24)] {
            let result = create_deposit(&pool, &house.id, &request(karim, amount)).await;
            assert!(matches!(result, Err(LedgerError::Validation(_))), "{} accepted", amount);
        }

        create_deposit(&pool, &house.id, &request(karim, Decimal::new(1_000_000_000, 0)))
            .await
            .unwrap();
        create_deposit(&pool, &house.id, &request(karim, Decimal::new(10_050, 3)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deposit_for_foreign_member_rejected() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let other_house = seed_house(&pool).await;
        let stranger = seed_member(&pool, &other_house.id, "Stranger").await;

        let result = create_deposit(&pool, &house.id, &request(stranger, Decimal::new(100, 0))).await;
        assert!(matches!(result, Err(LedgerError::MemberNotFound)));
    }

    #[tokio::test]
    async fn test_delete_deposit() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let karim = seed_member(&pool, &house.id, "Karim").await;

        let deposit = create_deposit(&pool, &house.id, &request(karim, Decimal::new(100, 0)))
            .await
            .unwrap();
        delete_deposit(&pool, &house.id, &deposit.id).await.unwrap();
        assert!(matches!(
            delete_deposit(&pool, &house.id, &deposit.id).await,
            Err(LedgerError::NotFound)
        ));
    }
}
