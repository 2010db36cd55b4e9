use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::MealRow;
use crate::services::ledger::{fetch_meal_rows, require_active_member, LedgerError};
use crate::services::settlement::{fits_record_scale, Period, MAX_MEAL_COUNT, RECORD_SCALE};
use shared::{CreateMealRequest, DailyMealsRequest, MealRecord};

fn validate_meal_count(meal_count: Decimal) -> Result<(), LedgerError> {
    if meal_count < Decimal::ZERO {
        return Err(LedgerError::Validation("Meal count cannot be negative".to_string()));
    }
    if meal_count > MAX_MEAL_COUNT {
        return Err(LedgerError::Validation(format!("Meal count cannot exceed {}", MAX_MEAL_COUNT)));
    }
    if !fits_record_scale(meal_count) {
        return Err(LedgerError::Validation(format!(
            "Meal count can have at most {} decimal places",
            RECORD_SCALE
        )));
    }
    Ok(())
}

/// Insert or replace the member's meal count for the day
async fn upsert_meal(
    conn: &mut SqliteConnection,
    house_id: &Uuid,
    member_id: &Uuid,
    date: NaiveDate,
    meal_count: Decimal,
) -> Result<MealRow, LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO meals (id, member_id, house_id, date, meal_count, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(member_id, date) DO UPDATE SET
            meal_count = excluded.meal_count
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(member_id.to_string())
    .bind(house_id.to_string())
    .bind(date)
    .bind(meal_count.normalize().to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    let row: MealRow = sqlx::query_as("SELECT * FROM meals WHERE member_id = ? AND date = ?")
        .bind(member_id.to_string())
        .bind(date)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row)
}

pub async fn record_meal(
    pool: &SqlitePool,
    house_id: &Uuid,
    request: &CreateMealRequest,
) -> Result<MealRecord, LedgerError> {
    validate_meal_count(request.meal_count)?;
    require_active_member(pool, house_id, &request.member_id).await?;

    let mut conn = pool.acquire().await?;
    let row = upsert_meal(&mut conn, house_id, &request.member_id, request.date, request.meal_count).await?;

    Ok(row.to_shared())
}

/// Record a whole day's sheet; either every entry is written or none is
pub async fn record_daily_meals(
    pool: &SqlitePool,
    house_id: &Uuid,
    request: &DailyMealsRequest,
) -> Result<Vec<MealRecord>, LedgerError> {
    if request.entries.is_empty() {
        return Err(LedgerError::Validation("At least one meal entry is required".to_string()));
    }
    for entry in &request.entries {
        validate_meal_count(entry.meal_count)?;
        require_active_member(pool, house_id, &entry.member_id).await?;
    }

    let mut tx = pool.begin().await?;
    let mut records = Vec::with_capacity(request.entries.len());
    for entry in &request.entries {
        let row = upsert_meal(&mut tx, house_id, &entry.member_id, request.date, entry.meal_count).await?;
        records.push(row.to_shared());
    }
    tx.commit().await?;

    Ok(records)
}

pub async fn list_meals(
    pool: &SqlitePool,
    house_id: &Uuid,
    period: Period,
    member_id: Option<&Uuid>,
) -> Result<Vec<MealRecord>, LedgerError> {
    let rows = fetch_meal_rows(pool, house_id, period).await?;
    let member_id = member_id.map(|id| id.to_string());

    Ok(rows
        .iter()
        .filter(|row| member_id.as_ref().map_or(true, |id| &row.member_id == id))
        .map(|row| row.to_shared())
        .collect())
}

pub async fn delete_meal(pool: &SqlitePool, house_id: &Uuid, meal_id: &Uuid) -> Result<(), LedgerError> {
    let result = sqlx::query("DELETE FROM meals WHERE id = ? AND house_id = ?")
        .bind(meal_id.to_string())
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
    use crate::test_utils::{date, seed_house, seed_member, setup_test_db};
    use shared::DailyMealEntry;
    use std::str::FromStr;

    fn d(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[tokio::test]
    async fn test_record_meal_upserts_per_day() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let member = seed_member(&pool, &house.id, "Karim").await;

        let first = record_meal(
            &pool,
            &house.id,
            &CreateMealRequest {
                member_id: member,
                date: date(2024, 3, 5),
                meal_count: d("2"),
            },
        )
        .await
        .unwrap();
        let second = record_meal(
            &pool,
            &house.id,
            &CreateMealRequest {
                member_id: member,
                date: date(2024, 3, 5),
                meal_count: d("1.5"),
            },
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.meal_count, d("1.5"));

        let march = MonthKey::new(2024, 3).unwrap().period();
        let meals = list_meals(&pool, &house.id, march, None).await.unwrap();
        assert_eq!(meals.len(), 1);
    }

    #[tokio::test]
    async fn test_record_meal_rejects_negative_count() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let member = seed_member(&pool, &house.id, "Karim").await;

        let result = record_meal(
            &pool,
            &house.id,
            &CreateMealRequest {
                member_id: member,
                date: date(2024, 3, 5),
                meal_count: d("-1"),
            },
        )
        .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_record_meal_limits_precision_and_size() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let member = seed_member(&pool, &house.id, "Karim").await;

        for count in ["0.000000000000000000000001", "1.005", "101"] {
            let result = record_meal(
                &pool,
                &house.id,
                &CreateMealRequest {
                    member_id: member,
                    date: date(2024, 3, 5),
                    meal_count: d(count),
                },
            )
            .await;
            assert!(matches!(result, Err(LedgerError::Validation(_))), "{} accepted", count);
        }

        let half = record_meal(
            &pool,
            &house.id,
            &CreateMealRequest {
                member_id: member,
                date: date(2024, 3, 5),
                meal_count: d("2.50"),
            },
        )
        .await
        .unwrap();
        assert_eq!(half.meal_count, d("2.5"));
    }

    #[tokio::test]
    async fn test_daily_sheet_is_all_or_nothing() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let karim = seed_member(&pool, &house.id, "Karim").await;
        let rahim = seed_member(&pool, &house.id, "Rahim").await;

        let sheet = DailyMealsRequest {
            date: date(2024, 3, 6),
            entries: vec![
                DailyMealEntry {
                    member_id: karim,
                    meal_count: d("3"),
                },
                DailyMealEntry {
                    member_id: Uuid::new_v4(),
                    meal_count: d("2"),
                },
            ],
        };
        assert!(matches!(
            record_daily_meals(&pool, &house.id, &sheet).await,
            Err(LedgerError::MemberNotFound)
        ));

        let march = MonthKey::new(2024, 3).unwrap().period();
        assert!(list_meals(&pool, &house.id, march, None).await.unwrap().is_empty());

        let sheet = DailyMealsRequest {
            date: date(2024, 3, 6),
            entries: vec![
                DailyMealEntry {
                    member_id: karim,
                    meal_count: d("3"),
                },
                DailyMealEntry {
                    member_id: rahim,
                    meal_count: d("0.5"),
                },
            ],
        };
        let records = record_daily_meals(&pool, &house.id, &sheet).await.unwrap();
        assert_eq!(records.len(), 2);

        let rahim_only = list_meals(&pool, &house.id, march, Some(&rahim)).await.unwrap();
        assert_eq!(rahim_only.len(), 1);
        assert_eq!(rahim_only[0].meal_count, d("0.5"));
    }

    #[tokio::test]
    async fn test_delete_meal_scoped_to_house() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let other_house = seed_house(&pool).await;
        let member = seed_member(&pool, &house.id, "Karim").await;

        let meal = record_meal(
            &pool,
            &house.id,
            &CreateMealRequest {
                member_id: member,
                date: date(2024, 3, 5),
                meal_count: d("2"),
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            delete_meal(&pool, &other_house.id, &meal.id).await,
            Err(LedgerError::NotFound)
        ));
        assert!(delete_meal(&pool, &house.id, &meal.id).await.is_ok());
    }
}
