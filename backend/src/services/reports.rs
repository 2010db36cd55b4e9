//! Read-only views over the settlement engine: member reports and dashboards.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::MemberRow;
use crate::services::breakdown::{category_breakdown, meal_share_percent};
use crate::services::carry_forward::{adjusted_balance, get_previous_balance, previous_period_key};
use crate::services::deposits::list_deposits;
use crate::services::houses::{get_house, HouseError};
use crate::services::ledger::{load_ledger, LedgerError};
use crate::services::meals::list_meals;
use crate::services::members::{get_member_row, list_member_rows, MemberError};
use crate::services::settlement::{
    checked_total, compute_house_totals, compute_meal_rate, compute_member_settlement, compute_member_totals,
    compute_monthly_settlement, compute_yearly_settlement, round_money, HouseTotals, MemberSettlement, MonthKey,
    Period, SettlementError,
};
use shared::{
    HouseTotalsSummary, ManagerDashboard, MemberBalanceRow, MemberReport, MonthlyReport, MonthlySettlementRow,
    PeriodQuery, ReportView, SettlementSummary, YearlyReport,
};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("House not found")]
    HouseNotFound,
    #[error("Member not found")]
    MemberNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

impl From<LedgerError> for ReportError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DatabaseError(e) => ReportError::DatabaseError(e),
            LedgerError::MemberNotFound | LedgerError::InactiveMember => ReportError::MemberNotFound,
            LedgerError::NotFound => ReportError::HouseNotFound,
            LedgerError::Validation(msg) => ReportError::Validation(msg),
        }
    }
}

impl From<HouseError> for ReportError {
    fn from(err: HouseError) -> Self {
        match err {
            HouseError::DatabaseError(e) => ReportError::DatabaseError(e),
            HouseError::NotFound | HouseError::CodeExhausted => ReportError::HouseNotFound,
            HouseError::Validation(msg) => ReportError::Validation(msg),
        }
    }
}

impl From<MemberError> for ReportError {
    fn from(err: MemberError) -> Self {
        match err {
            MemberError::DatabaseError(e) => ReportError::DatabaseError(e),
            MemberError::Validation(msg) => ReportError::Validation(msg),
            _ => ReportError::MemberNotFound,
        }
    }
}

/// The period a report covers, resolved from the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub view: ReportView,
    pub key: MonthKey,
}

impl ReportPeriod {
    pub fn year(&self) -> i32 {
        self.key.year()
    }
}

/// Today's date in the house's configured time zone
pub fn today_in(timezone: Tz) -> NaiveDate {
    Utc::now().with_timezone(&timezone).date_naive()
}

/// Missing month/year fall back to the month containing `today`
pub fn resolve_period(query: &PeriodQuery, today: NaiveDate) -> Result<ReportPeriod, ReportError> {
    let current = MonthKey::containing(today).ok_or_else(|| ReportError::Validation("Invalid date".to_string()))?;

    let year = query.year.unwrap_or(current.year());
    if !(1970..=9999).contains(&year) {
        return Err(ReportError::Validation(format!("Year {} is out of range", year)));
    }
    let month = query.month.unwrap_or(current.month());
    let key = MonthKey::new(year, month)
        .ok_or_else(|| ReportError::Validation(format!("Month {} is out of range (1-12)", month)))?;

    Ok(ReportPeriod {
        view: query.view.unwrap_or_default(),
        key,
    })
}

fn house_summary(house: &HouseTotals, meal_rate: Decimal) -> HouseTotalsSummary {
    HouseTotalsSummary {
        total_meals: round_money(house.total_meals),
        total_expenses: round_money(house.total_expenses),
        meal_rate: round_money(meal_rate),
    }
}

fn settlement_summary(settlement: &MemberSettlement) -> SettlementSummary {
    SettlementSummary {
        meals: round_money(settlement.meals),
        deposits: round_money(settlement.deposits),
        cost: round_money(settlement.cost),
        balance: round_money(settlement.balance),
    }
}

async fn require_member(pool: &SqlitePool, house_id: &Uuid, member_id: &Uuid) -> Result<MemberRow, ReportError> {
    if get_house(pool, house_id).await?.is_none() {
        return Err(ReportError::HouseNotFound);
    }
    get_member_row(pool, house_id, member_id)
        .await?
        .ok_or(ReportError::MemberNotFound)
}

pub async fn member_monthly_report(
    pool: &SqlitePool,
    house_id: &Uuid,
    member_id: &Uuid,
    key: MonthKey,
) -> Result<MonthlyReport, ReportError> {
    let member = require_member(pool, house_id, member_id).await?;
    let period = key.period();

    let (ledger, meals, deposits) = futures::try_join!(
        load_ledger(pool, house_id, period),
        list_meals(pool, house_id, period, Some(member_id)),
        list_deposits(pool, house_id, period, Some(member_id)),
    )?;

    let monthly = compute_monthly_settlement(&ledger, member_id, key)?;
    let previous_balance = match previous_period_key(ReportView::Monthly, key.year(), key.month()) {
        Some(previous) => get_previous_balance(pool, house_id, member_id, previous).await?,
        None => Decimal::ZERO,
    };

    Ok(MonthlyReport {
        house_id: *house_id,
        member_id: *member_id,
        member_name: member.name,
        year: key.year(),
        month: key.month(),
        house: house_summary(&monthly.house, monthly.meal_rate),
        settlement: settlement_summary(&monthly.settlement),
        previous_balance: round_money(previous_balance),
        adjusted_balance: round_money(adjusted_balance(monthly.settlement.balance, previous_balance)?),
        meal_share_percent: meal_share_percent(monthly.settlement.meals, monthly.house.total_meals)?,
        categories: category_breakdown(ledger.expenses_in(period))?,
        meals,
        deposits,
    })
}

pub async fn member_yearly_report(
    pool: &SqlitePool,
    house_id: &Uuid,
    member_id: &Uuid,
    year: i32,
) -> Result<YearlyReport, ReportError> {
    let member = require_member(pool, house_id, member_id).await?;
    let period = Period::year(year).ok_or_else(|| ReportError::Validation(format!("Year {} is out of range", year)))?;

    let ledger = load_ledger(pool, house_id, period).await?;
    let yearly = compute_yearly_settlement(&ledger, member_id, year)?;
    let house = compute_house_totals(&ledger, period)?;

    let previous_balance = match previous_period_key(ReportView::Yearly, year, 1) {
        Some(previous) => get_previous_balance(pool, house_id, member_id, previous).await?,
        None => Decimal::ZERO,
    };

    Ok(YearlyReport {
        house_id: *house_id,
        member_id: *member_id,
        member_name: member.name,
        year,
        months: yearly
            .months
            .iter()
            .map(|m| MonthlySettlementRow {
                month: m.key.month(),
                meal_rate: round_money(m.meal_rate),
                meals: round_money(m.settlement.meals),
                deposits: round_money(m.settlement.deposits),
                cost: round_money(m.settlement.cost),
                balance: round_money(m.settlement.balance),
            })
            .collect(),
        totals: settlement_summary(&yearly.totals),
        house_meals: round_money(house.total_meals),
        house_expenses: round_money(house.total_expenses),
        previous_balance: round_money(previous_balance),
        adjusted_balance: round_money(adjusted_balance(yearly.totals.balance, previous_balance)?),
        meal_share_percent: meal_share_percent(yearly.totals.meals, house.total_meals)?,
        categories: category_breakdown(ledger.expenses_in(period))?,
    })
}

pub async fn member_report(
    pool: &SqlitePool,
    house_id: &Uuid,
    member_id: &Uuid,
    period: ReportPeriod,
) -> Result<MemberReport, ReportError> {
    match period.view {
        ReportView::Monthly => Ok(MemberReport::Monthly(
            member_monthly_report(pool, house_id, member_id, period.key).await?,
        )),
        ReportView::Yearly => Ok(MemberReport::Yearly(
            member_yearly_report(pool, house_id, member_id, period.year()).await?,
        )),
    }
}

/// House-wide figures for one month with a balance row per member
pub async fn manager_dashboard(pool: &SqlitePool, house_id: &Uuid, key: MonthKey) -> Result<ManagerDashboard, ReportError> {
    let house = get_house(pool, house_id).await?.ok_or(ReportError::HouseNotFound)?;
    let period = key.period();

    let ledger = load_ledger(pool, house_id, period).await?;
    let members = list_member_rows(pool, house_id).await?;

    let totals = compute_house_totals(&ledger, period)?;
    let meal_rate = compute_meal_rate(totals.total_expenses, totals.total_meals)?;
    let total_deposits = checked_total(ledger.deposits_in(period).map(|d| d.amount))?;
    let cash_in_hand = total_deposits
        .checked_sub(totals.total_expenses)
        .ok_or(SettlementError::Overflow)?;

    let previous_key = key.previous();
    let mut rows = Vec::with_capacity(members.len());
    for member in &members {
        let member_id = Uuid::parse_str(&member.id).unwrap_or_default();
        let (meals, deposits) = compute_member_totals(&ledger, &member_id, period)?;
        let settlement = compute_member_settlement(meals, deposits, meal_rate)?;
        let previous_balance = match previous_key {
            Some(previous) => get_previous_balance(pool, house_id, &member_id, previous).await?,
            None => Decimal::ZERO,
        };

        rows.push(MemberBalanceRow {
            member_id,
            name: member.name.clone(),
            status: member.to_shared(false).status,
            meals: round_money(settlement.meals),
            deposits: round_money(settlement.deposits),
            cost: round_money(settlement.cost),
            balance: round_money(settlement.balance),
            previous_balance: round_money(previous_balance),
            adjusted_balance: round_money(adjusted_balance(settlement.balance, previous_balance)?),
        });
    }

    Ok(ManagerDashboard {
        house,
        year: key.year(),
        month: key.month(),
        totals: house_summary(&totals, meal_rate),
        total_deposits: round_money(total_deposits),
        cash_in_hand: round_money(cash_in_hand),
        active_members: members.iter().filter(|m| m.is_active()).count() as i64,
        categories: category_breakdown(ledger.expenses_in(period))?,
        members: rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::deposits::create_deposit;
    use crate::services::expenses::create_expense;
    use crate::services::meals::record_meal;
    use crate::services::summaries::close_month;
    use crate::test_utils::{date, seed_house, seed_manager, seed_member, setup_test_db};
    use shared::{CreateDepositRequest, CreateExpenseRequest, CreateMealRequest, ExpenseCategory};

    async fn seed_month(pool: &SqlitePool) -> (Uuid, Uuid, Uuid) {
        let house = seed_house(pool).await;
        let manager = seed_manager(pool, &house.id).await;
        let karim = seed_member(pool, &house.id, "Karim").await;
        let rahim = seed_member(pool, &house.id, "Rahim").await;

        record_meal(
            pool,
            &house.id,
            &CreateMealRequest {
                member_id: karim,
                date: date(2024, 3, 4),
                meal_count: Decimal::new(40, 0),
            },
        )
        .await
        .unwrap();
        record_meal(
            pool,
            &house.id,
            &CreateMealRequest {
                member_id: rahim,
                date: date(2024, 3, 4),
                meal_count: Decimal::new(160, 0),
            },
        )
        .await
        .unwrap();
        create_deposit(
            pool,
            &house.id,
            &CreateDepositRequest {
                member_id: karim,
                date: date(2024, 3, 1),
                amount: Decimal::new(2500, 0),
                description: None,
            },
        )
        .await
        .unwrap();
        create_expense(
            pool,
            &house.id,
            &manager,
            &CreateExpenseRequest {
                date: date(2024, 3, 2),
                category: ExpenseCategory::Rice,
                amount: Decimal::new(6000, 0),
                description: None,
            },
        )
        .await
        .unwrap();
        create_expense(
            pool,
            &house.id,
            &manager,
            &CreateExpenseRequest {
                date: date(2024, 3, 3),
                category: ExpenseCategory::Fish,
                amount: Decimal::new(4000, 0),
                description: None,
            },
        )
        .await
        .unwrap();

        (house.id, karim, rahim)
    }

    #[test]
    fn test_resolve_period_defaults_to_today() {
        let period = resolve_period(&PeriodQuery::default(), date(2024, 5, 17)).unwrap();
        assert_eq!(period.view, ReportView::Monthly);
        assert_eq!(period.key, MonthKey::new(2024, 5).unwrap());

        let query = PeriodQuery {
            view: Some(ReportView::Yearly),
            year: Some(2023),
            ..Default::default()
        };
        let period = resolve_period(&query, date(2024, 5, 17)).unwrap();
        assert_eq!(period.view, ReportView::Yearly);
        assert_eq!(period.year(), 2023);
    }

    #[test]
    fn test_resolve_period_rejects_out_of_range() {
        let query = PeriodQuery {
            month: Some(13),
            ..Default::default()
        };
        assert!(matches!(
            resolve_period(&query, date(2024, 5, 17)),
            Err(ReportError::Validation(_))
        ));

        let query = PeriodQuery {
            month: Some(0),
            ..Default::default()
        };
        assert!(resolve_period(&query, date(2024, 5, 17)).is_err());
    }

    #[tokio::test]
    async fn test_member_monthly_report() {
        let pool = setup_test_db().await;
        let (house_id, karim, _) = seed_month(&pool).await;

        let report = member_monthly_report(&pool, &house_id, &karim, MonthKey::new(2024, 3).unwrap())
            .await
            .unwrap();

        assert_eq!(report.member_name, "Karim");
        assert_eq!(report.house.total_meals, Decimal::new(200, 0));
        assert_eq!(report.house.meal_rate, Decimal::new(50, 0));
        assert_eq!(report.settlement.cost, Decimal::new(2000, 0));
        assert_eq!(report.settlement.balance, Decimal::new(500, 0));
        assert_eq!(report.previous_balance, Decimal::ZERO);
        assert_eq!(report.adjusted_balance, report.settlement.balance);
        assert_eq!(report.meal_share_percent, Decimal::new(20, 0));
        assert_eq!(report.categories[0].category, ExpenseCategory::Rice);
        assert_eq!(report.meals.len(), 1);
        assert_eq!(report.deposits.len(), 1);
    }

    #[tokio::test]
    async fn test_member_yearly_report_has_twelve_months() {
        let pool = setup_test_db().await;
        let (house_id, karim, _) = seed_month(&pool).await;

        let report = member_yearly_report(&pool, &house_id, &karim, 2024).await.unwrap();

        assert_eq!(report.months.len(), 12);
        assert_eq!(report.months[2].balance, Decimal::new(500, 0));
        assert_eq!(report.months[0].balance, Decimal::ZERO);
        assert_eq!(report.totals.balance, Decimal::new(500, 0));
        assert_eq!(report.house_expenses, Decimal::new(10000, 0));
    }

    #[tokio::test]
    async fn test_yearly_report_carries_closed_december() {
        let pool = setup_test_db().await;
        let (house_id, karim, _) = seed_month(&pool).await;
        let manager = seed_manager(&pool, &house_id).await;

        create_deposit(
            &pool,
            &house_id,
            &CreateDepositRequest {
                member_id: karim,
                date: date(2023, 12, 10),
                amount: Decimal::new(300, 0),
                description: None,
            },
        )
        .await
        .unwrap();
        close_month(&pool, &house_id, &manager, MonthKey::new(2023, 12).unwrap(), date(2024, 1, 5))
            .await
            .unwrap();

        let report = member_yearly_report(&pool, &house_id, &karim, 2024).await.unwrap();
        assert_eq!(report.totals.balance, Decimal::new(500, 0));
        assert_eq!(report.previous_balance, Decimal::new(300, 0));
        assert_eq!(report.adjusted_balance, Decimal::new(800, 0));

        // The monthly view of January reads the same snapshot
        let january = member_monthly_report(&pool, &house_id, &karim, MonthKey::new(2024, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(january.previous_balance, Decimal::new(300, 0));

        let next_year = member_yearly_report(&pool, &house_id, &karim, 2025).await.unwrap();
        assert_eq!(next_year.previous_balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_report_with_smallest_meal_count() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;
        let manager = seed_manager(&pool, &house.id).await;
        let karim = seed_member(&pool, &house.id, "Karim").await;

        record_meal(
            &pool,
            &house.id,
            &CreateMealRequest {
                member_id: karim,
                date: date(2024, 4, 1),
                meal_count: Decimal::new(1, 2),
            },
        )
        .await
        .unwrap();
        create_expense(
            &pool,
            &house.id,
            &manager,
            &CreateExpenseRequest {
                date: date(2024, 4, 2),
                category: ExpenseCategory::Meat,
                amount: Decimal::new(1_000_000, 0),
                description: None,
            },
        )
        .await
        .unwrap();

        let april = MonthKey::new(2024, 4).unwrap();
        let report = member_monthly_report(&pool, &house.id, &karim, april).await.unwrap();
        assert_eq!(report.house.meal_rate, Decimal::new(100_000_000, 0));
        assert_eq!(report.settlement.cost, Decimal::new(1_000_000, 0));
        assert_eq!(report.settlement.balance, Decimal::new(-1_000_000, 0));

        let dashboard = manager_dashboard(&pool, &house.id, april).await.unwrap();
        assert_eq!(dashboard.cash_in_hand, Decimal::new(-1_000_000, 0));
    }

    #[tokio::test]
    async fn test_report_for_unknown_member() {
        let pool = setup_test_db().await;
        let (house_id, _, _) = seed_month(&pool).await;

        let result = member_monthly_report(&pool, &house_id, &Uuid::new_v4(), MonthKey::new(2024, 3).unwrap()).await;
        assert!(matches!(result, Err(ReportError::MemberNotFound)));

        let result = member_yearly_report(&pool, &Uuid::new_v4(), &Uuid::new_v4(), 2024).await;
        assert!(matches!(result, Err(ReportError::HouseNotFound)));
    }

    #[tokio::test]
    async fn test_manager_dashboard() {
        let pool = setup_test_db().await;
        let (house_id, karim, rahim) = seed_month(&pool).await;

        let dashboard = manager_dashboard(&pool, &house_id, MonthKey::new(2024, 3).unwrap())
            .await
            .unwrap();

        assert_eq!(dashboard.totals.meal_rate, Decimal::new(50, 0));
        assert_eq!(dashboard.total_deposits, Decimal::new(2500, 0));
        assert_eq!(dashboard.cash_in_hand, Decimal::new(-7500, 0));
        assert_eq!(dashboard.active_members, 2);
        assert_eq!(dashboard.members.len(), 2);

        let karim_row = dashboard.members.iter().find(|m| m.member_id == karim).unwrap();
        assert_eq!(karim_row.balance, Decimal::new(500, 0));
        let rahim_row = dashboard.members.iter().find(|m| m.member_id == rahim).unwrap();
        assert_eq!(rahim_row.cost, Decimal::new(8000, 0));
        assert_eq!(rahim_row.balance, Decimal::new(-8000, 0));
    }

    #[tokio::test]
    async fn test_empty_month_dashboard_is_all_zero() {
        let pool = setup_test_db().await;
        let house = seed_house(&pool).await;

        let dashboard = manager_dashboard(&pool, &house.id, MonthKey::new(2024, 3).unwrap())
            .await
            .unwrap();
        assert_eq!(dashboard.totals.meal_rate, Decimal::ZERO);
        assert!(dashboard.categories.is_empty());
        assert!(dashboard.members.is_empty());
    }
}
