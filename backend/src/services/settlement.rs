//! Settlement engine: house totals, meal rate and per-member balances.
//!
//! Everything here is pure. Callers load a [`HouseLedger`] snapshot once
//! (see `services::ledger`) and every surface (dashboards, reports,
//! CSV export, month close) derives its figures from the same functions.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use shared::ExpenseCategory;
use thiserror::Error;
use uuid::Uuid;

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year + 1, 1, 1)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// A calendar month, always valid once constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
    period: Period,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            year,
            month,
            period: Period { start, end },
        })
    }

    pub fn containing(date: NaiveDate) -> Option<Self> {
        Self::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// The calendar month before this one (January rolls back to December)
    pub fn previous(&self) -> Option<Self> {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ();

    /// Parses `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s.split_once('-').ok_or(())?;
        if year.len() != 4 || month.len() != 2 {
            return Err(());
        }
        let year = year.parse().map_err(|_| ())?;
        let month = month.parse().map_err(|_| ())?;
        Self::new(year, month).ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealEntry {
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub meal_count: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepositEntry {
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseEntry {
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Decimal,
}

/// Raw records of one house over some date range
#[derive(Debug, Clone, Default)]
pub struct HouseLedger {
    pub meals: Vec<MealEntry>,
    pub deposits: Vec<DepositEntry>,
    pub expenses: Vec<ExpenseEntry>,
}

impl HouseLedger {
    pub fn expenses_in(&self, period: Period) -> impl Iterator<Item = &ExpenseEntry> {
        self.expenses.iter().filter(move |e| period.contains(e.date))
    }

    pub fn deposits_in(&self, period: Period) -> impl Iterator<Item = &DepositEntry> {
        self.deposits.iter().filter(move |d| period.contains(d.date))
    }
}

/// Figures too large for `Decimal` to hold
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SettlementError {
    #[error("Settlement figures overflowed")]
    Overflow,
}

/// Decimal places a stored meal count or amount may carry
pub const RECORD_SCALE: u32 = 2;

/// Upper bound for a single deposit or expense
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Upper bound for one member's meals on one day
pub const MAX_MEAL_COUNT: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// True when `value` needs no more than [`RECORD_SCALE`] decimal places
pub fn fits_record_scale(value: Decimal) -> bool {
    value.normalize().scale() <= RECORD_SCALE
}

pub(crate) fn checked_total(values: impl IntoIterator<Item = Decimal>) -> Result<Decimal, SettlementError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value).ok_or(SettlementError::Overflow))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HouseTotals {
    pub total_meals: Decimal,
    pub total_expenses: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberSettlement {
    pub meals: Decimal,
    pub deposits: Decimal,
    pub cost: Decimal,
    pub balance: Decimal,
}

impl MemberSettlement {
    fn accumulate(&mut self, other: &MemberSettlement) -> Result<(), SettlementError> {
        self.meals = checked_total([self.meals, other.meals])?;
        self.deposits = checked_total([self.deposits, other.deposits])?;
        self.cost = checked_total([self.cost, other.cost])?;
        self.balance = checked_total([self.balance, other.balance])?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlySettlement {
    pub key: MonthKey,
    pub house: HouseTotals,
    pub meal_rate: Decimal,
    pub settlement: MemberSettlement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearlySettlement {
    pub year: i32,
    /// January first, one row per month even when the month is empty
    pub months: Vec<MonthlySettlement>,
    pub totals: MemberSettlement,
}

pub fn compute_house_totals(ledger: &HouseLedger, period: Period) -> Result<HouseTotals, SettlementError> {
    let total_meals = checked_total(
        ledger
            .meals
            .iter()
            .filter(|m| period.contains(m.date))
            .map(|m| m.meal_count),
    )?;
    let total_expenses = checked_total(ledger.expenses_in(period).map(|e| e.amount))?;

    Ok(HouseTotals {
        total_meals,
        total_expenses,
    })
}

pub fn compute_meal_rate(total_expenses: Decimal, total_meals: Decimal) -> Result<Decimal, SettlementError> {
    if total_meals > Decimal::ZERO {
        total_expenses.checked_div(total_meals).ok_or(SettlementError::Overflow)
    } else {
        Ok(Decimal::ZERO)
    }
}

/// Meals eaten and money deposited by one member within the period
pub fn compute_member_totals(
    ledger: &HouseLedger,
    member_id: &Uuid,
    period: Period,
) -> Result<(Decimal, Decimal), SettlementError> {
    let meals = checked_total(
        ledger
            .meals
            .iter()
            .filter(|m| m.member_id == *member_id && period.contains(m.date))
            .map(|m| m.meal_count),
    )?;
    let deposits = checked_total(
        ledger
            .deposits_in(period)
            .filter(|d| d.member_id == *member_id)
            .map(|d| d.amount),
    )?;

    Ok((meals, deposits))
}

pub fn compute_member_settlement(
    member_meals: Decimal,
    member_deposits: Decimal,
    rate: Decimal,
) -> Result<MemberSettlement, SettlementError> {
    let cost = member_meals.checked_mul(rate).ok_or(SettlementError::Overflow)?;
    let balance = member_deposits.checked_sub(cost).ok_or(SettlementError::Overflow)?;
    Ok(MemberSettlement {
        meals: member_meals,
        deposits: member_deposits,
        cost,
        balance,
    })
}

pub fn compute_monthly_settlement(
    ledger: &HouseLedger,
    member_id: &Uuid,
    key: MonthKey,
) -> Result<MonthlySettlement, SettlementError> {
    let house = compute_house_totals(ledger, key.period())?;
    let meal_rate = compute_meal_rate(house.total_expenses, house.total_meals)?;
    let (meals, deposits) = compute_member_totals(ledger, member_id, key.period())?;

    Ok(MonthlySettlement {
        key,
        house,
        meal_rate,
        settlement: compute_member_settlement(meals, deposits, meal_rate)?,
    })
}

/// Runs the monthly computation for January through December and sums it.
///
/// Each month keeps its own meal rate; the yearly figures are the sum of
/// the monthly ones, not a single rate applied to the whole year.
pub fn compute_yearly_settlement(
    ledger: &HouseLedger,
    member_id: &Uuid,
    year: i32,
) -> Result<YearlySettlement, SettlementError> {
    let months = (1..=12)
        .filter_map(|month| MonthKey::new(year, month))
        .map(|key| compute_monthly_settlement(ledger, member_id, key))
        .collect::<Result<Vec<_>, _>>()?;

    let mut totals = MemberSettlement::default();
    for month in &months {
        totals.accumulate(&month.settlement)?;
    }

    Ok(YearlySettlement { year, months, totals })
}

/// Display precision for money, rates and meal counts (half away from zero,
/// trailing zeros dropped)
pub fn round_money(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}
