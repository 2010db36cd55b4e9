use std::collections::BTreeMap;

use rust_decimal::Decimal;
use shared::{CategoryShare, ExpenseCategory};

use crate::services::settlement::{checked_total, round_money, ExpenseEntry, SettlementError};

/// Expense totals per category with each category's share of the whole.
///
/// Sorted by total, largest first; equal totals sort by category name. All
/// percents are zero when nothing was spent.
pub fn category_breakdown<'a>(
    expenses: impl IntoIterator<Item = &'a ExpenseEntry>,
) -> Result<Vec<CategoryShare>, SettlementError> {
    let mut totals: BTreeMap<ExpenseCategory, Decimal> = BTreeMap::new();
    for expense in expenses {
        let total = totals.entry(expense.category).or_default();
        *total = checked_total([*total, expense.amount])?;
    }

    let grand_total = checked_total(totals.values().copied())?;

    let mut shares = totals
        .into_iter()
        .map(|(category, total)| -> Result<CategoryShare, SettlementError> {
            Ok(CategoryShare {
                category,
                total: round_money(total),
                percent: percent_of(total, grand_total)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    shares.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
    });
    Ok(shares)
}

/// A member's share of all meals eaten in the house, in percent
pub fn meal_share_percent(member_meals: Decimal, house_meals: Decimal) -> Result<Decimal, SettlementError> {
    percent_of(member_meals, house_meals)
}

fn percent_of(part: Decimal, whole: Decimal) -> Result<Decimal, SettlementError> {
    if whole > Decimal::ZERO {
        let percent = part
            .checked_div(whole)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or(SettlementError::Overflow)?;
        Ok(round_money(percent))
    } else {
        Ok(Decimal::ZERO)
    }
}
