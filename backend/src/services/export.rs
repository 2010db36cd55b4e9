//! CSV rendering of member reports

use csv::Writer;
use rust_decimal::Decimal;
use thiserror::Error;

use shared::{MemberReport, MonthlyReport, YearlyReport};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Attachment name, e.g. `report-karim-2024-03.csv`
pub fn export_filename(report: &MemberReport) -> String {
    let (name, period) = match report {
        MemberReport::Monthly(r) => (&r.member_name, format!("{:04}-{:02}", r.year, r.month)),
        MemberReport::Yearly(r) => (&r.member_name, format!("{:04}", r.year)),
    };
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("report-{}-{}.csv", slug, period)
}

pub fn export_member_report(report: &MemberReport) -> Result<Vec<u8>, ExportError> {
    let mut wtr = Writer::from_writer(Vec::new());
    match report {
        MemberReport::Monthly(r) => write_monthly(&mut wtr, r)?,
        MemberReport::Yearly(r) => write_yearly(&mut wtr, r)?,
    }
    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

fn write_monthly(wtr: &mut Writer<Vec<u8>>, report: &MonthlyReport) -> Result<(), ExportError> {
    wtr.write_record(["Item", "Value"])?;
    row(wtr, "Member", report.member_name.clone())?;
    row(wtr, "Month", format!("{:04}-{:02}", report.year, report.month))?;
    row(wtr, "House meals", report.house.total_meals.to_string())?;
    row(wtr, "House expenses", report.house.total_expenses.to_string())?;
    row(wtr, "Meal rate", report.house.meal_rate.to_string())?;
    row(wtr, "Meals", report.settlement.meals.to_string())?;
    row(wtr, "Deposits", report.settlement.deposits.to_string())?;
    row(wtr, "Cost", report.settlement.cost.to_string())?;
    row(wtr, "Balance", report.settlement.balance.to_string())?;
    row(wtr, "Previous balance", report.previous_balance.to_string())?;
    row(wtr, "Adjusted balance", report.adjusted_balance.to_string())?;
    row(wtr, "Meal share %", report.meal_share_percent.to_string())?;

    for share in &report.categories {
        row(
            wtr,
            &format!("Expense: {}", share.category.as_str()),
            format!("{} ({}%)", share.total, share.percent),
        )?;
    }
    for meal in &report.meals {
        row(wtr, &format!("Meal {}", meal.date), meal.meal_count.to_string())?;
    }
    for deposit in &report.deposits {
        row(wtr, &format!("Deposit {}", deposit.date), deposit.amount.to_string())?;
    }

    Ok(())
}

fn row(wtr: &mut Writer<Vec<u8>>, item: &str, value: String) -> csv::Result<()> {
    wtr.write_record([item, value.as_str()])
}

fn write_yearly(wtr: &mut Writer<Vec<u8>>, report: &YearlyReport) -> Result<(), ExportError> {
    wtr.write_record(["Month", "Meal rate", "Meals", "Deposits", "Cost", "Balance"])?;

    for month in &report.months {
        wtr.write_record([
            format!("{:04}-{:02}", report.year, month.month),
            month.meal_rate.to_string(),
            month.meals.to_string(),
            month.deposits.to_string(),
            month.cost.to_string(),
            month.balance.to_string(),
        ])?;
    }

    let totals = &report.totals;
    wtr.write_record([
        "Total".to_string(),
        String::new(),
        totals.meals.to_string(),
        totals.deposits.to_string(),
        totals.cost.to_string(),
        totals.balance.to_string(),
    ])?;
    write_balance_line(wtr, "Previous balance", report.previous_balance)?;
    write_balance_line(wtr, "Adjusted balance", report.adjusted_balance)?;

    Ok(())
}

fn write_balance_line(wtr: &mut Writer<Vec<u8>>, label: &str, value: Decimal) -> Result<(), ExportError> {
    wtr.write_record([label, "", "", "", "", value.to_string().as_str()])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::{
        CategoryShare, Deposit, ExpenseCategory, HouseTotalsSummary, MonthlySettlementRow, SettlementSummary,
    };
    use uuid::Uuid;

    fn summary(meals: i64, deposits: i64, cost: i64) -> SettlementSummary {
        SettlementSummary {
            meals: Decimal::new(meals, 0),
            deposits: Decimal::new(deposits, 0),
            cost: Decimal::new(cost, 0),
            balance: Decimal::new(deposits - cost, 0),
        }
    }

    fn monthly() -> MonthlyReport {
        MonthlyReport {
            house_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            member_name: "Karim Uddin".to_string(),
            year: 2024,
            month: 3,
            house: HouseTotalsSummary {
                total_meals: Decimal::new(200, 0),
                total_expenses: Decimal::new(10000, 0),
                meal_rate: Decimal::new(50, 0),
            },
            settlement: summary(40, 2500, 2000),
            previous_balance: Decimal::new(-100, 0),
            adjusted_balance: Decimal::new(400, 0),
            meal_share_percent: Decimal::new(20, 0),
            categories: vec![CategoryShare {
                category: ExpenseCategory::Rice,
                total: Decimal::new(10000, 0),
                percent: Decimal::new(100, 0),
            }],
            meals: vec![],
            deposits: vec![Deposit {
                id: Uuid::new_v4(),
                member_id: Uuid::new_v4(),
                house_id: Uuid::new_v4(),
                date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                amount: Decimal::new(2500, 0),
                description: None,
                created_at: Utc::now(),
            }],
        }
    }

    #[test]
    fn test_export_monthly_report() {
        let bytes = export_member_report(&MemberReport::Monthly(monthly())).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("Item,Value\n"));
        assert!(text.contains("Meal rate,50\n"));
        assert!(text.contains("Adjusted balance,400\n"));
        assert!(text.contains("Expense: Rice,10000 (100%)\n"));
        assert!(text.contains("Deposit 2024-03-01,2500\n"));
    }

    #[test]
    fn test_export_yearly_report() {
        let months = (1..=12)
            .map(|month| MonthlySettlementRow {
                month,
                meal_rate: Decimal::ZERO,
                meals: Decimal::ZERO,
                deposits: Decimal::ZERO,
                cost: Decimal::ZERO,
                balance: Decimal::ZERO,
            })
            .collect();
        let report = YearlyReport {
            house_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            member_name: "Karim".to_string(),
            year: 2024,
            months,
            totals: summary(0, 0, 0),
            house_meals: Decimal::ZERO,
            house_expenses: Decimal::ZERO,
            previous_balance: Decimal::new(-50, 0),
            adjusted_balance: Decimal::new(-50, 0),
            meal_share_percent: Decimal::ZERO,
            categories: vec![],
        };

        let text = String::from_utf8(export_member_report(&MemberReport::Yearly(report)).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 16);
        assert_eq!(lines[1], "2024-01,0,0,0,0,0");
        assert_eq!(lines[13], "Total,,0,0,0,0");
        assert_eq!(lines[14], "Previous balance,,,,,-50");
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename(&MemberReport::Monthly(monthly())),
            "report-karim-uddin-2024-03.csv"
        );
    }
}
