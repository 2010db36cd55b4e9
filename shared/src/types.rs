use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// User Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }

    pub fn can_manage_house(&self) -> bool {
        matches!(self, Role::Manager)
    }

    pub fn can_view_all_members(&self) -> bool {
        matches!(self, Role::Manager)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manager" => Ok(Role::Manager),
            "member" => Ok(Role::Member),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub house_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creates a house together with its manager account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterManagerRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub house_name: String,
    pub security_question: String,
    pub security_answer: String,
}

/// Claims a pre-created member record with a join token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub token: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub security_question: String,
    pub security_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityQuestionRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityQuestionResponse {
    pub username: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub username: String,
    pub security_answer: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ============================================================================
// House Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct House {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateHouseRequest {
    pub name: Option<String>,
}

// ============================================================================
// Member Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Inactive,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for MemberStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(MemberStatus::Active),
            "inactive" => Ok(MemberStatus::Inactive),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub house_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub join_date: NaiveDate,
    pub status: MemberStatus,
    pub has_account: bool,
    pub join_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub join_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<MemberStatus>,
}

/// The raw token is only ever returned here; the database keeps a hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinTokenResponse {
    pub member_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Ledger Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub house_id: Uuid,
    pub date: NaiveDate,
    pub meal_count: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMealRequest {
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub meal_count: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMealEntry {
    pub member_id: Uuid,
    pub meal_count: Decimal,
}

/// A whole day's meal sheet for the house
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMealsRequest {
    pub date: NaiveDate,
    pub entries: Vec<DailyMealEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub id: Uuid,
    pub member_id: Uuid,
    pub house_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepositRequest {
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Rice,
    Fish,
    Meat,
    Vegetables,
    Spices,
    Oil,
    Others,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 7] = [
        ExpenseCategory::Rice,
        ExpenseCategory::Fish,
        ExpenseCategory::Meat,
        ExpenseCategory::Vegetables,
        ExpenseCategory::Spices,
        ExpenseCategory::Oil,
        ExpenseCategory::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Rice => "Rice",
            ExpenseCategory::Fish => "Fish",
            ExpenseCategory::Meat => "Meat",
            ExpenseCategory::Vegetables => "Vegetables",
            ExpenseCategory::Spices => "Spices",
            ExpenseCategory::Oil => "Oil",
            ExpenseCategory::Others => "Others",
        }
    }
}

impl FromStr for ExpenseCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rice" => Ok(ExpenseCategory::Rice),
            "fish" => Ok(ExpenseCategory::Fish),
            "meat" => Ok(ExpenseCategory::Meat),
            "vegetables" => Ok(ExpenseCategory::Vegetables),
            "spices" => Ok(ExpenseCategory::Spices),
            "oil" => Ok(ExpenseCategory::Oil),
            "others" | "other" => Ok(ExpenseCategory::Others),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub house_id: Uuid,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpenseRequest {
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub description: Option<String>,
}

// ============================================================================
// Report Types
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportView {
    #[default]
    Monthly,
    Yearly,
}

/// Query string shared by dashboards, reports and ledger listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodQuery {
    pub view: Option<ReportView>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub member_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseTotalsSummary {
    pub total_meals: Decimal,
    pub total_expenses: Decimal,
    pub meal_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub meals: Decimal,
    pub deposits: Decimal,
    pub cost: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: ExpenseCategory,
    pub total: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub house_id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub year: i32,
    pub month: u32,
    pub house: HouseTotalsSummary,
    pub settlement: SettlementSummary,
    pub previous_balance: Decimal,
    pub adjusted_balance: Decimal,
    pub meal_share_percent: Decimal,
    pub categories: Vec<CategoryShare>,
    pub meals: Vec<MealRecord>,
    pub deposits: Vec<Deposit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySettlementRow {
    pub month: u32,
    pub meal_rate: Decimal,
    pub meals: Decimal,
    pub deposits: Decimal,
    pub cost: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyReport {
    pub house_id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub year: i32,
    pub months: Vec<MonthlySettlementRow>,
    pub totals: SettlementSummary,
    pub house_meals: Decimal,
    pub house_expenses: Decimal,
    pub previous_balance: Decimal,
    pub adjusted_balance: Decimal,
    pub meal_share_percent: Decimal,
    pub categories: Vec<CategoryShare>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum MemberReport {
    Monthly(MonthlyReport),
    Yearly(YearlyReport),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberBalanceRow {
    pub member_id: Uuid,
    pub name: String,
    pub status: MemberStatus,
    pub meals: Decimal,
    pub deposits: Decimal,
    pub cost: Decimal,
    pub balance: Decimal,
    pub previous_balance: Decimal,
    pub adjusted_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerDashboard {
    pub house: House,
    pub year: i32,
    pub month: u32,
    pub totals: HouseTotalsSummary,
    pub total_deposits: Decimal,
    pub cash_in_hand: Decimal,
    pub active_members: i64,
    pub categories: Vec<CategoryShare>,
    pub members: Vec<MemberBalanceRow>,
}

// ============================================================================
// Monthly Summary Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseMonthRequest {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyMemberDetail {
    pub member_id: Uuid,
    pub member_name: String,
    pub total_meals: Decimal,
    pub total_deposits: Decimal,
    pub total_cost: Decimal,
    pub previous_balance: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub id: Uuid,
    pub house_id: Uuid,
    pub month_year: String,
    pub total_meals: Decimal,
    pub total_expenses: Decimal,
    pub meal_rate: Decimal,
    pub closed_by: Uuid,
    pub closed_at: DateTime<Utc>,
    pub members: Vec<MonthlyMemberDetail>,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Tests
// ============================================================================
