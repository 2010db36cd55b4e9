use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for house members
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemberRow {
    pub id: String,
    pub house_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub join_date: NaiveDate,
    pub status: String,
    pub join_token_hash: Option<String>,
    pub join_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemberRow {
    pub fn to_shared(&self, has_account: bool) -> shared::Member {
        shared::Member {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            house_id: Uuid::parse_str(&self.house_id).unwrap_or_default(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            join_date: self.join_date,
            status: self.status.parse().unwrap_or(shared::MemberStatus::Active),
            has_account,
            join_token_expires_at: self.join_token_expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == shared::MemberStatus::Active.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MemberStatus;

    fn row(status: &str) -> MemberRow {
        let now = Utc::now();
        MemberRow {
            id: Uuid::new_v4().to_string(),
            house_id: Uuid::new_v4().to_string(),
            name: "Karim".to_string(),
            phone: Some("01700000000".to_string()),
            email: None,
            join_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status: status.to_string(),
            join_token_hash: None,
            join_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_member_row_to_shared() {
        let row = row("inactive");
        let shared = row.to_shared(true);

        assert_eq!(shared.id.to_string(), row.id);
        assert_eq!(shared.name, "Karim");
        assert_eq!(shared.status, MemberStatus::Inactive);
        assert!(shared.has_account);
        assert!(!row.is_active());
    }

    #[test]
    fn test_member_row_invalid_status_defaults_to_active() {
        let row = row("unknown");
        assert_eq!(row.to_shared(false).status, MemberStatus::Active);
    }
}
