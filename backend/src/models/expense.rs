use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for expenses
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExpenseRow {
    pub id: String,
    pub mess_group_id: String,
    pub member_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExpenseRow {
    pub fn to_shared(&self) -> shared::Expense {
        shared::Expense {
            id: Uuid::parse_str(&self.id).unwrap(),
            mess_group_id: Uuid::parse_str(&self.mess_group_id).unwrap(),
            member_id: Uuid::parse_str(&self.member_id).unwrap(),
            date: self.date,
            description: self.description.clone(),
            amount: self.amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
