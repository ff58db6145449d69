use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for mess group memberships (member-in-group pivot)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MembershipRow {
    pub id: String,
    pub mess_group_id: String,
    pub member_id: String,
    pub shopping: f64,
    pub deposits: f64,
    pub balance: f64,
    pub joined_at: DateTime<Utc>,
}

impl MembershipRow {
    pub fn to_shared(&self) -> shared::Membership {
        shared::Membership {
            id: Uuid::parse_str(&self.id).unwrap(),
            mess_group_id: Uuid::parse_str(&self.mess_group_id).unwrap(),
            member_id: Uuid::parse_str(&self.member_id).unwrap(),
            shopping: self.shopping,
            deposits: self.deposits,
            balance: self.balance,
            joined_at: self.joined_at,
        }
    }
}
