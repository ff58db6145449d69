use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for mess groups
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessGroupRow {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub fixed_cost: f64,
    pub total_days: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessGroupRow {
    pub fn to_shared(&self) -> shared::MessGroup {
        shared::MessGroup {
            id: Uuid::parse_str(&self.id).unwrap(),
            name: self.name.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            fixed_cost: self.fixed_cost,
            total_days: self.total_days,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
