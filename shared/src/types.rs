use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// User & Auth Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued on register, login and refresh. The refresh token is opaque and
/// single-use; exchanging it invalidates the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

// ============================================================================
// Mess Group Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessGroup {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Flat charge applied per member on settlement, independent of the
    /// logged expenses.
    pub fixed_cost: f64,
    /// Inclusive day count of the date range. Informational only; the fixed
    /// cost is never scaled by it.
    pub total_days: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessGroupRequest {
    pub name: String,
    pub start_date: NaiveDate,
    /// Defaults to the last day of the start date's month when omitted.
    pub end_date: Option<NaiveDate>,
    pub fixed_cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMessGroupRequest {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub fixed_cost: Option<f64>,
}

// ============================================================================
// Member Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
}

// ============================================================================
// Membership Types
// ============================================================================

/// Per-group settlement state of a member. `balance` is owned by the balance
/// calculator and overwritten on every recalculation; `shopping` and
/// `deposits` are maintained through the membership endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub mess_group_id: Uuid,
    pub member_id: Uuid,
    pub shopping: f64,
    pub deposits: f64,
    pub balance: f64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberWithMembership {
    pub member: Member,
    pub membership: Membership,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessGroupWithMembers {
    pub group: MessGroup,
    pub members: Vec<MemberWithMembership>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachMemberRequest {
    pub member_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMembershipRequest {
    pub shopping: Option<f64>,
    pub deposits: Option<f64>,
}

// ============================================================================
// Expense Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub mess_group_id: Uuid,
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpenseRequest {
    pub mess_group_id: Uuid,
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExpenseRequest {
    pub mess_group_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseWithRelations {
    pub expense: Expense,
    pub mess_group: MessGroup,
    pub member: Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseImportSummary {
    pub imported: usize,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
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
