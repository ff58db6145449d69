use chrono::{Datelike, NaiveDate, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{MemberRow, MembershipRow, MessGroupRow};
use shared::{
    AttachMemberRequest, CreateMessGroupRequest, MemberWithMembership, Membership, MessGroup,
    MessGroupWithMembers, UpdateMembershipRequest, UpdateMessGroupRequest,
};

#[derive(Debug, Error)]
pub enum MessGroupError {
    #[error("Mess group not found")]
    NotFound,
    #[error("Member not found")]
    MemberNotFound,
    #[error("Member is already in this mess group")]
    AlreadyAttached,
    #[error("Member is not in this mess group")]
    NotAttached,
    #[error("Mess group name cannot be empty")]
    EmptyName,
    #[error("Mess group name is too long")]
    NameTooLong,
    #[error("End date cannot be before start date")]
    InvalidDateRange,
    #[error("Fixed cost must be a non-negative amount")]
    InvalidFixedCost,
    #[error("Deposits and shopping must be non-negative amounts")]
    InvalidPivotAmount,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub async fn create_mess_group(
    pool: &SqlitePool,
    request: &CreateMessGroupRequest,
) -> Result<MessGroup, MessGroupError> {
    validate_name(&request.name)?;
    if !is_valid_amount(request.fixed_cost) {
        return Err(MessGroupError::InvalidFixedCost);
    }

    // A missing end date defaults to the last day of the start month
    let end_date = request
        .end_date
        .unwrap_or_else(|| end_of_month(request.start_date));
    if end_date < request.start_date {
        return Err(MessGroupError::InvalidDateRange);
    }
    let total_days = derive_total_days(request.start_date, Some(end_date));

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO mess_groups (id, name, start_date, end_date, fixed_cost, total_days, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&request.name)
    .bind(request.start_date)
    .bind(end_date)
    .bind(request.fixed_cost)
    .bind(total_days)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(MessGroup {
        id,
        name: request.name.clone(),
        start_date: request.start_date,
        end_date: Some(end_date),
        fixed_cost: request.fixed_cost,
        total_days,
        created_at: now,
        updated_at: now,
    })
}

pub async fn list_mess_groups(pool: &SqlitePool) -> Result<Vec<MessGroup>, MessGroupError> {
    let groups: Vec<MessGroupRow> =
        sqlx::query_as("SELECT * FROM mess_groups ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;

    Ok(groups.into_iter().map(|g| g.to_shared()).collect())
}

pub async fn update_mess_group(
    pool: &SqlitePool,
    group_id: &Uuid,
    request: &UpdateMessGroupRequest,
) -> Result<MessGroup, MessGroupError> {
    let mut group: MessGroupRow = sqlx::query_as("SELECT * FROM mess_groups WHERE id = ?")
        .bind(group_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(MessGroupError::NotFound)?;

    if let Some(ref name) = request.name {
        validate_name(name)?;
        group.name = name.clone();
    }
    if let Some(start_date) = request.start_date {
        group.start_date = start_date;
    }
    if let Some(end_date) = request.end_date {
        group.end_date = Some(end_date);
    }
    if let Some(fixed_cost) = request.fixed_cost {
        if !is_valid_amount(fixed_cost) {
            return Err(MessGroupError::InvalidFixedCost);
        }
        group.fixed_cost = fixed_cost;
    }

    if let Some(end_date) = group.end_date {
        if end_date < group.start_date {
            return Err(MessGroupError::InvalidDateRange);
        }
    }
    group.total_days = derive_total_days(group.start_date, group.end_date);

    let now = Utc::now();
    group.updated_at = now;

    sqlx::query(
        r#"
        UPDATE mess_groups
        SET name = ?, start_date = ?, end_date = ?, fixed_cost = ?, total_days = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&group.name)
    .bind(group.start_date)
    .bind(group.end_date)
    .bind(group.fixed_cost)
    .bind(group.total_days)
    .bind(now)
    .bind(group_id.to_string())
    .execute(pool)
    .await?;

    Ok(group.to_shared())
}

pub async fn delete_mess_group(pool: &SqlitePool, group_id: &Uuid) -> Result<(), MessGroupError> {
    ensure_group_exists(pool, group_id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM expenses WHERE mess_group_id = ?")
        .bind(group_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM mess_group_memberships WHERE mess_group_id = ?")
        .bind(group_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM mess_groups WHERE id = ?")
        .bind(group_id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

pub async fn get_group_with_members(
    pool: &SqlitePool,
    group_id: &Uuid,
) -> Result<MessGroupWithMembers, MessGroupError> {
    let group: MessGroupRow = sqlx::query_as("SELECT * FROM mess_groups WHERE id = ?")
        .bind(group_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(MessGroupError::NotFound)?;

    let members = members_of(pool, group_id).await?;

    Ok(MessGroupWithMembers {
        group: group.to_shared(),
        members,
    })
}

pub async fn list_members(
    pool: &SqlitePool,
    group_id: &Uuid,
) -> Result<Vec<MemberWithMembership>, MessGroupError> {
    ensure_group_exists(pool, group_id).await?;

    members_of(pool, group_id).await
}

pub async fn attach_member(
    pool: &SqlitePool,
    group_id: &Uuid,
    request: &AttachMemberRequest,
) -> Result<Membership, MessGroupError> {
    ensure_group_exists(pool, group_id).await?;

    let member_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE id = ?")
        .bind(request.member_id.to_string())
        .fetch_one(pool)
        .await?;
    if member_exists == 0 {
        return Err(MessGroupError::MemberNotFound);
    }

    let attached = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM mess_group_memberships WHERE mess_group_id = ? AND member_id = ?",
    )
    .bind(group_id.to_string())
    .bind(request.member_id.to_string())
    .fetch_one(pool)
    .await?;
    if attached > 0 {
        return Err(MessGroupError::AlreadyAttached);
    }

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO mess_group_memberships (id, mess_group_id, member_id, shopping, deposits, balance, joined_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(group_id.to_string())
    .bind(request.member_id.to_string())
    .bind(0.0_f64)
    .bind(0.0_f64)
    .bind(0.0_f64)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Membership {
        id,
        mess_group_id: *group_id,
        member_id: request.member_id,
        shopping: 0.0,
        deposits: 0.0,
        balance: 0.0,
        joined_at: now,
    })
}

pub async fn update_membership(
    pool: &SqlitePool,
    group_id: &Uuid,
    member_id: &Uuid,
    request: &UpdateMembershipRequest,
) -> Result<Membership, MessGroupError> {
    ensure_group_exists(pool, group_id).await?;

    let mut membership: MembershipRow = sqlx::query_as(
        "SELECT * FROM mess_group_memberships WHERE mess_group_id = ? AND member_id = ?",
    )
    .bind(group_id.to_string())
    .bind(member_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or(MessGroupError::NotAttached)?;

    if let Some(shopping) = request.shopping {
        if !is_valid_amount(shopping) {
            return Err(MessGroupError::InvalidPivotAmount);
        }
        membership.shopping = shopping;
    }
    if let Some(deposits) = request.deposits {
        if !is_valid_amount(deposits) {
            return Err(MessGroupError::InvalidPivotAmount);
        }
        membership.deposits = deposits;
    }

    sqlx::query("UPDATE mess_group_memberships SET shopping = ?, deposits = ? WHERE id = ?")
        .bind(membership.shopping)
        .bind(membership.deposits)
        .bind(&membership.id)
        .execute(pool)
        .await?;

    Ok(membership.to_shared())
}

pub async fn detach_member(
    pool: &SqlitePool,
    group_id: &Uuid,
    member_id: &Uuid,
) -> Result<(), MessGroupError> {
    ensure_group_exists(pool, group_id).await?;

    let result =
        sqlx::query("DELETE FROM mess_group_memberships WHERE mess_group_id = ? AND member_id = ?")
            .bind(group_id.to_string())
            .bind(member_id.to_string())
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(MessGroupError::NotAttached);
    }

    Ok(())
}

async fn ensure_group_exists(pool: &SqlitePool, group_id: &Uuid) -> Result<(), MessGroupError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mess_groups WHERE id = ?")
        .bind(group_id.to_string())
        .fetch_one(pool)
        .await?;

    if count == 0 {
        return Err(MessGroupError::NotFound);
    }

    Ok(())
}

async fn members_of(
    pool: &SqlitePool,
    group_id: &Uuid,
) -> Result<Vec<MemberWithMembership>, MessGroupError> {
    let memberships: Vec<MembershipRow> = sqlx::query_as(
        "SELECT * FROM mess_group_memberships WHERE mess_group_id = ? ORDER BY joined_at ASC",
    )
    .bind(group_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut result = Vec::new();
    for m in memberships {
        let member: MemberRow = sqlx::query_as("SELECT * FROM members WHERE id = ?")
            .bind(&m.member_id)
            .fetch_one(pool)
            .await?;

        result.push(MemberWithMembership {
            member: member.to_shared(),
            membership: m.to_shared(),
        });
    }

    Ok(result)
}

fn validate_name(name: &str) -> Result<(), MessGroupError> {
    if name.trim().is_empty() {
        return Err(MessGroupError::EmptyName);
    }
    if name.len() > 255 {
        return Err(MessGroupError::NameTooLong);
    }

    Ok(())
}

fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

/// Last calendar day of the month `date` falls in
fn end_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = match date.month() {
        12 => (date.year() + 1, 1),
        month => (date.year(), month + 1),
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(date)
}

/// Inclusive day count of the group's date range
fn derive_total_days(start: NaiveDate, end: Option<NaiveDate>) -> Option<i64> {
    end.map(|end| (end - start).num_days() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn seed_member(pool: &SqlitePool, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query("INSERT INTO members (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .unwrap();

        id
    }

    fn february_group() -> CreateMessGroupRequest {
        CreateMessGroupRequest {
            name: "February Mess".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            end_date: Some(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()),
            fixed_cost: 70.0,
        }
    }

    #[test]
    fn test_end_of_month() {
        let mid_feb = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        assert_eq!(
            end_of_month(mid_feb),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );

        let december = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(
            end_of_month(december),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_derive_total_days() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();

        assert_eq!(derive_total_days(start, Some(end)), Some(20));
        assert_eq!(derive_total_days(start, Some(start)), Some(1));
        assert_eq!(derive_total_days(start, None), None);
    }

    #[tokio::test]
    async fn test_create_defaults_end_date_to_end_of_month() {
        let pool = setup_test_db().await;

        let group = create_mess_group(
            &pool,
            &CreateMessGroupRequest {
                name: "Open Ended".to_string(),
                start_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
                end_date: None,
                fixed_cost: 50.0,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            group.end_date,
            Some(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap())
        );
        assert_eq!(group.total_days, Some(19));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let pool = setup_test_db().await;

        let mut empty_name = february_group();
        empty_name.name = "  ".to_string();
        assert!(matches!(
            create_mess_group(&pool, &empty_name).await,
            Err(MessGroupError::EmptyName)
        ));

        let mut negative_cost = february_group();
        negative_cost.fixed_cost = -1.0;
        assert!(matches!(
            create_mess_group(&pool, &negative_cost).await,
            Err(MessGroupError::InvalidFixedCost)
        ));

        let mut backwards = february_group();
        backwards.end_date = Some(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert!(matches!(
            create_mess_group(&pool, &backwards).await,
            Err(MessGroupError::InvalidDateRange)
        ));
    }

    #[tokio::test]
    async fn test_update_rederives_total_days() {
        let pool = setup_test_db().await;
        let group = create_mess_group(&pool, &february_group()).await.unwrap();
        assert_eq!(group.total_days, Some(28));

        let updated = update_mess_group(
            &pool,
            &group.id,
            &UpdateMessGroupRequest {
                end_date: Some(NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.total_days, Some(14));
        assert_eq!(updated.name, "February Mess");
    }

    #[tokio::test]
    async fn test_update_unknown_group() {
        let pool = setup_test_db().await;

        let result = update_mess_group(
            &pool,
            &Uuid::new_v4(),
            &UpdateMessGroupRequest {
                name: Some("Ghost".to_string()),
                ..Default::default()
            },
        )
        .await;

        assert!(matches!(result, Err(MessGroupError::NotFound)));
    }

    #[tokio::test]
    async fn test_attach_and_duplicate_attach() {
        let pool = setup_test_db().await;
        let group = create_mess_group(&pool, &february_group()).await.unwrap();
        let member_id = seed_member(&pool, "Iqbal").await;

        let membership = attach_member(
            &pool,
            &group.id,
            &AttachMemberRequest { member_id },
        )
        .await
        .unwrap();

        assert_eq!(membership.shopping, 0.0);
        assert_eq!(membership.deposits, 0.0);
        assert_eq!(membership.balance, 0.0);

        let duplicate = attach_member(&pool, &group.id, &AttachMemberRequest { member_id }).await;
        assert!(matches!(duplicate, Err(MessGroupError::AlreadyAttached)));
    }

    #[tokio::test]
    async fn test_attach_unknown_member() {
        let pool = setup_test_db().await;
        let group = create_mess_group(&pool, &february_group()).await.unwrap();

        let result = attach_member(
            &pool,
            &group.id,
            &AttachMemberRequest {
                member_id: Uuid::new_v4(),
            },
        )
        .await;

        assert!(matches!(result, Err(MessGroupError::MemberNotFound)));
    }

    #[tokio::test]
    async fn test_update_membership_persists_pivot() {
        let pool = setup_test_db().await;
        let group = create_mess_group(&pool, &february_group()).await.unwrap();
        let member_id = seed_member(&pool, "Siraj").await;
        attach_member(&pool, &group.id, &AttachMemberRequest { member_id })
            .await
            .unwrap();

        let updated = update_membership(
            &pool,
            &group.id,
            &member_id,
            &UpdateMembershipRequest {
                shopping: Some(12.5),
                deposits: Some(200.0),
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.shopping, 12.5);
        assert_eq!(updated.deposits, 200.0);

        let members = list_members(&pool, &group.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].membership.deposits, 200.0);

        let negative = update_membership(
            &pool,
            &group.id,
            &member_id,
            &UpdateMembershipRequest {
                shopping: None,
                deposits: Some(-5.0),
            },
        )
        .await;
        assert!(matches!(negative, Err(MessGroupError::InvalidPivotAmount)));
    }

    #[tokio::test]
    async fn test_detach_member() {
        let pool = setup_test_db().await;
        let group = create_mess_group(&pool, &february_group()).await.unwrap();
        let member_id = seed_member(&pool, "Jafar").await;
        attach_member(&pool, &group.id, &AttachMemberRequest { member_id })
            .await
            .unwrap();

        detach_member(&pool, &group.id, &member_id).await.unwrap();
        assert!(list_members(&pool, &group.id).await.unwrap().is_empty());

        let again = detach_member(&pool, &group.id, &member_id).await;
        assert!(matches!(again, Err(MessGroupError::NotAttached)));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let pool = setup_test_db().await;
        let group = create_mess_group(&pool, &february_group()).await.unwrap();
        let member_id = seed_member(&pool, "Kamrul Hasan").await;
        attach_member(&pool, &group.id, &AttachMemberRequest { member_id })
            .await
            .unwrap();

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO expenses (id, mess_group_id, member_id, date, description, amount, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(group.id.to_string())
        .bind(member_id.to_string())
        .bind(NaiveDate::from_ymd_opt(2025, 2, 3).unwrap())
        .bind("Groceries")
        .bind(42.0)
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

        delete_mess_group(&pool, &group.id).await.unwrap();

        let groups = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mess_groups")
            .fetch_one(&pool)
            .await
            .unwrap();
        let memberships = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mess_group_memberships")
            .fetch_one(&pool)
            .await
            .unwrap();
        let expenses = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expenses")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(groups, 0);
        assert_eq!(memberships, 0);
        assert_eq!(expenses, 0);
    }

    #[tokio::test]
    async fn test_get_group_with_members() {
        let pool = setup_test_db().await;
        let group = create_mess_group(&pool, &february_group()).await.unwrap();
        let member_id = seed_member(&pool, "Rahim").await;
        attach_member(&pool, &group.id, &AttachMemberRequest { member_id })
            .await
            .unwrap();

        let with_members = get_group_with_members(&pool, &group.id).await.unwrap();

        assert_eq!(with_members.group.id, group.id);
        assert_eq!(with_members.members.len(), 1);
        assert_eq!(with_members.members[0].member.name, "Rahim");

        let missing = get_group_with_members(&pool, &Uuid::new_v4()).await;
        assert!(matches!(missing, Err(MessGroupError::NotFound)));
    }
}
