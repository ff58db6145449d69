use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{MemberRow, MembershipRow, MessGroupRow};
use shared::{MemberWithMembership, MessGroupWithMembers};

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("Mess group not found")]
    GroupNotFound,
    #[error("Mess group has no members")]
    EmptyGroup,
    #[error("Mess group covers zero days")]
    ZeroDays,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Recompute every member's settlement balance for a group.
///
/// Variable expenses are split evenly across the members and each member
/// additionally owes the group's fixed cost. What a member paid for the
/// group and deposited with it counts in their favor:
///
/// `balance = round2(paid + deposits - (total_variable / member_count + fixed_cost))`
///
/// Positive means the mess owes the member, negative means the member owes
/// the mess. Reads and writes happen in one transaction, so a failed run
/// leaves the stored balances untouched.
pub async fn recalculate_balances(
    pool: &SqlitePool,
    group_id: &Uuid,
) -> Result<MessGroupWithMembers, BalanceError> {
    let mut tx = pool.begin().await?;

    let group: MessGroupRow = sqlx::query_as("SELECT * FROM mess_groups WHERE id = ?")
        .bind(group_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BalanceError::GroupNotFound)?;

    if group.total_days == Some(0) {
        return Err(BalanceError::ZeroDays);
    }

    let mut memberships: Vec<MembershipRow> = sqlx::query_as(
        "SELECT * FROM mess_group_memberships WHERE mess_group_id = ? ORDER BY joined_at ASC",
    )
    .bind(group_id.to_string())
    .fetch_all(&mut *tx)
    .await?;

    if memberships.is_empty() {
        return Err(BalanceError::EmptyGroup);
    }

    let total_variable: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0.0) FROM expenses WHERE mess_group_id = ?",
    )
    .bind(group_id.to_string())
    .fetch_one(&mut *tx)
    .await?;

    let share = total_variable / memberships.len() as f64;
    let owed = share + group.fixed_cost;

    for membership in &mut memberships {
        let paid: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0.0) FROM expenses WHERE mess_group_id = ? AND member_id = ?",
        )
        .bind(group_id.to_string())
        .bind(&membership.member_id)
        .fetch_one(&mut *tx)
        .await?;

        membership.balance = round2(paid + membership.deposits - owed);

        sqlx::query("UPDATE mess_group_memberships SET balance = ? WHERE id = ?")
            .bind(membership.balance)
            .bind(&membership.id)
            .execute(&mut *tx)
            .await?;
    }

    let mut members = Vec::new();
    for membership in &memberships {
        let member: MemberRow = sqlx::query_as("SELECT * FROM members WHERE id = ?")
            .bind(&membership.member_id)
            .fetch_one(&mut *tx)
            .await?;

        members.push(MemberWithMembership {
            member: member.to_shared(),
            membership: membership.to_shared(),
        });
    }

    tx.commit().await?;

    Ok(MessGroupWithMembers {
        group: group.to_shared(),
        members,
    })
}

/// Half-up rounding to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn seed_group(pool: &SqlitePool, fixed_cost: f64) -> Uuid {
        seed_group_with_days(pool, fixed_cost, Some(28)).await
    }

    async fn seed_group_with_days(pool: &SqlitePool, fixed_cost: f64, total_days: Option<i64>) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO mess_groups (id, name, start_date, end_date, fixed_cost, total_days, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind("February Mess")
        .bind(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
        .bind(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap())
        .bind(fixed_cost)
        .bind(total_days)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();

        id
    }

    async fn seed_member_in_group(
        pool: &SqlitePool,
        group_id: &Uuid,
        name: &str,
        deposits: f64,
    ) -> Uuid {
        let member_id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query("INSERT INTO members (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(member_id.to_string())
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .unwrap();

        sqlx::query(
            r#"
            INSERT INTO mess_group_memberships (id, mess_group_id, member_id, shopping, deposits, balance, joined_at)
            VALUES (?, ?, ?, 0, ?, 0, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(group_id.to_string())
        .bind(member_id.to_string())
        .bind(deposits)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();

        member_id
    }

    async fn seed_expense(pool: &SqlitePool, group_id: &Uuid, member_id: &Uuid, amount: f64) {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO expenses (id, mess_group_id, member_id, date, description, amount, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(group_id.to_string())
        .bind(member_id.to_string())
        .bind(NaiveDate::from_ymd_opt(2025, 2, 10).unwrap())
        .bind("Bazar")
        .bind(amount)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
    }

    fn balance_of(result: &MessGroupWithMembers, member_id: &Uuid) -> f64 {
        result
            .members
            .iter()
            .find(|m| m.member.id == *member_id)
            .map(|m| m.membership.balance)
            .unwrap()
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(106.357142), 106.36);
        assert_eq!(round2(-135.892857), -135.89);
        assert_eq!(round2(53.107142), 53.11);
        assert_eq!(round2(10.0), 10.0);
        assert_eq!(round2(0.0), 0.0);
    }

    #[tokio::test]
    async fn test_seven_member_settlement() {
        let pool = setup_test_db().await;
        let group_id = seed_group(&pool, 70.0).await;

        let iqbal = seed_member_in_group(&pool, &group_id, "Iqbal", 0.0).await;
        let siraj = seed_member_in_group(&pool, &group_id, "Siraj", 0.0).await;
        let jafar = seed_member_in_group(&pool, &group_id, "Jafar", 0.0).await;
        let kamrul = seed_member_in_group(&pool, &group_id, "Kamrul Hasan", 0.0).await;
        let rahim = seed_member_in_group(&pool, &group_id, "Rahim", 0.0).await;
        let karim = seed_member_in_group(&pool, &group_id, "Karim", 0.0).await;
        let salam = seed_member_in_group(&pool, &group_id, "Salam", 0.0).await;

        seed_expense(&pool, &group_id, &iqbal, 242.25).await;
        seed_expense(&pool, &group_id, &siraj, 189.0).await;
        seed_expense(&pool, &group_id, &jafar, 6.5).await;
        seed_expense(&pool, &group_id, &kamrul, 23.5).await;

        let result = recalculate_balances(&pool, &group_id).await.unwrap();
        assert_eq!(result.members.len(), 7);

        // owed per head = 461.25 / 7 + 70.00 = 135.892857...
        assert_eq!(balance_of(&result, &iqbal), 106.36);
        assert_eq!(balance_of(&result, &siraj), 53.11);
        assert_eq!(balance_of(&result, &jafar), -129.39);
        assert_eq!(balance_of(&result, &kamrul), -112.39);
        assert_eq!(balance_of(&result, &rahim), -135.89);
        assert_eq!(balance_of(&result, &karim), -135.89);
        assert_eq!(balance_of(&result, &salam), -135.89);
    }

    #[tokio::test]
    async fn test_balances_are_persisted() {
        let pool = setup_test_db().await;
        let group_id = seed_group(&pool, 70.0).await;
        let iqbal = seed_member_in_group(&pool, &group_id, "Iqbal", 0.0).await;
        seed_expense(&pool, &group_id, &iqbal, 100.0).await;

        recalculate_balances(&pool, &group_id).await.unwrap();

        let stored: f64 = sqlx::query_scalar(
            "SELECT balance FROM mess_group_memberships WHERE mess_group_id = ? AND member_id = ?",
        )
        .bind(group_id.to_string())
        .bind(iqbal.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();

        // Single member covers everything: 100 - (100 / 1 + 70) = -70
        assert_eq!(stored, -70.0);
        assert_eq!(round2(stored), stored);
    }

    #[tokio::test]
    async fn test_deposits_count_toward_balance() {
        let pool = setup_test_db().await;
        let group_id = seed_group(&pool, 70.0).await;
        let member = seed_member_in_group(&pool, &group_id, "Saver", 200.0).await;

        let result = recalculate_balances(&pool, &group_id).await.unwrap();

        assert_eq!(balance_of(&result, &member), 130.0);
    }

    #[tokio::test]
    async fn test_unknown_group() {
        let pool = setup_test_db().await;

        let result = recalculate_balances(&pool, &Uuid::new_v4()).await;
        assert!(matches!(result, Err(BalanceError::GroupNotFound)));
    }

    #[tokio::test]
    async fn test_empty_group_writes_nothing() {
        let pool = setup_test_db().await;
        let group_id = seed_group(&pool, 70.0).await;

        let result = recalculate_balances(&pool, &group_id).await;
        assert!(matches!(result, Err(BalanceError::EmptyGroup)));
    }

    #[tokio::test]
    async fn test_zero_days_group_is_rejected() {
        let pool = setup_test_db().await;
        let group_id = seed_group_with_days(&pool, 70.0, Some(0)).await;
        seed_member_in_group(&pool, &group_id, "Iqbal", 0.0).await;

        let result = recalculate_balances(&pool, &group_id).await;
        assert!(matches!(result, Err(BalanceError::ZeroDays)));
    }

    #[tokio::test]
    async fn test_recalculation_is_idempotent() {
        let pool = setup_test_db().await;
        let group_id = seed_group(&pool, 70.0).await;
        let iqbal = seed_member_in_group(&pool, &group_id, "Iqbal", 50.0).await;
        let siraj = seed_member_in_group(&pool, &group_id, "Siraj", 0.0).await;
        seed_expense(&pool, &group_id, &iqbal, 120.0).await;

        let first = recalculate_balances(&pool, &group_id).await.unwrap();
        let second = recalculate_balances(&pool, &group_id).await.unwrap();

        assert_eq!(balance_of(&first, &iqbal), balance_of(&second, &iqbal));
        assert_eq!(balance_of(&first, &siraj), balance_of(&second, &siraj));
    }

    #[tokio::test]
    async fn test_detach_changes_denominator() {
        let pool = setup_test_db().await;
        let group_id = seed_group(&pool, 0.0).await;
        let payer = seed_member_in_group(&pool, &group_id, "Payer", 0.0).await;
        let freeloader = seed_member_in_group(&pool, &group_id, "Freeloader", 0.0).await;
        seed_expense(&pool, &group_id, &payer, 100.0).await;

        let before = recalculate_balances(&pool, &group_id).await.unwrap();
        assert_eq!(balance_of(&before, &payer), 50.0);
        assert_eq!(balance_of(&before, &freeloader), -50.0);

        sqlx::query("DELETE FROM mess_group_memberships WHERE member_id = ?")
            .bind(freeloader.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let after = recalculate_balances(&pool, &group_id).await.unwrap();
        assert_eq!(after.members.len(), 1);
        assert_eq!(balance_of(&after, &payer), 0.0);
    }

    #[tokio::test]
    async fn test_balance_sum_reconciles_with_deposits_and_fixed_cost() {
        let pool = setup_test_db().await;
        let group_id = seed_group(&pool, 70.0).await;

        let iqbal = seed_member_in_group(&pool, &group_id, "Iqbal", 100.0).await;
        seed_member_in_group(&pool, &group_id, "Siraj", 40.0).await;
        seed_member_in_group(&pool, &group_id, "Jafar", 0.0).await;
        seed_expense(&pool, &group_id, &iqbal, 461.25).await;

        let result = recalculate_balances(&pool, &group_id).await.unwrap();

        let balance_sum: f64 = result.members.iter().map(|m| m.membership.balance).sum();
        let deposit_sum: f64 = result.members.iter().map(|m| m.membership.deposits).sum();
        let expected = deposit_sum - 3.0 * 70.0;

        // Each of the 3 balances may carry up to half a cent of rounding
        assert!((balance_sum - expected).abs() <= 0.03);
    }
}
