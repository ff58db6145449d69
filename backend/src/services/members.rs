use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::MemberRow;
use shared::{CreateMemberRequest, Member, UpdateMemberRequest};

#[derive(Debug, Error)]
pub enum MemberError {
    #[error("Member not found")]
    NotFound,
    #[error("Member name cannot be empty")]
    EmptyName,
    #[error("Member name is too long")]
    NameTooLong,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub async fn create_member(
    pool: &SqlitePool,
    request: &CreateMemberRequest,
) -> Result<Member, MemberError> {
    validate_name(&request.name)?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query("INSERT INTO members (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(&request.name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(Member {
        id,
        name: request.name.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn list_members(pool: &SqlitePool) -> Result<Vec<Member>, MemberError> {
    let members: Vec<MemberRow> = sqlx::query_as("SELECT * FROM members ORDER BY name ASC")
        .fetch_all(pool)
        .await?;

    Ok(members.into_iter().map(|m| m.to_shared()).collect())
}

pub async fn get_member(pool: &SqlitePool, member_id: &Uuid) -> Result<Option<Member>, MemberError> {
    let member: Option<MemberRow> = sqlx::query_as("SELECT * FROM members WHERE id = ?")
        .bind(member_id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(member.map(|m| m.to_shared()))
}

pub async fn update_member(
    pool: &SqlitePool,
    member_id: &Uuid,
    request: &UpdateMemberRequest,
) -> Result<Member, MemberError> {
    let mut member: MemberRow = sqlx::query_as("SELECT * FROM members WHERE id = ?")
        .bind(member_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(MemberError::NotFound)?;

    if let Some(ref name) = request.name {
        validate_name(name)?;
        member.name = name.clone();
    }

    let now = Utc::now();
    member.updated_at = now;

    sqlx::query("UPDATE members SET name = ?, updated_at = ? WHERE id = ?")
        .bind(&member.name)
        .bind(now)
        .bind(member_id.to_string())
        .execute(pool)
        .await?;

    Ok(member.to_shared())
}

pub async fn delete_member(pool: &SqlitePool, member_id: &Uuid) -> Result<(), MemberError> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE id = ?")
        .bind(member_id.to_string())
        .fetch_one(pool)
        .await?;
    if existing == 0 {
        return Err(MemberError::NotFound);
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM expenses WHERE member_id = ?")
        .bind(member_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM mess_group_memberships WHERE member_id = ?")
        .bind(member_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM members WHERE id = ?")
        .bind(member_id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

fn validate_name(name: &str) -> Result<(), MemberError> {
    if name.trim().is_empty() {
        return Err(MemberError::EmptyName);
    }
    if name.len() > 255 {
        return Err(MemberError::NameTooLong);
    }

    Ok(())
}
