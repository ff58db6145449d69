use chrono::{NaiveDate, Utc};
use csv::ReaderBuilder;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ExpenseRow, MemberRow, MessGroupRow};
use shared::{
    CreateExpenseRequest, Expense, ExpenseImportSummary, ExpenseWithRelations, UpdateExpenseRequest,
};

#[derive(Debug, Error)]
pub enum ExpenseError {
    #[error("Expense not found")]
    NotFound,
    #[error("Mess group not found")]
    GroupNotFound,
    #[error("Member not found")]
    MemberNotFound,
    #[error("Expense description cannot be empty")]
    EmptyDescription,
    #[error("Expense amount must be a non-negative number")]
    InvalidAmount,
    #[error("Import failed at line {line}: {message}")]
    ImportRow { line: usize, message: String },
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub async fn create_expense(
    pool: &SqlitePool,
    request: &CreateExpenseRequest,
) -> Result<Expense, ExpenseError> {
    if request.description.trim().is_empty() {
        return Err(ExpenseError::EmptyDescription);
    }
    if !is_valid_amount(request.amount) {
        return Err(ExpenseError::InvalidAmount);
    }

    ensure_group_exists(pool, &request.mess_group_id).await?;
    ensure_member_exists(pool, &request.member_id).await?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO expenses (id, mess_group_id, member_id, date, description, amount, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(request.mess_group_id.to_string())
    .bind(request.member_id.to_string())
    .bind(request.date)
    .bind(&request.description)
    .bind(request.amount)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Expense {
        id,
        mess_group_id: request.mess_group_id,
        member_id: request.member_id,
        date: request.date,
        description: request.description.clone(),
        amount: request.amount,
        created_at: now,
        updated_at: now,
    })
}

pub async fn list_expenses(pool: &SqlitePool) -> Result<Vec<ExpenseWithRelations>, ExpenseError> {
    let expenses: Vec<ExpenseRow> =
        sqlx::query_as("SELECT * FROM expenses ORDER BY date DESC, created_at DESC")
            .fetch_all(pool)
            .await?;

    let mut result = Vec::new();
    for expense in expenses {
        result.push(with_relations(pool, expense).await?);
    }

    Ok(result)
}

pub async fn get_expense(
    pool: &SqlitePool,
    expense_id: &Uuid,
) -> Result<Option<ExpenseWithRelations>, ExpenseError> {
    let expense: Option<ExpenseRow> = sqlx::query_as("SELECT * FROM expenses WHERE id = ?")
        .bind(expense_id.to_string())
        .fetch_optional(pool)
        .await?;

    match expense {
        Some(expense) => Ok(Some(with_relations(pool, expense).await?)),
        None => Ok(None),
    }
}

pub async fn update_expense(
    pool: &SqlitePool,
    expense_id: &Uuid,
    request: &UpdateExpenseRequest,
) -> Result<Expense, ExpenseError> {
    let mut expense: ExpenseRow = sqlx::query_as("SELECT * FROM expenses WHERE id = ?")
        .bind(expense_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(ExpenseError::NotFound)?;

    if let Some(mess_group_id) = request.mess_group_id {
        ensure_group_exists(pool, &mess_group_id).await?;
        expense.mess_group_id = mess_group_id.to_string();
    }
    if let Some(member_id) = request.member_id {
        ensure_member_exists(pool, &member_id).await?;
        expense.member_id = member_id.to_string();
    }
    if let Some(date) = request.date {
        expense.date = date;
    }
    if let Some(ref description) = request.description {
        if description.trim().is_empty() {
            return Err(ExpenseError::EmptyDescription);
        }
        expense.description = description.clone();
    }
    if let Some(amount) = request.amount {
        if !is_valid_amount(amount) {
            return Err(ExpenseError::InvalidAmount);
        }
        expense.amount = amount;
    }

    let now = Utc::now();
    expense.updated_at = now;

    sqlx::query(
        r#"
        UPDATE expenses
        SET mess_group_id = ?, member_id = ?, date = ?, description = ?, amount = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&expense.mess_group_id)
    .bind(&expense.member_id)
    .bind(expense.date)
    .bind(&expense.description)
    .bind(expense.amount)
    .bind(now)
    .bind(expense_id.to_string())
    .execute(pool)
    .await?;

    Ok(expense.to_shared())
}

pub async fn delete_expense(pool: &SqlitePool, expense_id: &Uuid) -> Result<(), ExpenseError> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
        .bind(expense_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ExpenseError::NotFound);
    }

    Ok(())
}

/// Bulk-load expenses for a group from CSV text with a header row and
/// `date,member_id,description,amount` columns. All rows go in together or
/// not at all.
pub async fn import_expenses(
    pool: &SqlitePool,
    group_id: &Uuid,
    csv_text: &str,
) -> Result<ExpenseImportSummary, ExpenseError> {
    ensure_group_exists(pool, group_id).await?;

    let rows = parse_import(csv_text)?;

    let mut tx = pool.begin().await?;

    for row in &rows {
        let member_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE id = ?")
                .bind(row.member_id.to_string())
                .fetch_one(&mut *tx)
                .await?;
        if member_exists == 0 {
            return Err(ExpenseError::ImportRow {
                line: row.line,
                message: format!("unknown member {}", row.member_id),
            });
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO expenses (id, mess_group_id, member_id, date, description, amount, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(group_id.to_string())
        .bind(row.member_id.to_string())
        .bind(row.date)
        .bind(&row.description)
        .bind(row.amount)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ExpenseImportSummary {
        imported: rows.len(),
    })
}

#[derive(Debug)]
struct ParsedExpenseRow {
    line: usize,
    date: NaiveDate,
    member_id: Uuid,
    description: String,
    amount: f64,
}

fn parse_import(csv_text: &str) -> Result<Vec<ParsedExpenseRow>, ExpenseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_text.as_bytes());

    let mut rows = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        // +2 because: 1-indexed + header row
        let line = line_num + 2;

        let record = result.map_err(|e| ExpenseError::ImportRow {
            line,
            message: e.to_string(),
        })?;

        let date_field = record.get(0).unwrap_or("").trim();
        let member_field = record.get(1).unwrap_or("").trim();
        let description = record.get(2).unwrap_or("").trim().to_string();
        let amount_field = record.get(3).unwrap_or("").trim();

        let date = NaiveDate::parse_from_str(date_field, "%Y-%m-%d").map_err(|_| {
            ExpenseError::ImportRow {
                line,
                message: format!("invalid date '{}'", date_field),
            }
        })?;

        let member_id = Uuid::parse_str(member_field).map_err(|_| ExpenseError::ImportRow {
            line,
            message: format!("invalid member id '{}'", member_field),
        })?;

        if description.is_empty() {
            return Err(ExpenseError::ImportRow {
                line,
                message: "description is empty".to_string(),
            });
        }

        let amount: f64 = amount_field.parse().map_err(|_| ExpenseError::ImportRow {
            line,
            message: format!("invalid amount '{}'", amount_field),
        })?;
        if !is_valid_amount(amount) {
            return Err(ExpenseError::ImportRow {
                line,
                message: "amount must be non-negative".to_string(),
            });
        }

        rows.push(ParsedExpenseRow {
            line,
            date,
            member_id,
            description,
            amount,
        });
    }

    Ok(rows)
}

async fn with_relations(
    pool: &SqlitePool,
    expense: ExpenseRow,
) -> Result<ExpenseWithRelations, ExpenseError> {
    let group: MessGroupRow = sqlx::query_as("SELECT * FROM mess_groups WHERE id = ?")
        .bind(&expense.mess_group_id)
        .fetch_one(pool)
        .await?;

    let member: MemberRow = sqlx::query_as("SELECT * FROM members WHERE id = ?")
        .bind(&expense.member_id)
        .fetch_one(pool)
        .await?;

    Ok(ExpenseWithRelations {
        expense: expense.to_shared(),
        mess_group: group.to_shared(),
        member: member.to_shared(),
    })
}

async fn ensure_group_exists(pool: &SqlitePool, group_id: &Uuid) -> Result<(), ExpenseError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mess_groups WHERE id = ?")
        .bind(group_id.to_string())
        .fetch_one(pool)
        .await?;

    if count == 0 {
        return Err(ExpenseError::GroupNotFound);
    }

    Ok(())
}

async fn ensure_member_exists(pool: &SqlitePool, member_id: &Uuid) -> Result<(), ExpenseError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE id = ?")
        .bind(member_id.to_string())
        .fetch_one(pool)
        .await?;

    if count == 0 {
        return Err(ExpenseError::MemberNotFound);
    }

    Ok(())
}

fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}
