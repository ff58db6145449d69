use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, CreateExpenseRequest, UpdateExpenseRequest};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::expenses as expense_service;
use crate::services::expenses::ExpenseError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/expenses")
            .route("", web::get().to(list_expenses))
            .route("", web::post().to(create_expense))
            .route("/{expense_id}", web::get().to(get_expense))
            .route("/{expense_id}", web::put().to(update_expense))
            .route("/{expense_id}", web::delete().to(delete_expense)),
    );
}

async fn list_expenses(state: web::Data<AppState>) -> Result<HttpResponse> {
    match expense_service::list_expenses(&state.db).await {
        Ok(expenses) => Ok(HttpResponse::Ok().json(ApiSuccess::new(expenses))),
        Err(e) => {
            log::error!("Error listing expenses: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list expenses".to_string(),
            }))
        }
    }
}

async fn create_expense(
    state: web::Data<AppState>,
    body: web::Json<CreateExpenseRequest>,
) -> Result<HttpResponse> {
    match expense_service::create_expense(&state.db, &body.into_inner()).await {
        Ok(expense) => Ok(HttpResponse::Created().json(ApiSuccess::new(expense))),
        Err(e) => Ok(expense_error_response(e, "Failed to create expense")),
    }
}

async fn get_expense(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let expense_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid expense ID format".to_string(),
            }));
        }
    };

    match expense_service::get_expense(&state.db, &expense_id).await {
        Ok(Some(expense)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(expense))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Expense not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error fetching expense: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch expense".to_string(),
            }))
        }
    }
}

async fn update_expense(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateExpenseRequest>,
) -> Result<HttpResponse> {
    let expense_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid expense ID format".to_string(),
            }));
        }
    };

    match expense_service::update_expense(&state.db, &expense_id, &body.into_inner()).await {
        Ok(expense) => Ok(HttpResponse::Ok().json(ApiSuccess::new(expense))),
        Err(e) => Ok(expense_error_response(e, "Failed to update expense")),
    }
}

async fn delete_expense(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let expense_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid expense ID format".to_string(),
            }));
        }
    };

    match expense_service::delete_expense(&state.db, &expense_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(ExpenseError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Expense not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error deleting expense: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to delete expense".to_string(),
            }))
        }
    }
}

fn expense_error_response(e: ExpenseError, context: &str) -> HttpResponse {
    match e {
        ExpenseError::NotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Expense not found".to_string(),
        }),
        ExpenseError::GroupNotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Mess group not found".to_string(),
        }),
        ExpenseError::MemberNotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Member not found".to_string(),
        }),
        e @ (ExpenseError::EmptyDescription
        | ExpenseError::InvalidAmount
        | ExpenseError::ImportRow { .. }) => HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: e.to_string(),
        }),
        ExpenseError::DatabaseError(e) => {
            log::error!("{}: {:?}", context, e);
            HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: context.to_string(),
            })
        }
    }
}
