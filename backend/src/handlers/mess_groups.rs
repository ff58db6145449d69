use actix_web::{web, HttpResponse, Result};
use shared::{
    ApiError, ApiSuccess, AttachMemberRequest, CreateMessGroupRequest, UpdateMembershipRequest,
    UpdateMessGroupRequest,
};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::balances::{self, BalanceError};
use crate::services::events::GroupEvent;
use crate::services::expenses as expense_service;
use crate::services::expenses::ExpenseError;
use crate::services::mess_groups as group_service;
use crate::services::mess_groups::MessGroupError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/mess-groups")
            .route("", web::get().to(list_groups))
            .route("", web::post().to(create_group))
            .route("/{group_id}", web::get().to(get_group))
            .route("/{group_id}", web::put().to(update_group))
            .route("/{group_id}", web::delete().to(delete_group))
            .route("/{group_id}/calculate-balances", web::post().to(calculate_balances))
            .route("/{group_id}/members", web::get().to(list_group_members))
            .route("/{group_id}/members", web::post().to(attach_member))
            .route("/{group_id}/members/{member_id}", web::put().to(update_membership))
            .route("/{group_id}/members/{member_id}", web::delete().to(detach_member))
            .route("/{group_id}/expenses/import", web::post().to(import_expenses)),
    );
}

async fn list_groups(state: web::Data<AppState>) -> Result<HttpResponse> {
    match group_service::list_mess_groups(&state.db).await {
        Ok(groups) => Ok(HttpResponse::Ok().json(ApiSuccess::new(groups))),
        Err(e) => {
            log::error!("Error listing mess groups: {:?}", e);
            Ok(internal_error("Failed to list mess groups"))
        }
    }
}

async fn create_group(
    state: web::Data<AppState>,
    body: web::Json<CreateMessGroupRequest>,
) -> Result<HttpResponse> {
    match group_service::create_mess_group(&state.db, &body.into_inner()).await {
        Ok(group) => Ok(HttpResponse::Created().json(ApiSuccess::new(group))),
        Err(e) => Ok(group_error_response(e, "Failed to create mess group")),
    }
}

async fn get_group(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let group_id = match parse_id(&path.into_inner(), "mess group") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match group_service::get_group_with_members(&state.db, &group_id).await {
        Ok(group) => Ok(HttpResponse::Ok().json(ApiSuccess::new(group))),
        Err(e) => Ok(group_error_response(e, "Failed to fetch mess group")),
    }
}

async fn update_group(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateMessGroupRequest>,
) -> Result<HttpResponse> {
    let group_id = match parse_id(&path.into_inner(), "mess group") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match group_service::update_mess_group(&state.db, &group_id, &body.into_inner()).await {
        Ok(group) => {
            notify_group_changed(&state, group_id, "group updated");
            Ok(HttpResponse::Ok().json(ApiSuccess::new(group)))
        }
        Err(e) => Ok(group_error_response(e, "Failed to update mess group")),
    }
}

async fn delete_group(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let group_id = match parse_id(&path.into_inner(), "mess group") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match group_service::delete_mess_group(&state.db, &group_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(group_error_response(e, "Failed to delete mess group")),
    }
}

/// Synchronous settlement recalculation for one group, returning the group
/// with its members and their fresh balances
async fn calculate_balances(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let group_id = match parse_id(&path.into_inner(), "mess group") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match balances::recalculate_balances(&state.db, &group_id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiSuccess::new(result))),
        Err(BalanceError::GroupNotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Mess group not found".to_string(),
        })),
        Err(e @ (BalanceError::EmptyGroup | BalanceError::ZeroDays)) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_state".to_string(),
                message: e.to_string(),
            }))
        }
        Err(e) => {
            log::error!("Error calculating balances: {:?}", e);
            Ok(internal_error("Failed to calculate balances"))
        }
    }
}

async fn list_group_members(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let group_id = match parse_id(&path.into_inner(), "mess group") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match group_service::list_members(&state.db, &group_id).await {
        Ok(members) => Ok(HttpResponse::Ok().json(ApiSuccess::new(members))),
        Err(e) => Ok(group_error_response(e, "Failed to list group members")),
    }
}

async fn attach_member(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AttachMemberRequest>,
) -> Result<HttpResponse> {
    let group_id = match parse_id(&path.into_inner(), "mess group") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match group_service::attach_member(&state.db, &group_id, &body.into_inner()).await {
        Ok(membership) => {
            notify_group_changed(&state, group_id, "member attached");
            Ok(HttpResponse::Created().json(ApiSuccess::new(membership)))
        }
        Err(e) => Ok(group_error_response(e, "Failed to attach member")),
    }
}

async fn update_membership(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateMembershipRequest>,
) -> Result<HttpResponse> {
    let (group_id_str, member_id_str) = path.into_inner();

    let group_id = match parse_id(&group_id_str, "mess group") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let member_id = match parse_id(&member_id_str, "member") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match group_service::update_membership(&state.db, &group_id, &member_id, &body.into_inner())
        .await
    {
        Ok(membership) => {
            notify_group_changed(&state, group_id, "membership updated");
            Ok(HttpResponse::Ok().json(ApiSuccess::new(membership)))
        }
        Err(e) => Ok(group_error_response(e, "Failed to update membership")),
    }
}

async fn detach_member(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (group_id_str, member_id_str) = path.into_inner();

    let group_id = match parse_id(&group_id_str, "mess group") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let member_id = match parse_id(&member_id_str, "member") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match group_service::detach_member(&state.db, &group_id, &member_id).await {
        Ok(()) => {
            notify_group_changed(&state, group_id, "member detached");
            Ok(HttpResponse::NoContent().finish())
        }
        Err(e) => Ok(group_error_response(e, "Failed to detach member")),
    }
}

/// Bulk CSV import of expenses into a group. The request body is the raw
/// CSV text with a header row and `date,member_id,description,amount` columns.
async fn import_expenses(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let group_id = match parse_id(&path.into_inner(), "mess group") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let csv_text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: "Import body must be UTF-8 CSV text".to_string(),
            }));
        }
    };

    match expense_service::import_expenses(&state.db, &group_id, csv_text).await {
        Ok(summary) => Ok(HttpResponse::Created().json(ApiSuccess::new(summary))),
        Err(ExpenseError::GroupNotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Mess group not found".to_string(),
        })),
        Err(e @ ExpenseError::ImportRow { .. }) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: e.to_string(),
        })),
        Err(e) => {
            log::error!("Error importing expenses: {:?}", e);
            Ok(internal_error("Failed to import expenses"))
        }
    }
}

/// Queue a background balance recalculation for a group whose composition
/// or parameters just changed
fn notify_group_changed(state: &web::Data<AppState>, group_id: Uuid, reason: &'static str) {
    if state.recalc_tx.send(GroupEvent::new(group_id, reason)).is_err() {
        log::warn!(
            "Recalculation worker is gone, balances for mess group {} are stale after {}",
            group_id,
            reason
        );
    }
}

fn parse_id(raw: &str, what: &str) -> std::result::Result<Uuid, HttpResponse> {
    Uuid::parse_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(ApiError {
            error: "invalid_id".to_string(),
            message: format!("Invalid {} ID format", what),
        })
    })
}

fn group_error_response(e: MessGroupError, context: &str) -> HttpResponse {
    match e {
        MessGroupError::NotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Mess group not found".to_string(),
        }),
        MessGroupError::MemberNotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Member not found".to_string(),
        }),
        MessGroupError::NotAttached => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Member is not in this mess group".to_string(),
        }),
        e @ (MessGroupError::AlreadyAttached
        | MessGroupError::EmptyName
        | MessGroupError::NameTooLong
        | MessGroupError::InvalidDateRange
        | MessGroupError::InvalidFixedCost
        | MessGroupError::InvalidPivotAmount) => HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: e.to_string(),
        }),
        MessGroupError::DatabaseError(e) => {
            log::error!("{}: {:?}", context, e);
            internal_error(context)
        }
    }
}

fn internal_error(message: &str) -> HttpResponse {
    HttpResponse::InternalServerError().json(ApiError {
        error: "internal_error".to_string(),
        message: message.to_string(),
    })
}
