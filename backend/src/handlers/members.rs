use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, CreateMemberRequest, UpdateMemberRequest};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::members as member_service;
use crate::services::members::MemberError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/members")
            .route("", web::get().to(list_members))
            .route("", web::post().to(create_member))
            .route("/{member_id}", web::get().to(get_member))
            .route("/{member_id}", web::put().to(update_member))
            .route("/{member_id}", web::delete().to(delete_member)),
    );
}

async fn list_members(state: web::Data<AppState>) -> Result<HttpResponse> {
    match member_service::list_members(&state.db).await {
        Ok(members) => Ok(HttpResponse::Ok().json(ApiSuccess::new(members))),
        Err(e) => {
            log::error!("Error listing members: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list members".to_string(),
            }))
        }
    }
}

async fn create_member(
    state: web::Data<AppState>,
    body: web::Json<CreateMemberRequest>,
) -> Result<HttpResponse> {
    match member_service::create_member(&state.db, &body.into_inner()).await {
        Ok(member) => Ok(HttpResponse::Created().json(ApiSuccess::new(member))),
        Err(e @ (MemberError::EmptyName | MemberError::NameTooLong)) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: e.to_string(),
            }))
        }
        Err(e) => {
            log::error!("Error creating member: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to create member".to_string(),
            }))
        }
    }
}

async fn get_member(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let member_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid member ID format".to_string(),
            }));
        }
    };

    match member_service::get_member(&state.db, &member_id).await {
        Ok(Some(member)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(member))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Member not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error fetching member: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch member".to_string(),
            }))
        }
    }
}

async fn update_member(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateMemberRequest>,
) -> Result<HttpResponse> {
    let member_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid member ID format".to_string(),
            }));
        }
    };

    match member_service::update_member(&state.db, &member_id, &body.into_inner()).await {
        Ok(member) => Ok(HttpResponse::Ok().json(ApiSuccess::new(member))),
        Err(MemberError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Member not found".to_string(),
        })),
        Err(e @ (MemberError::EmptyName | MemberError::NameTooLong)) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: e.to_string(),
            }))
        }
        Err(e) => {
            log::error!("Error updating member: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to update member".to_string(),
            }))
        }
    }
}

async fn delete_member(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let member_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid member ID format".to_string(),
            }));
        }
    };

    match member_service::delete_member(&state.db, &member_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(MemberError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Member not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error deleting member: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to delete member".to_string(),
            }))
        }
    }
}
