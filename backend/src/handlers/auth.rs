use actix_web::{web, HttpResponse, Result};
use shared::{
    ApiError, ApiSuccess, AuthResponse, CreateUserRequest, LoginRequest, RefreshTokenRequest, User,
};

use crate::models::AppState;
use crate::services::auth as auth_service;
use crate::services::auth::AuthError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(get_current_user)),
    );
}

async fn register(
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();

    match auth_service::register_user(&state.db, &request).await {
        Ok(user) => session_response(&state, user, true).await,
        Err(e @ (AuthError::MissingFields | AuthError::PasswordTooShort)) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: e.to_string(),
            }))
        }
        Err(AuthError::UserAlreadyExists) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "registration_error".to_string(),
            message: "User already exists".to_string(),
        })),
        Err(e) => {
            log::error!("Registration error: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to register user".to_string(),
            }))
        }
    }
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse> {
    let request = body.into_inner();

    if !state.login_rate_limiter.check(&request.username) {
        return Ok(HttpResponse::TooManyRequests().json(ApiError {
            error: "rate_limited".to_string(),
            message: "Too many login attempts, try again later".to_string(),
        }));
    }

    match auth_service::login_user(&state.db, &request).await {
        Ok(user) => {
            state.login_rate_limiter.clear(&request.username);
            session_response(&state, user, false).await
        }
        Err(AuthError::InvalidCredentials) => {
            state.login_rate_limiter.record(&request.username);
            Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "authentication_error".to_string(),
                message: "Invalid username or password".to_string(),
            }))
        }
        Err(e) => {
            log::error!("Login error: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to log in".to_string(),
            }))
        }
    }
}

async fn refresh(
    state: web::Data<AppState>,
    body: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();

    match auth_service::refresh_session(
        &state.db,
        &request.refresh_token,
        state.config.refresh_expiration_days,
    )
    .await
    {
        Ok((user, refresh_token)) => {
            match auth_service::create_jwt(
                &user.id,
                &state.config.jwt_secret,
                state.config.jwt_expiration_hours,
            ) {
                Ok(token) => Ok(HttpResponse::Ok().json(ApiSuccess::new(AuthResponse {
                    token,
                    refresh_token,
                    user,
                }))),
                Err(e) => {
                    log::error!("JWT creation error: {:?}", e);
                    Ok(HttpResponse::InternalServerError().json(ApiError {
                        error: "jwt_error".to_string(),
                        message: "Failed to create token".to_string(),
                    }))
                }
            }
        }
        Err(AuthError::InvalidRefreshToken | AuthError::UserNotFound) => {
            Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "authentication_error".to_string(),
                message: "Invalid refresh token".to_string(),
            }))
        }
        Err(e) => {
            log::error!("Refresh error: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to refresh session".to_string(),
            }))
        }
    }
}

async fn logout(state: web::Data<AppState>, req: actix_web::HttpRequest) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match auth_service::revoke_refresh_tokens(&state.db, &user_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => {
            log::error!("Logout error: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to log out".to_string(),
            }))
        }
    }
}

async fn get_current_user(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match auth_service::get_user_by_id(&state.db, &user_id).await {
        Ok(Some(user)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "User not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error fetching user: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch user".to_string(),
            }))
        }
    }
}

/// Issue a JWT and a fresh refresh token for a just-authenticated user
async fn session_response(
    state: &web::Data<AppState>,
    user: User,
    created: bool,
) -> Result<HttpResponse> {
    let refresh_token = match auth_service::issue_refresh_token(
        &state.db,
        &user.id,
        state.config.refresh_expiration_days,
    )
    .await
    {
        Ok(token) => token,
        Err(e) => {
            log::error!("Refresh token issuance error: {:?}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to create session".to_string(),
            }));
        }
    };

    match auth_service::create_jwt(
        &user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    ) {
        Ok(token) => {
            let response = ApiSuccess::new(AuthResponse {
                token,
                refresh_token,
                user,
            });
            if created {
                Ok(HttpResponse::Created().json(response))
            } else {
                Ok(HttpResponse::Ok().json(response))
            }
        }
        Err(e) => {
            log::error!("JWT creation error: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "jwt_error".to_string(),
                message: "Failed to create token".to_string(),
            }))
        }
    }
}
