use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{RefreshTokenRow, UserRow};
use shared::{CreateUserRequest, LoginRequest, User};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists")]
    UserAlreadyExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Username, email and password are required")]
    MissingFields,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Password hashing error")]
    HashingError,
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub async fn register_user(
    pool: &SqlitePool,
    request: &CreateUserRequest,
) -> Result<User, AuthError> {
    if request.username.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(AuthError::MissingFields);
    }
    if request.password.len() < 8 {
        return Err(AuthError::PasswordTooShort);
    }

    // Check if user exists
    let existing =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
            .bind(&request.username)
            .bind(&request.email)
            .fetch_one(pool)
            .await?;

    if existing > 0 {
        return Err(AuthError::UserAlreadyExists);
    }

    // Hash password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(request.password.as_bytes(), &salt)
        .map_err(|_| AuthError::HashingError)?
        .to_string();

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&request.username)
    .bind(&request.email)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(User {
        id,
        username: request.username.clone(),
        email: request.email.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn login_user(pool: &SqlitePool, request: &LoginRequest) -> Result<User, AuthError> {
    let user: UserRow = sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(&request.username)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let parsed_hash =
        PasswordHash::new(&user.password_hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(request.password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)?;

    Ok(user.to_shared())
}

pub async fn get_user_by_id(pool: &SqlitePool, user_id: &Uuid) -> Result<Option<User>, AuthError> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(user.map(|u| u.to_shared()))
}

/// Mint a refresh token for a user; only its SHA-256 digest is stored.
pub async fn issue_refresh_token(
    pool: &SqlitePool,
    user_id: &Uuid,
    expiration_days: i64,
) -> Result<String, AuthError> {
    let token = generate_token();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id.to_string())
    .bind(hash_token(&token))
    .bind(now + Duration::days(expiration_days))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(token)
}

/// Exchange a refresh token for the user it belongs to, rotating the token.
/// The presented token is consumed whether or not it is still valid.
pub async fn refresh_session(
    pool: &SqlitePool,
    refresh_token: &str,
    expiration_days: i64,
) -> Result<(User, String), AuthError> {
    let row: Option<RefreshTokenRow> =
        sqlx::query_as("SELECT * FROM refresh_tokens WHERE token_hash = ?")
            .bind(hash_token(refresh_token))
            .fetch_optional(pool)
            .await?;

    let row = row.ok_or(AuthError::InvalidRefreshToken)?;

    if row.is_expired(Utc::now()) {
        sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
            .bind(&row.id)
            .execute(pool)
            .await?;
        return Err(AuthError::InvalidRefreshToken);
    }

    let user: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&row.user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let new_token = generate_token();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
        .bind(&row.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&row.user_id)
    .bind(hash_token(&new_token))
    .bind(now + Duration::days(expiration_days))
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((user.to_shared(), new_token))
}

/// Revoke every refresh token a user holds (logout everywhere)
pub async fn revoke_refresh_tokens(pool: &SqlitePool, user_id: &Uuid) -> Result<(), AuthError> {
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

pub fn create_jwt(user_id: &Uuid, secret: &str, expiration_hours: i64) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidCredentials)
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    encode_hex(&bytes)
}

fn hash_token(token: &str) -> String {
    encode_hex(&Sha256::digest(token.as_bytes()))
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
