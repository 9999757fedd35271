use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::ConnectionTrait;
use tracing::{info, warn};

use crate::db::entities::user;
use crate::db::services::user_service;
use crate::web::error::AppError;
use crate::web::models::{Claims, LoginRequest, LoginResponse};

/// Token lifetime.
const TOKEN_TTL_HOURS: i64 = 24;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST).map_err(|e| AppError::PasswordHashingError(e.to_string()))
}

/// Hashes the password and stores a new user.
pub async fn register_user<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
    is_admin: bool,
) -> Result<user::Model, AppError> {
    if username.trim().is_empty() || password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Username must not be empty and the password needs at least 8 characters.".to_string(),
        ));
    }
    let password_hash = hash_password(password)?;
    user_service::create_user(db, username.trim(), &password_hash, is_admin).await
}

pub async fn login_user<C: ConnectionTrait>(
    db: &C,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput("Username and password must not be empty.".to_string()));
    }

    let user = user_service::get_user_by_username(db, &req.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        warn!(username = %req.username, "Rejected login with a wrong password.");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = user.id, "User logged in.");
    create_jwt_for_user(&user, jwt_secret)
}

pub fn create_jwt_for_user(user: &user::Model, jwt_secret: &str) -> Result<LoginResponse, AppError> {
    let expiration = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;

    let claims = Claims {
        sub: user.username.clone(),
        user_id: user.id,
        exp: expiration,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_ref()))
        .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse {
        token,
        user_id: user.id,
        username: user.username.clone(),
        is_admin: user.is_admin,
    })
}

pub fn decode_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding failed.");
        AppError::Unauthorized
    })
}
