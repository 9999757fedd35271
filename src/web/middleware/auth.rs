use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, error};

use crate::db::services::user_service;
use crate::services::auth_service;
use crate::web::models::AuthenticatedAdmin;
use crate::web::{AppState, error::AppError};

/// Lets the request through only for an existing admin user.
///
/// The token comes from the `Authorization: Bearer` header or, failing that,
/// the `token` cookie. Every rejection is an empty 401.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .or_else(|| jar.get("token").map(|c| c.value().to_string()))
        .ok_or(AppError::Unauthorized)?;

    let claims = auth_service::decode_token(&token, &state.config.jwt_secret)?;

    let admin = user_service::find_admin(&state.db_pool, claims.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Admin lookup failed.");
            AppError::Unauthorized
        })?
        .ok_or_else(|| {
            debug!(user_id = claims.user_id, "Rejected non-admin request.");
            AppError::Unauthorized
        })?;

    req.extensions_mut().insert(AuthenticatedAdmin {
        id: admin.id,
        username: admin.username,
    });
    Ok(next.run(req).await)
}
