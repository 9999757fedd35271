use axum::{
    Json, Router,
    extract::{Extension, Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::db::entities::tag;
use crate::db::services::tag_service;
use crate::web::middleware::auth;
use crate::web::models::AuthenticatedAdmin;
use crate::web::routes::json_object;
use crate::web::{AppError, AppState};

// --- Route Handlers ---

async fn get_tags_handler(State(app_state): State<Arc<AppState>>) -> Result<Json<Vec<tag::Model>>, AppError> {
    let tags = tag_service::get_tags(&app_state.db_pool).await?;
    Ok(Json(tags))
}

async fn get_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
) -> Result<Json<tag::Model>, AppError> {
    let tag = tag_service::get_tag(&app_state.db_pool, tag_id).await?;
    Ok(Json(tag))
}

async fn create_tag_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<tag::Model>), AppError> {
    let attributes = json_object(payload)?;
    let tag = tag_service::create_tag(&app_state.db_pool, &attributes).await?;
    info!(admin = %admin.username, tag_id = tag.id, "Tag created via API.");
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<tag::Model>, AppError> {
    let attributes = json_object(payload)?;
    let tag = tag_service::update_tag(&app_state.db_pool, tag_id, &attributes).await?;
    info!(admin = %admin.username, tag_id, "Tag updated via API.");
    Ok(Json(tag))
}

async fn delete_tag_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    tag_service::remove_tag(&app_state.db_pool, tag_id, true).await?;
    info!(admin = %admin.username, tag_id, "Tag deleted via API.");
    Ok(StatusCode::NO_CONTENT)
}

// --- Router ---

pub fn create_tags_router(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_only = || axum_middleware::from_fn_with_state(app_state.clone(), auth::require_admin);

    Router::new()
        .route("/", get(get_tags_handler).merge(post(create_tag_handler).route_layer(admin_only())))
        .route(
            "/{tag_id}",
            get(get_tag_handler).merge(
                put(update_tag_handler)
                    .delete(delete_tag_handler)
                    .route_layer(admin_only()),
            ),
        )
}
