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

use crate::db::entities::article;
use crate::db::services::article_service::{self, ArticleDetails};
use crate::web::middleware::auth;
use crate::web::models::AuthenticatedAdmin;
use crate::web::routes::json_object;
use crate::web::{AppError, AppState};

async fn get_articles_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<article::Model>>, AppError> {
    let articles = article_service::get_articles(&app_state.db_pool).await?;
    Ok(Json(articles))
}

async fn get_article_handler(
    State(app_state): State<Arc<AppState>>,
    Path(article_id): Path<i32>,
) -> Result<Json<ArticleDetails>, AppError> {
    let details = article_service::get_article_details(&app_state.db_pool, article_id).await?;
    Ok(Json(details))
}

async fn create_article_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ArticleDetails>), AppError> {
    let attributes = json_object(payload)?;
    let created = article_service::create_article(
        &app_state.db_pool,
        attributes,
        app_state.config.garden_link_policy,
    )
    .await?;
    info!(admin = %admin.username, article_id = created.id, "Article created via API.");

    let details = article_service::get_article_details(&app_state.db_pool, created.id).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

async fn update_article_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
    Path(article_id): Path<i32>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ArticleDetails>, AppError> {
    let attributes = json_object(payload)?;
    article_service::update_article(
        &app_state.db_pool,
        article_id,
        attributes,
        app_state.config.garden_link_policy,
    )
    .await?;
    info!(admin = %admin.username, article_id, "Article updated via API.");

    let details = article_service::get_article_details(&app_state.db_pool, article_id).await?;
    Ok(Json(details))
}

async fn delete_article_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
    Path(article_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    article_service::remove_article(&app_state.db_pool, article_id, true).await?;
    info!(admin = %admin.username, article_id, "Article deleted via API.");
    Ok(StatusCode::NO_CONTENT)
}

/// Reads are public; writes go through the admin gate.
pub fn create_articles_router(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_only = || axum_middleware::from_fn_with_state(app_state.clone(), auth::require_admin);

    Router::new()
        .route(
            "/",
            get(get_articles_handler).merge(post(create_article_handler).route_layer(admin_only())),
        )
        .route(
            "/{article_id}",
            get(get_article_handler).merge(
                put(update_article_handler)
                    .delete(delete_article_handler)
                    .route_layer(admin_only()),
            ),
        )
}
