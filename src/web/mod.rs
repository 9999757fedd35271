use axum::{Router, http::Method, routing::get};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::server::config::ServerConfig;
use crate::web::routes::*;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub config: Arc<ServerConfig>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(db_pool: DatabaseConnection, config: Arc<ServerConfig>) -> Router {
    let upload_dir = config.upload_dir.clone();
    let app_state = Arc::new(AppState { db_pool, config });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/auth", auth_routes::create_auth_router())
        .nest("/api/articles", article_routes::create_articles_router(app_state.clone()))
        .nest("/api/tags", tag_routes::create_tags_router(app_state.clone()))
        .nest("/api/garden", garden_routes::create_garden_router(app_state.clone()))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .with_state(app_state)
        .layer(cors)
}
