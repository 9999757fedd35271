#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use garden_cms::db::entities::{article, garden, tag};
use garden_cms::db::schema;
use garden_cms::db::services::{LinkPolicy, garden_service, tag_service, user_service};
use garden_cms::server::config::ServerConfig;
use garden_cms::services::auth_service;
use garden_cms::web;
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret";

/// Fresh in-memory SQLite database with the schema in place.
///
/// A single pooled connection keeps every query on the same in-memory database.
pub async fn test_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect to in-memory sqlite");
    schema::ensure_schema(&db).await.expect("create schema");
    db
}

/// File-backed SQLite database served by a pool of several connections, so
/// transactions from concurrent tasks really overlap. Keep the `TempDir`
/// alive for as long as the database is used.
pub async fn test_db_pooled(max_connections: u32) -> (DatabaseConnection, TempDir) {
    let dir = tempfile::tempdir().expect("create database dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("garden.db").display());
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(max_connections).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect to file sqlite");
    schema::ensure_schema(&db).await.expect("create schema");
    (db, dir)
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub async fn seed_tag(db: &DatabaseConnection, name: &str) -> tag::Model {
    tag_service::create_tag(db, &object(json!({ "name": name })))
        .await
        .expect("seed tag")
}

pub async fn seed_garden(db: &DatabaseConnection, name: &str) -> garden::Model {
    garden_service::create_garden(db, &object(json!({ "name": name })))
        .await
        .expect("seed garden")
}

pub fn article_payload(title: &str) -> Map<String, Value> {
    object(json!({
        "title": title,
        "content": format!("Body of {title}"),
        "url": format!("/articles/{}", title.to_lowercase().replace(' ', "-")),
    }))
}

pub async fn seed_article(db: &DatabaseConnection, title: &str) -> article::Model {
    garden_cms::db::services::create_article(db, article_payload(title), LinkPolicy::ReplaceAll)
        .await
        .expect("seed article")
}

pub struct TestHarness {
    pub db: DatabaseConnection,
    pub config: Arc<ServerConfig>,
    pub upload_dir: TempDir,
    pub router: Router,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_policy(LinkPolicy::ReplaceAll).await
    }

    pub async fn with_policy(garden_link_policy: LinkPolicy) -> Self {
        let db = test_db().await;
        let upload_dir = tempfile::tempdir().expect("create upload dir");
        let config = Arc::new(ServerConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: JWT_SECRET.to_string(),
            listen_addr: "127.0.0.1:0".to_string(),
            upload_dir: upload_dir.path().to_path_buf(),
            log_dir: upload_dir.path().join("logs"),
            max_connections: 1,
            garden_link_policy,
        });
        let router = web::create_axum_router(db.clone(), config.clone());
        Self {
            db,
            config,
            upload_dir,
            router,
        }
    }

    /// Token for a stored user. The hash is a placeholder; login is never
    /// attempted with these accounts.
    pub async fn token_for(&self, username: &str, is_admin: bool) -> String {
        let user = user_service::create_user(&self.db, username, "not-a-real-hash", is_admin)
            .await
            .expect("create user");
        auth_service::create_jwt_for_user(&user, JWT_SECRET)
            .expect("issue token")
            .token
    }

    pub async fn admin_token(&self) -> String {
        self.token_for("admin", true).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("router is infallible")
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

pub async fn expect_json(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
