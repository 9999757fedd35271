use axum::{
    Json, Router,
    extract::{
        Extension, Multipart, Path, State,
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use serde_json::{Map, Value};
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::entities::garden;
use crate::db::services::garden_service;
use crate::db::validation::FieldError;
use crate::web::middleware::auth;
use crate::web::models::AuthenticatedAdmin;
use crate::web::routes::json_object;
use crate::web::{AppError, AppState};

const PICTURE_FIELD: &str = "main_picture";

/// Public URL prefix of stored uploads; matches the `/uploads` mount.
const UPLOADS_URL_PREFIX: &str = "/uploads";

struct StoredPicture {
    path: PathBuf,
    url: String,
}

/// Picks a file extension from the client file name, falling back to the
/// declared content type. Only short alphanumeric extensions are kept.
fn picture_extension(file_name: Option<&str>, content_type: Option<&str>) -> Option<String> {
    let from_name = file_name
        .and_then(|name| FsPath::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let from_type = content_type
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string());

    from_name
        .or(from_type)
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn is_image(file_name: Option<&str>, content_type: Option<&str>) -> bool {
    if let Some(content_type) = content_type {
        return content_type.starts_with("image/");
    }
    file_name
        .and_then(|name| mime_guess::from_path(name).first())
        .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE)
}

async fn store_picture(upload_dir: &FsPath, field: Field<'_>) -> Result<Option<StoredPicture>, AppError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|err| AppError::InvalidInput(format!("invalid {PICTURE_FIELD} field: {err}")))?;

    // A file input left empty still sends the part.
    if bytes.is_empty() {
        return Ok(None);
    }
    if !is_image(file_name.as_deref(), content_type.as_deref()) {
        return Err(AppError::Validation(vec![FieldError::at(
            PICTURE_FIELD,
            "any.invalid",
            format!("\"{PICTURE_FIELD}\" must be an image"),
        )]));
    }

    let stored_name = match picture_extension(file_name.as_deref(), content_type.as_deref()) {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    };
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to prepare upload directory: {e}")))?;
    let path = upload_dir.join(&stored_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to store upload: {e}")))?;

    info!(path = %path.display(), size = bytes.len(), "Stored garden picture.");
    Ok(Some(StoredPicture {
        path,
        url: format!("{UPLOADS_URL_PREFIX}/{stored_name}"),
    }))
}

async fn discard_picture(picture: &StoredPicture) {
    if let Err(e) = tokio::fs::remove_file(&picture.path).await {
        warn!(path = %picture.path.display(), error = %e, "Failed to remove orphaned upload.");
    }
}

// --- Route Handlers ---

async fn get_gardens_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<garden::Model>>, AppError> {
    let gardens = garden_service::get_gardens(&app_state.db_pool).await?;
    Ok(Json(gardens))
}

async fn get_garden_handler(
    State(app_state): State<Arc<AppState>>,
    Path(garden_id): Path<i32>,
) -> Result<Json<garden::Model>, AppError> {
    let garden = garden_service::get_garden(&app_state.db_pool, garden_id).await?;
    Ok(Json(garden))
}

/// Reads the garden form. A stored picture is handed back through `picture`
/// even on error, so the caller can discard it.
async fn read_garden_form(
    upload_dir: &FsPath,
    multipart: &mut Multipart,
    picture: &mut Option<StoredPicture>,
) -> Result<Map<String, Value>, AppError> {
    let mut attributes = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::InvalidInput(format!("invalid multipart payload: {err}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == PICTURE_FIELD {
            if let Some(previous) = picture.take() {
                discard_picture(&previous).await;
            }
            *picture = store_picture(upload_dir, field).await?;
        } else {
            // Text parts go through the same validation as JSON attributes,
            // so unexpected names are reported as unknown keys.
            let value = field
                .text()
                .await
                .map_err(|err| AppError::InvalidInput(format!("invalid {name} field: {err}")))?;
            attributes.insert(name, Value::String(value));
        }
    }
    if let Some(stored) = picture.as_ref() {
        attributes.insert("main_picture_url".to_string(), Value::String(stored.url.clone()));
    }
    Ok(attributes)
}

/// `multipart/form-data` with a `name` field and an optional `main_picture` file.
async fn create_garden_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<garden::Model>), AppError> {
    let mut multipart = multipart.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let mut picture = None;

    let created = match read_garden_form(&app_state.config.upload_dir, &mut multipart, &mut picture).await {
        Ok(attributes) => garden_service::create_garden(&app_state.db_pool, &attributes).await,
        Err(e) => Err(e),
    };
    match created {
        Ok(garden) => {
            info!(admin = %admin.username, garden_id = garden.id, "Garden created via API.");
            Ok((StatusCode::CREATED, Json(garden)))
        }
        Err(e) => {
            if let Some(stored) = &picture {
                discard_picture(stored).await;
            }
            Err(e)
        }
    }
}

async fn update_garden_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
    Path(garden_id): Path<i32>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<garden::Model>, AppError> {
    let attributes = json_object(payload)?;
    let garden = garden_service::update_garden(&app_state.db_pool, garden_id, &attributes).await?;
    info!(admin = %admin.username, garden_id, "Garden updated via API.");
    Ok(Json(garden))
}

async fn delete_garden_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
    Path(garden_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    garden_service::remove_garden(&app_state.db_pool, garden_id, true).await?;
    info!(admin = %admin.username, garden_id, "Garden deleted via API.");
    Ok(StatusCode::NO_CONTENT)
}

// --- Router ---

pub fn create_garden_router(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_only = || axum_middleware::from_fn_with_state(app_state.clone(), auth::require_admin);

    Router::new()
        .route("/", get(get_gardens_handler).merge(post(create_garden_handler).route_layer(admin_only())))
        .route(
            "/{garden_id}",
            get(get_garden_handler).merge(
                put(update_garden_handler)
                    .delete(delete_garden_handler)
                    .route_layer(admin_only()),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_prefers_file_name_then_content_type() {
        assert_eq!(picture_extension(Some("Rose.PNG"), Some("image/jpeg")).as_deref(), Some("png"));
        assert_eq!(picture_extension(None, Some("image/png")).as_deref(), Some("png"));
        assert_eq!(picture_extension(Some("noext"), None), None);
        assert_eq!(picture_extension(Some("evil.p/h"), None), None);
    }

    #[test]
    fn only_images_are_accepted() {
        assert!(is_image(Some("a.txt"), Some("image/webp")));
        assert!(is_image(Some("a.jpg"), None));
        assert!(!is_image(Some("a.txt"), None));
        assert!(!is_image(None, Some("text/plain")));
    }
}
