use axum::{Json, extract::rejection::JsonRejection};
use serde_json::{Map, Value};

use crate::web::error::AppError;

pub mod article_routes;
pub mod auth_routes;
pub mod garden_routes;
pub mod tag_routes;

/// Unwraps a JSON request body that must be an object.
///
/// Malformed bodies become `InvalidInput` instead of axum's plain-text rejection,
/// so every failure reaches the client in the `{ "error": ... }` shape.
pub(crate) fn json_object(payload: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, AppError> {
    let Json(value) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::InvalidInput("Request body must be a JSON object.".to_string())),
    }
}
