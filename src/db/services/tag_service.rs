use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, SqlErr};
use serde_json::{Map, Value};
use tracing::info;

use crate::db::entities::tag;
use crate::db::validation::{self, Mode};
use crate::web::error::AppError;

const ENTITY: &str = "tag";

fn map_write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("A tag with this name already exists.".to_string())
        }
        _ => AppError::from(err),
    }
}

/// Retrieves all tags.
pub async fn get_tags<C: ConnectionTrait>(db: &C) -> Result<Vec<tag::Model>, AppError> {
    Ok(tag::Entity::find().order_by_asc(tag::Column::Id).all(db).await?)
}

/// Looks up a tag. A missing row is an error only when `fail_if_not_found` is set.
pub async fn get_one_tag<C: ConnectionTrait>(
    db: &C,
    tag_id: i32,
    fail_if_not_found: bool,
) -> Result<Option<tag::Model>, AppError> {
    let found = tag::Entity::find_by_id(tag_id).one(db).await?;
    if found.is_none() && fail_if_not_found {
        return Err(AppError::not_found(ENTITY, tag_id));
    }
    Ok(found)
}

pub async fn get_tag<C: ConnectionTrait>(db: &C, tag_id: i32) -> Result<tag::Model, AppError> {
    get_one_tag(db, tag_id, true)
        .await?
        .ok_or(AppError::not_found(ENTITY, tag_id))
}

pub async fn create_tag<C: ConnectionTrait>(
    db: &C,
    attributes: &Map<String, Value>,
) -> Result<tag::Model, AppError> {
    let changes = validation::validate_tag(attributes, Mode::Create)?;
    let result = tag::Entity::insert(changes.into_active_model())
        .exec(db)
        .await
        .map_err(map_write_error)?;
    info!(tag_id = result.last_insert_id, "Tag created.");
    get_tag(db, result.last_insert_id).await
}

pub async fn update_tag<C: ConnectionTrait>(
    db: &C,
    tag_id: i32,
    attributes: &Map<String, Value>,
) -> Result<tag::Model, AppError> {
    let changes = validation::validate_tag(attributes, Mode::Update)?;
    if !changes.is_empty() {
        let result = tag::Entity::update_many()
            .set(changes.into_active_model())
            .filter(tag::Column::Id.eq(tag_id))
            .exec(db)
            .await
            .map_err(map_write_error)?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found(ENTITY, tag_id));
        }
    }
    get_tag(db, tag_id).await
}

/// Deletes a tag; its article links go with it (ON DELETE CASCADE).
pub async fn remove_tag<C: ConnectionTrait>(
    db: &C,
    tag_id: i32,
    fail_if_not_found: bool,
) -> Result<bool, AppError> {
    let result = tag::Entity::delete_by_id(tag_id).exec(db).await?;
    if result.rows_affected > 0 {
        info!(tag_id, "Tag deleted.");
        return Ok(true);
    }
    if fail_if_not_found {
        return Err(AppError::not_found(ENTITY, tag_id));
    }
    Ok(false)
}
