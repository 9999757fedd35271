use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::{Map, Value};
use tracing::info;

use crate::db::entities::garden;
use crate::db::validation::{self, Mode};
use crate::web::error::AppError;

const ENTITY: &str = "garden";

pub async fn get_gardens<C: ConnectionTrait>(db: &C) -> Result<Vec<garden::Model>, AppError> {
    Ok(garden::Entity::find().order_by_asc(garden::Column::Id).all(db).await?)
}

pub async fn get_one_garden<C: ConnectionTrait>(
    db: &C,
    garden_id: i32,
    fail_if_not_found: bool,
) -> Result<Option<garden::Model>, AppError> {
    let found = garden::Entity::find_by_id(garden_id).one(db).await?;
    if found.is_none() && fail_if_not_found {
        return Err(AppError::not_found(ENTITY, garden_id));
    }
    Ok(found)
}

pub async fn get_garden<C: ConnectionTrait>(db: &C, garden_id: i32) -> Result<garden::Model, AppError> {
    get_one_garden(db, garden_id, true)
        .await?
        .ok_or(AppError::not_found(ENTITY, garden_id))
}

/// Creates a garden. `main_picture_url` is usually the stored path of an
/// uploaded file, filled in by the route handler.
pub async fn create_garden<C: ConnectionTrait>(
    db: &C,
    attributes: &Map<String, Value>,
) -> Result<garden::Model, AppError> {
    let changes = validation::validate_garden(attributes, Mode::Create)?;
    let result = garden::Entity::insert(changes.into_active_model())
        .exec(db)
        .await?;
    info!(garden_id = result.last_insert_id, "Garden created.");
    get_garden(db, result.last_insert_id).await
}

pub async fn update_garden<C: ConnectionTrait>(
    db: &C,
    garden_id: i32,
    attributes: &Map<String, Value>,
) -> Result<garden::Model, AppError> {
    let changes = validation::validate_garden(attributes, Mode::Update)?;
    if !changes.is_empty() {
        let result = garden::Entity::update_many()
            .set(changes.into_active_model())
            .filter(garden::Column::Id.eq(garden_id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found(ENTITY, garden_id));
        }
    }
    get_garden(db, garden_id).await
}

pub async fn remove_garden<C: ConnectionTrait>(
    db: &C,
    garden_id: i32,
    fail_if_not_found: bool,
) -> Result<bool, AppError> {
    let result = garden::Entity::delete_by_id(garden_id).exec(db).await?;
    if result.rows_affected > 0 {
        info!(garden_id, "Garden deleted.");
        return Ok(true);
    }
    if fail_if_not_found {
        return Err(AppError::not_found(ENTITY, garden_id));
    }
    Ok(false)
}
