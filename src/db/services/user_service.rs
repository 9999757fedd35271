use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr};
use tracing::info;

use crate::db::entities::user;
use crate::web::error::AppError;

/// Creates a new user from an already hashed password.
pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password_hash: &str,
    is_admin: bool,
) -> Result<user::Model, AppError> {
    let new_user = user::ActiveModel {
        username: Set(username.to_owned()),
        password_hash: Set(password_hash.to_owned()),
        is_admin: Set(is_admin),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let result = user::Entity::insert(new_user)
        .exec(db)
        .await
        .map_err(|e: DbErr| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict(format!("User '{username}' already exists."))
            }
            _ => AppError::from(e),
        })?;
    info!(user_id = result.last_insert_id, username, is_admin, "User created.");

    user::Entity::find_by_id(result.last_insert_id)
        .one(db)
        .await?
        .ok_or(AppError::InternalServerError("created user could not be read back".to_string()))
}

/// Retrieves a user by their ID.
pub async fn get_user_by_id<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(user_id).one(db).await
}

/// Retrieves a user by their username.
pub async fn get_user_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
}

/// Returns the user only if it exists and has the admin flag.
pub async fn find_admin<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Option<user::Model>, DbErr> {
    Ok(get_user_by_id(db, user_id).await?.filter(|u| u.is_admin))
}
