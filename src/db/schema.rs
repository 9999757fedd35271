//! Creates the content tables from the entity definitions.
//!
//! Tables are created with `IF NOT EXISTS`, parents before link tables so the
//! foreign keys resolve.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::db::entities::prelude::{Article, ArticleGarden, ArticleTag, Garden, Tag, User};

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    db.execute(backend.build(statement.if_not_exists())).await?;
    Ok(())
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Article).await?;
    create_table(db, &schema, Tag).await?;
    create_table(db, &schema, Garden).await?;
    create_table(db, &schema, User).await?;
    create_table(db, &schema, ArticleTag).await?;
    create_table(db, &schema, ArticleGarden).await?;

    info!("Database schema is ready.");
    Ok(())
}
