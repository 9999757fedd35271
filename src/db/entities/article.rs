use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "article")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub url: String,
    pub created_at: ChronoDateTimeUtc,
    // Only ever written by an update.
    pub updated_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article_tag::Entity")]
    ArticleTag,
    #[sea_orm(has_many = "super::article_garden::Entity")]
    ArticleGarden,
}

impl Related<super::article_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ArticleTag.def()
    }
}

impl Related<super::article_garden::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ArticleGarden.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::article_tag::Relation::Tag.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::article_tag::Relation::Article.def().rev())
    }
}

impl Related<super::garden::Entity> for Entity {
    fn to() -> RelationDef {
        super::article_garden::Relation::Garden.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::article_garden::Relation::Article.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
