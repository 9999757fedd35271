use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "garden")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub main_picture_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article_garden::Entity")]
    ArticleGarden,
}

impl Related<super::article_garden::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ArticleGarden.def()
    }
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        super::article_garden::Relation::Article.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::article_garden::Relation::Garden.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
