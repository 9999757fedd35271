//! SeaORM entities for the content tables.
//!
//! Link tables (`article_tag`, `article_garden`) use the id pair as their
//! composite primary key and cascade on delete of either side.

pub mod article;
pub mod article_garden;
pub mod article_tag;
pub mod garden;
pub mod tag;
pub mod user;

pub mod prelude {
    pub use super::article::Entity as Article;
    pub use super::article_garden::Entity as ArticleGarden;
    pub use super::article_tag::Entity as ArticleTag;
    pub use super::garden::Entity as Garden;
    pub use super::tag::Entity as Tag;
    pub use super::user::Entity as User;
}
