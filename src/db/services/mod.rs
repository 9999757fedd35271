//! Data access for the content tables.
//!
//! Each sub-module owns one entity (articles, tags, gardens, users);
//! `link_service` holds the article association linkers. Functions take any
//! `ConnectionTrait` unless they open their own transaction.

pub mod article_service;
pub mod garden_service;
pub mod link_service;
pub mod tag_service;
pub mod user_service;

pub use article_service::*;
pub use garden_service::*;
pub use link_service::{LinkError, LinkPolicy, LinkTarget};
pub use tag_service::*;
pub use user_service::*;
