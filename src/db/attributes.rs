//! Turns sparse change sets into sea-orm active models.
//!
//! A provided field becomes `Set(value)`; an absent field stays `NotSet` and
//! is left out of the generated INSERT/UPDATE entirely, never written as NULL.

use sea_orm::{ActiveValue, NotSet, Set};

use crate::db::entities::{article, garden, tag};
use crate::db::validation::{ArticleChanges, GardenChanges, TagChanges};

pub fn set_if_provided<V>(value: Option<V>) -> ActiveValue<V>
where
    V: Into<sea_orm::Value>,
{
    match value {
        Some(v) => Set(v),
        None => NotSet,
    }
}

impl ArticleChanges {
    pub fn into_active_model(self) -> article::ActiveModel {
        article::ActiveModel {
            title: set_if_provided(self.title),
            content: set_if_provided(self.content),
            url: set_if_provided(self.url),
            ..Default::default()
        }
    }
}

impl TagChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }

    pub fn into_active_model(self) -> tag::ActiveModel {
        tag::ActiveModel {
            name: set_if_provided(self.name),
            ..Default::default()
        }
    }
}

impl GardenChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.main_picture_url.is_none()
    }

    pub fn into_active_model(self) -> garden::ActiveModel {
        garden::ActiveModel {
            name: set_if_provided(self.name),
            main_picture_url: set_if_provided(self.main_picture_url),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provided_fields_are_set() {
        let model = ArticleChanges {
            title: Some("New".into()),
            content: None,
            url: Some(String::new()),
        }
        .into_active_model();

        assert_eq!(model.title, Set("New".to_string()));
        assert_eq!(model.url, Set(String::new()));
        assert!(model.content.is_not_set());
        assert!(model.id.is_not_set());
        assert!(model.created_at.is_not_set());
    }

    #[test]
    fn empty_changes_produce_no_assignments() {
        let changes = TagChanges::default();
        assert!(changes.is_empty());
        assert!(changes.into_active_model().name.is_not_set());
    }

    #[test]
    fn garden_picture_clear_is_an_explicit_null() {
        let changes = GardenChanges {
            name: None,
            main_picture_url: Some(None),
        };
        assert!(!changes.is_empty());
        let model = changes.into_active_model();
        assert_eq!(model.main_picture_url, Set(None));
        assert!(model.name.is_not_set());
    }
}
