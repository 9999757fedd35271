use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::db::entities::{article, garden, tag};
use crate::db::services::link_service::{self, LinkError, LinkPolicy, LinkTarget};
use crate::db::validation::{self, ArticleChanges, Mode};
use crate::web::error::AppError;

const ENTITY: &str = "article";

/// Id lists carried by an article payload next to its attributes.
/// `None` means the key was absent and the links are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleLinks {
    pub tags: Option<Vec<i32>>,
    pub garden: Option<Vec<i32>>,
}

/// An article together with the tags and gardens it is linked to.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetails {
    #[serde(flatten)]
    pub article: article::Model,
    pub tags: Vec<tag::Model>,
    pub garden: Vec<garden::Model>,
}

/// Splits a request body into validated attributes and link id lists.
/// Errors from all three parts are reported together.
pub fn parse_article_payload(
    mut payload: Map<String, Value>,
    mode: Mode,
) -> Result<(ArticleChanges, ArticleLinks), AppError> {
    let tags_value = payload.remove(LinkTarget::Tags.field());
    let garden_value = payload.remove(LinkTarget::Gardens.field());
    let mut errors = Vec::new();

    let changes = match validation::validate_article(&payload, mode) {
        Ok(changes) => changes,
        Err(e) => {
            errors.extend(e);
            ArticleChanges::default()
        }
    };

    let mut parse_ids = |field: &str, value: Option<Value>| match value {
        None | Some(Value::Null) => None,
        Some(value) => match validation::validate_id_array(field, &value) {
            Ok(ids) => Some(ids),
            Err(e) => {
                errors.extend(e);
                None
            }
        },
    };
    let links = ArticleLinks {
        tags: parse_ids(LinkTarget::Tags.field(), tags_value),
        garden: parse_ids(LinkTarget::Gardens.field(), garden_value),
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok((changes, links))
}

/// Retrieves all articles, newest first.
pub async fn get_articles<C: ConnectionTrait>(db: &C) -> Result<Vec<article::Model>, AppError> {
    Ok(article::Entity::find()
        .order_by_desc(article::Column::CreatedAt)
        .order_by_desc(article::Column::Id)
        .all(db)
        .await?)
}

/// Looks up an article. A missing row is an error only when `fail_if_not_found` is set.
pub async fn get_one_article<C: ConnectionTrait>(
    db: &C,
    article_id: i32,
    fail_if_not_found: bool,
) -> Result<Option<article::Model>, AppError> {
    let found = article::Entity::find_by_id(article_id).one(db).await?;
    if found.is_none() && fail_if_not_found {
        return Err(AppError::not_found(ENTITY, article_id));
    }
    Ok(found)
}

pub async fn get_article<C: ConnectionTrait>(db: &C, article_id: i32) -> Result<article::Model, AppError> {
    get_one_article(db, article_id, true)
        .await?
        .ok_or(AppError::not_found(ENTITY, article_id))
}

pub async fn get_article_details<C: ConnectionTrait>(
    db: &C,
    article_id: i32,
) -> Result<ArticleDetails, AppError> {
    let article = get_article(db, article_id).await?;
    let tags = article
        .find_related(tag::Entity)
        .order_by_asc(tag::Column::Id)
        .all(db)
        .await?;
    let garden = article
        .find_related(garden::Entity)
        .order_by_asc(garden::Column::Id)
        .all(db)
        .await?;
    Ok(ArticleDetails { article, tags, garden })
}

async fn apply_links(
    txn: &DatabaseTransaction,
    article_id: i32,
    links: &ArticleLinks,
    garden_policy: LinkPolicy,
) -> Result<(), LinkError> {
    if let Some(tag_ids) = &links.tags {
        link_service::link_article_to_tags(txn, article_id, tag_ids).await?;
    }
    if let Some(garden_ids) = &links.garden {
        link_service::link_article_to_gardens(txn, article_id, garden_ids, garden_policy).await?;
    }
    Ok(())
}

/// Creates an article and links it to the given tags and gardens.
///
/// The insert and the links share one transaction. If linking fails the
/// transaction is rolled back and the article does not exist afterwards.
pub async fn create_article(
    db: &DatabaseConnection,
    payload: Map<String, Value>,
    garden_policy: LinkPolicy,
) -> Result<article::Model, AppError> {
    let (changes, links) = parse_article_payload(payload, Mode::Create)?;

    let mut new_article = changes.into_active_model();
    new_article.created_at = Set(Utc::now());

    let txn = db.begin().await?;
    let article_id = match article::Entity::insert(new_article).exec(&txn).await {
        Ok(result) => result.last_insert_id,
        Err(e) => {
            txn.rollback().await?;
            return Err(e.into());
        }
    };

    if let Err(e) = apply_links(&txn, article_id, &links, garden_policy).await {
        warn!(article_id, error = %e, "Linking failed, rolling back article creation.");
        txn.rollback().await?;
        return Err(e.into_app_error("the article was removed"));
    }
    txn.commit().await?;

    info!(article_id, "Article created.");
    get_article(db, article_id).await
}

/// Updates the provided attributes of an article and re-applies its links.
///
/// `updated_at` is always stamped. On a linking failure nothing is written:
/// the attributes and the previous links stay as they were.
pub async fn update_article(
    db: &DatabaseConnection,
    article_id: i32,
    payload: Map<String, Value>,
    garden_policy: LinkPolicy,
) -> Result<article::Model, AppError> {
    let (changes, links) = parse_article_payload(payload, Mode::Update)?;

    let mut changed = changes.into_active_model();
    changed.updated_at = Set(Some(Utc::now()));

    let txn = db.begin().await?;
    let updated = article::Entity::update_many()
        .set(changed)
        .filter(article::Column::Id.eq(article_id))
        .exec(&txn)
        .await;
    match updated {
        Ok(result) if result.rows_affected > 0 => {}
        Ok(_) => {
            txn.rollback().await?;
            return Err(AppError::not_found(ENTITY, article_id));
        }
        Err(e) => {
            txn.rollback().await?;
            return Err(e.into());
        }
    }

    if let Err(e) = apply_links(&txn, article_id, &links, garden_policy).await {
        warn!(article_id, error = %e, "Linking failed, rolling back article update.");
        txn.rollback().await?;
        return Err(e.into_app_error("the article was left unchanged"));
    }
    txn.commit().await?;

    info!(article_id, "Article updated.");
    get_article(db, article_id).await
}

/// Deletes an article; its link rows go with it (ON DELETE CASCADE).
pub async fn remove_article<C: ConnectionTrait>(
    db: &C,
    article_id: i32,
    fail_if_not_found: bool,
) -> Result<bool, AppError> {
    let result = article::Entity::delete_by_id(article_id).exec(db).await?;
    if result.rows_affected > 0 {
        info!(article_id, "Article deleted.");
        return Ok(true);
    }
    if fail_if_not_found {
        return Err(AppError::not_found(ENTITY, article_id));
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn payload_split_separates_links_from_attributes() {
        let (changes, links) = parse_article_payload(
            obj(json!({ "title": "A", "content": "B", "url": "a", "tags": [1, 2], "garden": [] })),
            Mode::Create,
        )
        .unwrap();
        assert_eq!(changes.title.as_deref(), Some("A"));
        assert_eq!(links.tags, Some(vec![1, 2]));
        assert_eq!(links.garden, Some(vec![]));
    }

    #[test]
    fn absent_or_null_links_are_left_alone() {
        let (_, links) =
            parse_article_payload(obj(json!({ "title": "t", "tags": null })), Mode::Update).unwrap();
        assert_eq!(links, ArticleLinks::default());
    }

    #[test]
    fn payload_errors_are_merged() {
        let err = parse_article_payload(
            obj(json!({ "title": 5, "content": "c", "url": "u", "tags": ["x"], "garden": 3 })),
            Mode::Create,
        )
        .unwrap_err();
        let AppError::Validation(details) = err else {
            panic!("expected a validation error");
        };
        let kinds: Vec<&str> = details.iter().map(|d| d.kind.as_str()).collect();
        assert_eq!(kinds, vec!["string.base", "number.base", "array.base"]);
    }
}
