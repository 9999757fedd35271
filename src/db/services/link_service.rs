//! Article ↔ tag and article ↔ garden association linking.
//!
//! The linkers take any `ConnectionTrait`, and callers hand them the open
//! transaction of the article write. A failed link leaves the transaction to
//! be rolled back by the caller, so the parent row and its previous links are
//! never left half-updated.

use std::collections::HashSet;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::db::entities::{article_garden, article_tag, garden, tag};
use crate::db::validation::{FieldError, PathSegment};
use crate::web::error::AppError;

/// How a new id list is applied to the garden links of an article.
///
/// Tags are always replaced. Gardens historically only appended, so the
/// policy is explicit and configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkPolicy {
    /// Delete prior links, then insert the given ids. An empty list clears.
    #[default]
    ReplaceAll,
    /// Keep prior links and add the ids not linked yet. An empty list is a no-op.
    Append,
}

impl std::str::FromStr for LinkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace-all" | "replace_all" | "replace" => Ok(LinkPolicy::ReplaceAll),
            "append" => Ok(LinkPolicy::Append),
            other => Err(format!("unknown link policy '{other}' (expected 'replace-all' or 'append')")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Tags,
    Gardens,
}

impl LinkTarget {
    /// Name of the id list in request payloads.
    pub fn field(self) -> &'static str {
        match self {
            LinkTarget::Tags => "tags",
            LinkTarget::Gardens => "garden",
        }
    }

    fn link_path(self) -> &'static str {
        match self {
            LinkTarget::Tags => "tagToArticle",
            LinkTarget::Gardens => "gardenToArticle",
        }
    }

    fn entity(self) -> &'static str {
        match self {
            LinkTarget::Tags => "tag",
            LinkTarget::Gardens => "garden",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            LinkTarget::Tags => "tags",
            LinkTarget::Gardens => "gardens",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("could not link article {article_id} to its {}", .target.plural())]
    Rejected {
        target: LinkTarget,
        article_id: i32,
        /// `(position in the request, id)` of every id that does not exist.
        missing: Vec<(usize, i32)>,
        /// Store error raised by the bulk insert, if that is what failed.
        cause: Option<String>,
    },
}

impl LinkError {
    /// Converts into the API error. `outcome` tells the client what happened
    /// to the parent article, e.g. "the article was removed".
    pub fn into_app_error(self, outcome: &str) -> AppError {
        match self {
            LinkError::DbErr(err) => AppError::from(err),
            LinkError::Rejected { target, missing, .. } => {
                let mut details = vec![FieldError::new(
                    vec![PathSegment::from(target.link_path())],
                    "insertionError",
                    format!(
                        "there was a problem to link the article to its {}, {outcome}",
                        target.plural()
                    ),
                )];
                details.extend(missing.into_iter().map(|(index, id)| {
                    FieldError::new(
                        vec![PathSegment::from(target.field()), PathSegment::from(index)],
                        "any.invalid",
                        format!("{} {id} does not exist", target.entity()),
                    )
                }));
                AppError::Validation(details)
            }
        }
    }
}

/// Ids in first-seen order with repeats removed.
fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn missing_ids(requested: &[i32], existing: &HashSet<i32>) -> Vec<(usize, i32)> {
    requested
        .iter()
        .enumerate()
        .filter(|(_, id)| !existing.contains(*id))
        .map(|(index, id)| (index, *id))
        .collect()
}

async fn existing_tag_ids<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> Result<HashSet<i32>, DbErr> {
    let found: Vec<i32> = tag::Entity::find()
        .select_only()
        .column(tag::Column::Id)
        .filter(tag::Column::Id.is_in(ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(found.into_iter().collect())
}

async fn existing_garden_ids<C: ConnectionTrait>(
    conn: &C,
    ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    let found: Vec<i32> = garden::Entity::find()
        .select_only()
        .column(garden::Column::Id)
        .filter(garden::Column::Id.is_in(ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(found.into_iter().collect())
}

pub async fn clear_tag_links<C: ConnectionTrait>(conn: &C, article_id: i32) -> Result<u64, DbErr> {
    let result = article_tag::Entity::delete_many()
        .filter(article_tag::Column::ArticleId.eq(article_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn clear_garden_links<C: ConnectionTrait>(conn: &C, article_id: i32) -> Result<u64, DbErr> {
    let result = article_garden::Entity::delete_many()
        .filter(article_garden::Column::ArticleId.eq(article_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Replaces the tag links of `article_id` with `tag_ids`.
///
/// An empty list clears the links. Every id must exist; otherwise nothing is
/// inserted and `LinkError::Rejected` lists the missing ones.
pub async fn link_article_to_tags<C: ConnectionTrait>(
    conn: &C,
    article_id: i32,
    tag_ids: &[i32],
) -> Result<(), LinkError> {
    let removed = clear_tag_links(conn, article_id).await?;
    debug!(article_id, removed, "Cleared previous tag links.");
    if tag_ids.is_empty() {
        return Ok(());
    }

    let existing = existing_tag_ids(conn, tag_ids).await?;
    let missing = missing_ids(tag_ids, &existing);
    if !missing.is_empty() {
        return Err(LinkError::Rejected {
            target: LinkTarget::Tags,
            article_id,
            missing,
            cause: None,
        });
    }

    let rows = dedup_ids(tag_ids)
        .into_iter()
        .map(|tag_id| article_tag::ActiveModel {
            article_id: Set(article_id),
            tag_id: Set(tag_id),
        });
    if let Err(e) = article_tag::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await
    {
        warn!(article_id, error = %e, "Bulk insert of tag links failed.");
        return Err(LinkError::Rejected {
            target: LinkTarget::Tags,
            article_id,
            missing: Vec::new(),
            cause: Some(e.to_string()),
        });
    }
    Ok(())
}

/// Applies `garden_ids` to the garden links of `article_id` under `policy`.
pub async fn link_article_to_gardens<C: ConnectionTrait>(
    conn: &C,
    article_id: i32,
    garden_ids: &[i32],
    policy: LinkPolicy,
) -> Result<(), LinkError> {
    if policy == LinkPolicy::ReplaceAll {
        let removed = clear_garden_links(conn, article_id).await?;
        debug!(article_id, removed, "Cleared previous garden links.");
    }
    if garden_ids.is_empty() {
        return Ok(());
    }

    let existing = existing_garden_ids(conn, garden_ids).await?;
    let missing = missing_ids(garden_ids, &existing);
    if !missing.is_empty() {
        return Err(LinkError::Rejected {
            target: LinkTarget::Gardens,
            article_id,
            missing,
            cause: None,
        });
    }

    let mut ids = dedup_ids(garden_ids);
    if policy == LinkPolicy::Append {
        let linked: HashSet<i32> = linked_garden_ids(conn, article_id).await?.into_iter().collect();
        ids.retain(|id| !linked.contains(id));
        if ids.is_empty() {
            return Ok(());
        }
    }

    let rows = ids.into_iter().map(|garden_id| article_garden::ActiveModel {
        article_id: Set(article_id),
        garden_id: Set(garden_id),
    });
    if let Err(e) = article_garden::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await
    {
        warn!(article_id, error = %e, "Bulk insert of garden links failed.");
        return Err(LinkError::Rejected {
            target: LinkTarget::Gardens,
            article_id,
            missing: Vec::new(),
            cause: Some(e.to_string()),
        });
    }
    Ok(())
}

/// Tag ids linked to an article, one entry per link row.
pub async fn linked_tag_ids<C: ConnectionTrait>(conn: &C, article_id: i32) -> Result<Vec<i32>, DbErr> {
    article_tag::Entity::find()
        .select_only()
        .column(article_tag::Column::TagId)
        .filter(article_tag::Column::ArticleId.eq(article_id))
        .order_by_asc(article_tag::Column::TagId)
        .into_tuple()
        .all(conn)
        .await
}

/// Garden ids linked to an article, one entry per link row.
pub async fn linked_garden_ids<C: ConnectionTrait>(
    conn: &C,
    article_id: i32,
) -> Result<Vec<i32>, DbErr> {
    article_garden::Entity::find()
        .select_only()
        .column(article_garden::Column::GardenId)
        .filter(article_garden::Column::ArticleId.eq(article_id))
        .order_by_asc(article_garden::Column::GardenId)
        .into_tuple()
        .all(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn missing_ids_report_request_positions() {
        let existing: HashSet<i32> = [1, 2].into_iter().collect();
        assert_eq!(missing_ids(&[1, 9, 2, 7], &existing), vec![(1, 9), (3, 7)]);
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("append".parse::<LinkPolicy>().unwrap(), LinkPolicy::Append);
        assert_eq!("Replace-All".parse::<LinkPolicy>().unwrap(), LinkPolicy::ReplaceAll);
        assert!("merge".parse::<LinkPolicy>().is_err());
    }

    #[test]
    fn rejection_lists_every_missing_id() {
        let err = LinkError::Rejected {
            target: LinkTarget::Tags,
            article_id: 4,
            missing: vec![(0, 999), (2, 1000)],
            cause: None,
        };
        let AppError::Validation(details) = err.into_app_error("the article was removed") else {
            panic!("expected a validation error");
        };
        assert_eq!(details.len(), 3);
        assert_eq!(details[0].kind, "insertionError");
        assert_eq!(details[0].path, vec![PathSegment::Key("tagToArticle".into())]);
        assert!(details[0].message.ends_with("the article was removed"));
        assert_eq!(details[2].message, "tag 1000 does not exist");
        assert_eq!(
            details[2].path,
            vec![PathSegment::Key("tags".into()), PathSegment::Index(2)]
        );
    }
}
