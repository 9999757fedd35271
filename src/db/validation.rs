//! Attribute validation for incoming entity payloads.
//!
//! Payloads arrive as raw JSON objects so that every field can be checked in
//! one pass: a wrong type on `title` does not hide a missing `content`. The
//! checks produce typed change sets (`ArticleChanges`, `TagChanges`,
//! `GardenChanges`) whose absent fields are simply `None`.
//!
//! | Entity  | Field              | Create                          | Update                    |
//! |---------|--------------------|---------------------------------|---------------------------|
//! | article | title, url         | required string, ≤ 150 chars    | optional, empty/null ok   |
//! | article | content            | required non-empty string       | optional, empty/null ok   |
//! | article | updated_at         | ignored                         | optional valid date       |
//! | tag     | name               | required non-empty, ≤ 100 chars | optional                  |
//! | garden  | name               | required non-empty, ≤ 150 chars | optional                  |
//! | garden  | main_picture_url   | optional string or null         | optional string or null   |

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};

pub const MAX_TITLE_LEN: usize = 150;
pub const MAX_URL_LEN: usize = 150;
pub const MAX_TAG_NAME_LEN: usize = 100;
pub const MAX_GARDEN_NAME_LEN: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// One element of the path to an offending value, e.g. `["tags", 2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// A single validation failure as reported to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub path: Vec<PathSegment>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(path: Vec<PathSegment>, kind: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path,
            kind: kind.to_string(),
        }
    }

    pub(crate) fn at(field: &str, kind: &str, message: impl Into<String>) -> Self {
        Self::new(vec![field.into()], kind, message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChanges {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GardenChanges {
    pub name: Option<String>,
    /// `Some(None)` clears the picture, `None` leaves it alone.
    pub main_picture_url: Option<Option<String>>,
}

struct StringRule {
    field: &'static str,
    max_len: Option<usize>,
    allow_empty: bool,
}

/// Checks one string field; returns the value when it is present and valid.
fn check_string(
    attrs: &Map<String, Value>,
    rule: &StringRule,
    mode: Mode,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let field = rule.field;
    match attrs.get(field) {
        None => {
            if mode == Mode::Create {
                errors.push(FieldError::at(
                    field,
                    "any.required",
                    format!("\"{field}\" is required"),
                ));
            }
            None
        }
        Some(Value::Null) if mode == Mode::Update => None,
        Some(Value::String(s)) => {
            if s.is_empty() {
                if mode == Mode::Create && !rule.allow_empty {
                    errors.push(FieldError::at(
                        field,
                        "string.empty",
                        format!("\"{field}\" is not allowed to be empty"),
                    ));
                    return None;
                }
                return Some(String::new());
            }
            if let Some(max) = rule.max_len {
                if s.chars().count() > max {
                    errors.push(FieldError::at(
                        field,
                        "string.max",
                        format!("\"{field}\" length must be less than or equal to {max} characters long"),
                    ));
                    return None;
                }
            }
            Some(s.clone())
        }
        Some(_) => {
            errors.push(FieldError::at(
                field,
                "string.base",
                format!("\"{field}\" must be a string"),
            ));
            None
        }
    }
}

fn check_unknown_keys(attrs: &Map<String, Value>, allowed: &[&str], errors: &mut Vec<FieldError>) {
    for key in attrs.keys() {
        if !allowed.contains(&key.as_str()) {
            errors.push(FieldError::at(
                key,
                "object.unknown",
                format!("\"{key}\" is not allowed"),
            ));
        }
    }
}

fn is_valid_date(value: &Value) -> bool {
    match value {
        Value::String(s) => {
            DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        }
        Value::Number(n) => n.is_i64() || n.is_u64(),
        _ => false,
    }
}

fn finish<T>(value: T, errors: Vec<FieldError>) -> Result<T, Vec<FieldError>> {
    if errors.is_empty() { Ok(value) } else { Err(errors) }
}

pub fn validate_article(
    attrs: &Map<String, Value>,
    mode: Mode,
) -> Result<ArticleChanges, Vec<FieldError>> {
    let mut errors = Vec::new();
    check_unknown_keys(attrs, &["title", "content", "url", "updated_at"], &mut errors);

    let title = check_string(
        attrs,
        &StringRule { field: "title", max_len: Some(MAX_TITLE_LEN), allow_empty: true },
        mode,
        &mut errors,
    );
    let content = check_string(
        attrs,
        &StringRule { field: "content", max_len: None, allow_empty: false },
        mode,
        &mut errors,
    );
    let url = check_string(
        attrs,
        &StringRule { field: "url", max_len: Some(MAX_URL_LEN), allow_empty: true },
        mode,
        &mut errors,
    );

    if mode == Mode::Update {
        if let Some(value) = attrs.get("updated_at") {
            if !value.is_null() && !is_valid_date(value) {
                errors.push(FieldError::at(
                    "updated_at",
                    "date.base",
                    "\"updated_at\" must be a valid date",
                ));
            }
        }
    }

    finish(ArticleChanges { title, content, url }, errors)
}

pub fn validate_tag(attrs: &Map<String, Value>, mode: Mode) -> Result<TagChanges, Vec<FieldError>> {
    let mut errors = Vec::new();
    check_unknown_keys(attrs, &["name"], &mut errors);
    let name = check_string(
        attrs,
        &StringRule { field: "name", max_len: Some(MAX_TAG_NAME_LEN), allow_empty: false },
        mode,
        &mut errors,
    );
    finish(TagChanges { name }, errors)
}

pub fn validate_garden(
    attrs: &Map<String, Value>,
    mode: Mode,
) -> Result<GardenChanges, Vec<FieldError>> {
    let mut errors = Vec::new();
    check_unknown_keys(attrs, &["name", "main_picture_url"], &mut errors);
    let name = check_string(
        attrs,
        &StringRule { field: "name", max_len: Some(MAX_GARDEN_NAME_LEN), allow_empty: false },
        mode,
        &mut errors,
    );
    let main_picture_url = match attrs.get("main_picture_url") {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(s)) => Some(Some(s.clone())),
        Some(_) => {
            errors.push(FieldError::at(
                "main_picture_url",
                "string.base",
                "\"main_picture_url\" must be a string",
            ));
            None
        }
    };
    finish(GardenChanges { name, main_picture_url }, errors)
}

/// `None` when the number has a fractional part, `Some(Err)` when it is
/// integral but does not fit an id. `3.0` counts as the integer 3.
fn integral_id(n: &serde_json::Number) -> Option<Result<i32, ()>> {
    if let Some(id) = n.as_i64() {
        return Some(i32::try_from(id).map_err(|_| ()));
    }
    if n.as_u64().is_some() {
        return Some(Err(()));
    }
    let value = n.as_f64()?;
    if value.fract() != 0.0 {
        return None;
    }
    if value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Some(Ok(value as i32))
    } else {
        Some(Err(()))
    }
}

/// Checks the shape of an id list (`tags`, `garden`).
///
/// Every element must be an integer that fits an `i32` id; all offending
/// elements are reported. Existence is checked later against the live table.
pub fn validate_id_array(field: &str, value: &Value) -> Result<Vec<i32>, Vec<FieldError>> {
    let Value::Array(items) = value else {
        return Err(vec![FieldError::at(
            field,
            "array.base",
            format!("\"{field}\" must be an array"),
        )]);
    };

    let mut ids = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let path = vec![PathSegment::from(field), PathSegment::from(index)];
        let label = format!("\"{field}[{index}]\"");
        match item {
            Value::Number(n) => match integral_id(n) {
                Some(Ok(id)) => ids.push(id),
                Some(Err(())) => errors.push(FieldError::new(
                    path,
                    "number.unsafe",
                    format!("{label} must be a safe number"),
                )),
                None => errors.push(FieldError::new(
                    path,
                    "number.integer",
                    format!("{label} must be an integer"),
                )),
            },
            _ => errors.push(FieldError::new(
                path,
                "number.base",
                format!("{label} must be a number"),
            )),
        }
    }
    finish(ids, errors)
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

    fn kinds(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.kind.as_str()).collect()
    }

    #[test]
    fn create_accepts_complete_article() {
        let changes = validate_article(
            &obj(json!({ "title": "A", "content": "B", "url": "a" })),
            Mode::Create,
        )
        .unwrap();
        assert_eq!(changes.title.as_deref(), Some("A"));
        assert_eq!(changes.content.as_deref(), Some("B"));
        assert_eq!(changes.url.as_deref(), Some("a"));
    }

    #[test]
    fn create_collects_every_error() {
        let errors = validate_article(
            &obj(json!({ "title": 12, "url": "x".repeat(151) })),
            Mode::Create,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(kinds(&errors), vec!["string.base", "any.required", "string.max"]);
        assert_eq!(errors[1].path, vec![PathSegment::Key("content".into())]);
    }

    #[test]
    fn create_allows_empty_title_but_not_empty_content() {
        let errors = validate_article(
            &obj(json!({ "title": "", "content": "", "url": "" })),
            Mode::Create,
        )
        .unwrap_err();
        assert_eq!(kinds(&errors), vec!["string.empty"]);
        assert_eq!(errors[0].message, "\"content\" is not allowed to be empty");
    }

    #[test]
    fn title_limit_counts_characters_not_bytes() {
        let title = "é".repeat(MAX_TITLE_LEN);
        let result = validate_article(
            &obj(json!({ "title": title, "content": "c", "url": "u" })),
            Mode::Create,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn update_makes_everything_optional() {
        let changes = validate_article(&obj(json!({})), Mode::Update).unwrap();
        assert_eq!(changes, ArticleChanges::default());

        let changes = validate_article(
            &obj(json!({ "title": null, "content": "", "updated_at": "2024-01-02 03:04:05" })),
            Mode::Update,
        )
        .unwrap();
        assert_eq!(changes.title, None);
        assert_eq!(changes.content.as_deref(), Some(""));
    }

    #[test]
    fn update_rejects_bad_date_and_unknown_key() {
        let errors = validate_article(
            &obj(json!({ "updated_at": "yesterday", "author": "me" })),
            Mode::Update,
        )
        .unwrap_err();
        let mut found = kinds(&errors);
        found.sort();
        assert_eq!(found, vec!["date.base", "object.unknown"]);
    }

    #[test]
    fn tag_name_is_required_on_create_only() {
        assert!(validate_tag(&obj(json!({})), Mode::Create).is_err());
        assert_eq!(validate_tag(&obj(json!({})), Mode::Update).unwrap(), TagChanges::default());
        let errors = validate_tag(&obj(json!({ "name": "" })), Mode::Create).unwrap_err();
        assert_eq!(kinds(&errors), vec!["string.empty"]);
    }

    #[test]
    fn garden_picture_can_be_cleared() {
        let changes =
            validate_garden(&obj(json!({ "main_picture_url": null })), Mode::Update).unwrap();
        assert_eq!(changes.main_picture_url, Some(None));
        assert_eq!(changes.name, None);
    }

    #[test]
    fn id_array_reports_each_bad_element() {
        let errors = validate_id_array("tags", &json!([1, "two", 3.5, 4_000_000_000u64])).unwrap_err();
        assert_eq!(kinds(&errors), vec!["number.base", "number.integer", "number.unsafe"]);
        assert_eq!(
            errors[0].path,
            vec![PathSegment::Key("tags".into()), PathSegment::Index(1)]
        );
    }

    #[test]
    fn id_array_requires_an_array() {
        let errors = validate_id_array("garden", &json!(7)).unwrap_err();
        assert_eq!(kinds(&errors), vec!["array.base"]);
        assert_eq!(validate_id_array("garden", &json!([3, 1])).unwrap(), vec![3, 1]);
    }

    #[test]
    fn whole_floats_count_as_ids() {
        assert_eq!(validate_id_array("tags", &json!([3.0, 4])).unwrap(), vec![3, 4]);

        let errors = validate_id_array("tags", &json!([1.5, 1e12])).unwrap_err();
        assert_eq!(kinds(&errors), vec!["number.integer", "number.unsafe"]);
        assert_eq!(errors[1].path, vec![PathSegment::from("tags"), PathSegment::from(1)]);
    }

    #[test]
    fn max_length_also_applies_on_update() {
        let title = "x".repeat(MAX_TITLE_LEN + 1);
        let errors = validate_article(&obj(json!({ "title": title })), Mode::Update).unwrap_err();
        assert_eq!(kinds(&errors), vec!["string.max"]);
    }
}
