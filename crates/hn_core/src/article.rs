use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::Document;
use crate::{timestamp, Error, Result};

pub const ID_FIELD: &str = "id";
pub const CATEGORY_FIELD: &str = "category";
pub const SLUG_FIELD: &str = "slug";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// A news article as returned to callers. Serializes flat: the well known
/// keys next to every other attribute the document carried. `timestamp` is
/// the value exactly as stored; `published` is its decoded instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(skip)]
    pub published: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Article {
    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }
}

impl TryFrom<Document> for Article {
    type Error = Error;

    /// Normalize a raw store document. Fails instead of guessing when one of
    /// the well known fields has an unexpected shape.
    fn try_from(document: Document) -> Result<Self> {
        let Document { id, mut fields } = document;
        if id.is_empty() {
            return Err(Error::QueryFailed("document without an id".to_string()));
        }

        fields.remove(ID_FIELD);
        fields.remove("_id");

        let category = match fields.remove(CATEGORY_FIELD) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => return Err(malformed(&id, CATEGORY_FIELD, &other)),
        };

        let slug = match fields.remove(SLUG_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => return Err(malformed(&id, SLUG_FIELD, &other)),
        };

        let (timestamp, published) = match fields.remove(TIMESTAMP_FIELD) {
            None | Some(Value::Null) => (None, None),
            Some(raw) => match timestamp::parse(&raw) {
                Some(ts) => (Some(raw), Some(ts)),
                None => return Err(malformed(&id, TIMESTAMP_FIELD, &raw)),
            },
        };

        Ok(Self { id, category, slug, timestamp, published, fields })
    }
}

fn malformed(id: &str, field: &str, value: &Value) -> Error {
    Error::QueryFailed(format!("document {} has a malformed {} field: {}", id, field, value))
}
