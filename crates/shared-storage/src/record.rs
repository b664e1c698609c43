//! # Records and Tags
//!
//! A record is a serializable entity plus a flat set of tags. Tags are a
//! derived projection of the record's fields; the query layer only sees tags.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A queryable tag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    String(String),
    Bool(bool),
    /// Matches a query value if the list contains it.
    List(Vec<String>),
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::String(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::String(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<Vec<String>> for TagValue {
    fn from(value: Vec<String>) -> Self {
        TagValue::List(value)
    }
}

/// Tag map of a record.
pub type Tags = BTreeMap<String, TagValue>;

/// Builder-style helpers for composing default tags.
pub trait TagsExt {
    /// Insert a tag when the value is present.
    fn insert_opt<V: Into<TagValue>>(&mut self, key: &str, value: Option<V>);
}

impl TagsExt for Tags {
    fn insert_opt<V: Into<TagValue>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key.to_string(), value.into());
        }
    }
}

/// A persisted entity.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Record type name, used as the storage category.
    const RECORD_TYPE: &'static str;

    /// Unique, immutable id.
    fn id(&self) -> &str;

    /// Tags computed from the record's fields.
    fn default_tags(&self) -> Tags;

    /// Free-form tags set by the application.
    fn custom_tags(&self) -> &Tags;

    /// Set by the repository on every update.
    fn set_updated_at(&mut self, updated_at: DateTime<Utc>);

    /// Default tags merged with custom tags. Default tags win on conflict.
    fn tags(&self) -> Tags {
        let mut tags = self.custom_tags().clone();
        tags.extend(self.default_tags());
        tags
    }
}
