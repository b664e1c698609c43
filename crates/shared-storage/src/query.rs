//! # Tag Queries
//!
//! ```text
//! Query::and(vec![
//!     Query::eq("connectionId", "c-1"),
//!     Query::eq("role", "responder"),
//! ])
//! ```

use std::fmt;

use crate::record::{TagValue, Tags};

/// A boolean expression over record tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Matches every record.
    All,
    /// Tag equals value (or, for list tags, contains it).
    Equals(String, TagValue),
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
}

impl Query {
    pub fn eq(key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        Query::Equals(key.into(), value.into())
    }

    /// Equality on an optional value; `None` places no constraint.
    pub fn eq_opt(key: impl Into<String>, value: Option<impl Into<TagValue>>) -> Self {
        match value {
            Some(value) => Query::eq(key, value),
            None => Query::All,
        }
    }

    pub fn and(queries: Vec<Query>) -> Self {
        Query::And(queries)
    }

    pub fn or(queries: Vec<Query>) -> Self {
        Query::Or(queries)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(query: Query) -> Self {
        Query::Not(Box::new(query))
    }

    /// Evaluate the query against a tag set.
    pub fn matches(&self, tags: &Tags) -> bool {
        match self {
            Query::All => true,
            Query::Equals(key, expected) => match (tags.get(key), expected) {
                (Some(TagValue::List(values)), TagValue::String(value)) => values.contains(value),
                (Some(actual), expected) => actual == expected,
                (None, _) => false,
            },
            Query::And(queries) => queries.iter().all(|q| q.matches(tags)),
            Query::Or(queries) => queries.iter().any(|q| q.matches(tags)),
            Query::Not(query) => !query.matches(tags),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::All => f.write_str("*"),
            Query::Equals(key, value) => match value {
                TagValue::String(v) => write!(f, "{}={}", key, v),
                TagValue::Bool(v) => write!(f, "{}={}", key, v),
                TagValue::List(v) => write!(f, "{}={:?}", key, v),
            },
            Query::And(queries) => write_joined(f, queries, " AND "),
            Query::Or(queries) => write_joined(f, queries, " OR "),
            Query::Not(query) => write!(f, "NOT ({})", query),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, queries: &[Query], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, query) in queries.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", query)?;
    }
    f.write_str(")")
}

/// Paging for multi-record queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl QueryOptions {
    /// Apply paging to an already filtered result set.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0);
        let iter = items.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> Tags {
        let mut tags = Tags::new();
        tags.insert("connectionId".into(), "c-1".into());
        tags.insert("role".into(), "responder".into());
        tags.insert("keys".into(), vec!["k1".to_string(), "k2".to_string()].into());
        tags.insert("active".into(), true.into());
        tags
    }

    #[test]
    fn test_equals_and_and() {
        let query = Query::and(vec![
            Query::eq("connectionId", "c-1"),
            Query::eq("role", "responder"),
        ]);
        assert!(query.matches(&tags()));
        assert!(!Query::eq("role", "requester").matches(&tags()));
    }

    #[test]
    fn test_missing_tag_never_matches() {
        assert!(!Query::eq("threadId", "t-1").matches(&tags()));
    }

    #[test]
    fn test_eq_opt_none_is_unconstrained() {
        let query = Query::and(vec![
            Query::eq("connectionId", "c-1"),
            Query::eq_opt("threadId", None::<String>),
        ]);
        assert!(query.matches(&tags()));
    }

    #[test]
    fn test_list_contains_or_not() {
        assert!(Query::eq("keys", "k2").matches(&tags()));
        assert!(Query::or(vec![Query::eq("keys", "zz"), Query::eq("active", true)]).matches(&tags()));
        assert!(Query::not(Query::eq("keys", "zz")).matches(&tags()));
    }

    #[test]
    fn test_query_options_paging() {
        let options = QueryOptions {
            limit: Some(2),
            offset: Some(1),
        };
        assert_eq!(options.apply(vec![1, 2, 3, 4]), vec![2, 3]);
        assert_eq!(QueryOptions::default().apply(vec![1, 2]), vec![1, 2]);
    }

    #[test]
    fn test_display() {
        let query = Query::and(vec![Query::eq("a", "1"), Query::not(Query::eq("b", "2"))]);
        assert_eq!(query.to_string(), "(a=1 AND NOT (b=2))");
    }
}
