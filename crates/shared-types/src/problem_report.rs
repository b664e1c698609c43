//! # Problem Reports
//!
//! Every protocol defines its own `problem-report` message type; they all share
//! the `description` body defined here.

use serde::{Deserialize, Serialize};

/// `description` field of a problem report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemReportDescription {
    /// Human readable text.
    pub en: String,
    /// Machine readable reason code.
    pub code: String,
}

impl ProblemReportDescription {
    pub fn new(en: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            code: code.into(),
        }
    }

    /// `"<code>: <en>"`, the form stored on records as `error_message`.
    pub fn to_error_message(&self) -> String {
        format!("{}: {}", self.code, self.en)
    }
}

/// Who is expected to retry after a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhoRetries {
    You,
    Me,
    Both,
    None,
}

/// Body shared by all problem report messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemReportBody {
    pub description: ProblemReportDescription,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_retries: Option<WhoRetries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
}

impl ProblemReportBody {
    pub fn new(description: ProblemReportDescription) -> Self {
        Self {
            description,
            who_retries: None,
            fix_hint: None,
        }
    }
}
