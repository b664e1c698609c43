//! Credential preview
//!
//! The attribute list shown to the holder before issuance. Equality of two
//! previews ignores attribute order.

use serde::{Deserialize, Serialize};

use crate::messages::CREDENTIAL_PREVIEW_TYPE;

/// One previewed attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialPreviewAttribute {
    pub name: String,
    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub value: String,
}

impl CredentialPreviewAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            value: value.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// `credential-preview` inner object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialPreview {
    #[serde(rename = "@type")]
    pub preview_type: String,
    pub attributes: Vec<CredentialPreviewAttribute>,
}

impl CredentialPreview {
    pub fn new(attributes: Vec<CredentialPreviewAttribute>) -> Self {
        Self {
            preview_type: CREDENTIAL_PREVIEW_TYPE.to_string(),
            attributes,
        }
    }

    /// Build from `(name, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, value)| CredentialPreviewAttribute::new(name, value))
                .collect(),
        )
    }
}

/// Same attributes (name, value and mime-type) in any order.
pub fn are_preview_attributes_equal(
    first: &[CredentialPreviewAttribute],
    second: &[CredentialPreviewAttribute],
) -> bool {
    if first.len() != second.len() {
        return false;
    }
    let mut first = first.to_vec();
    let mut second = second.to_vec();
    first.sort();
    second.sort();
    first == second
}
