//! Credential format adapters

pub mod json_format;

pub use json_format::{JsonCredential, JsonCredentialFormatService};
