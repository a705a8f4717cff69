//! Prompt and schema types passed to the judgment capability

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("Invalid regex"));

/// A rendered prompt: optional system instructions plus the user turn.
///
/// `name` identifies the call site (e.g. `"grade_documents"`) for logging
/// and for scripted test doubles.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub name: &'static str,
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn new(name: &'static str, user: impl Into<String>) -> Self {
        Self {
            name,
            system: None,
            user: user.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// JSON schema the structured output must conform to
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Closed record type returned by a structured judgment call
pub trait Verdict: DeserializeOwned + Send + 'static {
    /// Schema name sent to the provider
    const NAME: &'static str;

    /// JSON schema describing exactly the record's fields
    fn schema() -> serde_json::Value;

    fn response_schema() -> ResponseSchema {
        ResponseSchema::new(Self::NAME, Self::schema())
    }
}

/// Substitute `${name}` placeholders in a template.
///
/// Single pass over the template: substituted values are never re-expanded,
/// and unknown placeholders are left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            vars.iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
