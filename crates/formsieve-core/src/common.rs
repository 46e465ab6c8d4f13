//! Shared validation state: the error bag and the per-field error window.

use crate::error::{Result, SieveError};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Map of field name to its single error message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorBag {
    fields: HashMap<String, String>,
}

impl ErrorBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the error message for a field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Get all field names with errors.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge another bag into this one. Existing entries win.
    pub fn merge(&mut self, other: &ErrorBag) {
        for (field, message) in &other.fields {
            self.fields
                .entry(field.clone())
                .or_insert_with(|| message.clone());
        }
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.fields
    }

    fn insert(&mut self, field: &str, message: String) {
        self.fields.insert(field.to_string(), message);
    }
}

impl fmt::Display for ErrorBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field error(s)", self.len())
    }
}

/// Error state shared by the validator, the DB checker and the handler.
///
/// Each check opens a window with [`reset`](Common::reset). Inside a window at
/// most one error may be set; a second [`set_error`](Common::set_error) is a
/// programming error and returns [`SieveError::State`].
#[derive(Debug, Clone, Default)]
pub struct Common {
    field: String,
    index: usize,
    error_set: bool,
    errors: ErrorBag,
}

impl Common {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new error window for `field` at value position `index`.
    pub fn reset(&mut self, field: &str, index: usize) {
        self.field.clear();
        self.field.push_str(field);
        self.index = index;
        self.error_set = false;
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Record an error for the current field.
    ///
    /// `{value}`, `{name}`, `{_this}` and `{_index}` are interpolated into the
    /// template before it is stored.
    pub fn set_error(&mut self, template: &str, value: &str) -> Result<()> {
        if self.error_set {
            return Err(SieveError::State(format!(
                "an error was already set for field '{}' since the last reset",
                self.field
            )));
        }
        let message = interpolate_error(template, &self.field, value, self.index);
        crate::trace_debug!(field = %self.field, index = self.index, %message, "validation error");
        self.errors.insert(&self.field, message);
        self.error_set = true;
        Ok(())
    }

    /// True when no error was set since the last reset.
    pub fn succeeds(&self) -> bool {
        !self.error_set
    }

    pub fn fails(&self) -> bool {
        self.error_set
    }

    pub fn errors(&self) -> &ErrorBag {
        &self.errors
    }
}

static ERROR_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

/// Interpolate the error message tokens.
///
/// `{_index}` is rendered 1-based. The template is scanned once, so tokens
/// inside the submitted value are kept as they are.
pub fn interpolate_error(template: &str, field: &str, value: &str, index: usize) -> String {
    ERROR_TOKEN_REGEX
        .get_or_init(|| Regex::new(r"\{(value|name|_this|_index)\}").unwrap())
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "value" => value.to_string(),
            "_index" => (index + 1).to_string(),
            _ => field.to_string(),
        })
        .into_owned()
}
