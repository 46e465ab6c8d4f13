//! Declarative database checks.

use formsieve_core::{Interpolate, PlaceholderContext, Result, SieveError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a [`DbCheck`] asserts about the queried record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Existence {
    #[serde(rename = "itExists", alias = "exists")]
    ItExists,
    #[serde(rename = "itDoesNotExist", alias = "notExists", alias = "doesNotExist")]
    ItDoesNotExist,
}

impl Existence {
    pub(crate) fn default_err(self) -> &'static str {
        match self {
            Existence::ItExists => "{value} does not exist",
            Existence::ItDoesNotExist => "{value} already exists",
        }
    }
}

/// Existence check against a model (table or collection).
///
/// Without a `query` the check looks the value up in the column named after
/// `field` (or the rule's field), converted to the configured case style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCheck {
    pub that: Existence,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl DbCheck {
    pub fn new(that: Existence, model: impl Into<String>) -> Self {
        Self {
            that,
            model: model.into(),
            query: None,
            field: None,
            err: None,
        }
    }

    pub fn exists(model: impl Into<String>) -> Self {
        Self::new(Existence::ItExists, model)
    }

    pub fn not_exists(model: impl Into<String>) -> Self {
        Self::new(Existence::ItDoesNotExist, model)
    }

    /// Explicit query object. String members may use `{value}` and `{_index}`.
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    /// Column to look the value up in when no query is given.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn err(mut self, err: impl Into<String>) -> Self {
        self.err = Some(err.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(SieveError::Config("db check model must not be empty".into()));
        }
        match &self.query {
            None | Some(Value::Object(_)) => Ok(()),
            Some(other) => Err(SieveError::Config(format!(
                "db check query for model '{}' must be an object, got {other}",
                self.model
            ))),
        }
    }
}

// `{value}` and `{_index}` are left for the adapter; only data placeholders
// resolve here.
impl Interpolate for DbCheck {
    fn interpolate(&self, ctx: &PlaceholderContext<'_>) -> Self {
        Self {
            model: self.model.interpolate(ctx),
            query: self.query.interpolate(ctx),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn deserializes_with_legacy_aliases() {
        let check: DbCheck =
            serde_json::from_value(json!({"that": "notExists", "model": "users", "field": "email"}))
                .unwrap();
        assert_eq!(check.that, Existence::ItDoesNotExist);
        assert_eq!(check.field.as_deref(), Some("email"));

        let check: DbCheck = serde_json::from_value(json!({"that": "itExists", "model": "roles"})).unwrap();
        assert_eq!(check.that, Existence::ItExists);
    }

    #[test]
    fn empty_model_or_scalar_query_is_rejected() {
        assert!(matches!(DbCheck::exists(" ").validate(), Err(SieveError::Config(_))));
        assert!(DbCheck::exists("users").query(json!("id")).validate().is_err());
        assert!(DbCheck::exists("users").query(json!({"id": 1})).validate().is_ok());
    }

    #[test]
    fn interpolation_keeps_value_tokens() {
        let data: Map<String, Value> = json!({"org": "acme"}).as_object().unwrap().clone();
        let ctx = PlaceholderContext::new("email", &data);
        let check = DbCheck::not_exists("users").query(json!({"email": "{value}", "org": "{org}"}));
        let resolved = check.interpolate(&ctx);
        assert_eq!(resolved.query, Some(json!({"email": "{value}", "org": "acme"})));
    }
}
