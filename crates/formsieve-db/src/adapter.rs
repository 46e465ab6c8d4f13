//! The adapter contract used to run [`DbCheck`]s.

use crate::check::{DbCheck, Existence};
use async_trait::async_trait;
use formsieve_core::value::to_text;
use formsieve_core::{CaseStyle, Common, DataType, Result, SieveError};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::OnceLock;

/// Storage flavour, used to map the `id` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DbKind {
    #[default]
    #[serde(alias = "sql")]
    Relational,
    /// Document stores; `id` is queried as `_id`.
    #[serde(alias = "nosql")]
    Document,
}

impl FromStr for DbKind {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "relational" | "sql" => Ok(DbKind::Relational),
            "document" | "nosql" => Ok(DbKind::Document),
            other => Err(SieveError::Config(format!("unknown db kind '{other}'"))),
        }
    }
}

/// How generated queries name their columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DbSettings {
    pub case_style: CaseStyle,
    pub kind: DbKind,
}

impl DbSettings {
    pub fn new(case_style: CaseStyle, kind: DbKind) -> Self {
        Self { case_style, kind }
    }

    /// Column for a field name.
    pub fn column(&self, field: &str) -> String {
        let column = self.case_style.convert(field);
        match self.kind {
            DbKind::Document if column == "id" => "_id".to_string(),
            _ => column,
        }
    }
}

/// Build the query for `check`, substituting `{value}` and `{_index}`.
///
/// A string member that is exactly `{value}` takes the value itself, keeping
/// its JSON type.
pub fn build_query(
    field: &str,
    value: &Value,
    index: usize,
    check: &DbCheck,
    settings: &DbSettings,
) -> Map<String, Value> {
    match &check.query {
        Some(Value::Object(query)) => query
            .iter()
            .map(|(k, v)| (k.clone(), substitute(v, value, index)))
            .collect(),
        _ => {
            let column = settings.column(check.field.as_deref().unwrap_or(field));
            let mut query = Map::new();
            query.insert(column, value.clone());
            query
        }
    }
}

static QUERY_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn substitute(template: &Value, value: &Value, index: usize) -> Value {
    match template {
        Value::String(s) if s == "{value}" => value.clone(),
        Value::String(s) => Value::String(
            QUERY_TOKEN_REGEX
                .get_or_init(|| Regex::new(r"\{(value|_index)\}").unwrap())
                .replace_all(s, |caps: &Captures<'_>| match &caps[1] {
                    "value" => to_text(value),
                    _ => (index + 1).to_string(),
                })
                .into_owned(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, value, index)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, value, index)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// A database the handler can run existence checks against.
///
/// Only [`it_exists`](DbAdapter::it_exists) is required. The default
/// [`execute`](DbAdapter::execute) builds the query, runs the right lookup and
/// records the field error on `common`.
#[async_trait]
pub trait DbAdapter: Send + Sync {
    async fn it_exists(&self, model: &str, query: &Map<String, Value>) -> Result<bool>;

    async fn it_does_not_exist(&self, model: &str, query: &Map<String, Value>) -> Result<bool> {
        Ok(!self.it_exists(model, query).await?)
    }

    /// Run one check for the value at `index` of `field`.
    ///
    /// Returns `Ok(false)` after recording the check's error.
    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        field_type: DataType,
        field: &str,
        value: &Value,
        index: usize,
        check: &DbCheck,
        settings: &DbSettings,
        common: &mut Common,
    ) -> Result<bool> {
        check.validate()?;
        common.reset(field, index);

        // Files are looked up by their content key.
        let needle = if field_type.is_file() {
            value.get("key").cloned().unwrap_or(Value::Null)
        } else {
            value.clone()
        };
        let query = build_query(field, &needle, index, check, settings);

        let passed = match check.that {
            Existence::ItExists => self.it_exists(&check.model, &query).await?,
            Existence::ItDoesNotExist => self.it_does_not_exist(&check.model, &query).await?,
        };
        formsieve_core::trace_debug!(
            field = %field,
            model = %check.model,
            passed = passed,
            "db check"
        );

        if !passed {
            let template = check.err.as_deref().unwrap_or(check.that.default_err());
            common.set_error(template, &to_text(&needle))?;
        }
        Ok(passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_queries_follow_case_style_and_kind() {
        let snake = DbSettings::new(CaseStyle::Snake, DbKind::Relational);
        let check = DbCheck::exists("users");
        assert_eq!(
            build_query("emailAddress", &json!("a@b.c"), 0, &check, &snake),
            json!({"email_address": "a@b.c"}).as_object().unwrap().clone()
        );

        let doc = DbSettings::new(CaseStyle::Camel, DbKind::Document);
        let by_id = DbCheck::exists("users").field("id");
        assert_eq!(
            build_query("owner", &json!(7), 0, &by_id, &doc),
            json!({"_id": 7}).as_object().unwrap().clone()
        );
    }

    #[test]
    fn explicit_queries_substitute_tokens() {
        let check = DbCheck::exists("tags").query(json!({"name": "{value}", "slot": "slot-{_index}", "n": 1}));
        let query = build_query("tags", &json!(42), 2, &check, &DbSettings::default());
        assert_eq!(query["name"], json!(42));
        assert_eq!(query["slot"], json!("slot-3"));
        assert_eq!(query["n"], json!(1));
    }

    #[test]
    fn substituted_values_keep_their_braces() {
        let check = DbCheck::exists("tags").query(json!({"label": "tag {value}"}));
        let query = build_query("tags", &json!("{_index}"), 0, &check, &DbSettings::default());
        assert_eq!(query["label"], json!("tag {_index}"));
    }

    #[test]
    fn parses_kind() {
        assert_eq!("SQL".parse::<DbKind>().unwrap(), DbKind::Relational);
        assert_eq!("document".parse::<DbKind>().unwrap(), DbKind::Document);
        assert!("graph".parse::<DbKind>().is_err());
    }
}
