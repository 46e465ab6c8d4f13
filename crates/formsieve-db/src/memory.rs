//! In-memory reference adapter.

use crate::adapter::DbAdapter;
use async_trait::async_trait;
use formsieve_core::value::loosely_equal;
use formsieve_core::{Result, SieveError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

type Record = Map<String, Value>;

/// Records kept per model in memory. Useful for tests and prototypes.
///
/// A query matches a record when every query member is present and equal
/// (compared as strings). Dotted keys reach into nested objects.
#[derive(Debug, Default)]
pub struct InMemoryAdapter {
    models: RwLock<HashMap<String, Vec<Record>>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed records before the adapter is shared. Non-object records are skipped.
    pub fn seed(mut self, model: &str, records: impl IntoIterator<Item = Value>) -> Self {
        let entry = self.models.get_mut().entry(model.to_string()).or_default();
        entry.extend(records.into_iter().filter_map(|r| match r {
            Value::Object(map) => Some(map),
            _ => None,
        }));
        self
    }

    pub async fn insert(&self, model: &str, record: Value) -> Result<()> {
        let Value::Object(record) = record else {
            return Err(SieveError::Config(format!(
                "records for model '{model}' must be objects"
            )));
        };
        self.models
            .write()
            .await
            .entry(model.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    pub async fn count(&self, model: &str) -> usize {
        self.models.read().await.get(model).map_or(0, Vec::len)
    }
}

fn lookup<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn matches(record: &Record, query: &Map<String, Value>) -> bool {
    query.iter().all(|(key, expected)| {
        lookup(record, key)
            .map(|actual| loosely_equal(actual, expected))
            .unwrap_or(false)
    })
}

#[async_trait]
impl DbAdapter for InMemoryAdapter {
    async fn it_exists(&self, model: &str, query: &Map<String, Value>) -> Result<bool> {
        let models = self.models.read().await;
        Ok(models
            .get(model)
            .map(|records| records.iter().any(|r| matches(r, query)))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DbCheck, DbKind, DbSettings};
    use formsieve_core::{CaseStyle, Common, DataType};
    use serde_json::json;

    fn users() -> InMemoryAdapter {
        InMemoryAdapter::new().seed(
            "users",
            vec![
                json!({"_id": 1, "email": "ada@example.com", "address": {"country": "UK"}}),
                json!({"_id": 2, "email": "alan@example.com", "address": {"country": "UK"}}),
            ],
        )
    }

    #[tokio::test]
    async fn lookups_match_every_member() {
        let db = users();
        let query = json!({"email": "ada@example.com", "address.country": "UK"});
        assert!(db.it_exists("users", query.as_object().unwrap()).await.unwrap());

        let query = json!({"_id": "2"});
        assert!(db.it_exists("users", query.as_object().unwrap()).await.unwrap());

        let query = json!({"email": "grace@example.com"});
        assert!(db.it_does_not_exist("users", query.as_object().unwrap()).await.unwrap());
        assert!(!db.it_exists("orders", query.as_object().unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn execute_records_default_errors() {
        let db = users();
        let settings = DbSettings::default();
        let mut common = Common::new();

        let unique = DbCheck::not_exists("users");
        let ok = db
            .execute(DataType::Email, "email", &json!("ada@example.com"), 0, &unique, &settings, &mut common)
            .await
            .unwrap();
        assert!(!ok);
        assert_eq!(common.errors().get("email"), Some("ada@example.com already exists"));

        let known = DbCheck::exists("users").field("id");
        let doc = DbSettings::new(CaseStyle::Camel, DbKind::Document);
        assert!(!db
            .execute(DataType::Int, "owner", &json!(9), 0, &known, &doc, &mut common)
            .await
            .unwrap());
        assert_eq!(common.errors().get("owner"), Some("9 does not exist"));
        assert!(db
            .execute(DataType::Int, "owner2", &json!(2), 0, &known, &doc, &mut common)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn empty_model_is_a_config_error() {
        let db = users();
        let mut common = Common::new();
        let err = db
            .execute(DataType::Text, "x", &json!("y"), 0, &DbCheck::exists(""), &DbSettings::default(), &mut common)
            .await
            .unwrap_err();
        assert!(matches!(err, SieveError::Config(_)));
    }

    #[tokio::test]
    async fn insert_rejects_non_objects() {
        let db = InMemoryAdapter::new();
        db.insert("tags", json!({"name": "rust"})).await.unwrap();
        assert_eq!(db.count("tags").await, 1);
        assert!(db.insert("tags", json!("rust")).await.is_err());
    }
}
