use formsieve_core::{Result, SieveError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filtered values of every validated field.
///
/// Lookups of fields that were never part of the run fail instead of quietly
/// returning `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatedData(Map<String, Value>);

impl ValidatedData {
    pub(crate) fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, field: &str) -> Result<&Value> {
        self.0
            .get(field)
            .ok_or_else(|| SieveError::UnknownField(field.to_string()))
    }

    /// Deserialize a field into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> Result<T> {
        let value = self.get(field)?.clone();
        serde_json::from_value(value).map_err(|e| {
            SieveError::Config(format!("field '{field}' cannot be read as the requested type: {e}"))
        })
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<ValidatedData> for Value {
    fn from(data: ValidatedData) -> Self {
        Value::Object(data.0)
    }
}
