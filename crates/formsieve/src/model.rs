//! Mapping validated data onto a persistence shape.

use formsieve_core::CaseStyle;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Exporter over a handler's validated data.
///
/// Keys are case-converted segment by segment. With
/// [`expand_properties`](Model::expand_properties) dotted keys become nested
/// objects, so `address.country` exports as `{"address": {"country": ..}}`.
#[derive(Debug, Clone)]
pub struct Model {
    data: Map<String, Value>,
    skip: HashSet<String>,
    rename: HashMap<String, String>,
    expand: bool,
    case_style: CaseStyle,
}

impl Model {
    pub fn new(data: Map<String, Value>, case_style: CaseStyle) -> Self {
        Self {
            data,
            skip: HashSet::new(),
            rename: HashMap::new(),
            expand: false,
            case_style,
        }
    }

    /// Leave fields out of the export.
    pub fn skip<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Export `field` under `key`. Renamed keys are not case-converted.
    pub fn rename(mut self, field: impl Into<String>, key: impl Into<String>) -> Self {
        self.rename.insert(field.into(), key.into());
        self
    }

    pub fn expand_properties(mut self, on: bool) -> Self {
        self.expand = on;
        self
    }

    pub fn case_style(mut self, style: CaseStyle) -> Self {
        self.case_style = style;
        self
    }

    pub fn export(&self) -> Map<String, Value> {
        let mut out = Map::new();
        self.export_into(&mut out);
        out
    }

    /// Write the export into `target`. Nested objects are merged.
    pub fn export_into(&self, target: &mut Map<String, Value>) {
        for (field, value) in &self.data {
            if self.skip.contains(field) {
                continue;
            }
            let key = match self.rename.get(field) {
                Some(key) => key.clone(),
                None => self.case_style.convert(field),
            };
            if self.expand && key.contains('.') {
                let path: Vec<&str> = key.split('.').collect();
                insert_path(target, &path, value.clone());
            } else {
                merge_value(target, key, value.clone());
            }
        }
    }
}

fn insert_path(target: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [last] => merge_value(target, (*last).to_string(), value),
        [head, rest @ ..] => {
            let slot = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                insert_path(inner, rest, value);
            }
        }
    }
}

fn merge_value(target: &mut Map<String, Value>, key: String, value: Value) {
    match (target.get_mut(&key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                merge_value(existing, k, v);
            }
        }
        (_, value) => {
            target.insert(key, value);
        }
    }
}
