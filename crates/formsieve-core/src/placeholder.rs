//! `{token}` interpolation for hints, options and checks.
//!
//! Resolution is pure: every call returns a new value and leaves the template
//! untouched.
//!
//! Recognised tokens:
//!
//! - `{name}` - the field being resolved
//! - `{current_date}` - `YYYY-MM-DD`
//! - `{current_year}`
//! - `{current_time}` - `HH:MM:SS`
//! - any other identifier is looked up in the accumulated data; unknown or
//!   `null` entries leave the token in place.

use crate::value::to_text;
use chrono::{Datelike, Local, NaiveDateTime};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.]*)\}").unwrap())
}

/// Values available while resolving placeholders for one field.
#[derive(Debug, Clone)]
pub struct PlaceholderContext<'a> {
    field: &'a str,
    data: &'a Map<String, Value>,
    now: NaiveDateTime,
}

impl<'a> PlaceholderContext<'a> {
    pub fn new(field: &'a str, data: &'a Map<String, Value>) -> Self {
        Self::at(field, data, Local::now().naive_local())
    }

    /// Context with a fixed clock.
    pub fn at(field: &'a str, data: &'a Map<String, Value>, now: NaiveDateTime) -> Self {
        Self { field, data, now }
    }

    pub fn field(&self) -> &str {
        self.field
    }

    fn lookup(&self, token: &str) -> Option<String> {
        match token {
            "name" => Some(self.field.to_string()),
            "current_date" => Some(self.now.format("%Y-%m-%d").to_string()),
            "current_year" => Some(self.now.year().to_string()),
            "current_time" => Some(self.now.format("%H:%M:%S").to_string()),
            other => match self.data.get(other) {
                None | Some(Value::Null) => None,
                Some(value) => Some(to_text(value)),
            },
        }
    }
}

/// Replace every known `{token}` in `template`.
pub fn resolve(template: &str, ctx: &PlaceholderContext<'_>) -> String {
    if !template.contains('{') {
        return template.to_string();
    }
    token_regex()
        .replace_all(template, |caps: &Captures<'_>| {
            ctx.lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Whether `text` still holds a `{token}`.
pub fn has_placeholder(text: &str) -> bool {
    text.contains('{') && token_regex().is_match(text)
}

/// Types whose string content can be placeholder-resolved.
pub trait Interpolate: Sized {
    fn interpolate(&self, ctx: &PlaceholderContext<'_>) -> Self;
}

impl Interpolate for String {
    fn interpolate(&self, ctx: &PlaceholderContext<'_>) -> Self {
        resolve(self, ctx)
    }
}

impl<T: Interpolate> Interpolate for Option<T> {
    fn interpolate(&self, ctx: &PlaceholderContext<'_>) -> Self {
        self.as_ref().map(|inner| inner.interpolate(ctx))
    }
}

impl<T: Interpolate> Interpolate for Vec<T> {
    fn interpolate(&self, ctx: &PlaceholderContext<'_>) -> Self {
        self.iter().map(|item| item.interpolate(ctx)).collect()
    }
}

impl Interpolate for Value {
    fn interpolate(&self, ctx: &PlaceholderContext<'_>) -> Self {
        match self {
            Value::String(s) => Value::String(resolve(s, ctx)),
            Value::Array(items) => Value::Array(items.interpolate(ctx)),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.interpolate(ctx)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}
