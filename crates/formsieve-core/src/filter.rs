//! Value filter pipeline.
//!
//! Steps run in a fixed order: decode, strip tags, minimize, trim, casing,
//! inflection, numeric cast, type specific stripping, type cast, callback.
//! Boolean types skip all of them and collapse to a falsy-pattern test.

use crate::data_type::DataType;
use crate::inflect;
use crate::value::{self, to_text};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

static FALSY_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static INT_REGEX: OnceLock<Regex> = OnceLock::new();
static FLOAT_REGEX: OnceLock<Regex> = OnceLock::new();
static NUMERIC_PREFIX_REGEX: OnceLock<Regex> = OnceLock::new();
static EMAIL_STRIP_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_STRIP_REGEX: OnceLock<Regex> = OnceLock::new();

fn falsy_regex() -> &'static Regex {
    FALSY_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^(?:|false|off|0|nil|null|none|undefined|no)$").unwrap()
    })
}

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"<\s*/?\s*([A-Za-z][A-Za-z0-9-]*)\b[^>]*>").unwrap())
}

fn int_regex() -> &'static Regex {
    INT_REGEX.get_or_init(|| Regex::new(r"^[-+]?\d+$").unwrap())
}

fn float_regex() -> &'static Regex {
    FLOAT_REGEX
        .get_or_init(|| Regex::new(r"^[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?$").unwrap())
}

fn numeric_prefix_regex() -> &'static Regex {
    NUMERIC_PREFIX_REGEX
        .get_or_init(|| Regex::new(r"^[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").unwrap())
}

fn email_strip_regex() -> &'static Regex {
    EMAIL_STRIP_REGEX.get_or_init(|| Regex::new(r"[^\w!#$%&'*+/=?^`{|}~.@-]").unwrap())
}

fn url_strip_regex() -> &'static Regex {
    URL_STRIP_REGEX.get_or_init(|| Regex::new(r"[^\w.~:/?#\[\]@!$&'()*+,;=%-]").unwrap())
}

/// Caller supplied final transform.
#[derive(Clone)]
pub struct FilterCallback(Arc<dyn Fn(Value) -> Value + Send + Sync>);

impl FilterCallback {
    pub fn new(f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for FilterCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FilterCallback")
    }
}

/// Per-field filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Filters {
    pub decode: bool,
    pub strip_tags: bool,
    /// Tag names kept by `strip_tags`, e.g. `["b", "i"]`.
    pub strip_tag_ignore: Vec<String>,
    pub minimize: bool,
    pub trim: bool,
    pub to_title: bool,
    pub capitalize: bool,
    pub to_upper: bool,
    pub to_lower: bool,
    pub pluralize: bool,
    pub singularize: bool,
    pub ordinalize: bool,
    pub to_numeric: bool,
    /// De-duplicate list values before filtering.
    pub unique: bool,
    #[serde(skip)]
    pub callback: Option<FilterCallback>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            decode: true,
            strip_tags: true,
            strip_tag_ignore: Vec::new(),
            minimize: false,
            trim: true,
            to_title: false,
            capitalize: false,
            to_upper: false,
            to_lower: false,
            pluralize: false,
            singularize: false,
            ordinalize: false,
            to_numeric: false,
            unique: true,
            callback: None,
        }
    }
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters that leave text untouched apart from the type casts.
    pub fn raw() -> Self {
        Self {
            decode: false,
            strip_tags: false,
            trim: false,
            ..Self::default()
        }
    }

    pub fn decode(mut self, on: bool) -> Self {
        self.decode = on;
        self
    }

    pub fn strip_tags(mut self, on: bool) -> Self {
        self.strip_tags = on;
        self
    }

    pub fn keep_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strip_tag_ignore = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn minimize(mut self, on: bool) -> Self {
        self.minimize = on;
        self
    }

    pub fn trim(mut self, on: bool) -> Self {
        self.trim = on;
        self
    }

    pub fn to_title(mut self) -> Self {
        self.to_title = true;
        self
    }

    pub fn capitalize(mut self) -> Self {
        self.capitalize = true;
        self
    }

    pub fn to_upper(mut self) -> Self {
        self.to_upper = true;
        self
    }

    pub fn to_lower(mut self) -> Self {
        self.to_lower = true;
        self
    }

    pub fn pluralize(mut self) -> Self {
        self.pluralize = true;
        self
    }

    pub fn singularize(mut self) -> Self {
        self.singularize = true;
        self
    }

    pub fn ordinalize(mut self) -> Self {
        self.ordinalize = true;
        self
    }

    pub fn to_numeric(mut self) -> Self {
        self.to_numeric = true;
        self
    }

    pub fn unique(mut self, on: bool) -> Self {
        self.unique = on;
        self
    }

    pub fn callback(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.callback = Some(FilterCallback::new(f));
        self
    }
}

/// True for `''`, `false`, `off`, `0`, `nil`, `null`, `none`, `undefined`, `no`.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !*b,
        Value::Array(items) => items.is_empty(),
        other => falsy_regex().is_match(to_text(other).trim()),
    }
}

/// Run the pipeline over a single value.
pub fn filter_value(value: &Value, data_type: DataType, filters: &Filters) -> Value {
    if data_type.is_boolean() {
        return Value::Bool(!is_falsy(value));
    }
    if value.is_null() {
        return Value::Null;
    }

    let mut text = to_text(value);

    if filters.decode {
        text = decode(&text);
    }
    if filters.strip_tags {
        text = strip_tags(&text, &filters.strip_tag_ignore);
    }
    if filters.minimize {
        text = minimize(&text);
    }
    if filters.trim {
        text = text.trim().to_string();
    }

    if filters.to_title {
        text = title_case(&text);
    } else if filters.capitalize {
        text = capitalize(&text);
    } else if filters.to_upper {
        text = text.to_uppercase();
    } else if filters.to_lower {
        text = text.to_lowercase();
    }

    if filters.pluralize {
        text = inflect::pluralize(&text);
    } else if filters.singularize {
        text = inflect::singularize(&text);
    }
    if filters.ordinalize {
        text = inflect::ordinalize(&text);
    }

    let mut out = if filters.to_numeric {
        to_numeric(&text)
    } else {
        match data_type {
            DataType::Email => text = email_strip_regex().replace_all(&text, "").into_owned(),
            DataType::Url => text = url_strip_regex().replace_all(&text, "").into_owned(),
            _ => {}
        }
        cast(text, data_type)
    };

    if let Some(callback) = &filters.callback {
        out = callback.call(out);
    }

    match out {
        Value::String(s) if s.is_empty() => Value::Null,
        other => other,
    }
}

/// Run the pipeline over list values, de-duplicating first and dropping nulls.
pub fn filter_list(values: &[Value], data_type: DataType, filters: &Filters) -> Vec<Value> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|v| !filters.unique || seen.insert(to_text(v)))
        .map(|v| filter_value(v, data_type, filters))
        .filter(|v| !v.is_null())
        .collect()
}

/// Parse the leading number of `text`; `0` when there is none.
pub fn to_numeric(text: &str) -> Value {
    numeric_prefix_regex()
        .find(text.trim())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(value::number)
        .unwrap_or_else(|| Value::from(0))
}

fn cast(text: String, data_type: DataType) -> Value {
    if data_type.is_integer() && int_regex().is_match(&text) {
        if let Ok(n) = text.trim_start_matches('+').parse::<i64>() {
            return Value::from(n);
        }
    } else if data_type.is_float() && float_regex().is_match(&text) {
        if let Ok(f) = text.parse::<f64>() {
            return value::number(f);
        }
    }
    Value::String(text)
}

fn decode(text: &str) -> String {
    match urlencoding::decode(text) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Remove tags, keeping those whose name is in `ignore`.
pub fn strip_tags(text: &str, ignore: &[String]) -> String {
    if !text.contains('<') {
        return text.to_string();
    }
    tag_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps[1].to_lowercase();
            let keep = ignore.iter().any(|tag| {
                tag.trim_matches(|c: char| c == '<' || c == '>' || c == '/')
                    .eq_ignore_ascii_case(&name)
            });
            if keep {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

fn minimize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut start = true;
    for c in text.chars() {
        if c.is_whitespace() || c == '-' {
            start = true;
            out.push(c);
        } else if start {
            out.extend(c.to_uppercase());
            start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}
