//! Field rule declarations.
//!
//! Rules can be built in code:
//!
//! ```rust,ignore
//! use formsieve::prelude::*;
//!
//! let rules = Rules::new()
//!     .with("email", Rule::new(DataType::Email).db_check(DbCheck::not_exists("users")))
//!     .with("newsletter", Rule::new(DataType::Checkbox).optional())
//!     .with("topics", Rule::new(DataType::Text).required_if(Conditional::checked("newsletter")));
//! ```
//!
//! or parsed from JSON with [`Rules::from_json`], where a bare string is the
//! shorthand for a rule of that type:
//!
//! ```json
//! { "email": "email", "age": { "type": "pInt", "required": false, "options": { "min": 18 } } }
//! ```

use formsieve_core::filter::is_falsy;
use formsieve_core::value::{is_truthy, loosely_equal, to_text};
use formsieve_core::{DataType, Filters, Interpolate, PlaceholderContext, Result, SieveError};
use formsieve_db::DbCheck;
use formsieve_validate::Options;
use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Owned snapshot handed to caller hooks.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub field: String,
    pub value: Value,
    /// Position of `value` within a list field, `0` otherwise.
    pub index: usize,
    /// Filtered data of every field at the time the hook runs.
    pub data: Map<String, Value>,
}

macro_rules! hook {
    ($(#[$meta:meta])* $name:ident => $output:ty) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Arc<dyn Fn(HookContext) -> BoxFuture<'static, $output> + Send + Sync>);

        impl $name {
            pub fn new<F>(f: F) -> Self
            where
                F: Fn(HookContext) -> BoxFuture<'static, $output> + Send + Sync + 'static,
            {
                Self(Arc::new(f))
            }

            pub fn call(&self, ctx: HookContext) -> BoxFuture<'static, $output> {
                (self.0)(ctx)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    };
}

hook! {
    /// Post-validation check. `Err(msg)` becomes the field error; an empty
    /// message falls back to a default.
    CheckHook => std::result::Result<(), String>
}

hook! {
    /// Extra validation run after the built-in check of the data type passes.
    ValidateHook => std::result::Result<(), String>
}

hook! {
    /// Computes the final value of a field once everything else passed.
    ComputeHook => Result<Value>
}

/// A check run after validation, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Check {
    Db(DbCheck),
    #[serde(skip)]
    Callback(CheckHook),
}

impl From<DbCheck> for Check {
    fn from(check: DbCheck) -> Self {
        Check::Db(check)
    }
}

impl Interpolate for Check {
    fn interpolate(&self, ctx: &PlaceholderContext<'_>) -> Self {
        match self {
            Check::Db(check) => Check::Db(check.interpolate(ctx)),
            Check::Callback(hook) => Check::Callback(hook.clone()),
        }
    }
}

/// Comparison used by [`Conditional`] and [`Override`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Checked,
    NotChecked,
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    NotContains,
}

impl Condition {
    /// Evaluate against the target's filtered value.
    pub fn holds(&self, target: &Value, expected: &Value) -> bool {
        match self {
            Condition::Checked => !is_falsy(target),
            Condition::NotChecked => is_falsy(target),
            Condition::Equals => loosely_equal(target, expected),
            Condition::NotEquals => !loosely_equal(target, expected),
            Condition::In => is_in(target, expected),
            Condition::NotIn => !is_in(target, expected),
            Condition::Contains => contains(target, expected),
            Condition::NotContains => !contains(target, expected),
        }
    }
}

fn is_in(target: &Value, expected: &Value) -> bool {
    match expected {
        Value::Array(items) => items.iter().any(|item| loosely_equal(item, target)),
        other => loosely_equal(other, target),
    }
}

fn contains(target: &Value, expected: &Value) -> bool {
    match target {
        Value::Array(items) => items.iter().any(|item| loosely_equal(item, expected)),
        Value::Null => false,
        other => is_truthy(expected) && to_text(other).contains(&to_text(expected)),
    }
}

fn default_true() -> bool {
    true
}

/// `requiredIf`: the field is required only while the condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conditional {
    pub condition: Condition,
    pub field: String,
    #[serde(default)]
    pub value: Value,
    /// Null the field's data when the condition fails.
    #[serde(default = "default_true")]
    pub drop: bool,
}

impl Conditional {
    pub fn new(condition: Condition, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            condition,
            field: field.into(),
            value: value.into(),
            drop: true,
        }
    }

    pub fn checked(field: impl Into<String>) -> Self {
        Self::new(Condition::Checked, field, Value::Null)
    }

    pub fn not_checked(field: impl Into<String>) -> Self {
        Self::new(Condition::NotChecked, field, Value::Null)
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(Condition::Equals, field, value)
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(Condition::NotEquals, field, value)
    }

    pub fn one_of(field: impl Into<String>, values: impl Into<Value>) -> Self {
        Self::new(Condition::In, field, values)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(Condition::Contains, field, value)
    }

    /// Keep the field's data when the condition fails.
    pub fn keep(mut self) -> Self {
        self.drop = false;
        self
    }
}

/// `overrideIf`: replace the field's value with `with` while the condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    pub condition: Condition,
    pub field: String,
    #[serde(default)]
    pub value: Value,
    pub with: Value,
}

impl Override {
    pub fn new(
        condition: Condition,
        field: impl Into<String>,
        value: impl Into<Value>,
        with: impl Into<Value>,
    ) -> Self {
        Self {
            condition,
            field: field.into(),
            value: value.into(),
            with: with.into(),
        }
    }
}

/// Declared rule of one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rule {
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub required: bool,
    pub required_if: Option<Conditional>,
    pub override_if: Option<Override>,
    /// Decided from the field name when unset.
    pub is_list: Option<bool>,
    pub hint: Option<String>,
    pub default_value: Value,
    pub options: Options,
    pub filters: Filters,
    pub checks: Vec<Check>,
    #[serde(skip)]
    pub compute: Option<ComputeHook>,
    #[serde(skip)]
    pub validate: Option<ValidateHook>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            data_type: DataType::Text,
            required: true,
            required_if: None,
            override_if: None,
            is_list: None,
            hint: None,
            default_value: Value::Null,
            options: Options::default(),
            filters: Filters::default(),
            checks: Vec::new(),
            compute: None,
            validate: None,
        }
    }
}

impl Rule {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            ..Self::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn required_if(mut self, conditional: Conditional) -> Self {
        self.required_if = Some(conditional);
        self
    }

    pub fn override_if(mut self, rule: Override) -> Self {
        self.override_if = Some(rule);
        self
    }

    pub fn list(mut self, is_list: bool) -> Self {
        self.is_list = Some(is_list);
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn check(mut self, check: impl Into<Check>) -> Self {
        self.checks.push(check.into());
        self
    }

    pub fn db_check(self, check: DbCheck) -> Self {
        self.check(check)
    }

    pub fn check_with<F>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> BoxFuture<'static, std::result::Result<(), String>>
            + Send
            + Sync
            + 'static,
    {
        self.checks.push(Check::Callback(CheckHook::new(f)));
        self
    }

    pub fn validate_with<F>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> BoxFuture<'static, std::result::Result<(), String>>
            + Send
            + Sync
            + 'static,
    {
        self.validate = Some(ValidateHook::new(f));
        self
    }

    pub fn compute<F>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> BoxFuture<'static, Result<Value>> + Send + Sync + 'static,
    {
        self.compute = Some(ComputeHook::new(f));
        self
    }

    fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::String(shorthand) => Ok(Rule::new(shorthand.parse()?)),
            Value::Object(map) => {
                // Surface unknown types as such rather than as a parse failure.
                if let Some(Value::String(name)) = map.get("type") {
                    name.parse::<DataType>()?;
                }
                Ok(serde_json::from_value(Value::Object(map))?)
            }
            other => Err(SieveError::InvalidRules(format!(
                "a rule must be a type name or an object, got {other}"
            ))),
        }
    }
}

/// Ordered rule map.
#[derive(Debug, Clone, Default)]
pub struct Rules(IndexMap<String, Rule>);

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, rule: Rule) -> Self {
        self.insert(field, rule);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, rule: Rule) {
        self.0.insert(field.into(), rule);
    }

    pub fn get(&self, field: &str) -> Option<&Rule> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Rule)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a JSON object of field name to rule.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(SieveError::InvalidRules("rules must be a JSON object".into()));
        };
        map.into_iter()
            .map(|(field, rule)| Ok((field, Rule::from_json(rule)?)))
            .collect()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(json)?)
    }
}

impl FromIterator<(String, Rule)> for Rules {
    fn from_iter<I: IntoIterator<Item = (String, Rule)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Rules {
    type Item = (String, Rule);
    type IntoIter = indexmap::map::IntoIter<String, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
