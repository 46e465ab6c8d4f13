//! Per-field validation options.
//!
//! One bag shared by every data type; each validator reads the keys that
//! apply to it and ignores the rest.

use crate::phone::PhoneFormat;
use formsieve_core::placeholder::has_placeholder;
use formsieve_core::{FileEntry, Interpolate, PlaceholderContext};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A pattern the value must (or must not) match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexRule {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl RegexRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            err: None,
        }
    }

    pub fn with_err(mut self, err: impl Into<String>) -> Self {
        self.err = Some(err.into());
        self
    }
}

/// At least one of `patterns` must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexAny {
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

/// The value must equal `target` once placeholders are resolved,
/// e.g. `{password}` for a confirmation field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShouldMatch {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

/// Snapshot handed to a [`MoveHook`].
#[derive(Debug, Clone)]
pub struct FileMoveContext {
    pub field: String,
    pub index: usize,
    pub entry: FileEntry,
}

type MoveFn = dyn Fn(FileMoveContext) -> BoxFuture<'static, Result<FileEntry, String>> + Send + Sync;

/// Caller supplied file move. `Ok` returns the updated entry, `Err` becomes
/// the field error.
#[derive(Clone)]
pub struct MoveHook(Arc<MoveFn>);

impl MoveHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(FileMoveContext) -> BoxFuture<'static, Result<FileEntry, String>> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, ctx: FileMoveContext) -> BoxFuture<'static, Result<FileEntry, String>> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for MoveHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MoveHook")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub gt: Option<Value>,
    pub lt: Option<Value>,
    pub min_err: Option<String>,
    pub max_err: Option<String>,
    pub gt_err: Option<String>,
    pub lt_err: Option<String>,

    pub regex: Vec<RegexRule>,
    pub regex_any: Option<RegexAny>,
    pub regex_none: Vec<RegexRule>,
    pub should_match: Option<ShouldMatch>,

    /// Replaces the default format error of the type.
    pub err: Option<String>,

    pub choices: Vec<Value>,
    pub from: Option<Value>,
    pub to: Option<Value>,
    pub step: Option<Value>,

    /// Password strength pre-check.
    pub pre_validate: bool,

    /// Two letter region the phone number must belong to.
    pub country: Option<String>,
    /// Rewrite valid phone numbers into this format.
    pub format: Option<PhoneFormat>,

    /// Allowed file extensions, without the dot.
    pub exts: Vec<String>,
    pub ext_err: Option<String>,
    pub move_to: Option<PathBuf>,
    #[serde(skip)]
    pub move_with: Option<MoveHook>,

    /// Limit and range options that were filled from `{token}` placeholders.
    /// Unusable values there come from submitted data, not from the rule.
    #[serde(skip)]
    pub(crate) placeholder_bounds: Vec<&'static str>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            gt: None,
            lt: None,
            min_err: None,
            max_err: None,
            gt_err: None,
            lt_err: None,
            regex: Vec::new(),
            regex_any: None,
            regex_none: Vec::new(),
            should_match: None,
            err: None,
            choices: Vec::new(),
            from: None,
            to: None,
            step: None,
            pre_validate: true,
            country: None,
            format: None,
            exts: Vec::new(),
            ext_err: None,
            move_to: None,
            move_with: None,
            placeholder_bounds: Vec::new(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_placeholder(&self, option: &str) -> bool {
        self.placeholder_bounds.iter().any(|name| *name == option)
    }

    pub fn min(mut self, min: impl Into<Value>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<Value>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn gt(mut self, gt: impl Into<Value>) -> Self {
        self.gt = Some(gt.into());
        self
    }

    pub fn lt(mut self, lt: impl Into<Value>) -> Self {
        self.lt = Some(lt.into());
        self
    }

    pub fn min_err(mut self, err: impl Into<String>) -> Self {
        self.min_err = Some(err.into());
        self
    }

    pub fn max_err(mut self, err: impl Into<String>) -> Self {
        self.max_err = Some(err.into());
        self
    }

    pub fn regex(mut self, rule: RegexRule) -> Self {
        self.regex.push(rule);
        self
    }

    pub fn regex_any<I, S>(mut self, patterns: I, err: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regex_any = Some(RegexAny {
            patterns: patterns.into_iter().map(Into::into).collect(),
            err,
        });
        self
    }

    pub fn regex_none(mut self, rule: RegexRule) -> Self {
        self.regex_none.push(rule);
        self
    }

    pub fn should_match(mut self, target: impl Into<String>, err: Option<String>) -> Self {
        self.should_match = Some(ShouldMatch {
            target: target.into(),
            err,
        });
        self
    }

    pub fn err(mut self, err: impl Into<String>) -> Self {
        self.err = Some(err.into());
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn range(mut self, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        self.from = Some(from.into());
        self.to = Some(to.into());
        self
    }

    pub fn step(mut self, step: impl Into<Value>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn pre_validate(mut self, on: bool) -> Self {
        self.pre_validate = on;
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn format(mut self, format: PhoneFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn exts<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exts = exts.into_iter().map(Into::into).collect();
        self
    }

    pub fn ext_err(mut self, err: impl Into<String>) -> Self {
        self.ext_err = Some(err.into());
        self
    }

    pub fn move_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.move_to = Some(dir.into());
        self
    }

    pub fn move_with<F>(mut self, f: F) -> Self
    where
        F: Fn(FileMoveContext) -> BoxFuture<'static, Result<FileEntry, String>> + Send + Sync + 'static,
    {
        self.move_with = Some(MoveHook::new(f));
        self
    }
}

impl Interpolate for ShouldMatch {
    fn interpolate(&self, ctx: &PlaceholderContext<'_>) -> Self {
        Self {
            target: self.target.interpolate(ctx),
            err: self.err.clone(),
        }
    }
}

// Error templates keep their `{value}`/`{name}` tokens for the error stage;
// regex patterns are never resolved.
impl Interpolate for Options {
    fn interpolate(&self, ctx: &PlaceholderContext<'_>) -> Self {
        let bounds = [
            ("min", &self.min),
            ("max", &self.max),
            ("gt", &self.gt),
            ("lt", &self.lt),
            ("from", &self.from),
            ("to", &self.to),
            ("step", &self.step),
        ];
        let mut placeholder_bounds = self.placeholder_bounds.clone();
        placeholder_bounds.extend(
            bounds
                .into_iter()
                .filter(|(_, v)| matches!(v, Some(Value::String(s)) if has_placeholder(s)))
                .map(|(name, _)| name),
        );
        Self {
            min: self.min.interpolate(ctx),
            max: self.max.interpolate(ctx),
            gt: self.gt.interpolate(ctx),
            lt: self.lt.interpolate(ctx),
            should_match: self.should_match.interpolate(ctx),
            choices: self.choices.interpolate(ctx),
            from: self.from.interpolate(ctx),
            to: self.to.interpolate(ctx),
            step: self.step.interpolate(ctx),
            country: self.country.interpolate(ctx),
            move_to: self
                .move_to
                .as_ref()
                .map(|dir| PathBuf::from(dir.to_string_lossy().into_owned().interpolate(ctx))),
            placeholder_bounds,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn deserializes_camel_case_keys_with_defaults() {
        let options: Options = serde_json::from_value(json!({
            "min": 2,
            "maxErr": "too long",
            "regexAny": {"patterns": ["^a", "^b"]},
            "shouldMatch": {"target": "{password}"},
            "format": "e164",
            "moveTo": "/srv/uploads"
        }))
        .unwrap();
        assert_eq!(options.min, Some(json!(2)));
        assert_eq!(options.max_err.as_deref(), Some("too long"));
        assert_eq!(options.regex_any.unwrap().patterns.len(), 2);
        assert!(options.pre_validate);
        assert_eq!(options.format, Some(PhoneFormat::E164));
        assert_eq!(options.move_to, Some(PathBuf::from("/srv/uploads")));
    }

    #[test]
    fn interpolation_leaves_patterns_and_error_templates() {
        let data: Map<String, Value> =
            json!({"password": "s3cret!!", "start": "2020-01-01"}).as_object().unwrap().clone();
        let ctx = PlaceholderContext::new("confirm", &data);
        let options = Options::new()
            .min("{start}")
            .regex(RegexRule::new(r"^\d{2}$").with_err("{name} is wrong"))
            .should_match("{password}", None);

        let resolved = options.interpolate(&ctx);
        assert_eq!(resolved.min, Some(json!("2020-01-01")));
        assert_eq!(resolved.should_match.unwrap().target, "s3cret!!");
        assert_eq!(resolved.regex[0].pattern, r"^\d{2}$");
        assert_eq!(resolved.regex[0].err.as_deref(), Some("{name} is wrong"));
        assert_eq!(options.min, Some(json!("{start}")));
    }
}
