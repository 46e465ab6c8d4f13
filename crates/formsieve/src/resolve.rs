//! Normalizing declared rules into the form the handler executes.

use crate::rule::{Check, ComputeHook, Conditional, Override, Rule, Rules, ValidateHook};
use formsieve_core::filter::{filter_list, filter_value};
use formsieve_core::inflect::is_plural;
use formsieve_core::placeholder::resolve;
use formsieve_core::{
    DataType, FilesSource, Filters, Interpolate, PlaceholderContext, Result, SieveError,
};
use formsieve_validate::Options;
use indexmap::IndexMap;
use serde_json::{Map, Value};

const DEFAULT_HINT: &str = "{name} is required";

/// A rule with every default applied.
#[derive(Debug, Clone)]
pub struct ResolvedRule {
    pub name: String,
    pub data_type: DataType,
    pub required: bool,
    pub is_list: bool,
    pub hint: String,
    pub default_value: Value,
    pub options: Options,
    pub filters: Filters,
    pub checks: Vec<Check>,
    pub required_if: Option<Conditional>,
    pub override_if: Option<Override>,
    pub compute: Option<ComputeHook>,
    pub validate: Option<ValidateHook>,
    /// Set when a failed `requiredIf` removed the field from the run.
    pub dropped: bool,
}

impl ResolvedRule {
    pub fn from_rule(name: &str, rule: &Rule) -> Self {
        let is_list = rule
            .is_list
            .unwrap_or_else(|| !rule.data_type.is_boolean() && is_plural(name));
        Self {
            name: name.to_string(),
            data_type: rule.data_type,
            required: rule.required,
            is_list,
            hint: rule.hint.clone().unwrap_or_else(|| DEFAULT_HINT.to_string()),
            default_value: rule.default_value.clone(),
            options: rule.options.clone(),
            filters: rule.filters.clone(),
            checks: rule.checks.clone(),
            required_if: rule.required_if.clone(),
            override_if: rule.override_if.clone(),
            compute: rule.compute.clone(),
            validate: rule.validate.clone(),
            dropped: false,
        }
    }

    /// Run a raw data value through this rule's filters.
    ///
    /// List fields always produce an array.
    pub fn filter(&self, raw: &Value) -> Value {
        if self.is_list {
            let items = match raw {
                Value::Array(items) => filter_list(items, self.data_type, &self.filters),
                Value::Null => Vec::new(),
                single => filter_list(std::slice::from_ref(single), self.data_type, &self.filters),
            };
            Value::Array(items)
        } else {
            filter_value(raw, self.data_type, &self.filters)
        }
    }

    /// Resolve placeholders in the hint against the raw data.
    pub(crate) fn resolve_hint(&mut self, raw: &Map<String, Value>) {
        let ctx = PlaceholderContext::new(&self.name, raw);
        self.hint = resolve(&self.hint, &ctx);
    }

    /// Resolve placeholders in options and checks against the filtered data.
    pub(crate) fn resolve_options(&mut self, filtered: &Map<String, Value>) {
        let ctx = PlaceholderContext::new(&self.name, filtered);
        self.options = self.options.interpolate(&ctx);
        self.checks = self.checks.interpolate(&ctx);
    }
}

/// Apply defaults to every rule and settle `requiredIf`.
pub(crate) fn resolve_rules(
    rules: &Rules,
    raw: &Map<String, Value>,
    files: Option<&FilesSource>,
) -> Result<IndexMap<String, ResolvedRule>> {
    let mut resolved = IndexMap::with_capacity(rules.len());
    for (name, rule) in rules.iter() {
        if rule.data_type.is_file() && files.is_none() {
            return Err(SieveError::MissingFilesSource(name.clone()));
        }
        resolved.insert(name.clone(), ResolvedRule::from_rule(name, rule));
    }

    let conditionals: Vec<(String, Conditional)> = resolved
        .iter()
        .filter_map(|(name, rule)| rule.required_if.clone().map(|c| (name.clone(), c)))
        .collect();

    for (name, conditional) in conditionals {
        let target = filtered_target(&conditional.field, &resolved, raw, files);
        let holds = conditional.condition.holds(&target, &conditional.value);
        formsieve_core::trace_debug!(
            field = %name,
            target = %conditional.field,
            holds = holds,
            "requiredIf resolved"
        );
        if let Some(rule) = resolved.get_mut(&name) {
            rule.required = holds;
            rule.dropped = !holds && conditional.drop;
        }
    }

    Ok(resolved)
}

/// Filtered value of `field` as seen by conditions.
///
/// Undeclared fields are filtered as plain text; file fields report whether
/// anything was uploaded.
pub(crate) fn filtered_target(
    field: &str,
    resolved: &IndexMap<String, ResolvedRule>,
    data: &Map<String, Value>,
    files: Option<&FilesSource>,
) -> Value {
    match resolved.get(field) {
        Some(rule) if rule.data_type.is_file() => Value::Bool(
            files
                .and_then(|files| files.get(field))
                .map_or(false, |input| input.has_name()),
        ),
        Some(rule) => rule.filter(data.get(field).unwrap_or(&Value::Null)),
        None => filter_value(
            data.get(field).unwrap_or(&Value::Null),
            DataType::Text,
            &Filters::default(),
        ),
    }
}
