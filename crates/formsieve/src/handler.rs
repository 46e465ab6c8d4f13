//! The validation pipeline.
//!
//! A [`Handler`] is single use: it owns its sources, resolves the rules once
//! and runs filtering, validation, checks and computation in one `execute`.

use crate::config::{global_config, HandlerConfig};
use crate::data::ValidatedData;
use crate::model::Model;
use crate::resolve::{filtered_target, resolve_rules, ResolvedRule};
use crate::rule::{Check, HookContext, Rule, Rules};
use formsieve_core::value::{is_empty, to_text};
use formsieve_core::{Common, ErrorBag, FileInput, FilesSource, Result, SieveError};
use formsieve_db::DbAdapter;
use formsieve_validate::Validator;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

const ARITY_ERR: &str = "{name} does not accept multiple values";
const HOOK_ERR: &str = "{value} is not valid";

/// Validates one submission against a set of rules.
///
/// ```rust,ignore
/// use formsieve::prelude::*;
///
/// let mut handler = Handler::new()
///     .data_source(form)
///     .rules(Rules::from_json_str(r#"{"email": "email", "age": "pInt"}"#)?);
///
/// if handler.execute().await? {
///     let email = handler.data().get_as::<String>("email")?;
/// } else {
///     for (field, message) in handler.errors().iter() {
///         eprintln!("{field}: {message}");
///     }
/// }
/// ```
#[derive(Default)]
pub struct Handler {
    data_source: Option<Map<String, Value>>,
    files_source: Option<FilesSource>,
    rules: Option<Rules>,
    added: Vec<(String, Value, Option<Rule>)>,
    validator: Validator,
    db_adapter: Option<Arc<dyn DbAdapter>>,
    config: Option<HandlerConfig>,
    common: Common,
    db_common: Common,
    resolved: IndexMap<String, ResolvedRule>,
    data: Map<String, Value>,
    executed: bool,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("fields", &self.rules.as_ref().map_or(0, Rules::len))
            .field("has_files", &self.files_source.is_some())
            .field("has_db_adapter", &self.db_adapter.is_some())
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(
        data: Map<String, Value>,
        files: Option<FilesSource>,
        rules: Rules,
    ) -> Self {
        Self {
            data_source: Some(data),
            files_source: files,
            rules: Some(rules),
            ..Self::default()
        }
    }

    pub fn data_source(mut self, data: Map<String, Value>) -> Self {
        self.data_source = Some(data);
        self
    }

    pub fn files_source(mut self, files: FilesSource) -> Self {
        self.files_source = Some(files);
        self
    }

    pub fn rules(mut self, rules: Rules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Replace the validator, e.g. to plug in another phone parser or file detector.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn db_adapter(mut self, adapter: Arc<dyn DbAdapter>) -> Self {
        self.db_adapter = Some(adapter);
        self
    }

    pub fn config(mut self, config: HandlerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Add a value that is not part of the submitted data.
    ///
    /// With a rule the field is validated like any other; without one it is
    /// carried into the validated data as-is.
    pub fn add_field(mut self, name: impl Into<String>, value: impl Into<Value>, rule: Option<Rule>) -> Self {
        self.added.push((name.into(), value.into(), rule));
        self
    }

    /// Validate every declared field.
    pub async fn execute(&mut self) -> Result<bool> {
        self.run(None).await
    }

    /// Validate only the fields that were submitted, plus `required_fields`.
    pub async fn execute_on_demand<I, S>(&mut self, required_fields: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let required = required_fields.into_iter().map(Into::into).collect();
        self.run(Some(required)).await
    }

    /// Every error recorded so far, across the handler, the validator and the checks.
    pub fn errors(&self) -> ErrorBag {
        let mut bag = self.common.errors().clone();
        bag.merge(self.validator.errors());
        bag.merge(self.db_common.errors());
        bag
    }

    pub fn succeeds(&self) -> bool {
        self.executed && self.errors().is_empty()
    }

    pub fn data(&self) -> ValidatedData {
        ValidatedData::new(self.data.clone())
    }

    pub fn get_resolved_rules(&self) -> &IndexMap<String, ResolvedRule> {
        &self.resolved
    }

    /// Exporter over the validated data, using the configured DB case style.
    pub fn model(&self) -> Model {
        Model::new(self.data.clone(), self.effective_config().db_case_style)
    }

    fn effective_config(&self) -> HandlerConfig {
        self.config.clone().unwrap_or_else(global_config)
    }

    fn has_error(&self, field: &str) -> bool {
        self.common.errors().contains(field)
            || self.validator.errors().contains(field)
            || self.db_common.errors().contains(field)
    }

    async fn run(&mut self, on_demand: Option<HashSet<String>>) -> Result<bool> {
        if self.executed {
            return Err(SieveError::State("the handler was already executed".into()));
        }
        let source = self.data_source.as_ref().ok_or(SieveError::MissingDataSource)?;
        let declared = self.rules.as_ref().ok_or(SieveError::MissingRules)?;
        self.executed = true;

        let mut raw = source.clone();
        let mut rules = declared.clone();
        for (name, value, rule) in &self.added {
            raw.insert(name.clone(), value.clone());
            if let Some(rule) = rule {
                rules.insert(name.clone(), rule.clone());
            }
        }

        let files = self.files_source.as_ref();
        let mut resolved = resolve_rules(&rules, &raw, files)?;

        if let Some(required) = &on_demand {
            resolved.retain(|name, _| {
                required.contains(name)
                    || raw.contains_key(name)
                    || files.map_or(false, |f| f.contains_key(name))
            });
        }
        for rule in resolved.values_mut() {
            rule.resolve_hint(&raw);
        }
        formsieve_core::trace_info!(
            fields = resolved.len(),
            on_demand = on_demand.is_some(),
            "executing handler"
        );

        let mut missing = HashSet::new();
        for rule in resolved.values() {
            if rule.dropped || !is_missing(rule, &raw, files) {
                continue;
            }
            if rule.required {
                self.common.reset(&rule.name, 0);
                self.common.set_error(&rule.hint, "")?;
            }
            missing.insert(rule.name.clone());
        }
        if !self.common.errors().is_empty() {
            formsieve_core::trace_info!(missing = self.common.errors().len(), "required fields missing");
            self.resolved = resolved;
            return Ok(false);
        }

        let mut data = Map::new();
        for rule in resolved.values() {
            let value = if rule.dropped {
                Value::Null
            } else if rule.data_type.is_file() {
                let entries = files
                    .and_then(|f| f.get(&rule.name))
                    .map(FileInput::entries)
                    .unwrap_or_default();
                file_data(rule, &entries)
            } else if missing.contains(&rule.name) {
                rule.default_value.clone()
            } else {
                rule.filter(raw.get(&rule.name).unwrap_or(&Value::Null))
            };
            data.insert(rule.name.clone(), value);
        }
        for (name, value, _) in &self.added {
            if !resolved.contains_key(name) {
                data.insert(name.clone(), value.clone());
            }
        }
        for rule in resolved.values() {
            let Some(rule_override) = rule.override_if.as_ref().filter(|_| !rule.dropped) else {
                continue;
            };
            let target = match data.get(&rule_override.field) {
                Some(value) => value.clone(),
                None => filtered_target(&rule_override.field, &resolved, &raw, files),
            };
            if rule_override.condition.holds(&target, &rule_override.value) {
                formsieve_core::trace_debug!(field = %rule.name, "overrideIf applied");
                data.insert(rule.name.clone(), rule_override.with.clone());
            }
        }

        for rule in resolved.values() {
            if rule.dropped || rule.is_list {
                continue;
            }
            let multiple = if rule.data_type.is_file() {
                files
                    .and_then(|f| f.get(&rule.name))
                    .map_or(false, FileInput::is_multiple)
            } else {
                matches!(raw.get(&rule.name), Some(Value::Array(items)) if items.len() > 1)
            };
            if multiple {
                self.common.reset(&rule.name, 0);
                self.common.set_error(ARITY_ERR, "")?;
            }
        }

        for rule in resolved.values_mut() {
            rule.resolve_options(&data);
        }
        let ordered: Vec<ResolvedRule> = resolved.values().cloned().collect();
        self.resolved = resolved;

        for rule in &ordered {
            if rule.dropped || missing.contains(&rule.name) || self.has_error(&rule.name) {
                continue;
            }
            if rule.data_type.is_file() {
                self.validate_files(rule, &mut data).await?;
            } else {
                self.validate_values(rule, &mut data).await?;
            }
        }

        if self.errors().is_empty() {
            self.run_checks(&ordered, &missing, &data).await?;
        }

        if self.errors().is_empty() {
            for rule in &ordered {
                let Some(compute) = rule.compute.as_ref().filter(|_| !rule.dropped) else {
                    continue;
                };
                let ctx = HookContext {
                    field: rule.name.clone(),
                    value: data.get(&rule.name).cloned().unwrap_or(Value::Null),
                    index: 0,
                    data: data.clone(),
                };
                let value = compute.call(ctx).await?;
                data.insert(rule.name.clone(), value);
            }
        }

        self.data = data;
        let errors = self.errors();
        formsieve_core::trace_info!(passed = errors.is_empty(), errors = errors.len(), "handler finished");
        Ok(errors.is_empty())
    }

    async fn validate_values(&mut self, rule: &ResolvedRule, data: &mut Map<String, Value>) -> Result<()> {
        for (index, value) in values_of(rule, data).into_iter().enumerate() {
            if value.is_null() {
                continue;
            }
            let passed = self
                .validator
                .validate_value(rule.data_type, &rule.name, &value, index, &rule.options)
                .await?;
            if !passed {
                break;
            }
            let value = match self.validator.take_transformed() {
                Some(transformed) => {
                    replace_value(data, rule, index, transformed.clone());
                    transformed
                }
                None => value,
            };
            if !self.run_validate_hook(rule, value, index, data).await? {
                break;
            }
        }
        Ok(())
    }

    async fn validate_files(&mut self, rule: &ResolvedRule, data: &mut Map<String, Value>) -> Result<()> {
        let Some(input) = self.files_source.as_ref().and_then(|f| f.get(&rule.name)) else {
            return Ok(());
        };
        let multiple = matches!(input, FileInput::Multiple(_));
        let mut entries: Vec<_> = input.entries().into_iter().filter(|e| !e.name.is_empty()).collect();

        for (index, entry) in entries.iter_mut().enumerate() {
            let passed = self
                .validator
                .validate_file_as(rule.data_type.file_category(), &rule.name, entry, index, &rule.options)
                .await?;
            if !passed || !self.run_validate_hook(rule, entry.to_value(), index, data).await? {
                break;
            }
        }

        data.insert(rule.name.clone(), file_data(rule, &entries));
        let updated = if multiple {
            FileInput::from(entries)
        } else {
            match entries.into_iter().next() {
                Some(entry) => FileInput::Single(entry),
                None => return Ok(()),
            }
        };
        if let Some(files) = self.files_source.as_mut() {
            files.insert(rule.name.clone(), updated);
        }
        Ok(())
    }

    /// Runs after the built-in check passed, inside the same error window.
    async fn run_validate_hook(
        &mut self,
        rule: &ResolvedRule,
        value: Value,
        index: usize,
        data: &Map<String, Value>,
    ) -> Result<bool> {
        let Some(hook) = &rule.validate else {
            return Ok(true);
        };
        let shown = display_value(&value);
        let ctx = HookContext {
            field: rule.name.clone(),
            value,
            index,
            data: data.clone(),
        };
        match hook.call(ctx).await {
            Ok(()) => Ok(true),
            Err(message) => {
                let template = if message.is_empty() { HOOK_ERR } else { message.as_str() };
                self.validator.fail(template, &shown)
            }
        }
    }

    async fn run_checks(
        &mut self,
        rules: &[ResolvedRule],
        missing: &HashSet<String>,
        data: &Map<String, Value>,
    ) -> Result<()> {
        let config = self.effective_config();
        let adapter = self.db_adapter.clone().or_else(|| config.adapter.clone());
        let settings = config.db_settings();

        for rule in rules {
            if rule.dropped || rule.checks.is_empty() || missing.contains(&rule.name) {
                continue;
            }
            'values: for (index, value) in values_of(rule, data).into_iter().enumerate() {
                if value.is_null() {
                    continue;
                }
                for check in &rule.checks {
                    let passed = match check {
                        Check::Db(db_check) => {
                            let adapter = adapter.as_ref().ok_or_else(|| {
                                formsieve_core::trace_warn!(
                                    field = %rule.name,
                                    model = %db_check.model,
                                    "db check skipped, no adapter configured"
                                );
                                SieveError::Config(format!(
                                    "field '{}' declares a db check but no db adapter is configured",
                                    rule.name
                                ))
                            })?;
                            adapter
                                .execute(
                                    rule.data_type,
                                    &rule.name,
                                    &value,
                                    index,
                                    db_check,
                                    &settings,
                                    &mut self.db_common,
                                )
                                .await?
                        }
                        Check::Callback(hook) => {
                            self.db_common.reset(&rule.name, index);
                            let ctx = HookContext {
                                field: rule.name.clone(),
                                value: value.clone(),
                                index,
                                data: data.clone(),
                            };
                            match hook.call(ctx).await {
                                Ok(()) => true,
                                Err(message) => {
                                    let template =
                                        if message.is_empty() { HOOK_ERR } else { message.as_str() };
                                    self.db_common.set_error(template, &display_value(&value))?;
                                    false
                                }
                            }
                        }
                    };
                    if !passed {
                        break 'values;
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_missing(rule: &ResolvedRule, raw: &Map<String, Value>, files: Option<&FilesSource>) -> bool {
    if rule.data_type.is_file() {
        return !files
            .and_then(|f| f.get(&rule.name))
            .map_or(false, FileInput::has_name);
    }
    let value = raw.get(&rule.name).unwrap_or(&Value::Null);
    if is_empty(value) {
        return true;
    }
    match rule.filter(value) {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn file_data(rule: &ResolvedRule, entries: &[formsieve_core::FileEntry]) -> Value {
    let mut named = entries.iter().filter(|e| !e.name.is_empty()).map(|e| e.to_value());
    if rule.is_list {
        Value::Array(named.collect())
    } else {
        named.next().unwrap_or(Value::Null)
    }
}

fn values_of(rule: &ResolvedRule, data: &Map<String, Value>) -> Vec<Value> {
    match data.get(&rule.name) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) if rule.is_list => items.clone(),
        Some(value) => vec![value.clone()],
    }
}

fn replace_value(data: &mut Map<String, Value>, rule: &ResolvedRule, index: usize, value: Value) {
    match data.get_mut(&rule.name) {
        Some(Value::Array(items)) if rule.is_list => {
            if let Some(slot) = items.get_mut(index) {
                *slot = value;
            }
        }
        Some(slot) => *slot = value,
        None => {
            data.insert(rule.name.clone(), value);
        }
    }
}

// Files are reported by their client name.
fn display_value(value: &Value) -> String {
    match value.get("name") {
        Some(name) if value.get("tmpPath").is_some() => to_text(name),
        _ => to_text(value),
    }
}
