//! `min` / `max` / `gt` / `lt` limiting rules.

use crate::options::Options;
use crate::validator::Validator;
use formsieve_core::placeholder::has_placeholder;
use formsieve_core::value::to_text;
use formsieve_core::{Result, SieveError};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static SIZE_REGEX: OnceLock<Regex> = OnceLock::new();

/// What a limit measures; decides how limits parse and the default wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LimitUnit {
    Chars,
    Number,
    Date,
    Bytes,
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Min,
    Max,
    Gt,
    Lt,
}

impl Bound {
    fn violated(self, measured: f64, limit: f64) -> bool {
        match self {
            Bound::Min => measured < limit,
            Bound::Max => measured > limit,
            Bound::Gt => measured <= limit,
            Bound::Lt => measured >= limit,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Bound::Min => "min",
            Bound::Max => "max",
            Bound::Gt => "gt",
            Bound::Lt => "lt",
        }
    }
}

fn default_message(unit: LimitUnit, bound: Bound) -> &'static str {
    match (unit, bound) {
        (LimitUnit::Chars, Bound::Min) => "{name} should be at least {count} characters",
        (LimitUnit::Chars, Bound::Max) => "{name} should not exceed {count} characters",
        (LimitUnit::Chars, Bound::Gt) => "{name} should be more than {count} characters",
        (LimitUnit::Chars, Bound::Lt) => "{name} should be less than {count} characters",
        (LimitUnit::Number, Bound::Min) => "{name} should not be less than {count}",
        (LimitUnit::Number, Bound::Max) => "{name} should not be greater than {count}",
        (LimitUnit::Number, Bound::Gt) => "{name} should be greater than {count}",
        (LimitUnit::Number, Bound::Lt) => "{name} should be less than {count}",
        (LimitUnit::Date, Bound::Min) => "{name} should not be earlier than {count}",
        (LimitUnit::Date, Bound::Max) => "{name} should not be later than {count}",
        (LimitUnit::Date, Bound::Gt) => "{name} should be after {count}",
        (LimitUnit::Date, Bound::Lt) => "{name} should be before {count}",
        (LimitUnit::Bytes, Bound::Min) => "{name} should be at least {count}",
        (LimitUnit::Bytes, Bound::Max) => "{name} should not exceed {count}",
        (LimitUnit::Bytes, Bound::Gt) => "{name} should be larger than {count}",
        (LimitUnit::Bytes, Bound::Lt) => "{name} should be smaller than {count}",
    }
}

/// Parse a size such as `2mb`, `512kb` or a plain byte count. Multiples of 1024.
pub fn parse_size(value: &Value) -> Option<f64> {
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    let text = value.as_str()?.trim();
    let re = SIZE_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*(b|kb|mb|gb|tb)?$").unwrap()
    });
    let caps = re.captures(text)?;
    let amount: f64 = caps[1].parse().ok()?;
    let power = match caps.get(2).map(|m| m.as_str().to_lowercase()).as_deref() {
        None | Some("b") => 0,
        Some("kb") => 1,
        Some("mb") => 2,
        Some("gb") => 3,
        _ => 4,
    };
    Some(amount * 1024f64.powi(power))
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

impl Validator {
    fn limit_value(&self, unit: LimitUnit, limit: &Value) -> Option<f64> {
        match unit {
            LimitUnit::Chars | LimitUnit::Number => parse_number(limit),
            LimitUnit::Bytes => parse_size(limit),
            LimitUnit::Date => limit
                .as_str()
                .and_then(|s| self.convert_date(s))
                .map(|d| date_ordinal(&d)),
        }
    }

    /// Check every configured limit against `measured`, stopping at the first
    /// violation.
    ///
    /// A limit whose `{token}` found no data is no limit at all. A limit filled
    /// from data that does not parse is skipped as well; one declared that way
    /// is a configuration error.
    pub(crate) fn check_limits(
        &mut self,
        value: &str,
        measured: f64,
        unit: LimitUnit,
        options: &Options,
    ) -> Result<bool> {
        let bounds = [
            (Bound::Min, &options.min, &options.min_err),
            (Bound::Max, &options.max, &options.max_err),
            (Bound::Gt, &options.gt, &options.gt_err),
            (Bound::Lt, &options.lt, &options.lt_err),
        ];

        for (bound, limit, custom_err) in bounds {
            let Some(limit) = limit else {
                continue;
            };
            if limit.as_str().is_some_and(has_placeholder) {
                formsieve_core::trace_debug!(field = %self.common().field(), bound = bound.name(), "limit left unresolved");
                continue;
            }
            let Some(parsed) = self.limit_value(unit, limit) else {
                if options.from_placeholder(bound.name()) {
                    formsieve_core::trace_debug!(field = %self.common().field(), bound = bound.name(), %limit, "limit from data unusable");
                    continue;
                }
                return Err(SieveError::Config(format!(
                    "invalid '{}' limit {} for field '{}'",
                    bound.name(),
                    limit,
                    self.common().field()
                )));
            };
            if bound.violated(measured, parsed) {
                let template = custom_err
                    .as_deref()
                    .unwrap_or_else(|| default_message(unit, bound))
                    .replace("{count}", &to_text(limit));
                return self.fail(&template, value);
            }
        }
        Ok(true)
    }
}

pub(crate) fn date_ordinal(date: &chrono::NaiveDate) -> f64 {
    use chrono::Datelike;
    f64::from(date.num_days_from_ce())
}
