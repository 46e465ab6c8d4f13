use crate::options::Options;
use crate::validator::Validator;
use formsieve_core::placeholder::has_placeholder;
use formsieve_core::value::{self, to_text};
use formsieve_core::{Result, SieveError};
use serde_json::Value;

/// Upper bound on the number of values a range may expand to.
const MAX_RANGE_LEN: usize = 100_000;

/// Expand `from..=to` by `step` into its members.
///
/// Numeric bounds produce numbers, single letter bounds produce letters.
/// Descending ranges are walked downwards.
pub fn expand_range(from: &Value, to: &Value, step: Option<&Value>) -> Result<Vec<String>> {
    let step = match step {
        None => 1.0,
        Some(v) => to_text(v)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|s| *s > 0.0 && s.is_finite())
            .ok_or_else(|| SieveError::Config(format!("invalid range step {v}")))?,
    };
    let (lo_text, hi_text) = (to_text(from), to_text(to));

    if let (Ok(start), Ok(end)) = (lo_text.trim().parse::<f64>(), hi_text.trim().parse::<f64>()) {
        let span = ((end - start).abs() / step).floor();
        if !span.is_finite() || span >= MAX_RANGE_LEN as f64 {
            return Err(SieveError::Config(format!(
                "range {lo_text}..{hi_text} expands to more than {MAX_RANGE_LEN} values"
            )));
        }
        let count = span as usize + 1;
        let direction = if end < start { -1.0 } else { 1.0 };
        return Ok((0..count)
            .map(|i| to_text(&value::number(start + direction * step * i as f64)))
            .collect());
    }

    let mut from_chars = lo_text.chars();
    let mut to_chars = hi_text.chars();
    match (from_chars.next(), from_chars.next(), to_chars.next(), to_chars.next()) {
        (Some(start), None, Some(end), None) if start.is_alphabetic() && end.is_alphabetic() => {
            let step = step as u32;
            if step == 0 {
                return Err(SieveError::Config("alphabetic range step must be a whole number".into()));
            }
            let (lo, hi) = (start as u32, end as u32);
            let members: Vec<u32> = if lo <= hi {
                (lo..=hi).step_by(step as usize).collect()
            } else {
                (hi..=lo).rev().step_by(step as usize).collect()
            };
            Ok(members
                .into_iter()
                .filter_map(char::from_u32)
                .map(String::from)
                .collect())
        }
        _ => Err(SieveError::Config(format!(
            "range bounds '{lo_text}' and '{hi_text}' are neither numbers nor letters"
        ))),
    }
}

impl Validator {
    /// String-compared membership in `options.choices`.
    pub fn validate_choice(
        &mut self,
        field: &str,
        value: &Value,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.begin(field, index);
        let text = to_text(value);
        if !options.choices.iter().any(|c| value::loosely_equal(c, value)) {
            let err = options.err.as_deref().unwrap_or("{value} is not an acceptable choice");
            return self.fail(err, &text);
        }
        self.run_shared_checks(&text, None, options)
    }

    /// Membership in the expansion of `options.from` / `to` / `step`.
    pub fn validate_range(
        &mut self,
        field: &str,
        value: &Value,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.begin(field, index);
        let (Some(from), Some(to)) = (&options.from, &options.to) else {
            return Err(SieveError::Config(format!(
                "range field '{field}' needs both 'from' and 'to'"
            )));
        };
        let text = to_text(value);
        let err = options.err.as_deref().unwrap_or("{value} is not an acceptable choice");
        let bounds = [Some(from), Some(to), options.step.as_ref()];
        if bounds.iter().flatten().any(|b| b.as_str().is_some_and(has_placeholder)) {
            formsieve_core::trace_debug!(field = %field, "range bounds left unresolved");
            return self.run_shared_checks(&text, None, options);
        }
        let members = match expand_range(from, to, options.step.as_ref()) {
            Ok(members) => members,
            Err(_) if ["from", "to", "step"].iter().any(|o| options.from_placeholder(o)) => {
                return self.fail(err, &text);
            }
            Err(e) => return Err(e),
        };
        let matches = members.iter().any(|m| *m == text)
            || text
                .parse::<f64>()
                .ok()
                .map(|n| members.iter().any(|m| m.parse::<f64>().ok() == Some(n)))
                .unwrap_or(false);
        if !matches {
            return self.fail(err, &text);
        }
        self.run_shared_checks(&text, None, options)
    }
}
