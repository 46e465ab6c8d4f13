//! Built-in format patterns and the caller regex family.

use crate::options::Options;
use crate::validator::Validator;
use formsieve_core::{Result, SieveError};
use regex::Regex;
use std::sync::OnceLock;

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
static INT_REGEX: OnceLock<Regex> = OnceLock::new();
static P_INT_REGEX: OnceLock<Regex> = OnceLock::new();
static N_INT_REGEX: OnceLock<Regex> = OnceLock::new();
static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
static P_NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
static N_NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
static MONEY_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        // RFC 5322 simplified email regex
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
        ).unwrap()
    })
}

pub(crate) fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| Regex::new(r"^(?i)(https?|ftp)://[^\s/$.?#].[^\s]*$").unwrap())
}

/// `YYYY[sep]MM[sep]DD`; both separators are compared by the caller.
pub(crate) fn date_regex() -> &'static Regex {
    DATE_REGEX.get_or_init(|| Regex::new(r"^(\d{4})([-/.])(\d{1,2})([-/.])(\d{1,2})$").unwrap())
}

pub(crate) fn int_regex() -> &'static Regex {
    INT_REGEX.get_or_init(|| Regex::new(r"^[-+]?\d+$").unwrap())
}

pub(crate) fn p_int_regex() -> &'static Regex {
    P_INT_REGEX.get_or_init(|| Regex::new(r"^\+?\d+$").unwrap())
}

pub(crate) fn n_int_regex() -> &'static Regex {
    N_INT_REGEX.get_or_init(|| Regex::new(r"^-0*[1-9]\d*$").unwrap())
}

pub(crate) fn number_regex() -> &'static Regex {
    NUMBER_REGEX
        .get_or_init(|| Regex::new(r"^[-+]?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][-+]?\d+)?$").unwrap())
}

pub(crate) fn p_number_regex() -> &'static Regex {
    P_NUMBER_REGEX
        .get_or_init(|| Regex::new(r"^\+?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][-+]?\d+)?$").unwrap())
}

pub(crate) fn n_number_regex() -> &'static Regex {
    N_NUMBER_REGEX
        .get_or_init(|| Regex::new(r"^-(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][-+]?\d+)?$").unwrap())
}

pub(crate) fn money_regex() -> &'static Regex {
    MONEY_REGEX.get_or_init(|| {
        Regex::new(r"^[-+]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?$").unwrap()
    })
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SieveError::Config(format!("invalid regex '{pattern}': {e}")))
}

const DEFAULT_REGEX_ERR: &str = "{name} is not in the expected format";
const DEFAULT_REGEX_NONE_ERR: &str = "{name} contains a disallowed pattern";

impl Validator {
    /// `regex` (all must match), `regex_any` (one must match) and
    /// `regex_none` (none may match), stopping at the first error.
    pub(crate) fn check_regex_family(&mut self, value: &str, options: &Options) -> Result<bool> {
        for rule in &options.regex {
            if !compile(&rule.pattern)?.is_match(value) {
                let err = rule.err.as_deref().unwrap_or(DEFAULT_REGEX_ERR);
                return self.fail(err, value);
            }
        }

        if let Some(any) = &options.regex_any {
            let mut matched = any.patterns.is_empty();
            for pattern in &any.patterns {
                if compile(pattern)?.is_match(value) {
                    matched = true;
                    break;
                }
            }
            if !matched {
                let err = any.err.as_deref().unwrap_or(DEFAULT_REGEX_ERR);
                return self.fail(err, value);
            }
        }

        for rule in &options.regex_none {
            if compile(&rule.pattern)?.is_match(value) {
                let err = rule.err.as_deref().unwrap_or(DEFAULT_REGEX_NONE_ERR);
                return self.fail(err, value);
            }
        }

        Ok(true)
    }

    pub(crate) fn check_should_match(&mut self, value: &str, options: &Options) -> Result<bool> {
        match &options.should_match {
            Some(rule) if rule.target != value => {
                let err = rule.err.as_deref().unwrap_or("{name} does not match");
                self.fail(err, value)
            }
            _ => Ok(true),
        }
    }
}
