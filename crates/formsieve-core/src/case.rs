//! Field name case conversion, used for DB column names and model export.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::SieveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStyle {
    #[default]
    Camel,
    Snake,
}

impl CaseStyle {
    /// Convert a field name. Dotted paths are converted segment by segment.
    pub fn convert(&self, name: &str) -> String {
        name.split('.')
            .map(|segment| match self {
                CaseStyle::Camel => to_camel_case(segment),
                CaseStyle::Snake => to_snake_case(segment),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl FromStr for CaseStyle {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "camel" | "camelcase" => Ok(CaseStyle::Camel),
            "snake" | "snakecase" => Ok(CaseStyle::Snake),
            other => Err(SieveError::Config(format!("unknown case style '{other}'"))),
        }
    }
}

pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for (i, c) in name.chars().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            upper_next = i > 0 && !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '-' || c == ' ' {
            out.push('_');
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
    }
    out
}
