//! Phone number parsing contract and a calling-code based default parser.

use crate::options::Options;
use crate::validator::Validator;
use async_trait::async_trait;
use formsieve_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub country_code: u16,
    pub national_number: String,
    /// Two letter region, upper case.
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneFormat {
    E164,
    International,
    National,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Invalid phone number: {0}")]
    Invalid(String),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),
}

/// Parses and formats phone numbers.
#[async_trait]
pub trait PhoneParser: Send + Sync {
    /// Parse `number`, reading national numbers in the context of `country`.
    async fn parse(&self, number: &str, country: Option<&str>) -> Result<PhoneNumber, PhoneError>;

    fn format(&self, number: &PhoneNumber, format: PhoneFormat) -> String;
}

struct Region {
    code: &'static str,
    calling_code: u16,
    lengths: (usize, usize),
    trunk: &'static str,
}

const fn region(
    code: &'static str,
    calling_code: u16,
    lengths: (usize, usize),
    trunk: &'static str,
) -> Region {
    Region {
        code,
        calling_code,
        lengths,
        trunk,
    }
}

const REGIONS: &[Region] = &[
    region("US", 1, (10, 10), "1"),
    region("CA", 1, (10, 10), "1"),
    region("GB", 44, (10, 10), "0"),
    region("DE", 49, (6, 11), "0"),
    region("FR", 33, (9, 9), "0"),
    region("ES", 34, (9, 9), ""),
    region("IT", 39, (6, 11), ""),
    region("NL", 31, (9, 9), "0"),
    region("NG", 234, (10, 10), "0"),
    region("GH", 233, (9, 9), "0"),
    region("KE", 254, (9, 9), "0"),
    region("ZA", 27, (9, 9), "0"),
    region("IN", 91, (10, 10), "0"),
    region("CN", 86, (11, 11), "0"),
    region("JP", 81, (9, 10), "0"),
    region("AU", 61, (9, 9), "0"),
    region("BR", 55, (10, 11), "0"),
    region("MX", 52, (10, 10), ""),
];

fn find_region(code: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.code.eq_ignore_ascii_case(code))
}

/// Default parser backed by a small calling-code table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicPhoneParser;

impl BasicPhoneParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_sync(&self, number: &str, country: Option<&str>) -> Result<PhoneNumber, PhoneError> {
        let compact: String = number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
            .collect();
        let (international, digits) = if let Some(rest) = compact.strip_prefix('+') {
            (true, rest)
        } else if let Some(rest) = compact.strip_prefix("00") {
            (true, rest)
        } else {
            (false, compact.as_str())
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::Invalid(number.to_string()));
        }

        let preferred = match country {
            Some(code) => {
                Some(find_region(code).ok_or_else(|| PhoneError::UnknownRegion(code.to_string()))?)
            }
            None => None,
        };

        let (region, national) = if international {
            let candidates = (1..=3).filter_map(|len| {
                let calling: u16 = digits.get(..len)?.parse().ok()?;
                let region = preferred
                    .filter(|r| r.calling_code == calling)
                    .or_else(|| REGIONS.iter().find(|r| r.calling_code == calling))?;
                Some((region, &digits[len..]))
            });
            candidates
                .into_iter()
                .find(|(r, rest)| (r.lengths.0..=r.lengths.1).contains(&rest.len()))
                .ok_or_else(|| PhoneError::Invalid(number.to_string()))?
        } else {
            let region = preferred.ok_or_else(|| PhoneError::Invalid(number.to_string()))?;
            let national = match digits.strip_prefix(region.trunk) {
                Some(rest) if !region.trunk.is_empty() && rest.len() >= region.lengths.0 => rest,
                _ => digits,
            };
            (region, national)
        };

        if !(region.lengths.0..=region.lengths.1).contains(&national.len()) {
            return Err(PhoneError::Invalid(number.to_string()));
        }

        Ok(PhoneNumber {
            country_code: region.calling_code,
            national_number: national.to_string(),
            region: region.code.to_string(),
        })
    }
}

fn group(digits: &str) -> String {
    let split = match digits.len() {
        10 => vec![3, 3, 4],
        9 => vec![3, 3, 3],
        11 => vec![3, 4, 4],
        _ => return digits.to_string(),
    };
    let mut parts = Vec::with_capacity(split.len());
    let mut start = 0;
    for len in split {
        parts.push(&digits[start..start + len]);
        start += len;
    }
    parts.join(" ")
}

#[async_trait]
impl PhoneParser for BasicPhoneParser {
    async fn parse(&self, number: &str, country: Option<&str>) -> Result<PhoneNumber, PhoneError> {
        self.parse_sync(number, country)
    }

    fn format(&self, number: &PhoneNumber, format: PhoneFormat) -> String {
        match format {
            PhoneFormat::E164 => format!("+{}{}", number.country_code, number.national_number),
            PhoneFormat::International => {
                format!("+{} {}", number.country_code, group(&number.national_number))
            }
            PhoneFormat::National => {
                let trunk = find_region(&number.region)
                    .map(|r| r.trunk)
                    .filter(|t| *t == "0")
                    .unwrap_or("");
                format!("{trunk}{}", group(&number.national_number))
            }
        }
    }
}

impl Validator {
    /// Parse through the configured [`PhoneParser`], check the region against
    /// `options.country`, and rewrite the value when `options.format` is set.
    pub async fn validate_phone_number(
        &mut self,
        field: &str,
        value: &str,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.begin(field, index);
        let parser = self.phone_parser.clone();
        let default_err = "{value} is not a valid phone number";

        let parsed = match parser.parse(value, options.country.as_deref()).await {
            Ok(number) => number,
            Err(err) => {
                formsieve_core::trace_debug!(field = %field, error = %err, "phone number rejected");
                return self.fail(options.err.as_deref().unwrap_or(default_err), value);
            }
        };
        if let Some(country) = &options.country {
            if !parsed.region.eq_ignore_ascii_case(country) {
                return self.fail(options.err.as_deref().unwrap_or(default_err), value);
            }
        }

        if !self.run_shared_checks(value, None, options)? {
            return Ok(false);
        }
        if let Some(format) = options.format {
            self.set_transformed(Value::String(parser.format(&parsed, format)));
        }
        Ok(true)
    }
}
