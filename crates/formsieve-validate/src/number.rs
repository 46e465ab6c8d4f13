use crate::limits::LimitUnit;
use crate::options::Options;
use crate::patterns::{
    int_regex, money_regex, n_int_regex, n_number_regex, number_regex, p_int_regex,
    p_number_regex,
};
use crate::validator::Validator;
use formsieve_core::Result;
use regex::Regex;

impl Validator {
    fn validate_numeric(
        &mut self,
        field: &str,
        value: &str,
        index: usize,
        options: &Options,
        format: &Regex,
        default_err: &str,
    ) -> Result<bool> {
        self.begin(field, index);
        let parsed = format
            .is_match(value)
            .then(|| value.replace(',', "").parse::<f64>().ok())
            .flatten();
        let Some(measured) = parsed else {
            return self.fail(options.err.as_deref().unwrap_or(default_err), value);
        };
        self.run_shared_checks(value, Some((measured, LimitUnit::Number)), options)
    }

    pub fn validate_int(&mut self, field: &str, value: &str, index: usize, options: &Options) -> Result<bool> {
        self.validate_numeric(field, value, index, options, int_regex(), "{value} is not a valid integer")
    }

    /// Zero counts as a positive integer.
    pub fn validate_p_int(&mut self, field: &str, value: &str, index: usize, options: &Options) -> Result<bool> {
        self.validate_numeric(
            field,
            value,
            index,
            options,
            p_int_regex(),
            "{value} is not a valid positive integer",
        )
    }

    pub fn validate_n_int(&mut self, field: &str, value: &str, index: usize, options: &Options) -> Result<bool> {
        self.validate_numeric(
            field,
            value,
            index,
            options,
            n_int_regex(),
            "{value} is not a valid negative integer",
        )
    }

    pub fn validate_number(&mut self, field: &str, value: &str, index: usize, options: &Options) -> Result<bool> {
        self.validate_numeric(field, value, index, options, number_regex(), "{value} is not a valid number")
    }

    pub fn validate_p_number(&mut self, field: &str, value: &str, index: usize, options: &Options) -> Result<bool> {
        self.validate_numeric(
            field,
            value,
            index,
            options,
            p_number_regex(),
            "{value} is not a valid positive number",
        )
    }

    pub fn validate_n_number(&mut self, field: &str, value: &str, index: usize, options: &Options) -> Result<bool> {
        let negative = n_number_regex().is_match(value)
            && value.parse::<f64>().map(|n| n < 0.0).unwrap_or(false);
        if !negative {
            self.begin(field, index);
            let err = options.err.as_deref().unwrap_or("{value} is not a valid negative number");
            return self.fail(err, value);
        }
        self.validate_numeric(
            field,
            value,
            index,
            options,
            n_number_regex(),
            "{value} is not a valid negative number",
        )
    }

    /// Up to two decimals, optional thousands separators.
    pub fn validate_money(&mut self, field: &str, value: &str, index: usize, options: &Options) -> Result<bool> {
        self.validate_numeric(
            field,
            value,
            index,
            options,
            money_regex(),
            "{value} is not a valid monetary value",
        )
    }
}
