use crate::limits::LimitUnit;
use crate::options::Options;
use crate::patterns::{email_regex, url_regex};
use crate::validator::Validator;
use formsieve_core::Result;

const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 26;

fn chars(value: &str) -> Option<(f64, LimitUnit)> {
    Some((value.chars().count() as f64, LimitUnit::Chars))
}

fn is_structural_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    value.len() <= 254
        && !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !value.contains("..")
        && domain.len() <= 253
        && email_regex().is_match(value)
}

impl Validator {
    pub fn validate_text(
        &mut self,
        field: &str,
        value: &str,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.begin(field, index);
        self.run_shared_checks(value, chars(value), options)
    }

    pub fn validate_email(
        &mut self,
        field: &str,
        value: &str,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.begin(field, index);
        if !is_structural_email(value) {
            let err = options.err.as_deref().unwrap_or("{value} is not a valid email address");
            return self.fail(err, value);
        }
        self.run_shared_checks(value, chars(value), options)
    }

    pub fn validate_url(
        &mut self,
        field: &str,
        value: &str,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.begin(field, index);
        if !url_regex().is_match(value) {
            let err = options.err.as_deref().unwrap_or("{value} is not a valid url");
            return self.fail(err, value);
        }
        self.run_shared_checks(value, chars(value), options)
    }

    /// With `pre_validate` on, a password needs 8 to 26 characters, two
    /// letters and two non-letters before the caller's own checks run.
    pub fn validate_password(
        &mut self,
        field: &str,
        value: &str,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.begin(field, index);
        if options.pre_validate {
            let len = value.chars().count();
            let letters = value.chars().filter(|c| c.is_alphabetic()).count();
            let others = len - letters;

            if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
                return self.fail("{name} should be between 8 and 26 characters", "");
            }
            if letters < 2 {
                return self.fail("{name} should contain at least two letters", "");
            }
            if others < 2 {
                return self.fail(
                    "{name} should contain at least two non-letter characters",
                    "",
                );
            }
        }
        self.run_shared_checks(value, chars(value), options)
    }
}
