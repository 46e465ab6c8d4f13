//! The per-type validator.
//!
//! Every `validate_*` method opens a fresh error window on the shared
//! [`Common`], runs the type's format check, then the limits, the regex family
//! and `should_match`, stopping at the first error. `Ok(false)` means an error
//! was recorded; `Err` is reserved for misuse.

use crate::date::{default_date_converter, DateConverter};
use crate::file::{FileTypeDetector, MagicDetector};
use crate::limits::LimitUnit;
use crate::options::Options;
use crate::phone::{BasicPhoneParser, PhoneParser};
use chrono::NaiveDate;
use formsieve_core::value::to_text;
use formsieve_core::{Common, DataType, ErrorBag, Result, SieveError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub struct Validator {
    common: Common,
    pub(crate) detector: Arc<dyn FileTypeDetector>,
    pub(crate) phone_parser: Arc<dyn PhoneParser>,
    date_converter: DateConverter,
    transformed: Option<Value>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("common", &self.common)
            .field("transformed", &self.transformed)
            .finish_non_exhaustive()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self {
            common: Common::new(),
            detector: Arc::new(MagicDetector::new()),
            phone_parser: Arc::new(BasicPhoneParser::new()),
            date_converter: default_date_converter(),
            transformed: None,
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn FileTypeDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_phone_parser(mut self, parser: Arc<dyn PhoneParser>) -> Self {
        self.phone_parser = parser;
        self
    }

    /// Replace the converter used to compare dates against limits.
    pub fn with_date_converter(
        mut self,
        converter: impl Fn(&str) -> Option<NaiveDate> + Send + Sync + 'static,
    ) -> Self {
        self.date_converter = Arc::new(converter);
        self
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn errors(&self) -> &ErrorBag {
        self.common.errors()
    }

    pub fn succeeds(&self) -> bool {
        self.common.succeeds()
    }

    pub fn fails(&self) -> bool {
        self.common.fails()
    }

    /// Working value produced by the last check, e.g. a formatted phone number.
    pub fn take_transformed(&mut self) -> Option<Value> {
        self.transformed.take()
    }

    /// Record `template` for the current field and report failure.
    pub fn fail(&mut self, template: &str, value: &str) -> Result<bool> {
        self.common.set_error(template, value)?;
        Ok(false)
    }

    pub(crate) fn begin(&mut self, field: &str, index: usize) {
        self.common.reset(field, index);
        self.transformed = None;
    }

    pub(crate) fn set_transformed(&mut self, value: Value) {
        self.transformed = Some(value);
    }

    pub(crate) fn convert_date(&self, text: &str) -> Option<NaiveDate> {
        (self.date_converter)(text)
    }

    /// Limits (when `measured` is known), the regex family, then `should_match`.
    pub(crate) fn run_shared_checks(
        &mut self,
        value: &str,
        measured: Option<(f64, LimitUnit)>,
        options: &Options,
    ) -> Result<bool> {
        if let Some((measured, unit)) = measured {
            if !self.check_limits(value, measured, unit, options)? {
                return Ok(false);
            }
        }
        if !self.check_regex_family(value, options)? {
            return Ok(false);
        }
        self.check_should_match(value, options)
    }

    /// Validate a non-file value by data type.
    pub async fn validate_value(
        &mut self,
        data_type: DataType,
        field: &str,
        value: &Value,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        let text = to_text(value);
        match data_type {
            DataType::Text => self.validate_text(field, &text, index, options),
            DataType::Email => self.validate_email(field, &text, index, options),
            DataType::Url => self.validate_url(field, &text, index, options),
            DataType::Password => self.validate_password(field, &text, index, options),
            DataType::PhoneNumber => {
                self.validate_phone_number(field, &text, index, options)
                    .await
            }
            DataType::Date => self.validate_date(field, &text, index, options),
            DataType::Choice => self.validate_choice(field, value, index, options),
            DataType::Range => self.validate_range(field, value, index, options),
            DataType::Int => self.validate_int(field, &text, index, options),
            DataType::PInt => self.validate_p_int(field, &text, index, options),
            DataType::NInt => self.validate_n_int(field, &text, index, options),
            DataType::Number => self.validate_number(field, &text, index, options),
            DataType::PNumber => self.validate_p_number(field, &text, index, options),
            DataType::NNumber => self.validate_n_number(field, &text, index, options),
            DataType::Money => self.validate_money(field, &text, index, options),
            DataType::Boolean | DataType::Checkbox => {
                self.begin(field, index);
                Ok(true)
            }
            DataType::File
            | DataType::Image
            | DataType::Audio
            | DataType::Video
            | DataType::Media
            | DataType::Document
            | DataType::Archive => Err(SieveError::Config(format!(
                "field '{field}' of type {data_type} must be validated as a file entry"
            ))),
        }
    }
}
