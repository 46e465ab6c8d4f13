use crate::limits::{date_ordinal, LimitUnit};
use crate::options::Options;
use crate::patterns::date_regex;
use crate::validator::Validator;
use chrono::NaiveDate;
use formsieve_core::Result;
use std::sync::Arc;

/// Turns a date string into a calendar date for limit comparisons.
pub type DateConverter = Arc<dyn Fn(&str) -> Option<NaiveDate> + Send + Sync>;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

pub fn default_date_converter() -> DateConverter {
    Arc::new(|text: &str| {
        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text.trim(), format).ok())
    })
}

impl Validator {
    /// Accepts `YYYY-MM-DD` with `-`, `/` or `.` as the separator.
    pub fn validate_date(
        &mut self,
        field: &str,
        value: &str,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.begin(field, index);

        let Some(caps) = date_regex().captures(value).filter(|c| c[2] == c[4]) else {
            let err = options
                .err
                .as_deref()
                .unwrap_or("{value} does not match the date format YYYY-MM-DD");
            return self.fail(err, value);
        };

        let parts = (caps[1].parse(), caps[3].parse(), caps[5].parse());
        let calendar = match parts {
            (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
            _ => None,
        };
        let converted = calendar.and_then(|_| self.convert_date(value));
        let Some(date) = converted else {
            return self.fail("{value} is not a valid date", value);
        };

        self.run_shared_checks(value, Some((date_ordinal(&date), LimitUnit::Date)), options)
    }
}

#[cfg(test)]
mod tests {
    use crate::options::Options;
    use crate::validator::Validator;

    #[test]
    fn format_and_calendar_validity() {
        let mut v = Validator::new();
        assert!(v.validate_date("dob", "2014-01-01", 0, &Options::new()).unwrap());
        assert!(v.validate_date("slash", "2014/02/28", 0, &Options::new()).unwrap());

        assert!(!v.validate_date("bad_month", "2014-13-01", 0, &Options::new()).unwrap());
        assert_eq!(v.errors().get("bad_month"), Some("2014-13-01 is not a valid date"));

        assert!(!v.validate_date("reversed", "01-01-2014", 0, &Options::new()).unwrap());
        assert_eq!(
            v.errors().get("reversed"),
            Some("01-01-2014 does not match the date format YYYY-MM-DD")
        );

        assert!(!v.validate_date("mixed", "2014-01/01", 0, &Options::new()).unwrap());
        assert!(!v.validate_date("leap", "2015-02-29", 0, &Options::new()).unwrap());
    }

    #[test]
    fn date_limits_compare_calendar_dates() {
        let mut v = Validator::new();
        let options = Options::new().min("2000-01-01").lt("2010/01/01");
        assert!(v.validate_date("d", "2005-06-15", 0, &options).unwrap());
        assert!(!v.validate_date("early", "1999-12-31", 0, &options).unwrap());
        assert_eq!(v.errors().get("early"), Some("early should not be earlier than 2000-01-01"));
        assert!(!v.validate_date("late", "2010-01-01", 0, &options).unwrap());
        assert_eq!(v.errors().get("late"), Some("late should be before 2010/01/01"));
    }

    #[test]
    fn custom_converter() {
        let mut v = Validator::new().with_date_converter(|_| None);
        assert!(!v.validate_date("d", "2014-01-01", 0, &Options::new()).unwrap());
    }

    #[test]
    fn unparseable_limit_is_a_config_error() {
        let mut v = Validator::new();
        let options = Options::new().min("yesterday");
        assert!(v.validate_date("d", "2014-01-01", 0, &options).is_err());
    }
}
