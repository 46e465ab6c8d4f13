//! # formsieve-validate
//!
//! Per-type checks used by the formsieve handler. A [`Validator`] records at
//! most one error per field window through its shared
//! [`Common`](formsieve_core::Common) state.
//!
//! ```rust,ignore
//! use formsieve_validate::{Options, Validator};
//!
//! let mut v = Validator::new();
//! assert!(v.validate_int("age", "20", 0, &Options::new().min(18))?);
//! assert!(!v.validate_date("dob", "2014-13-01", 0, &Options::new())?);
//! assert_eq!(v.errors().get("dob"), Some("2014-13-01 is not a valid date"));
//! ```
//!
//! Content sniffing and phone parsing sit behind the [`FileTypeDetector`] and
//! [`PhoneParser`] traits, with [`MagicDetector`] and [`BasicPhoneParser`] as
//! the defaults.

mod choice;
mod date;
mod file;
mod limits;
mod number;
mod options;
mod patterns;
mod phone;
mod text;
mod validator;

pub use choice::expand_range;
pub use date::{default_date_converter, DateConverter};
pub use file::{FileTypeDetector, MagicDetector, ARCHIVE_EXTS, DOCUMENT_EXTS};
pub use limits::parse_size;
pub use options::{FileMoveContext, MoveHook, Options, RegexAny, RegexRule, ShouldMatch};
pub use phone::{BasicPhoneParser, PhoneError, PhoneFormat, PhoneNumber, PhoneParser};
pub use validator::Validator;
