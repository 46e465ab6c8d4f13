//! # formsieve
//!
//! Declarative validation and normalization of form submissions, API payloads
//! and file uploads.
//!
//! Declare a rule per field, hand the submitted data to a [`Handler`] and run
//! it. Values are filtered (decoded, stripped, trimmed, cast), validated by
//! data type, checked against a database and finally computed. Validation
//! failures are collected per field; `Err` is reserved for misconfiguration.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use formsieve::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> formsieve::Result<()> {
//!     let rules = Rules::from_json(json!({
//!         "email": {"type": "email", "checks": [{"that": "notExists", "model": "users"}]},
//!         "age": {"type": "pInt", "options": {"min": 18}},
//!         "subscribe": {"type": "checkbox", "required": false},
//!         "topics": {"requiredIf": {"condition": "checked", "field": "subscribe"}}
//!     }))?;
//!
//!     let form = json!({"email": "ada@example.com", "age": "36", "subscribe": "on", "topics": ["rust"]});
//!     let mut handler = Handler::new()
//!         .data_source(form.as_object().cloned().unwrap_or_default())
//!         .rules(rules)
//!         .db_adapter(Arc::new(InMemoryAdapter::new()));
//!
//!     if handler.execute().await? {
//!         let record = handler.model().case_style(CaseStyle::Snake).export();
//!         println!("{record:?}");
//!     } else {
//!         println!("{:?}", handler.errors());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `tracing` (default) - structured logs of every handler phase
//! - `config` - [`HandlerConfig::from_env`](config::HandlerConfig) with `.env` support
//! - `full` - all optional features enabled

pub mod config;
mod data;
mod handler;
mod model;
mod resolve;
mod rule;

pub use config::{global_config, set_global_config, HandlerConfig};
pub use data::ValidatedData;
pub use handler::Handler;
pub use model::Model;
pub use resolve::ResolvedRule;
pub use rule::{
    Check, CheckHook, ComputeHook, Condition, Conditional, HookContext, Override, Rule, Rules,
    ValidateHook,
};

// Re-export the building blocks
pub use formsieve_core::{
    case, filter, inflect, placeholder, value, CaseStyle, Common, DataType, DetectedType,
    ErrorBag, FileCategory, FileEntry, FileEntryCollection, FileInput, FilesSource,
    FilterCallback, Filters, Interpolate, PlaceholderContext, Result, SieveError,
};
pub use formsieve_db::{build_query, DbAdapter, DbCheck, DbKind, DbSettings, Existence, InMemoryAdapter};
pub use formsieve_validate::{
    expand_range, parse_size, BasicPhoneParser, FileMoveContext, FileTypeDetector, MagicDetector,
    MoveHook, Options, PhoneError, PhoneFormat, PhoneNumber, PhoneParser, RegexAny, RegexRule,
    ShouldMatch, Validator,
};

/// Commonly used types.
///
/// ```rust,ignore
/// use formsieve::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Pipeline
        Handler,
        HandlerConfig,
        Model,
        ValidatedData,
        // Rules
        Check,
        Condition,
        Conditional,
        DataType,
        Filters,
        Options,
        Override,
        RegexRule,
        Rule,
        Rules,
        // Database checks
        DbAdapter,
        DbCheck,
        DbKind,
        InMemoryAdapter,
        // Files and phones
        FileEntry,
        FileInput,
        FilesSource,
        PhoneFormat,
        // Errors
        CaseStyle,
        ErrorBag,
        Result,
        SieveError,
    };
    pub use std::sync::Arc;
}
