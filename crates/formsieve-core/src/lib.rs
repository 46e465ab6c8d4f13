//! # formsieve-core
//!
//! Building blocks shared by the formsieve crates: the fatal error type, the
//! per-field error state, the closed set of data types, placeholder
//! interpolation and the value filter pipeline.
//!
//! Most users depend on the `formsieve` facade instead of this crate.

#[macro_use]
mod tracing_macros;

pub mod case;
pub mod common;
pub mod data_type;
pub mod error;
pub mod file;
pub mod filter;
pub mod inflect;
pub mod placeholder;
pub mod value;

pub use case::CaseStyle;
pub use common::{interpolate_error, Common, ErrorBag};
pub use data_type::{DataType, FileCategory};
pub use error::{Result, SieveError};
pub use file::{DetectedType, FileEntry, FileEntryCollection, FileInput, FilesSource};
pub use filter::{FilterCallback, Filters};
pub use placeholder::{Interpolate, PlaceholderContext};

#[cfg(feature = "tracing")]
#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
