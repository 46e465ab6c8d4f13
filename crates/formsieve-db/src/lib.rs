//! # formsieve-db
//!
//! Database integrity checks. A [`DbCheck`] declares that a value must (or
//! must not) exist in a model; a [`DbAdapter`] answers the lookup. Concrete
//! database drivers implement [`DbAdapter::it_exists`] and inherit query
//! building and error reporting from [`DbAdapter::execute`].

mod adapter;
mod check;
mod memory;

pub use adapter::{build_query, DbAdapter, DbKind, DbSettings};
pub use check::{DbCheck, Existence};
pub use memory::InMemoryAdapter;
