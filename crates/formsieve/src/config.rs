//! Handler defaults.
//!
//! A [`HandlerConfig`] can be passed to each [`Handler`](crate::Handler), or
//! installed once for the whole process with [`set_global_config`].
//!
//! ```rust,ignore
//! use formsieve::config::{set_global_config, HandlerConfig};
//! use formsieve::prelude::*;
//!
//! set_global_config(
//!     HandlerConfig::new()
//!         .db_case_style(CaseStyle::Snake)
//!         .db_adapter(Arc::new(MyAdapter::connect().await?)),
//! )?;
//! ```

use formsieve_core::{CaseStyle, Result, SieveError};
use formsieve_db::{DbAdapter, DbKind, DbSettings};
use std::fmt;
use std::sync::{Arc, OnceLock};

static GLOBAL_CONFIG: OnceLock<HandlerConfig> = OnceLock::new();

#[derive(Clone, Default)]
pub struct HandlerConfig {
    /// Case style of generated DB columns and exported model keys.
    pub db_case_style: CaseStyle,
    pub db_kind: DbKind,
    /// Adapter used when a handler has none of its own.
    pub adapter: Option<Arc<dyn DbAdapter>>,
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("db_case_style", &self.db_case_style)
            .field("db_kind", &self.db_kind)
            .field("adapter", &self.adapter.is_some())
            .finish()
    }
}

impl HandlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn db_case_style(mut self, style: CaseStyle) -> Self {
        self.db_case_style = style;
        self
    }

    pub fn db_kind(mut self, kind: DbKind) -> Self {
        self.db_kind = kind;
        self
    }

    pub fn db_adapter(mut self, adapter: Arc<dyn DbAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn db_settings(&self) -> DbSettings {
        DbSettings::new(self.db_case_style, self.db_kind)
    }

    /// Load defaults from `FORMSIEVE_DB_CASE_STYLE` and `FORMSIEVE_DB_KIND`,
    /// reading a `.env` file first when one exists.
    ///
    /// Existing environment variables take precedence over `.env` values.
    #[cfg(feature = "config")]
    pub fn from_env() -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct EnvConfig {
            db_case_style: Option<String>,
            db_kind: Option<String>,
        }

        let _ = dotenvy::dotenv();
        let env = envy::prefixed("FORMSIEVE_")
            .from_env::<EnvConfig>()
            .map_err(|e| SieveError::Config(e.to_string()))?;

        let mut config = Self::default();
        if let Some(style) = env.db_case_style {
            config.db_case_style = style.parse()?;
        }
        if let Some(kind) = env.db_kind {
            config.db_kind = kind.parse()?;
        }
        Ok(config)
    }
}

/// Install the process-wide default. Can only be done once.
pub fn set_global_config(config: HandlerConfig) -> Result<()> {
    GLOBAL_CONFIG
        .set(config)
        .map_err(|_| SieveError::State("the global handler config is already set".into()))
}

/// The process-wide default, or [`HandlerConfig::default`] when none was set.
pub fn global_config() -> HandlerConfig {
    GLOBAL_CONFIG.get().cloned().unwrap_or_default()
}
