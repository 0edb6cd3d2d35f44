//! Runtime configuration loaded from TOML
//!
//! ```toml
//! [fanout]
//! mode = "parallel"
//! max_workers = 8
//!
//! [logging]
//! profile = "production"
//!
//! [store]
//! path = "/var/lib/cmdbx/store.db"
//! ```
//!
//! Every section and key is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::CoreError;
use crate::logging_facility::Profile;
use crate::ops::FanOut;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOutModeName {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FanOutConfig {
    pub mode: FanOutModeName,
    pub max_workers: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            mode: FanOutModeName::Sequential,
            max_workers: 4,
        }
    }
}

impl FanOutConfig {
    pub fn to_fanout(&self) -> FanOut {
        match self.mode {
            FanOutModeName::Sequential => FanOut::sequential(),
            FanOutModeName::Parallel => FanOut::parallel(self.max_workers),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".cmdbx/store.db"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub fanout: FanOutConfig,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
}

impl CoreConfig {
    /// # Errors
    ///
    /// `ValidationFailed` if the text is not valid TOML for this schema or
    /// the values are out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        let config: CoreConfig = toml::from_str(text).map_err(|e| CoreError::ValidationFailed {
            reason: format!("invalid configuration: {}", e.message()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `ValidationFailed` if the file cannot be read or fails `from_toml_str`.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::ValidationFailed {
            reason: format!("cannot read configuration {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// `ValidationFailed` for zero fan-out workers or an empty store path.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fanout.max_workers == 0 {
            return Err(CoreError::ValidationFailed {
                reason: "fanout.max_workers must be at least 1".to_string(),
            });
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(CoreError::ValidationFailed {
                reason: "store.path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
