//! Run configuration: TOML file, then environment, then CLI flags.
//!
//! ```toml
//! [output]
//! dir = "kdd-output"
//!
//! [logging]
//! level = "info"
//!
//! [strategies]
//! selected = ["Radial Power", "Axial Power"]
//!
//! [strategies.parameters."Radial Power"]
//! "Difference Type" = "Relative"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kdd::strategy::ParameterValues;

/// Environment variable overriding `output.dir`.
pub const OUTPUT_DIR_ENV: &str = "KDD_OUTPUT_DIR";

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives the reports.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("kdd-output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategiesConfig {
    /// Strategy names to run; empty means every available one.
    pub selected: Vec<String>,
    /// Strategy name → parameter overrides.
    pub parameters: BTreeMap<String, ParameterValues>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KddConfig {
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub strategies: StrategiesConfig,
}

impl KddConfig {
    /// Defaults, overlaid by `path` when given, then by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&text, &path.display().to_string())?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string (no environment overrides).
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(text, "<string>")?;
        config.validate()?;
        Ok(config)
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            if !dir.is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                field: "output.dir".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation {
                field: "logging.level".to_string(),
                message: format!("expected one of {LOG_LEVELS:?}"),
            });
        }
        Ok(())
    }
}
