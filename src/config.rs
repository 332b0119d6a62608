//! # Binder Configuration
//!
//! [`BinderConfig`] is read from the `binder:` section of the service's YAML
//! config file and can be overridden with environment variables.
//!
//! ## YAML
//!
//! ```yaml
//! binder:
//!   naming_fallback: true
//!   file_temp_key: tmp_name
//!   descriptor_cache: true
//! ```
//!
//! Every key is optional; missing keys take their defaults.
//!
//! ## Environment Variables
//!
//! | Variable                 | Field              | Values                      |
//! |--------------------------|--------------------|-----------------------------|
//! | `BRRTB_NAMING_FALLBACK`  | `naming_fallback`  | `on`/`off`, `true`/`false`, `1`/`0` |
//! | `BRRTB_FILE_TEMP_KEY`    | `file_temp_key`    | any non-empty key           |
//! | `BRRTB_DESCRIPTOR_CACHE` | `descriptor_cache` | `on`/`off`, `true`/`false`, `1`/`0` |
//!
//! Invalid values are logged and ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::warn;

pub const ENV_NAMING_FALLBACK: &str = "BRRTB_NAMING_FALLBACK";
pub const ENV_FILE_TEMP_KEY: &str = "BRRTB_FILE_TEMP_KEY";
pub const ENV_DESCRIPTOR_CACHE: &str = "BRRTB_DESCRIPTOR_CACHE";

/// Binder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Also look fields up under their snake-case form (default: true)
    pub naming_fallback: bool,
    /// Upload descriptor key holding the temporary path (default: `tmp_name`)
    pub file_temp_key: String,
    /// Cache controller descriptors per type, nested ones included (default: true)
    pub descriptor_cache: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            naming_fallback: true,
            file_temp_key: crate::upload::DEFAULT_TEMP_PATH_KEY.to_string(),
            descriptor_cache: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    binder: BinderConfig,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

impl BinderConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse the `binder:` section of a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile =
            serde_yaml::from_str(yaml).context("failed to parse binder configuration")?;
        Ok(file.binder)
    }

    /// Load from a YAML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Ok(Self::from_yaml_str(&text)?.with_env_overrides())
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (used by tests).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_NAMING_FALLBACK) {
            match parse_flag(&raw) {
                Some(v) => self.naming_fallback = v,
                None => warn!(var = ENV_NAMING_FALLBACK, value = %raw, "Ignoring invalid flag"),
            }
        }
        if let Some(raw) = lookup(ENV_FILE_TEMP_KEY) {
            if raw.trim().is_empty() {
                warn!(var = ENV_FILE_TEMP_KEY, "Ignoring empty temp-path key");
            } else {
                self.file_temp_key = raw.trim().to_string();
            }
        }
        if let Some(raw) = lookup(ENV_DESCRIPTOR_CACHE) {
            match parse_flag(&raw) {
                Some(v) => self.descriptor_cache = v,
                None => warn!(var = ENV_DESCRIPTOR_CACHE, value = %raw, "Ignoring invalid flag"),
            }
        }
        self
    }
}
