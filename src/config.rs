use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::graph::ExtractionOptions;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SYSBIOKG_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub schema: SchemaConfig,
    pub output: OutputConfig,
}

/// Extraction switches
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub add_default_compartments: bool,
    pub annotations_as_properties: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            add_default_compartments: true,
            annotations_as_properties: true,
        }
    }
}

/// Schema registry file settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub path: Option<PathBuf>,
    /// Where the updated schema is written; defaults to `path`.
    pub output_path: Option<PathBuf>,
    pub backup: bool,
}

/// Graph sink settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub log_level: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration.
    ///
    /// Loads environment variables from a .env file (if present) first, then
    /// looks for the config file in this order:
    /// 1. Path specified in the SYSBIOKG_CONFIG environment variable
    /// 2. ./config.toml in the current directory
    ///
    /// Without either, built-in defaults are used. An explicit SYSBIOKG_CONFIG
    /// that cannot be read is an error.
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let local = PathBuf::from("config.toml");
                if local.is_file() {
                    Self::from_file(&local)?
                } else {
                    log::debug!("No config file found; using defaults");
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.output.dir.as_os_str().is_empty() {
            anyhow::bail!("output.dir must not be empty");
        }

        if self.output.log_level.parse::<log::LevelFilter>().is_err() {
            anyhow::bail!("output.log_level '{}' is not a log level", self.output.log_level);
        }

        if self.schema.output_path.is_some() && self.schema.path.is_none() {
            anyhow::bail!("schema.output_path requires schema.path");
        }

        Ok(())
    }

    pub fn extraction_options(&self) -> ExtractionOptions {
        ExtractionOptions {
            add_default_compartments: self.extraction.add_default_compartments,
            annotations_as_properties: self.extraction.annotations_as_properties,
        }
    }

    /// Where the schema is saved: `output_path`, else `path`.
    pub fn schema_output(&self) -> Option<&Path> {
        self.schema
            .output_path
            .as_deref()
            .or(self.schema.path.as_deref())
    }
}
