//! Configuration: working directories, tool paths, and pipeline toggles.
//!
//! Loaded from a TOML file with `WEBREEL_`-prefixed environment variable
//! overrides, e.g. `WEBREEL_PIPELINE_ABORT_ON_FAILURE=true` overrides
//! `[pipeline] abort_on_failure`.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str};
pub use types::{Config, PathsConfig, PipelineConfig, ToolsConfig};
pub use validate::validate_config;

use thiserror::Error;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
