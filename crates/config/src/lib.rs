//! Configuration loading, validation, and env substitution.
//!
//! Config files: `chanstat.toml`, `chanstat.yaml`, or `chanstat.json`
//! Searched in `./` then `~/.config/chanstat/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_or_default_config_path,
        load_config,
    },
    schema::{
        ChanstatConfig, CollectorConfig, DatabaseConfig, FailurePolicy, PlatformApiConfig,
        RetryConfig, ServerConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
