//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides (`PARLEY_` prefix, `__` nesting)
//! - Configuration validation

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
