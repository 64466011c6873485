//! Infrastructure layer module
//!
//! Configuration loading and logging initialisation. Port implementations
//! live in `adapters`.

pub mod config;
pub mod logging;
