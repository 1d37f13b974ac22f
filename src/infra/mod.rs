//! Infrastructure - configuration, errors, and logging
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults, CLI overrides)
//! - `error` - Error taxonomy shared by the pipeline
//! - `logging` - tracing subscriber setup

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{CaptureSource, Config};
pub use error::{CollectError, CollectResult};
