//! Taskmill Core - Configuration and shared error types
//!
//! This crate provides the configuration model (`taskmill.toml` /
//! `taskmill.yaml`) and the top-level error types shared by the Taskmill
//! crates.

pub mod config;
pub mod error;

pub use config::{Config, ManifestConfig, TaskConfig};
pub use error::{ConfigError, Result, TaskmillError};
