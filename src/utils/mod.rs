//! Configuration and process setup helpers.

pub mod telemetry;
pub mod toml_config;
