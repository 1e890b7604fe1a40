//! Infrastructure adapters for filesystem, network, and configuration.

pub mod config;
pub mod fetch;
