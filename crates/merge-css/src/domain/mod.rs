//! Core domain types shared across the bundler.

pub mod errors;
pub mod model;
