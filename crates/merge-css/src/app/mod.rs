//! Application layer: scanning, resolving, and bundling stylesheets.

pub mod bundle;
pub mod charset;
pub mod imports;
pub mod mask;
pub mod merge;
pub mod resolve;
