//! Domain-specific errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions that abort a merge run.
///
/// Cyclic or repeated imports are not represented here: they resolve silently.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("input is not a file: {}", .0.display())]
    InputNotAFile(PathBuf),
    #[error("failed to read css: {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read css: {}: not valid {encoding}", .path.display())]
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },
    #[error("failed to fetch css: {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("unknown input encoding '{0}'")]
    UnknownEncoding(String),
    #[error("invalid base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to write output: {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
