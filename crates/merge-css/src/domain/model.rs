//! Domain models for stylesheet origins and parsed import directives.

use std::env;
use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

/// Where a stylesheet comes from.
///
/// Equality is the identity used for duplicate and cycle suppression: local paths compare by
/// their canonical form (normalized once in [`Origin::local`]), URLs compare as raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Absolute, normalized filesystem path.
    Local(PathBuf),
    /// Absolute URL, kept exactly as spelled.
    Remote(String),
}

impl Origin {
    /// Build a local origin, normalizing the path to its absolute canonical form.
    pub fn local(path: impl AsRef<Path>) -> Self {
        Origin::Local(normalize_path(path.as_ref()))
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Origin::Remote(url.into())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Origin::Remote(_))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local(path) => write!(f, "{}", path.display()),
            Origin::Remote(url) => f.write_str(url),
        }
    }
}

/// A single `@import` statement found in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    /// Import target with quotes and `url(...)` removed.
    pub target: String,
    /// Trailing media query list, verbatim. Empty means unconditional.
    pub media: String,
    /// Byte range of the whole statement in the original text.
    pub span: Range<usize>,
}

impl ImportDirective {
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}

/// Resolve `path` to an absolute canonical path.
///
/// Symlinks are resolved when the path exists; otherwise `.` and `..` are folded lexically
/// against the current directory.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
