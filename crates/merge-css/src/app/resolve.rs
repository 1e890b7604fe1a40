//! Resolution of `@import` targets against the importing origin.

use std::path::Path;

use url::Url;

use crate::domain::model::Origin;

const NON_FETCHABLE_PREFIXES: [&str; 4] = ["data:", "about:", "#", "blob:"];
const DEFAULT_SCHEME: &str = "https";

/// Compute the origin an `@import` target refers to.
///
/// Returns `None` when the target cannot be fetched (data/blob URLs, fragments, site-root
/// paths without a base URL or a matching file); the caller keeps such statements verbatim.
pub fn resolve_import(origin: &Origin, raw: &str, base_url: Option<&Url>) -> Option<Origin> {
    let target = raw.trim();
    if is_non_fetchable(target) {
        return None;
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        return Some(Origin::remote(target));
    }

    if target.starts_with("//") {
        let scheme = protocol_relative_scheme(base_url, origin);
        return Some(Origin::remote(format!("{scheme}:{target}")));
    }

    // Query and fragment only matter to URL joins, never to filesystem lookups.
    let path_part = path_component(target);

    if path_part.starts_with('/') {
        if let Some(base) = base_url {
            return join_url(base, target);
        }
        let path = Path::new(path_part);
        return path.exists().then(|| Origin::local(path));
    }

    match origin {
        Origin::Local(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("/"));
            Some(Origin::local(dir.join(path_part)))
        }
        Origin::Remote(url) => {
            let current = Url::parse(url).ok()?;
            join_url(&current, target)
        }
    }
}

fn is_non_fetchable(target: &str) -> bool {
    let lowered = target.to_ascii_lowercase();
    lowered.is_empty()
        || NON_FETCHABLE_PREFIXES
            .iter()
            .any(|prefix| lowered.starts_with(prefix))
}

fn protocol_relative_scheme<'a>(base_url: Option<&'a Url>, origin: &'a Origin) -> &'a str {
    if let Some(base) = base_url {
        return base.scheme();
    }
    if let Origin::Remote(url) = origin
        && let Some(scheme) = url_scheme(url)
    {
        return scheme;
    }
    DEFAULT_SCHEME
}

fn join_url(base: &Url, target: &str) -> Option<Origin> {
    match base.join(target) {
        Ok(joined) => Some(Origin::remote(joined.to_string())),
        Err(err) => {
            tracing::debug!(%base, import = target, error = %err, "import does not join");
            None
        }
    }
}

/// Leading `scheme:` of a URL-like string, if it has one.
fn url_scheme(value: &str) -> Option<&str> {
    let colon = value.find(':')?;
    let scheme = &value[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Path portion of a URL reference: scheme, authority, query and fragment removed.
fn path_component(target: &str) -> &str {
    let mut rest = target;
    if let Some(scheme) = url_scheme(rest) {
        rest = &rest[scheme.len() + 1..];
    }
    if let Some(after) = rest.strip_prefix("//") {
        let end = after.find(['/', '?', '#']).unwrap_or(after.len());
        rest = &after[end..];
    }
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}
