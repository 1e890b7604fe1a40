//! Loading stylesheet text from local files and remote URLs.

use std::fs;
use std::path::Path;
use std::time::Duration;

use encoding_rs::Encoding;

use crate::domain::errors::BundleError;
use crate::domain::model::Origin;

/// Network timeout applied to every remote fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of stylesheet text for a resolved origin.
pub trait OriginLoader {
    fn load(&self, origin: &Origin) -> Result<String, BundleError>;
}

impl<L: OriginLoader + ?Sized> OriginLoader for &L {
    fn load(&self, origin: &Origin) -> Result<String, BundleError> {
        (**self).load(origin)
    }
}

/// Reads local files with a fixed encoding and fetches remote URLs over blocking HTTP.
pub struct Fetcher {
    encoding: &'static Encoding,
    user_agent: String,
    agent: ureq::Agent,
}

impl Fetcher {
    pub fn new(encoding: &'static Encoding, user_agent: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(FETCH_TIMEOUT))
            .build();
        Self {
            encoding,
            user_agent: user_agent.into(),
            agent: config.into(),
        }
    }

    /// Read `path` and decode it strictly with the configured encoding.
    pub fn read_local(&self, path: &Path) -> Result<String, BundleError> {
        let bytes = fs::read(path).map_err(|source| BundleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        decode_strict(&bytes, self.encoding).ok_or_else(|| BundleError::Decode {
            path: path.to_path_buf(),
            encoding: self.encoding.name(),
        })
    }

    /// GET `url` and decode the body as UTF-8, replacing invalid sequences.
    pub fn fetch_remote(&self, url: &str) -> Result<String, BundleError> {
        let fetch_error = |reason: String| BundleError::Fetch {
            url: url.to_owned(),
            reason,
        };

        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|err| fetch_error(err.to_string()))?;
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|err| fetch_error(err.to_string()))?;

        tracing::debug!(url, bytes = bytes.len(), "fetched remote stylesheet");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl OriginLoader for Fetcher {
    fn load(&self, origin: &Origin) -> Result<String, BundleError> {
        match origin {
            Origin::Local(path) => self.read_local(path),
            Origin::Remote(url) => self.fetch_remote(url),
        }
    }
}

fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let mut text = encoding
        .decode_without_bom_handling_and_without_replacement(bytes)?
        .into_owned();
    if text.starts_with('\u{feff}') {
        text.remove(0);
    }
    Some(text)
}
