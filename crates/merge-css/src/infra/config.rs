//! Configuration management utilities.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = include_str!("../../assets/default-config.toml");
const WORKSPACE_CONFIG_FILE: &str = ".merge-css.toml";

/// User agent sent with remote `@import` fetches unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = "merge-css/0.1";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bundle: Bundle,
}

/// `[bundle]` table. Unset keys fall through to the previous layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Bundle {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub inline_imports: Option<bool>,
    #[serde(default)]
    pub fetch_remote_imports: Option<bool>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Bundle {
    fn default_encoding() -> &'static str {
        "utf-8"
    }

    /// Base URL for site-root imports; blank values count as unset.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn encoding(&self) -> &str {
        self.encoding.as_deref().unwrap_or(Self::default_encoding())
    }

    pub fn inline_imports(&self) -> bool {
        self.inline_imports.unwrap_or(true)
    }

    pub fn fetch_remote_imports(&self) -> bool {
        self.fetch_remote_imports.unwrap_or(false)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    base_url: Option<String>,
    encoding: Option<String>,
    user_agent: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            base_url: env::var("MERGE_CSS_BASE_URL").ok(),
            encoding: env::var("MERGE_CSS_ENCODING").ok(),
            user_agent: env::var("MERGE_CSS_USER_AGENT").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(base_url: &str, user_agent: &str) -> Self {
        Self {
            base_url: Some(base_url.to_owned()),
            encoding: None,
            user_agent: Some(user_agent.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let workspace = workspace_config_path(env::current_dir());
        Self::from_layers(&layer_paths(global_config_path(), workspace), EnvOverrides::from_env())
    }

    /// Fold the embedded defaults and every existing file in `paths`, later files winning.
    fn from_layers(paths: &[PathBuf], env_overrides: EnvOverrides) -> Result<Self> {
        let mut merged = parse_toml(DEFAULT_CONFIG).context("invalid built-in config")?;
        for path in paths.iter().filter(|path| path.exists()) {
            tracing::debug!(path = %path.display(), "loading config layer");
            let data = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            let layer = parse_toml(&data)
                .with_context(|| format!("invalid config file: {}", path.display()))?;
            merged.bundle = merge_bundle(merged.bundle, layer.bundle);
        }
        Ok(apply_env_overrides(merged, env_overrides))
    }
}

fn parse_toml(contents: &str) -> Result<Config> {
    Ok(toml::from_str(contents)?)
}

fn layer_paths(global: Option<PathBuf>, workspace: Option<PathBuf>) -> Vec<PathBuf> {
    global.into_iter().chain(workspace).collect()
}

fn merge_bundle(mut base: Bundle, overlay: Bundle) -> Bundle {
    if let Some(value) = overlay.base_url {
        base.base_url = Some(value);
    }
    if let Some(value) = overlay.encoding {
        base.encoding = Some(value);
    }
    if let Some(value) = overlay.inline_imports {
        base.inline_imports = Some(value);
    }
    if let Some(value) = overlay.fetch_remote_imports {
        base.fetch_remote_imports = Some(value);
    }
    if let Some(value) = overlay.user_agent {
        base.user_agent = Some(value);
    }
    base
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("merge-css/config.toml"))
}

/// `.merge-css.toml` at the enclosing git checkout root, or in `cwd` outside a checkout.
///
/// The workspace layer is skipped when the current directory is unavailable.
fn workspace_config_path(cwd: io::Result<PathBuf>) -> Option<PathBuf> {
    let cwd = match cwd {
        Ok(cwd) => cwd,
        Err(err) => {
            tracing::warn!(error = %err, "cannot locate workspace config; skipping it");
            return None;
        }
    };
    let root = cwd
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map_or_else(|| cwd.clone(), Path::to_path_buf);
    Some(root.join(WORKSPACE_CONFIG_FILE))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(base_url) = env.base_url {
        config.bundle.base_url = Some(base_url);
    }
    if let Some(encoding) = env.encoding {
        config.bundle.encoding = Some(encoding);
    }
    if let Some(user_agent) = env.user_agent {
        config.bundle.user_agent = Some(user_agent);
    }
    config
}
