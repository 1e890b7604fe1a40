//! Command-line front end.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use crate::app::bundle::BundleSettings;
use crate::app::merge::{MergeReport, merge_css};
use crate::infra::config::Config;

/// Merge multiple CSS files into one.
#[derive(Debug, Parser)]
#[command(name = "merge-css", author, version, long_about = None)]
pub struct Cli {
    /// Input CSS files (merged in the given order).
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output CSS file path.
    #[arg(short, long)]
    pub output: PathBuf,
    /// Base URL for resolving root-relative @import like "/foo.css".
    #[arg(long)]
    pub base_url: Option<String>,
    /// Do not inline @import (just concatenate).
    #[arg(long)]
    pub no_inline_imports: bool,
    /// Fetch and inline remote @import URLs (requires network).
    #[arg(long)]
    pub fetch_remote_imports: bool,
    /// Input file encoding (default: utf-8).
    #[arg(long)]
    pub encoding: Option<String>,
    /// User-Agent for fetching remote @import (default: merge-css/0.1).
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Layer command-line flags over the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.bundle.base_url = Some(base_url.clone());
        }
        if let Some(encoding) = &self.encoding {
            config.bundle.encoding = Some(encoding.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            config.bundle.user_agent = Some(user_agent.clone());
        }
        if self.no_inline_imports {
            config.bundle.inline_imports = Some(false);
        }
        if self.fetch_remote_imports {
            config.bundle.fetch_remote_imports = Some(true);
        }
    }

    /// Load configuration, apply flags, and run the merge.
    pub fn run(&self) -> Result<MergeReport> {
        let mut config = Config::load().context("failed to load configuration")?;
        self.apply(&mut config);
        let settings = BundleSettings::from_config(&config)?;
        let report = merge_css(&self.inputs, &self.output, settings)?;
        Ok(report)
    }
}
