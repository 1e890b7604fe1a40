//! Merging an ordered list of stylesheets into a single document.

use std::fs;
use std::path::{Path, PathBuf};

use crate::app::bundle::{BundleSettings, Bundler};
use crate::domain::errors::BundleError;
use crate::domain::model::Origin;
use crate::infra::fetch::OriginLoader;

/// In-memory result of bundling every input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedStylesheet {
    /// Final text, including the leading `@charset` line when one was found.
    pub css: String,
    /// Every origin bundled, in visit order.
    pub origins: Vec<Origin>,
    pub charset: Option<String>,
}

/// Summary of a completed [`merge_css`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub output: PathBuf,
    pub inputs: usize,
    pub origins: Vec<Origin>,
    pub charset: Option<String>,
}

/// Bundle `inputs` in order and write the merged stylesheet to `output`.
///
/// Inputs are checked before anything is read, and the output is only written once every
/// input bundled successfully.
pub fn merge_css(
    inputs: &[PathBuf],
    output: &Path,
    settings: BundleSettings,
) -> Result<MergeReport, BundleError> {
    let fetcher = settings.fetcher();
    merge_css_with(inputs, output, settings, fetcher)
}

/// [`merge_css`] with a caller-provided loader.
pub fn merge_css_with<L: OriginLoader>(
    inputs: &[PathBuf],
    output: &Path,
    settings: BundleSettings,
    loader: L,
) -> Result<MergeReport, BundleError> {
    validate_inputs(inputs)?;

    let origins: Vec<Origin> = inputs.iter().map(Origin::local).collect();
    let merged = merge_origins(&origins, settings, loader)?;
    write_output(output, &merged.css)?;

    tracing::info!(
        output = %output.display(),
        inputs = inputs.len(),
        origins = merged.origins.len(),
        bytes = merged.css.len(),
        "merged stylesheets"
    );

    Ok(MergeReport {
        output: output.to_path_buf(),
        inputs: inputs.len(),
        origins: merged.origins,
        charset: merged.charset,
    })
}

/// Ensure every input exists and is a regular file.
pub fn validate_inputs(inputs: &[PathBuf]) -> Result<(), BundleError> {
    for input in inputs {
        if !input.exists() {
            return Err(BundleError::InputNotFound(input.clone()));
        }
        if !input.is_file() {
            return Err(BundleError::InputNotAFile(input.clone()));
        }
    }
    Ok(())
}

/// Bundle each origin in order and join the results.
///
/// Every chunk is newline-terminated before the next begins, and the first recorded
/// `@charset` statement is placed on the first line.
pub fn merge_origins<L: OriginLoader>(
    origins: &[Origin],
    settings: BundleSettings,
    loader: L,
) -> Result<MergedStylesheet, BundleError> {
    let mut bundler = Bundler::new(settings, loader);
    let mut merged = String::new();

    for origin in origins {
        let chunk = bundler.bundle_origin(origin)?;
        merged.push_str(&chunk);
        if !chunk.ends_with('\n') {
            merged.push('\n');
        }
    }

    let (origins, charset) = bundler.into_context().into_parts();
    if let Some(statement) = &charset {
        merged.insert(0, '\n');
        merged.insert_str(0, statement);
    }

    Ok(MergedStylesheet {
        css: merged,
        origins,
        charset,
    })
}

fn write_output(path: &Path, css: &str) -> Result<(), BundleError> {
    let write_error = |source| BundleError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, css).map_err(write_error)
}
