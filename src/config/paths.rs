use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::ProbeError;
use super::types::{OutputPaths, ProbeConfig};

/// Resolves output file names against a base directory.
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new(base_dir: &Path) -> Result<Self, ProbeError> {
        let base_dir = std::path::absolute(base_dir)?;
        debug!(base = %base_dir.display(), "Path resolver initialized");
        Ok(Self { base_dir })
    }

    /// Absolute paths are kept as given; relative ones are joined to the base.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn resolve_outputs(&self, config: &ProbeConfig) -> OutputPaths {
        OutputPaths {
            output_log_file: self.resolve(&config.output_log_file),
            output_json_file: self.resolve(&config.output_json_file),
            output_html_file: self.resolve(&config.output_html_file),
            resume_file: self.resolve(&config.resume_file),
            vulnerabilities_file: self.resolve(&config.vulnerabilities_file),
        }
    }
}

/// Create the parent directory and an empty file if either is missing.
pub async fn ensure_file_exists(path: &Path) -> Result<(), ProbeError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    debug!(path = %path.display(), "File ensured");
    Ok(())
}

pub async fn ensure_outputs(paths: &OutputPaths) -> Result<(), ProbeError> {
    for path in [
        &paths.output_log_file,
        &paths.output_json_file,
        &paths.output_html_file,
        &paths.resume_file,
    ] {
        ensure_file_exists(path).await?;
    }
    Ok(())
}
