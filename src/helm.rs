//! Chart rendering through `helm template`.
//!
//! Rendering is hidden behind the [`TemplateEngine`] trait so the pipeline
//! can be exercised with a fake engine. [`HelmCli`] is the real one and shells
//! out to the `helm` binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Everything needed to render one chart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub release_name: String,
    pub chart_path: PathBuf,
    /// Passed as `-f` in order; later files win.
    pub values_files: Vec<PathBuf>,
    /// Passed as `--set key=value`, sorted by key.
    pub set_values: BTreeMap<String, String>,
}

impl RenderOptions {
    pub fn new(release_name: &str, chart_path: impl Into<PathBuf>) -> Self {
        Self {
            release_name: release_name.to_string(),
            chart_path: chart_path.into(),
            ..Default::default()
        }
    }

    /// Command-line arguments for `helm`, starting with the `template` subcommand.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "template".to_string(),
            self.release_name.clone(),
            self.chart_path.display().to_string(),
        ];
        for file in &self.values_files {
            args.push("-f".to_string());
            args.push(file.display().to_string());
        }
        for (key, value) in &self.set_values {
            args.push("--set".to_string());
            args.push(format!("{}={}", key, value));
        }
        args
    }
}

/// Renders a chart into raw manifest bytes.
pub trait TemplateEngine: Send + Sync {
    fn template(&self, options: &RenderOptions) -> Result<Vec<u8>>;
}

/// The `helm` command-line client.
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
}

impl HelmCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for HelmCli {
    fn default() -> Self {
        Self::new("helm")
    }
}

impl TemplateEngine for HelmCli {
    fn template(&self, options: &RenderOptions) -> Result<Vec<u8>> {
        let args = options.to_args();
        debug!("running {} {}", self.binary.display(), args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|e| Error::Template {
                release: options.release_name.clone(),
                message: format!("could not run {}: {}", self.binary.display(), e),
            })?;

        if !output.status.success() {
            return Err(Error::Template {
                release: options.release_name.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}
