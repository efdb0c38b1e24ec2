//! Run configuration and its defaults.

use std::path::PathBuf;

/// Default directory rendered manifests are written under.
pub const DEFAULT_OUTPUT_DIR: &str = "rendered";

/// Default number of applications rendered at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Release name used when rendering the root chart.
pub const ROOT_RELEASE_NAME: &str = "app-of-apps";

/// Prefix of the temporary directory holding all clones of a run.
pub const WORKSPACE_PREFIX: &str = "argo-charts-";

/// Child charts live in this directory under each application's path.
pub const CHART_DIR: &str = ".helm";

/// Settings for one render run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Path to the app-of-apps chart.
    pub chart_path: PathBuf,
    /// Values files for the app-of-apps chart, applied in order.
    pub values_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Upper bound on applications processed concurrently; at least 1.
    pub max_concurrency: usize,
}

impl RenderConfig {
    pub fn new(chart_path: impl Into<PathBuf>) -> Self {
        Self {
            chart_path: chart_path.into(),
            values_files: Vec::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_values_files(mut self, values_files: Vec<PathBuf>) -> Self {
        self.values_files = values_files;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// A zero bound is raised to 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }
}
