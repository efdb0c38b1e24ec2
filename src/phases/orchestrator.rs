//! Orchestrator for a complete render run
//!
//! This module ties the phases together:
//! 1. Prepare the temporary clone workspace and the output directory
//! 2. Render the root chart and resolve its applications
//! 3. Render every application on a bounded worker pool, sharing one clone cache
//! 4. Aggregate per-application failures into a single error
//!
//! Workers never cancel each other. Every application runs to completion and
//! the run reports how many failed along with the first failure in input
//! order.

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{error, info};
use rayon::prelude::*;

use super::render::{self, RenderContext};
use super::root;
use crate::application::Application;
use crate::cache::CloneCache;
use crate::config::{RenderConfig, WORKSPACE_PREFIX};
use crate::error::{Error, Result};
use crate::helm::{HelmCli, TemplateEngine};
use crate::repository::{DefaultGitOperations, GitOperations};

/// What a successful run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Applications found in the root chart.
    pub applications: usize,
    /// Distinct repository clones performed.
    pub clones: usize,
    /// Written manifests, in application order.
    pub outputs: Vec<PathBuf>,
}

/// Entry point for rendering an app-of-apps chart.
pub struct Renderer {
    git_ops: Box<dyn GitOperations>,
    engine: Box<dyn TemplateEngine>,
    progress: ProgressBar,
}

impl Renderer {
    /// Creates a `Renderer` that uses the system `git` and `helm` binaries.
    pub fn new() -> Self {
        Self::with_operations(
            Box::new(DefaultGitOperations::default()),
            Box::new(HelmCli::default()),
        )
    }

    /// Creates a `Renderer` with custom clone and template collaborators.
    pub fn with_operations(
        git_ops: Box<dyn GitOperations>,
        engine: Box<dyn TemplateEngine>,
    ) -> Self {
        Self {
            git_ops,
            engine,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report finished applications on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Execute the complete run described by `config`.
    ///
    /// The clone workspace is removed when this returns, whatever the outcome.
    pub fn run(&self, config: &RenderConfig) -> Result<RunSummary> {
        let workspace = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(|source| Error::Workspace {
                path: std::env::temp_dir(),
                source,
            })?;
        info!(
            "using temporary directory for clones: {}",
            workspace.path().display()
        );

        fs::create_dir_all(&config.output_dir).map_err(|source| Error::Workspace {
            path: config.output_dir.clone(),
            source,
        })?;

        let applications = root::render_root(self.engine.as_ref(), config)?;

        let cache = CloneCache::new(workspace.path());
        let outputs = self.render_all(
            &applications,
            &cache,
            &config.output_dir,
            config.max_concurrency,
        )?;

        Ok(RunSummary {
            applications: applications.len(),
            clones: cache.clone_count()?,
            outputs,
        })
    }

    /// Render `applications` with at most `max_concurrency` in flight.
    ///
    /// Returns the written manifest paths in application order, or
    /// [`Error::Aggregate`] if any application failed.
    pub fn render_all(
        &self,
        applications: &[Application],
        cache: &CloneCache,
        output_root: &Path,
        max_concurrency: usize,
    ) -> Result<Vec<PathBuf>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_concurrency.max(1))
            .thread_name(|i| format!("render-{}", i))
            .build()?;

        let ctx = RenderContext {
            cache,
            git_ops: self.git_ops.as_ref(),
            engine: self.engine.as_ref(),
            output_root,
        };

        self.progress.set_length(applications.len() as u64);
        let results: Vec<Result<PathBuf>> = pool.install(|| {
            applications
                .par_iter()
                .map(|app| {
                    let result = render::render_application(&ctx, app);
                    self.progress.inc(1);
                    result
                })
                .collect()
        });
        self.progress.finish_and_clear();

        aggregate(results)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn aggregate(results: Vec<Result<PathBuf>>) -> Result<Vec<PathBuf>> {
    let total = results.len();
    let mut outputs = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for result in results {
        match result {
            Ok(path) => outputs.push(path),
            Err(e) => failures.push(e),
        }
    }

    let failed = failures.len();
    match failures.into_iter().next() {
        None => {
            info!("rendered {} applications", total);
            Ok(outputs)
        }
        Some(first) => {
            error!("completed with {} of {} applications failing", failed, total);
            Err(Error::Aggregate {
                failed,
                total,
                first: Box::new(first),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_error(release: &str) -> Error {
        Error::Template {
            release: release.to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_aggregate_all_ok() {
        let results = vec![Ok(PathBuf::from("a.yaml")), Ok(PathBuf::from("b.yaml"))];
        assert_eq!(
            aggregate(results).unwrap(),
            vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]
        );
    }

    #[test]
    fn test_aggregate_reports_first_failure_in_order() {
        let results = vec![
            Ok(PathBuf::from("a.yaml")),
            Err(template_error("second")),
            Err(template_error("third")),
        ];
        match aggregate(results).unwrap_err() {
            Error::Aggregate {
                failed,
                total,
                first,
            } => {
                assert_eq!(failed, 2);
                assert_eq!(total, 3);
                assert!(first.to_string().contains("'second'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(Vec::new()).unwrap().is_empty());
    }
}
