//! CLI argument parsing and run dispatch

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};

use argo_unroll::config::{RenderConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_OUTPUT_DIR};
use argo_unroll::helm::HelmCli;
use argo_unroll::repository::DefaultGitOperations;
use argo_unroll::Renderer;

use crate::logging;

/// Render an Argo CD app-of-apps chart into per-application manifests
#[derive(Parser, Debug)]
#[command(name = "argo-unroll")]
#[command(version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Print version
    #[arg(short = 'v', long, short_alias = 'V', action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Path to the app-of-apps Helm chart
    #[arg(value_name = "CHART_PATH")]
    chart_path: PathBuf,

    /// Values file for the app-of-apps chart (can be repeated)
    #[arg(short = 'f', long = "values", value_name = "PATH")]
    values: Vec<PathBuf>,

    /// Directory to save rendered manifests
    #[arg(
        short,
        long,
        value_name = "PATH",
        default_value = DEFAULT_OUTPUT_DIR,
        env = "ARGO_UNROLL_OUTPUT_DIR"
    )]
    output_dir: PathBuf,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        default_value = "warn",
        value_parser = parse_level,
        env = "ARGO_UNROLL_LOG_LEVEL"
    )]
    log_level: LevelFilter,

    /// Maximum number of applications rendered at once
    #[arg(
        short,
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_CONCURRENCY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
        env = "ARGO_UNROLL_JOBS"
    )]
    jobs: usize,

    /// helm binary used for rendering
    #[arg(long, value_name = "PATH", default_value = "helm", env = "ARGO_UNROLL_HELM")]
    helm: PathBuf,

    /// git binary used for cloning
    #[arg(long, value_name = "PATH", default_value = "git", env = "ARGO_UNROLL_GIT")]
    git: PathBuf,
}

fn parse_level(value: &str) -> std::result::Result<LevelFilter, String> {
    value
        .parse::<LevelFilter>()
        .map_err(|_| format!("unknown log level '{}'", value))
}

impl Cli {
    /// Execute the render run
    pub fn execute(self) -> Result<()> {
        logging::init(self.log_level);

        let config = RenderConfig::new(self.chart_path)
            .with_values_files(self.values)
            .with_output_dir(self.output_dir)
            .with_max_concurrency(self.jobs);

        let renderer = Renderer::with_operations(
            Box::new(DefaultGitOperations::new(self.git)),
            Box::new(HelmCli::new(self.helm)),
        )
        .with_progress(progress_bar(self.log_level)?);

        let summary = renderer.run(&config).context("Application failed")?;
        info!(
            "rendered {} applications from {} clones into {}",
            summary.applications,
            summary.clones,
            config.output_dir.display()
        );
        Ok(())
    }
}

/// A progress bar on stderr, unless it would fight with log output or nobody is watching.
fn progress_bar(level: LevelFilter) -> Result<ProgressBar> {
    if level > LevelFilter::Warn || !console::Term::stderr().features().is_attended() {
        return Ok(ProgressBar::hidden());
    }
    let style = ProgressStyle::with_template("{spinner} rendering [{bar:30}] {pos}/{len}")?
        .progress_chars("=> ");
    Ok(ProgressBar::new(0).with_style(style))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["argo-unroll", "chart"]).unwrap();
        assert_eq!(cli.chart_path, PathBuf::from("chart"));
        assert!(cli.values.is_empty());
        assert_eq!(cli.output_dir, PathBuf::from("rendered"));
        assert_eq!(cli.log_level, LevelFilter::Warn);
        assert_eq!(cli.jobs, 10);
        assert_eq!(cli.helm, PathBuf::from("helm"));
    }

    #[test]
    fn test_repeated_values_keep_order() {
        let cli = Cli::try_parse_from([
            "argo-unroll", "chart", "-f", "a.yaml", "--values", "b.yaml", "-o", "out", "-l", "debug",
        ])
        .unwrap();
        assert_eq!(cli.values, vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]);
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_version_short_flags() {
        for flag in ["-v", "-V", "--version"] {
            let err = Cli::try_parse_from(["argo-unroll", flag]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion, "{flag}");
        }
    }

    #[test]
    fn test_chart_path_required() {
        assert!(Cli::try_parse_from(["argo-unroll"]).is_err());
    }

    #[test]
    fn test_rejects_zero_jobs_and_bad_level() {
        assert!(Cli::try_parse_from(["argo-unroll", "chart", "-j", "0"]).is_err());
        assert!(Cli::try_parse_from(["argo-unroll", "chart", "-l", "loud"]).is_err());
    }
}
