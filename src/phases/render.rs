//! Per-application worker
//!
//! Each application moves through a fixed sequence of stages:
//!
//! ```text
//! Queued -> Cloning | CacheHit -> Rendering -> Writing -> Done | Failed
//! ```
//!
//! There are no retries. A failure at any stage ends this application only and
//! is reported as [`Error::Application`] naming the stage it happened in.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use super::write;
use crate::application::Application;
use crate::cache::{CacheKey, CacheLookup, CloneCache};
use crate::config::CHART_DIR;
use crate::error::{Error, Result};
use crate::git::normalize_repo_url;
use crate::helm::{RenderOptions, TemplateEngine};
use crate::repository::GitOperations;

/// Override key that carries the resolved instance into the child chart.
pub const GLOBAL_INSTANCE_KEY: &str = "global.instance";
/// Override key that carries the resolved env into the child chart.
pub const GLOBAL_ENV_KEY: &str = "global.env";

/// Where a worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Cloning,
    CacheHit,
    Rendering,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Queued => "queued",
            Stage::Cloning => "cloning",
            Stage::CacheHit => "reusing a cached clone",
            Stage::Rendering => "rendering",
            Stage::Writing => "writing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        })
    }
}

/// Shared, read-only collaborators handed to every worker.
pub struct RenderContext<'a> {
    pub cache: &'a CloneCache,
    pub git_ops: &'a dyn GitOperations,
    pub engine: &'a dyn TemplateEngine,
    pub output_root: &'a Path,
}

/// The `--set` overrides for an application's chart.
///
/// Starts from the application's setters; a non-empty `instance`/`env`
/// overwrites `global.instance`/`global.env`.
pub fn override_values(app: &Application) -> BTreeMap<String, String> {
    let mut values = app.setters.clone();
    if !app.instance.is_empty() {
        values.insert(GLOBAL_INSTANCE_KEY.to_string(), app.instance.clone());
    }
    if !app.env.is_empty() {
        values.insert(GLOBAL_ENV_KEY.to_string(), app.env.clone());
    }
    values
}

/// Build the child render request from a clone directory.
///
/// The chart sits in `<clone>/<path>/.helm`; values files are relative to
/// `<clone>/<path>`.
pub fn child_render_options(app: &Application, clone_dir: &Path) -> RenderOptions {
    let service_dir = clone_dir.join(&app.path);
    RenderOptions {
        release_name: app.name.clone(),
        chart_path: service_dir.join(CHART_DIR),
        values_files: app
            .values_files
            .iter()
            .map(|file| service_dir.join(file))
            .collect(),
        set_values: override_values(app),
    }
}

/// Clone (or reuse), render and write one application.
///
/// Returns the path of the written manifest.
pub fn render_application(ctx: &RenderContext<'_>, app: &Application) -> Result<PathBuf> {
    let mut stage = Stage::Queued;
    match run_stages(ctx, app, &mut stage) {
        Ok(output) => {
            advance(app, &mut stage, Stage::Done);
            Ok(output)
        }
        Err(e) => {
            let failed_at = stage;
            advance(app, &mut stage, Stage::Failed);
            error!("application '{}': failed while {}: {}", app.name, failed_at, e);
            Err(Error::Application {
                name: app.name.clone(),
                stage: failed_at,
                source: Box::new(e),
            })
        }
    }
}

fn run_stages(ctx: &RenderContext<'_>, app: &Application, stage: &mut Stage) -> Result<PathBuf> {
    info!(
        "application '{}': {} --set values and {} values files",
        app.name,
        app.setters.len(),
        app.values_files.len()
    );

    let repo = normalize_repo_url(&app.repo_url);
    let key = CacheKey::new(&repo, &app.target_revision);

    advance(app, stage, Stage::Cloning);
    let lookup = ctx.cache.get_or_clone(&key, |target| {
        info!(
            "application '{}': cloning {} to {}",
            app.name,
            key,
            target.display()
        );
        ctx.git_ops
            .clone_shallow(&repo, &app.target_revision, target)
    })?;
    if let CacheLookup::Hit(path) = &lookup {
        advance(app, stage, Stage::CacheHit);
        info!(
            "application '{}': using cached repository from {}",
            app.name,
            path.display()
        );
    }

    advance(app, stage, Stage::Rendering);
    let options = child_render_options(app, lookup.path());
    let manifest = ctx.engine.template(&options)?;

    advance(app, stage, Stage::Writing);
    let output = write::write_manifest(ctx.output_root, app, &manifest)?;
    info!(
        "application '{}': saved manifest to {}",
        app.name,
        output.display()
    );
    Ok(output)
}

fn advance(app: &Application, stage: &mut Stage, next: Stage) {
    debug!("application '{}': {} -> {}", app.name, stage, next);
    *stage = next;
}
