//! Root chart rendering
//!
//! Renders the app-of-apps chart once and resolves its output into
//! application descriptors. This runs before any worker starts; any failure
//! here ends the run.

use log::info;

use crate::application::{parse_applications, Application};
use crate::config::{RenderConfig, ROOT_RELEASE_NAME};
use crate::error::Result;
use crate::helm::{RenderOptions, TemplateEngine};

/// Render the root chart in `config` and return its applications in document order.
pub fn render_root(engine: &dyn TemplateEngine, config: &RenderConfig) -> Result<Vec<Application>> {
    info!(
        "rendering the app-of-apps chart at {}",
        config.chart_path.display()
    );
    let mut options = RenderOptions::new(ROOT_RELEASE_NAME, &config.chart_path);
    options.values_files = config.values_files.clone();
    let manifests = engine.template(&options)?;

    info!("parsing rendered manifests for Argo CD applications");
    let applications = parse_applications(&manifests)?;
    info!("found {} applications to process", applications.len());
    Ok(applications)
}
