//! Output layout and manifest writing
//!
//! Manifests land in `<root>[/<env>][/<instance>]/<name>.yaml`. The `env` level
//! always comes before `instance`, and empty values add no level.

use std::fs;
use std::path::{Path, PathBuf};

use crate::application::Application;
use crate::error::{Error, Result};

/// Directory an application's manifest is written to.
pub fn output_dir_for(root: &Path, app: &Application) -> PathBuf {
    let mut dir = root.to_path_buf();
    if !app.env.is_empty() {
        dir.push(&app.env);
    }
    if !app.instance.is_empty() {
        dir.push(&app.instance);
    }
    dir
}

/// Write `manifest` for `app` under `root`, replacing any previous file.
pub fn write_manifest(root: &Path, app: &Application, manifest: &[u8]) -> Result<PathBuf> {
    let dir = output_dir_for(root, app);
    fs::create_dir_all(&dir).map_err(|source| Error::OutputWrite {
        path: dir.clone(),
        source,
    })?;

    let file = dir.join(format!("{}.yaml", app.name));
    fs::write(&file, manifest).map_err(|source| Error::OutputWrite {
        path: file.clone(),
        source,
    })?;
    Ok(file)
}
