//! Shared test utilities for integration and E2E tests.
//!
//! This module provides Application document builders and fake `helm` / `git`
//! executables so the pipeline can run without network access or real charts.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let yaml = AppDoc::new("web", "https://git.example.com/org/web", "main").to_yaml();
//! ```

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::{manifest_stream, AppDoc, FakeTools};
}

/// Builder for an Argo CD Application document as a root chart would render it.
#[derive(Debug, Clone)]
pub struct AppDoc {
    name: String,
    repo: String,
    revision: String,
    path: Option<String>,
    labels: Vec<(String, String)>,
    plugin_env: Vec<(String, String)>,
}

impl AppDoc {
    pub fn new(name: &str, repo: &str, revision: &str) -> Self {
        Self {
            name: name.to_string(),
            repo: repo.to_string(),
            revision: revision.to_string(),
            path: None,
            labels: Vec::new(),
            plugin_env: Vec::new(),
        }
    }

    /// Set the `rawPath` annotation.
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a `spec.source.plugin.env` entry.
    pub fn env_var(mut self, name: &str, value: &str) -> Self {
        self.plugin_env.push((name.to_string(), value.to_string()));
        self
    }

    pub fn to_yaml(&self) -> String {
        let mut yaml = format!(
            "apiVersion: argoproj.io/v1alpha1\nkind: Application\nmetadata:\n  name: {}\n",
            self.name
        );

        if self.labels.is_empty() {
            yaml.push_str("  labels: {}\n");
        } else {
            yaml.push_str("  labels:\n");
            for (key, value) in &self.labels {
                yaml.push_str(&format!("    {}: \"{}\"\n", key, value));
            }
        }

        yaml.push_str("  annotations:\n");
        yaml.push_str(&format!("    rawRepository: \"{}\"\n", self.repo));
        if let Some(path) = &self.path {
            yaml.push_str(&format!("    rawPath: \"{}\"\n", path));
        }

        yaml.push_str(&format!(
            "spec:\n  source:\n    targetRevision: {}\n    plugin:\n      env:",
            self.revision
        ));
        if self.plugin_env.is_empty() {
            yaml.push_str(" []\n");
        } else {
            yaml.push('\n');
            for (name, value) in &self.plugin_env {
                yaml.push_str(&format!(
                    "        - name: {}\n          value: \"{}\"\n",
                    name, value
                ));
            }
        }
        yaml
    }
}

/// Join documents into one multi-document stream, the way `helm template` prints them.
pub fn manifest_stream(documents: &[String]) -> String {
    documents
        .iter()
        .map(|doc| format!("---\n{}", doc))
        .collect::<Vec<_>>()
        .join("")
}

/// Shell-script stand-ins for `helm` and `git` that log every invocation.
pub struct FakeTools {
    pub bin_dir: PathBuf,
    pub helm: PathBuf,
    pub git: PathBuf,
    pub log: PathBuf,
}

impl FakeTools {
    /// Write fake tools into `dir`.
    ///
    /// - `helm template app-of-apps <chart>` prints `<chart>/templates/*.yaml`.
    /// - `helm template <name> <chart> ...` prints a stub manifest naming the
    ///   release, and fails when the chart path contains `broken-chart`.
    /// - `git clone ... <dest>` creates `<dest>`, and fails when any argument
    ///   contains `broken-repo`.
    #[cfg(unix)]
    pub fn install(dir: &Path) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = dir.join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        let log = dir.join("commands.log");

        let helm = bin_dir.join("helm");
        let helm_script = format!(
            r#"#!/bin/sh
echo "helm $*" >> "{log}"
RELEASE_NAME="$2"
CHART_PATH="$3"
case "$CHART_PATH" in
  *broken-chart*) echo "Error: chart is broken" >&2; exit 1 ;;
esac
if [ "$RELEASE_NAME" = "app-of-apps" ]; then
  if [ -d "$CHART_PATH/templates" ]; then
    cat "$CHART_PATH"/templates/*.yaml
  fi
else
  echo "kind: FakedHelmOutputForApp"
  echo "name: $RELEASE_NAME"
fi
"#,
            log = log.display()
        );
        fs::write(&helm, helm_script).unwrap();

        let git = bin_dir.join("git");
        let git_script = format!(
            r#"#!/bin/sh
echo "git $*" >> "{log}"
case "$*" in
  *broken-repo*) echo "fatal: Could not read from remote repository." >&2; exit 128 ;;
esac
for DEST; do :; done
mkdir -p "$DEST"
"#,
            log = log.display()
        );
        fs::write(&git, git_script).unwrap();

        for script in [&helm, &git] {
            fs::set_permissions(script, fs::Permissions::from_mode(0o755)).unwrap();
        }

        Self {
            bin_dir,
            helm,
            git,
            log,
        }
    }

    /// Everything the fake tools were invoked with, one line per call.
    pub fn commands(&self) -> String {
        fs::read_to_string(&self.log).unwrap_or_default()
    }
}

/// Write an app-of-apps chart whose single template is `manifests`.
pub fn write_root_chart(dir: &Path, manifests: &str) -> PathBuf {
    let chart = dir.join("app-of-apps-chart");
    fs::create_dir_all(chart.join("templates")).unwrap();
    fs::write(
        chart.join("Chart.yaml"),
        "apiVersion: v2\nname: fake-chart\nversion: 0.1.0\n",
    )
    .unwrap();
    fs::write(chart.join("templates").join("apps.yaml"), manifests).unwrap();
    chart
}
