//! # Argo CD App-of-Apps Renderer
//!
//! This library renders an Argo CD "app-of-apps" chart into concrete
//! per-application manifests. It is used by the `argo-unroll` command-line
//! tool but can be embedded wherever the same rendering is needed, for
//! example to diff manifests in CI.
//!
//! ## Quick Example
//!
//! ```
//! use argo_unroll::application::parse_applications;
//! use argo_unroll::git::normalize_repo_url;
//!
//! let rendered = br#"
//! apiVersion: argoproj.io/v1alpha1
//! kind: Application
//! metadata:
//!   name: web
//!   labels: {env: dev}
//!   annotations:
//!     rawRepository: https://git.example.com/org/web
//! spec:
//!   source:
//!     targetRevision: main
//! "#;
//!
//! let apps = parse_applications(rendered).unwrap();
//! assert_eq!(apps[0].env, "dev");
//! assert_eq!(apps[0].path, ".");
//! assert_eq!(normalize_repo_url(&apps[0].repo_url), "git@git.example.com:org/web");
//! ```
//!
//! ## Core Concepts
//!
//! - **Applications (`application`)**: Resolves each Argo CD `Application`
//!   in the root chart's output into a validated descriptor, reconciling
//!   labels, annotations and plugin environment variables.
//! - **Repository Identity (`git`)**: Normalizes repository URLs so HTTPS and
//!   SSH spellings of one repository share a clone.
//! - **Clone Cache (`cache`)**: Guarantees at most one clone per
//!   repository and revision, even when workers race for it.
//! - **Collaborators (`repository`, `helm`)**: Traits over the `git` and
//!   `helm` binaries so the pipeline can run against fakes.
//! - **Phases (`phases`)**: The run itself, from the root render through the
//!   bounded worker pool to the partitioned output tree.
//!
//! ## Execution Flow
//!
//! The main entry point is [`phases::orchestrator::Renderer::run`]:
//!
//! 1.  **Root**: Render the app-of-apps chart and resolve its applications.
//! 2.  **Render**: Clone each application's repository (deduplicated) and
//!     render its chart with the resolved values and overrides.
//! 3.  **Write**: Save each manifest to `<output>/<env>/<instance>/<name>.yaml`.

pub mod application;
pub mod cache;
pub mod config;
pub mod error;
pub mod git;
pub mod helm;
pub mod phases;
pub mod repository;

pub use application::{parse_applications, Application};
pub use config::RenderConfig;
pub use error::{Error, Result};
pub use phases::orchestrator::{Renderer, RunSummary};

#[cfg(test)]
mod proptests;
