//! # Error Handling
//!
//! This module defines the centralized error type for `argo-unroll`. It uses
//! the `thiserror` library to build a single `Error` enum covering every
//! anticipated failure, each variant carrying enough context to tell which
//! application and which step went wrong.
//!
//! Failures fall into three groups:
//!
//! - **Input errors**: a malformed YAML document, an application with no
//!   repository source, or conflicting `instance`/`env` values. These abort
//!   descriptor resolution as a whole.
//! - **Per-application errors**: clone, template-render and output-write
//!   failures. These are isolated to one worker and folded into an
//!   [`Error::Aggregate`] at the end of the run.
//! - **Environment errors**: the temporary workspace or the output directory
//!   cannot be created. These abort the run before any worker starts.

use std::path::PathBuf;

use thiserror::Error;

use crate::phases::render::Stage;

/// Main error type for argo-unroll operations
#[derive(Error, Debug)]
pub enum Error {
    /// A document in the rendered root chart is not valid YAML.
    #[error("failed to decode yaml document: {0}")]
    YamlDecode(#[source] serde_yaml::Error),

    /// An Application document was recognized but could not be resolved.
    #[error("application '{name}' is invalid: {source}")]
    InvalidApplication {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// A label and a plugin variable disagree on `instance` or `env`.
    #[error("conflicting values for '{field}': label is '{label}', plugin.env is '{plugin}'")]
    ConflictingValues {
        field: String,
        label: String,
        plugin: String,
    },

    /// An Application has no `metadata.name`.
    #[error("metadata.name is empty")]
    MissingName,

    /// Neither the `rawRepository` annotation nor `spec.source.repoURL` is set.
    #[error("both 'rawRepository' annotation and 'spec.source.repoURL' are empty")]
    MissingRepository,

    /// An error occurred while cloning a Git repository.
    ///
    /// Includes the repository URL, ref (branch/tag), error message, and an
    /// optional hint for resolution.
    #[error("Git clone error for {url}@{r#ref}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// The single clone attempt for this cache key already failed in this run.
    #[error("clone of {key} is unavailable: {message}")]
    CloneUnavailable { key: String, message: String },

    /// The templating engine failed to render a chart.
    #[error("failed to render chart for release '{release}': {message}")]
    Template { release: String, message: String },

    /// The temporary workspace or the output root could not be created.
    #[error("failed to prepare directory {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rendered manifest could not be written.
    #[error("failed to write manifest to {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single application failed; `stage` is where its worker stopped.
    #[error("application '{name}' failed while {stage}: {source}")]
    Application {
        name: String,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// One or more application workers failed.
    ///
    /// Only the first failure is carried; the rest were logged when they
    /// happened.
    #[error("failed to process {failed} of {total} application(s), first error: {first}")]
    Aggregate {
        failed: usize,
        total: usize,
        first: Box<Error>,
    },

    /// The bounded worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps a resolution failure with the application it belongs to.
    pub(crate) fn invalid_application(name: &str, source: Error) -> Self {
        Error::InvalidApplication {
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
