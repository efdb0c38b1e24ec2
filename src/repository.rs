//! # Version-Control Collaborator
//!
//! Cloning goes through the `GitOperations` trait so that the render pipeline
//! does not depend on a real `git` binary or network access. The main
//! application uses `DefaultGitOperations`, which wraps the system `git`
//! command; tests substitute a mock that records calls and can be told to
//! fail.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Materializes `revision` of `url` into `target_dir`.
    ///
    /// This is expected to be a shallow, single-branch clone.
    fn clone_shallow(&self, url: &str, revision: &str, target_dir: &Path) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
#[derive(Debug, Clone)]
pub struct DefaultGitOperations {
    binary: PathBuf,
}

impl DefaultGitOperations {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for DefaultGitOperations {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitOperations for DefaultGitOperations {
    fn clone_shallow(&self, url: &str, revision: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone_shallow(&self.binary, url, revision, target_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_default_operations_use_configured_binary() {
        let temp_dir = TempDir::new().unwrap();
        let git_ops = DefaultGitOperations::new("/nonexistent/bin/git");

        let err = git_ops
            .clone_shallow("git@example.com:org/repo", "main", &temp_dir.path().join("clone-1"))
            .unwrap_err();
        match err {
            Error::GitClone { url, message, .. } => {
                assert_eq!(url, "git@example.com:org/repo");
                assert!(message.contains("/nonexistent/bin/git"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_trait_object_is_usable_across_threads() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn GitOperations>();
    }
}
