//! Git helpers: repository identity normalization and shallow clones.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use url::Url;

use crate::error::Error;

/// `user@host:path`, the scp-like form git uses for SSH remotes.
static SCP_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9.-]+:[^/]").expect("valid scp-like remote pattern")
});

/// Map a repository URL to the canonical address used for cloning and caching.
///
/// - `user@host:path` remotes are returned unchanged.
/// - `http`/`https` URLs become `git@<host>[:<port>]:<path>` with the leading
///   slash dropped. Credentials are dropped; a non-default port is kept.
/// - Anything else, including input that does not parse as a URL, is returned
///   unchanged.
///
/// This never fails, so two spellings of the same repository share a cache
/// entry without a bad URL turning into an error here.
pub fn normalize_repo_url(repo_url: &str) -> String {
    if SCP_LIKE.is_match(repo_url) {
        return repo_url.to_string();
    }

    let parsed = match Url::parse(repo_url) {
        Ok(parsed) => parsed,
        Err(_) => return repo_url.to_string(),
    };

    match (parsed.scheme(), parsed.host_str()) {
        ("http" | "https", Some(host)) => {
            let path = parsed.path().trim_start_matches('/');
            match parsed.port() {
                Some(port) => format!("git@{}:{}:{}", host, port, path),
                None => format!("git@{}:{}", host, path),
            }
        }
        _ => repo_url.to_string(),
    }
}

/// Clone a single branch of a repository with `--depth=1`
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Personal access tokens
/// - Any authentication configured in ~/.gitconfig
pub fn clone_shallow(
    git_binary: &Path,
    url: &str,
    revision: &str,
    target_dir: &Path,
) -> Result<(), Error> {
    // git refuses to clone into an existing non-empty directory
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }

    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("running git clone for {}@{} into {}", url, revision, target_dir.display());
    let output = Command::new(git_binary)
        .args(["clone", "--depth=1", "--single-branch", "--branch", revision, url])
        .arg(target_dir)
        .output()
        .map_err(|e| Error::GitClone {
            url: url.to_string(),
            r#ref: revision.to_string(),
            message: format!("could not run {}: {}", git_binary.display(), e),
            hint: Some("Make sure git is installed and on PATH".to_string()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "HTTP(S) URLs are cloned over SSH; make sure an SSH key with access is loaded in ssh-agent"
                    .to_string(),
            )
        } else if stderr.contains("Remote branch") && stderr.contains("not found") {
            Some(format!(
                "targetRevision '{}' must name a branch or tag",
                revision
            ))
        } else {
            None
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            r#ref: revision.to_string(),
            message: stderr,
            hint,
        });
    }

    Ok(())
}
