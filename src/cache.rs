//! In-process cache of cloned repositories
//!
//! Maps `normalized-repo@revision` to the directory it was cloned into. Each
//! key owns a slot with its own lock. The first caller for a key clones while
//! holding that lock, so concurrent callers for the same key wait for the
//! clone and then reuse its outcome instead of cloning again. Callers for
//! different keys never wait on each other's clones.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// Cache key combining the normalized repository address and a revision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(normalized_repo: &str, revision: &str) -> Self {
        Self(format!("{}@{}", normalized_repo, revision))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a lookup was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Another caller already cloned this key.
    Hit(PathBuf),
    /// This call performed the clone.
    Cloned(PathBuf),
}

impl CacheLookup {
    pub fn path(&self) -> &Path {
        match self {
            CacheLookup::Hit(path) | CacheLookup::Cloned(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            CacheLookup::Hit(path) | CacheLookup::Cloned(path) => path,
        }
    }
}

#[derive(Debug, Clone)]
enum CloneOutcome {
    Ready(PathBuf),
    Failed(String),
}

/// `None` until the first clone for the key finishes.
type CloneSlot = Mutex<Option<CloneOutcome>>;

#[derive(Debug, Default)]
struct CacheState {
    slots: HashMap<CacheKey, Arc<CloneSlot>>,
    clone_counter: usize,
}

/// Clone cache shared by all render workers of one run
#[derive(Debug)]
pub struct CloneCache {
    workspace: PathBuf,
    state: Mutex<CacheState>,
}

impl CloneCache {
    /// Create an empty cache whose clones land in `workspace/clone-<N>`
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Get the clone directory for `key`, running `clone` if nobody has yet.
    ///
    /// `clone` receives a fresh `clone-<N>` directory and runs at most once per
    /// key for the lifetime of the cache. If it fails, every later lookup of
    /// the same key fails with [`Error::CloneUnavailable`] without retrying.
    pub fn get_or_clone<F>(&self, key: &CacheKey, clone: F) -> Result<CacheLookup>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let slot = {
            let mut state = self.lock_state()?;
            Arc::clone(state.slots.entry(key.clone()).or_default())
        };

        // The cache-wide lock is released here; only this key's slot is held
        // across the clone.
        let mut outcome = slot.lock().map_err(|_| Error::LockPoisoned {
            context: format!("clone slot for {}", key),
        })?;

        match outcome.as_ref() {
            Some(CloneOutcome::Ready(path)) => return Ok(CacheLookup::Hit(path.clone())),
            Some(CloneOutcome::Failed(message)) => {
                return Err(Error::CloneUnavailable {
                    key: key.to_string(),
                    message: message.clone(),
                })
            }
            None => {}
        }

        let target = self.next_clone_dir()?;
        match clone(&target) {
            Ok(()) => {
                *outcome = Some(CloneOutcome::Ready(target.clone()));
                Ok(CacheLookup::Cloned(target))
            }
            Err(e) => {
                *outcome = Some(CloneOutcome::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Number of clone directories handed out so far
    pub fn clone_count(&self) -> Result<usize> {
        Ok(self.lock_state()?.clone_counter)
    }

    fn next_clone_dir(&self) -> Result<PathBuf> {
        let mut state = self.lock_state()?;
        state.clone_counter += 1;
        Ok(self
            .workspace
            .join(format!("clone-{}", state.clone_counter)))
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, CacheState>> {
        self.state.lock().map_err(|_| Error::LockPoisoned {
            context: "clone cache".to_string(),
        })
    }
}

#[cfg(test)]
impl CloneCache {
    /// Path of a completed clone, without triggering one
    fn get(&self, key: &CacheKey) -> Result<Option<PathBuf>> {
        let slot = match self.lock_state()?.slots.get(key) {
            Some(slot) => Arc::clone(slot),
            None => return Ok(None),
        };
        let outcome = slot.lock().map_err(|_| Error::LockPoisoned {
            context: format!("clone slot for {}", key),
        })?;
        Ok(match outcome.as_ref() {
            Some(CloneOutcome::Ready(path)) => Some(path.clone()),
            _ => None,
        })
    }

    /// Number of distinct keys seen so far
    fn len(&self) -> Result<usize> {
        Ok(self.lock_state()?.slots.len())
    }
}
