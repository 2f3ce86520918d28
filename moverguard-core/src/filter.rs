use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::model::SourceKind;
use crate::paths::CacheRoots;

/// A normalized path together with the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedEntry {
    pub path: String,
    pub source: SourceKind,
}

impl NormalizedEntry {
    pub fn new(path: impl Into<String>, source: SourceKind) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub included: BTreeSet<String>,
    /// Unique paths dropped because they are missing from the cache mount,
    /// are not absolute, or cannot be written as a single line.
    pub skipped_count: usize,
}

/// Keep only entries that exist on the cache.
///
/// Entries are de-duplicated by path first. A path reported by the trusted
/// external file is kept without touching the filesystem even if another
/// source produced it too. Everything else is translated from the host
/// namespace into this process's mount namespace and checked.
pub async fn filter_existing<I>(entries: I, roots: &CacheRoots) -> FilterOutcome
where
    I: IntoIterator<Item = NormalizedEntry>,
{
    let mut trusted_by_path: BTreeMap<String, bool> = BTreeMap::new();
    for entry in entries {
        let trusted = entry.source.is_trusted();
        trusted_by_path
            .entry(entry.path)
            .and_modify(|seen| *seen |= trusted)
            .or_insert(trusted);
    }

    let mut outcome = FilterOutcome::default();
    for (path, trusted) in trusted_by_path {
        if !path.starts_with('/') {
            debug!(path = %path, "dropping non-absolute entry");
            outcome.skipped_count += 1;
            continue;
        }
        if path.contains(['\n', '\r']) {
            debug!(path = ?path, "dropping entry with a line break");
            outcome.skipped_count += 1;
            continue;
        }

        if trusted {
            outcome.included.insert(path);
            continue;
        }

        let mounted = roots.to_mount_path(&path);
        match tokio::fs::try_exists(&mounted).await {
            Ok(true) => {
                outcome.included.insert(path);
            }
            Ok(false) => {
                trace!(
                    path = %path,
                    mounted = %mounted.display(),
                    "not on cache"
                );
                outcome.skipped_count += 1;
            }
            Err(err) => {
                debug!(path = %path, error = %err, "existence check failed");
                outcome.skipped_count += 1;
            }
        }
    }

    outcome
}
