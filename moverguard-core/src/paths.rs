//! Path normalization between the library, plugin, and NAS namespaces.
//!
//! Radarr and Sonarr report paths as their containers see them
//! (`/data/movies/...`), the external cache manager writes its own view,
//! and the mover on the NAS host needs `/mnt/cache/...`. Each source kind
//! carries an ordered list of [`PathMapping`]s. Matching is done on whole
//! path segments so `/data/movies` never rewrites `/data/movies-4k`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::SourceKind;

/// A single prefix rewrite rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    pub from_prefix: String,
    pub to_prefix: String,
}

impl PathMapping {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_prefix: from.into(),
            to_prefix: to.into(),
        }
    }

    /// Rewrite `path` when it lives under `from_prefix`.
    pub fn rewrite(&self, path: &str) -> Option<String> {
        let rest = strip_segment_prefix(path, &self.from_prefix)?;
        Some(join_prefix(&self.to_prefix, rest))
    }

    /// True when `path` is already expressed under `to_prefix`.
    pub fn is_target(&self, path: &str) -> bool {
        strip_segment_prefix(path, &self.to_prefix).is_some()
    }
}

/// Per-source mapping lists. Manual folders never have mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTable {
    #[serde(default)]
    pub radarr: Vec<PathMapping>,
    #[serde(default)]
    pub sonarr: Vec<PathMapping>,
    #[serde(default)]
    pub external_file: Vec<PathMapping>,
}

impl MappingTable {
    pub fn for_source(&self, source: SourceKind) -> &[PathMapping] {
        match source {
            SourceKind::Manual => &[],
            SourceKind::ExternalFile => &self.external_file,
            SourceKind::Radarr => &self.radarr,
            SourceKind::Sonarr => &self.sonarr,
        }
    }
}

/// Map `path` produced by `source` into the NAS host namespace.
///
/// Paths already under one of the source's target prefixes pass through
/// untouched, which keeps the function idempotent. Unmatched paths also
/// pass through; a bad mapping shows up later as an existence-filter miss.
pub fn normalize(
    path: &str,
    source: SourceKind,
    mappings: &MappingTable,
) -> String {
    if path.is_empty() {
        return String::new();
    }

    let rules = mappings.for_source(source);
    if rules.iter().any(|rule| rule.is_target(path)) {
        return path.to_string();
    }

    rules
        .iter()
        .find_map(|rule| rule.rewrite(path))
        .unwrap_or_else(|| path.to_string())
}

/// Trim whitespace and surrounding quotes from a raw path line.
pub fn clean_raw_path(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
}

/// Return the remainder of `path` after `prefix` when the prefix ends on a
/// segment boundary. The remainder is empty or starts with `/`.
pub fn strip_segment_prefix<'a>(
    path: &'a str,
    prefix: &str,
) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }

    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        // Filesystem root: every absolute path qualifies.
        return path.starts_with('/').then_some(path);
    }

    let rest = path.strip_prefix(trimmed)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

fn join_prefix(prefix: &str, rest: &str) -> String {
    let base = prefix.trim_end_matches('/');
    match (base.is_empty(), rest.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => rest.to_string(),
        (false, _) => format!("{base}{rest}"),
    }
}

/// The two views of the same cache pool.
///
/// `host_cache_path` is what the NAS host (and therefore the mover) sees;
/// output entries are written in this namespace. `cache_mount_path` is
/// where this process has the pool mounted and is used for existence
/// checks. An empty mount path means both views are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRoots {
    #[serde(default)]
    pub host_cache_path: String,
    #[serde(default)]
    pub cache_mount_path: String,
}

impl CacheRoots {
    pub fn new(host: impl Into<String>, mount: impl Into<String>) -> Self {
        Self {
            host_cache_path: host.into(),
            cache_mount_path: mount.into(),
        }
    }

    fn is_passthrough(&self) -> bool {
        self.host_cache_path.is_empty()
            || self.cache_mount_path.is_empty()
            || self.host_cache_path.trim_end_matches('/')
                == self.cache_mount_path.trim_end_matches('/')
    }

    /// Where a host-namespace path can be found from inside this process.
    pub fn to_mount_path(&self, host_path: &str) -> PathBuf {
        if self.is_passthrough() {
            return PathBuf::from(host_path);
        }
        match strip_segment_prefix(host_path, &self.host_cache_path) {
            Some(rest) => {
                PathBuf::from(join_prefix(&self.cache_mount_path, rest))
            }
            None => PathBuf::from(host_path),
        }
    }

    /// Inverse of [`CacheRoots::to_mount_path`].
    pub fn to_host_path(&self, mount_path: &str) -> String {
        if self.is_passthrough() {
            return mount_path.to_string();
        }
        match strip_segment_prefix(mount_path, &self.cache_mount_path) {
            Some(rest) => join_prefix(&self.host_cache_path, rest),
            None => mount_path.to_string(),
        }
    }
}
