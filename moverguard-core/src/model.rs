use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a candidate exclusion path came from.
///
/// The source decides which mapping table the normalizer consults and
/// whether the existence filter re-validates the path.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Folder typed in by the user; already in the host namespace.
    Manual,
    /// Line from the external cache manager's exclusion file.
    ExternalFile,
    /// Tagged movie reported by Radarr.
    Radarr,
    /// Tagged series episode reported by Sonarr.
    Sonarr,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Manual,
        SourceKind::ExternalFile,
        SourceKind::Radarr,
        SourceKind::Sonarr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Manual => "manual",
            SourceKind::ExternalFile => "external_file",
            SourceKind::Radarr => "radarr",
            SourceKind::Sonarr => "sonarr",
        }
    }

    /// Entries from the external plugin were validated upstream and skip
    /// the existence check.
    pub fn is_trusted(self) -> bool {
        matches!(self, SourceKind::ExternalFile)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw path gathered during collection, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathCandidate {
    pub raw_path: String,
    pub source: SourceKind,
    pub service_tag_ids: BTreeSet<i32>,
}

impl PathCandidate {
    pub fn new(raw_path: impl Into<String>, source: SourceKind) -> Self {
        Self {
            raw_path: raw_path.into(),
            source,
            service_tag_ids: BTreeSet::new(),
        }
    }

    pub fn tagged(
        raw_path: impl Into<String>,
        source: SourceKind,
        tags: impl IntoIterator<Item = i32>,
    ) -> Self {
        Self {
            raw_path: raw_path.into(),
            source,
            service_tag_ids: tags.into_iter().collect(),
        }
    }
}

/// Counts reported by a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub candidate_count: usize,
    pub included_count: usize,
    pub skipped_count: usize,
    pub timestamp: DateTime<Utc>,
    /// Sources that were skipped because they failed, one line each.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Lifecycle of the builder. `Failed` persists until the next build starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Idle,
    Collecting,
    Normalizing,
    Filtering,
    Writing,
    Failed,
}

impl BuildPhase {
    pub fn is_active(self) -> bool {
        !matches!(self, BuildPhase::Idle | BuildPhase::Failed)
    }
}
