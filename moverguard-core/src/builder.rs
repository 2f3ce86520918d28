//! The exclusion build pipeline.
//!
//! `collect → normalize → filter → publish`, guarded so that at most one
//! build touches the output file at a time.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{error, info, instrument, warn};

use crate::collector::{self, CollectorSources, SourcePlan};
use crate::error::{ExclusionError, Result};
use crate::exclusion_file;
use crate::filter::{self, NormalizedEntry};
use crate::model::{BuildPhase, BuildResult};
use crate::paths::{CacheRoots, MappingTable, normalize};
use crate::stats::ExclusionStats;

/// Everything a build needs besides the library adapters. Loaded from the
/// settings store once per build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionPlan {
    pub sources: SourcePlan,
    pub mappings: MappingTable,
    pub roots: CacheRoots,
}

/// Persists the "last build" bookkeeping.
#[async_trait]
pub trait BuildLedger: Send + Sync {
    async fn record_build(&self, result: &BuildResult) -> Result<()>;

    async fn last_build(&self) -> Option<DateTime<Utc>>;
}

/// Ledger that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLedger;

#[async_trait]
impl BuildLedger for NoopLedger {
    async fn record_build(&self, _result: &BuildResult) -> Result<()> {
        Ok(())
    }

    async fn last_build(&self) -> Option<DateTime<Utc>> {
        None
    }
}

pub struct ExclusionBuilder {
    output_path: PathBuf,
    gate: Mutex<()>,
    phase: watch::Sender<BuildPhase>,
}

impl fmt::Debug for ExclusionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusionBuilder")
            .field("output_path", &self.output_path)
            .field("phase", &*self.phase.borrow())
            .finish()
    }
}

impl ExclusionBuilder {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        let (phase, _) = watch::channel(BuildPhase::Idle);
        Self {
            output_path: output_path.into(),
            gate: Mutex::new(()),
            phase,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn phase(&self) -> BuildPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<BuildPhase> {
        self.phase.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Run a build, waiting for any in-flight build to finish first.
    pub async fn build_exclusions(
        &self,
        plan: &ExclusionPlan,
        sources: CollectorSources<'_>,
        ledger: &dyn BuildLedger,
    ) -> Result<BuildResult> {
        let guard = self.gate.lock().await;
        self.run(guard, plan, sources, ledger).await
    }

    /// Run a build, or fail with [`ExclusionError::BuildInProgress`] if
    /// one is already running.
    pub async fn try_build_exclusions(
        &self,
        plan: &ExclusionPlan,
        sources: CollectorSources<'_>,
        ledger: &dyn BuildLedger,
    ) -> Result<BuildResult> {
        let guard = self
            .gate
            .try_lock()
            .map_err(|_| ExclusionError::BuildInProgress)?;
        self.run(guard, plan, sources, ledger).await
    }

    #[instrument(skip_all, fields(output = %self.output_path.display()))]
    async fn run(
        &self,
        _guard: MutexGuard<'_, ()>,
        plan: &ExclusionPlan,
        sources: CollectorSources<'_>,
        ledger: &dyn BuildLedger,
    ) -> Result<BuildResult> {
        match self.pipeline(plan, sources).await {
            Ok(result) => {
                self.phase.send_replace(BuildPhase::Idle);
                info!(
                    candidates = result.candidate_count,
                    included = result.included_count,
                    skipped = result.skipped_count,
                    "exclusion build finished"
                );
                if let Err(err) = ledger.record_build(&result).await {
                    warn!(error = %err, "could not record last build time");
                }
                Ok(result)
            }
            Err(err) => {
                self.phase.send_replace(BuildPhase::Failed);
                error!(error = %err, "exclusion build failed");
                Err(err)
            }
        }
    }

    async fn pipeline(
        &self,
        plan: &ExclusionPlan,
        sources: CollectorSources<'_>,
    ) -> Result<BuildResult> {
        self.phase.send_replace(BuildPhase::Collecting);
        let collection = collector::collect(&plan.sources, sources).await;
        let warnings: Vec<String> = collection
            .failed_sources()
            .filter_map(|report| report.error.clone())
            .collect();

        self.phase.send_replace(BuildPhase::Normalizing);
        let candidate_count = collection.candidates.len();
        let normalized: Vec<NormalizedEntry> = collection
            .candidates
            .into_iter()
            .filter_map(|candidate| {
                let path = normalize(
                    &candidate.raw_path,
                    candidate.source,
                    &plan.mappings,
                );
                (!path.is_empty())
                    .then(|| NormalizedEntry::new(path, candidate.source))
            })
            .collect();

        self.phase.send_replace(BuildPhase::Filtering);
        let outcome = filter::filter_existing(normalized, &plan.roots).await;

        self.phase.send_replace(BuildPhase::Writing);
        let included_count = outcome.included.len();
        self.publish(outcome.included).await?;

        Ok(BuildResult {
            candidate_count,
            included_count,
            skipped_count: outcome.skipped_count,
            timestamp: Utc::now(),
            warnings,
        })
    }

    async fn publish(&self, entries: BTreeSet<String>) -> Result<()> {
        let target = self.output_path.clone();
        tokio::task::spawn_blocking(move || {
            exclusion_file::publish(&target, &entries)
        })
        .await
        .map_err(|err| ExclusionError::Internal(err.to_string()))?
    }

    /// Entries of the currently published file.
    pub async fn read_exclusions(&self) -> Result<Vec<String>> {
        exclusion_file::read_entries(&self.output_path).await
    }

    pub async fn get_exclusion_stats(
        &self,
        ledger: &dyn BuildLedger,
    ) -> Result<ExclusionStats> {
        let entries = self.read_exclusions().await?;
        Ok(ExclusionStats::from_entries(
            entries.iter().map(String::as_str),
            ledger.last_build().await,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn phase_returns_to_idle_after_success() {
        let dir = TempDir::new().unwrap();
        let builder = ExclusionBuilder::new(dir.path().join("out.txt"));
        let plan = ExclusionPlan::default();

        let result = builder
            .build_exclusions(&plan, CollectorSources::default(), &NoopLedger)
            .await
            .unwrap();

        assert_eq!(result.included_count, 0);
        assert_eq!(builder.phase(), BuildPhase::Idle);
        assert!(builder.output_path().exists());
    }

    #[tokio::test]
    async fn failed_write_marks_builder_failed() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a dir").unwrap();
        let builder = ExclusionBuilder::new(blocker.join("out.txt"));

        let err = builder
            .build_exclusions(
                &ExclusionPlan::default(),
                CollectorSources::default(),
                &NoopLedger,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExclusionError::FileIo { .. }));
        assert_eq!(builder.phase(), BuildPhase::Failed);
        assert!(!builder.is_running());
    }
}
