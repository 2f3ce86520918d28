//! Core of moverguard: builds the exclusion list the NAS mover reads so
//! that protected media never leaves the cache pool.
//!
//! The pipeline is `collect → normalize → filter → publish`:
//!
//! - [`collector`] gathers raw candidates from manual folders, an external
//!   exclusion file and tag-filtered Radarr/Sonarr queries.
//! - [`paths`] maps every candidate into the NAS host namespace.
//! - [`filter`] drops entries that are not present on the cache.
//! - [`exclusion_file`] publishes the sorted set atomically.
//!
//! [`builder::ExclusionBuilder`] ties these together behind a single build
//! gate.

pub mod builder;
pub mod collector;
pub mod error;
pub mod exclusion_file;
pub mod filter;
pub mod library;
pub mod model;
pub mod mover_status;
pub mod paths;
pub mod protected;
pub mod stats;
pub mod tag_operation;

pub use builder::{BuildLedger, ExclusionBuilder, ExclusionPlan, NoopLedger};
pub use collector::{CollectorSources, SourcePlan};
pub use error::{ExclusionError, Result};
pub use model::{BuildPhase, BuildResult, PathCandidate, SourceKind};
pub use paths::{CacheRoots, MappingTable, PathMapping, normalize};
pub use protected::{
    ProtectedMovie, ProtectedShow, protected_movies, protected_shows,
};
pub use stats::ExclusionStats;
pub use tag_operation::{TagOperationResult, run_tag_operation};
