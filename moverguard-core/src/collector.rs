//! Gathers raw exclusion candidates from every configured source.
//!
//! Each source is collected independently. A source that fails (library
//! unreachable, external file unreadable) is logged and contributes zero
//! candidates; collection as a whole never fails.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ExclusionError;
use crate::library::{LibraryError, MovieLibrary, SeriesLibrary};
use crate::model::{PathCandidate, SourceKind};
use crate::paths::clean_raw_path;

/// Concurrent `episodefile` requests issued against Sonarr.
const EPISODE_FETCH_CONCURRENCY: usize = 4;

/// What to collect. Built from user settings at the start of each build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePlan {
    pub custom_folders: Vec<String>,
    pub external_file: Option<PathBuf>,
    pub radarr_tag_ids: BTreeSet<i32>,
    pub sonarr_tag_ids: BTreeSet<i32>,
}

/// Library adapters available for this build. `None` means the service is
/// not configured and is skipped without error.
#[derive(Clone, Copy, Default)]
pub struct CollectorSources<'a> {
    pub movies: Option<&'a dyn MovieLibrary>,
    pub series: Option<&'a dyn SeriesLibrary>,
}

impl std::fmt::Debug for CollectorSources<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorSources")
            .field("movies", &self.movies.is_some())
            .field("series", &self.series.is_some())
            .finish()
    }
}

/// Per-source outcome, kept for logging and alerting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: SourceKind,
    pub candidates: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub candidates: BTreeSet<PathCandidate>,
    pub reports: Vec<SourceReport>,
}

impl Collection {
    fn absorb(
        &mut self,
        source: SourceKind,
        outcome: Result<Vec<PathCandidate>, ExclusionError>,
    ) {
        match outcome {
            Ok(found) => {
                debug!(%source, count = found.len(), "source collected");
                self.reports.push(SourceReport {
                    source,
                    candidates: found.len(),
                    error: None,
                });
                self.candidates.extend(found);
            }
            Err(err) => {
                warn!(%source, error = %err, "source skipped for this build");
                self.reports.push(SourceReport {
                    source,
                    candidates: 0,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.reports.iter().filter(|report| report.error.is_some())
    }
}

/// Collect candidates from all four sources.
pub async fn collect(
    plan: &SourcePlan,
    sources: CollectorSources<'_>,
) -> Collection {
    let mut collection = Collection::default();

    collection.absorb(SourceKind::Manual, Ok(manual_folders(plan)));

    if let Some(path) = &plan.external_file {
        collection.absorb(SourceKind::ExternalFile, external_file(path).await);
    }

    if let Some(library) = sources.movies
        && !plan.radarr_tag_ids.is_empty()
    {
        let outcome = tagged_movies(library, &plan.radarr_tag_ids)
            .await
            .map_err(ExclusionError::from);
        collection.absorb(SourceKind::Radarr, outcome);
    }

    if let Some(library) = sources.series
        && !plan.sonarr_tag_ids.is_empty()
    {
        let outcome = tagged_episodes(library, &plan.sonarr_tag_ids)
            .await
            .map_err(ExclusionError::from);
        collection.absorb(SourceKind::Sonarr, outcome);
    }

    info!(
        candidates = collection.candidates.len(),
        failed = collection.failed_sources().count(),
        "collection finished"
    );
    collection
}

fn manual_folders(plan: &SourcePlan) -> Vec<PathCandidate> {
    plan.custom_folders
        .iter()
        .map(|folder| clean_raw_path(folder))
        .filter(|folder| !folder.is_empty())
        .map(|folder| PathCandidate::new(folder, SourceKind::Manual))
        .collect()
}

/// Parse the external exclusion file body: one path per line, `#` starts a
/// comment line, blank lines are ignored.
pub fn parse_external_lines(body: &str) -> Vec<PathCandidate> {
    body.lines()
        .map(clean_raw_path)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| PathCandidate::new(line, SourceKind::ExternalFile))
        .collect()
}

async fn external_file(
    path: &Path,
) -> Result<Vec<PathCandidate>, ExclusionError> {
    let body = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| ExclusionError::file_io(path, err))?;
    Ok(parse_external_lines(&body))
}

fn intersects(tags: &[i32], wanted: &BTreeSet<i32>) -> bool {
    tags.iter().any(|tag| wanted.contains(tag))
}

async fn tagged_movies(
    library: &dyn MovieLibrary,
    tag_ids: &BTreeSet<i32>,
) -> Result<Vec<PathCandidate>, LibraryError> {
    let movies = library.movies().await?;

    let candidates = movies
        .iter()
        .filter(|movie| intersects(&movie.tags, tag_ids))
        .filter_map(|movie| {
            let path = movie.exclusion_path();
            if path.is_none() {
                debug!(
                    id = movie.id,
                    title = %movie.title,
                    "tagged movie has no path"
                );
            }
            path.map(|path| {
                PathCandidate::tagged(
                    clean_raw_path(path),
                    SourceKind::Radarr,
                    movie.tags.iter().copied(),
                )
            })
        })
        .collect();

    Ok(candidates)
}

async fn tagged_episodes(
    library: &dyn SeriesLibrary,
    tag_ids: &BTreeSet<i32>,
) -> Result<Vec<PathCandidate>, LibraryError> {
    let series = library.series().await?;
    let tagged: Vec<_> = series
        .into_iter()
        .filter(|show| intersects(&show.tags, tag_ids))
        .collect();

    let per_show: Vec<Vec<PathCandidate>> = stream::iter(tagged)
        .map(|show| async move {
            let files = library.episode_files(show.id).await?;
            let mut found: Vec<PathCandidate> = files
                .iter()
                .filter_map(|file| file.path.as_deref())
                .map(clean_raw_path)
                .filter(|path| !path.is_empty())
                .map(|path| {
                    PathCandidate::tagged(
                        path,
                        SourceKind::Sonarr,
                        show.tags.iter().copied(),
                    )
                })
                .collect();

            if found.is_empty()
                && let Some(folder) = show.path.as_deref()
                && !folder.trim().is_empty()
            {
                debug!(
                    id = show.id,
                    title = %show.title,
                    "no episode files, using series folder"
                );
                found.push(PathCandidate::tagged(
                    clean_raw_path(folder),
                    SourceKind::Sonarr,
                    show.tags.iter().copied(),
                ));
            }
            Ok::<_, LibraryError>(found)
        })
        .buffer_unordered(EPISODE_FETCH_CONCURRENCY)
        .try_collect()
        .await?;

    Ok(per_show.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{
        EpisodeFile, Movie, MovieFile, MockMovieLibrary, MockSeriesLibrary,
        Series,
    };

    fn movie(id: i32, path: &str, tags: Vec<i32>) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
            year: None,
            path: Some(format!("/data/movies/Movie {id}")),
            has_file: true,
            movie_file: Some(MovieFile {
                path: Some(path.to_string()),
            }),
            tags,
        }
    }

    fn unreachable() -> LibraryError {
        LibraryError::NotConfigured { service: "radarr" }
    }

    #[test]
    fn external_lines_skip_comments_and_blanks() {
        let parsed = parse_external_lines(
            "/data/movies/Foo/Foo.mkv\n# comment\n\n   \n  \"/data/tv/B\"  \n",
        );
        let paths: Vec<_> =
            parsed.iter().map(|c| c.raw_path.as_str()).collect();
        assert_eq!(paths, vec!["/data/movies/Foo/Foo.mkv", "/data/tv/B"]);
    }

    #[tokio::test]
    async fn only_tagged_movies_are_collected() {
        let mut radarr = MockMovieLibrary::new();
        radarr.expect_movies().returning(|| {
            Ok(vec![
                movie(1, "/data/movies/A/A.mkv", vec![5]),
                movie(2, "/data/movies/B/B.mkv", vec![6]),
                movie(3, "/data/movies/C/C.mkv", vec![]),
            ])
        });

        let plan = SourcePlan {
            radarr_tag_ids: BTreeSet::from([5]),
            ..SourcePlan::default()
        };
        let sources = CollectorSources {
            movies: Some(&radarr),
            series: None,
        };
        let collection = collect(&plan, sources).await;

        let paths: Vec<_> = collection
            .candidates
            .iter()
            .map(|c| c.raw_path.as_str())
            .collect();
        assert_eq!(paths, vec!["/data/movies/A/A.mkv"]);
    }

    #[tokio::test]
    async fn library_failure_contributes_nothing() {
        let mut radarr = MockMovieLibrary::new();
        radarr.expect_movies().returning(|| Err(unreachable()));

        let plan = SourcePlan {
            custom_folders: vec!["/mnt/cache/Keep".into()],
            radarr_tag_ids: BTreeSet::from([1]),
            ..SourcePlan::default()
        };
        let sources = CollectorSources {
            movies: Some(&radarr),
            series: None,
        };
        let collection = collect(&plan, sources).await;

        assert_eq!(collection.candidates.len(), 1);
        assert_eq!(collection.failed_sources().count(), 1);
    }

    #[tokio::test]
    async fn libraries_are_not_queried_without_tags() {
        let radarr = MockMovieLibrary::new();
        let sonarr = MockSeriesLibrary::new();
        let sources = CollectorSources {
            movies: Some(&radarr),
            series: Some(&sonarr),
        };
        let collection = collect(&SourcePlan::default(), sources).await;
        assert!(collection.candidates.is_empty());
    }

    #[tokio::test]
    async fn series_without_files_fall_back_to_folder() {
        let mut sonarr = MockSeriesLibrary::new();
        sonarr.expect_series().returning(|| {
            Ok(vec![
                Series {
                    id: 1,
                    title: "Empty".into(),
                    year: None,
                    path: Some("/tv/Empty".into()),
                    status: None,
                    statistics: None,
                    tags: vec![9],
                },
                Series {
                    id: 2,
                    title: "Full".into(),
                    year: None,
                    path: Some("/tv/Full".into()),
                    status: None,
                    statistics: None,
                    tags: vec![9],
                },
            ])
        });
        sonarr.expect_episode_files().returning(|series_id| {
            if series_id == 2 {
                Ok(vec![EpisodeFile {
                    id: 20,
                    series_id,
                    path: Some("/tv/Full/S01/E01.mkv".into()),
                }])
            } else {
                Ok(vec![])
            }
        });

        let plan = SourcePlan {
            sonarr_tag_ids: BTreeSet::from([9]),
            ..SourcePlan::default()
        };
        let sources = CollectorSources {
            movies: None,
            series: Some(&sonarr),
        };
        let collection = collect(&plan, sources).await;

        let paths: BTreeSet<_> = collection
            .candidates
            .iter()
            .map(|c| c.raw_path.as_str())
            .collect();
        assert_eq!(
            paths,
            BTreeSet::from(["/tv/Empty", "/tv/Full/S01/E01.mkv"])
        );
    }
}
