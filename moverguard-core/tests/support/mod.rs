#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moverguard_core::library::{
    ApplyTags, EpisodeFile, LibraryError, Movie, MovieFile, MovieLibrary,
    Series, SeriesLibrary, SeriesStatistics,
};
use moverguard_core::{BuildLedger, BuildResult};

pub fn movie(id: i32, file: &str, tags: &[i32]) -> Movie {
    Movie {
        id,
        title: format!("Movie {id}"),
        year: Some(2000 + id),
        path: Path::new(file)
            .parent()
            .map(|parent| parent.to_string_lossy().into_owned()),
        has_file: true,
        movie_file: Some(MovieFile {
            path: Some(file.to_string()),
        }),
        tags: tags.to_vec(),
    }
}

pub fn series(id: i32, folder: &str, tags: &[i32]) -> Series {
    Series {
        id,
        title: format!("Series {id}"),
        year: Some(2010 + id),
        path: Some(folder.to_string()),
        status: Some("continuing".into()),
        statistics: Some(SeriesStatistics { season_count: 2 }),
        tags: tags.to_vec(),
    }
}

pub fn episode(id: i32, series_id: i32, path: &str) -> EpisodeFile {
    EpisodeFile {
        id,
        series_id,
        path: Some(path.to_string()),
    }
}

/// In-memory Radarr with optional latency and failure injection.
#[derive(Default)]
pub struct FakeRadarr {
    pub movies: Vec<Movie>,
    pub unreachable: bool,
    pub delay: Option<Duration>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeRadarr {
    pub fn with_movies(movies: Vec<Movie>) -> Self {
        Self {
            movies,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MovieLibrary for FakeRadarr {
    async fn movies(&self) -> Result<Vec<Movie>, LibraryError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable {
            return Err(LibraryError::Status {
                service: "radarr",
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                url: "/api/v3/movie".into(),
            });
        }
        Ok(self.movies.clone())
    }

    async fn movie_ids_for_tag(
        &self,
        tag_id: i32,
    ) -> Result<Vec<i32>, LibraryError> {
        Ok(self
            .movies
            .iter()
            .filter(|movie| movie.tags.contains(&tag_id))
            .map(|movie| movie.id)
            .collect())
    }

    async fn edit_movie_tags(
        &self,
        _movie_ids: Vec<i32>,
        _tag_ids: Vec<i32>,
        _apply: ApplyTags,
    ) -> Result<(), LibraryError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSonarr {
    pub series: Vec<Series>,
    pub episodes: Vec<EpisodeFile>,
}

#[async_trait]
impl SeriesLibrary for FakeSonarr {
    async fn series(&self) -> Result<Vec<Series>, LibraryError> {
        Ok(self.series.clone())
    }

    async fn episode_files(
        &self,
        series_id: i32,
    ) -> Result<Vec<EpisodeFile>, LibraryError> {
        Ok(self
            .episodes
            .iter()
            .filter(|file| file.series_id == series_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingLedger {
    pub builds: Mutex<Vec<BuildResult>>,
}

#[async_trait]
impl BuildLedger for RecordingLedger {
    async fn record_build(
        &self,
        result: &BuildResult,
    ) -> moverguard_core::Result<()> {
        self.builds.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn last_build(&self) -> Option<DateTime<Utc>> {
        self.builds.lock().unwrap().last().map(|build| build.timestamp)
    }
}

/// Create `relative` (a file) beneath `root`, including parents.
pub fn touch(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative.trim_start_matches('/'));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, b"").unwrap();
    path
}
