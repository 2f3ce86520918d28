//! Typed adapters for the Radarr and Sonarr v3 REST APIs.
//!
//! The collector only sees the [`MovieLibrary`] and [`SeriesLibrary`]
//! traits; the reqwest-backed clients live in [`radarr`] and [`sonarr`].

mod client;
pub mod radarr;
pub mod sonarr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::{ArrClient, ArrConnection};
pub use radarr::RadarrClient;
pub use sonarr::SonarrClient;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },

    #[error("{service} rejected the API key")]
    Unauthorized { service: &'static str },

    #[error("{service} returned {status} for {url}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("{service} request failed: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} sent an unreadable response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid {service} URL: {message}")]
    InvalidUrl {
        service: &'static str,
        message: String,
    },
}

impl LibraryError {
    pub fn service(&self) -> &'static str {
        match self {
            LibraryError::NotConfigured { service }
            | LibraryError::Unauthorized { service }
            | LibraryError::Status { service, .. }
            | LibraryError::Network { service, .. }
            | LibraryError::Decode { service, .. }
            | LibraryError::InvalidUrl { service, .. } => *service,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            LibraryError::Network { source, .. } if source.is_timeout()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDetail {
    pub id: i32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub movie_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieFile {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    /// Movie folder on the Radarr side.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub has_file: bool,
    #[serde(default)]
    pub movie_file: Option<MovieFile>,
    #[serde(default)]
    pub tags: Vec<i32>,
}

impl Movie {
    /// The on-disk file when Radarr has one, otherwise the movie folder.
    pub fn exclusion_path(&self) -> Option<&str> {
        self.movie_file
            .as_ref()
            .and_then(|file| file.path.as_deref())
            .filter(|path| !path.trim().is_empty())
            .or_else(|| {
                self.path.as_deref().filter(|path| !path.trim().is_empty())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub path: Option<String>,
    /// `continuing`, `ended`, ...
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub statistics: Option<SeriesStatistics>,
    #[serde(default)]
    pub tags: Vec<i32>,
}

impl Series {
    pub fn season_count(&self) -> u32 {
        self.statistics.as_ref().map_or(0, |stats| stats.season_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStatistics {
    #[serde(default)]
    pub season_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeFile {
    pub id: i32,
    #[serde(default)]
    pub series_id: i32,
    #[serde(default)]
    pub path: Option<String>,
}

/// How the Radarr bulk editor applies a tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyTags {
    Add,
    Remove,
    Replace,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieLibrary: Send + Sync {
    async fn movies(&self) -> Result<Vec<Movie>, LibraryError>;

    async fn movie_ids_for_tag(
        &self,
        tag_id: i32,
    ) -> Result<Vec<i32>, LibraryError>;

    async fn edit_movie_tags(
        &self,
        movie_ids: Vec<i32>,
        tag_ids: Vec<i32>,
        apply: ApplyTags,
    ) -> Result<(), LibraryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeriesLibrary: Send + Sync {
    async fn series(&self) -> Result<Vec<Series>, LibraryError>;

    async fn episode_files(
        &self,
        series_id: i32,
    ) -> Result<Vec<EpisodeFile>, LibraryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_prefers_file_path_over_folder() {
        let movie: Movie = serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": "Heat",
            "path": "/data/movies/Heat (1995)",
            "hasFile": true,
            "movieFile": { "path": "/data/movies/Heat (1995)/Heat.mkv" },
            "tags": [3]
        }))
        .unwrap();
        assert_eq!(
            movie.exclusion_path(),
            Some("/data/movies/Heat (1995)/Heat.mkv")
        );
    }

    #[test]
    fn movie_without_file_falls_back_to_folder() {
        let movie: Movie = serde_json::from_value(serde_json::json!({
            "id": 8,
            "path": "/data/movies/Ronin (1998)",
            "hasFile": false,
            "tags": []
        }))
        .unwrap();
        assert_eq!(movie.exclusion_path(), Some("/data/movies/Ronin (1998)"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let series: Series = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Show",
            "path": "/tv/Show",
            "tags": [1, 2],
            "seasons": [{ "seasonNumber": 1 }],
            "statistics": { "episodeFileCount": 10 }
        }))
        .unwrap();
        assert_eq!(series.tags, vec![1, 2]);
    }
}
