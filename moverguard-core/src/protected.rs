//! Library items kept on the cache by their exclude tags, for display.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::library::{LibraryError, Movie, MovieLibrary, Series, SeriesLibrary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedMovie {
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    /// File path when Radarr has one, otherwise the movie folder.
    pub path: Option<String>,
    pub has_file: bool,
    pub tags: Vec<i32>,
}

impl From<Movie> for ProtectedMovie {
    fn from(movie: Movie) -> Self {
        Self {
            path: movie.exclusion_path().map(str::to_string),
            id: movie.id,
            title: movie.title,
            year: movie.year,
            has_file: movie.has_file,
            tags: movie.tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedShow {
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub path: Option<String>,
    pub status: Option<String>,
    pub seasons: u32,
    pub tags: Vec<i32>,
}

impl From<Series> for ProtectedShow {
    fn from(show: Series) -> Self {
        Self {
            seasons: show.season_count(),
            id: show.id,
            title: show.title,
            year: show.year,
            path: show.path,
            status: show.status,
            tags: show.tags,
        }
    }
}

fn tagged(tags: &[i32], wanted: &BTreeSet<i32>) -> bool {
    tags.iter().any(|tag| wanted.contains(tag))
}

/// Movies carrying any of `tag_ids`, sorted by title. Empty without
/// querying Radarr when no tags are configured.
pub async fn protected_movies(
    library: &dyn MovieLibrary,
    tag_ids: &BTreeSet<i32>,
) -> Result<Vec<ProtectedMovie>, LibraryError> {
    if tag_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut movies: Vec<ProtectedMovie> = library
        .movies()
        .await?
        .into_iter()
        .filter(|movie| tagged(&movie.tags, tag_ids))
        .map(ProtectedMovie::from)
        .collect();
    movies.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    Ok(movies)
}

/// Series carrying any of `tag_ids`, sorted by title.
pub async fn protected_shows(
    library: &dyn SeriesLibrary,
    tag_ids: &BTreeSet<i32>,
) -> Result<Vec<ProtectedShow>, LibraryError> {
    if tag_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut shows: Vec<ProtectedShow> = library
        .series()
        .await?
        .into_iter()
        .filter(|show| tagged(&show.tags, tag_ids))
        .map(ProtectedShow::from)
        .collect();
    shows.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    Ok(shows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{
        MockMovieLibrary, MockSeriesLibrary, MovieFile, SeriesStatistics,
    };

    fn movie(id: i32, title: &str, tags: Vec<i32>) -> Movie {
        Movie {
            id,
            title: title.into(),
            year: Some(1999),
            path: Some(format!("/movies/{title}")),
            has_file: true,
            movie_file: Some(MovieFile {
                path: Some(format!("/movies/{title}/{title}.mkv")),
            }),
            tags,
        }
    }

    #[tokio::test]
    async fn only_tagged_movies_are_listed_by_title() {
        let mut radarr = MockMovieLibrary::new();
        radarr.expect_movies().returning(|| {
            Ok(vec![
                movie(1, "Zodiac", vec![3]),
                movie(2, "Alien", vec![3, 8]),
                movie(3, "Brazil", vec![5]),
            ])
        });

        let movies = protected_movies(&radarr, &BTreeSet::from([3]))
            .await
            .unwrap();
        let titles: Vec<&str> =
            movies.iter().map(|movie| movie.title.as_str()).collect();
        assert_eq!(titles, ["Alien", "Zodiac"]);
        assert_eq!(movies[0].path.as_deref(), Some("/movies/Alien/Alien.mkv"));
    }

    #[tokio::test]
    async fn no_tags_skips_the_library() {
        let mut radarr = MockMovieLibrary::new();
        radarr.expect_movies().never();
        let movies = protected_movies(&radarr, &BTreeSet::new()).await.unwrap();
        assert!(movies.is_empty());
    }

    #[tokio::test]
    async fn shows_report_status_and_seasons() {
        let mut sonarr = MockSeriesLibrary::new();
        sonarr.expect_series().returning(|| {
            Ok(vec![
                Series {
                    id: 4,
                    title: "Dark".into(),
                    year: Some(2017),
                    path: Some("/tv/Dark".into()),
                    status: Some("ended".into()),
                    statistics: Some(SeriesStatistics { season_count: 3 }),
                    tags: vec![9],
                },
                Series {
                    id: 5,
                    title: "Other".into(),
                    year: None,
                    path: None,
                    status: None,
                    statistics: None,
                    tags: vec![],
                },
            ])
        });

        let shows = protected_shows(&sonarr, &BTreeSet::from([9]))
            .await
            .unwrap();
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].seasons, 3);
        assert_eq!(shows[0].status.as_deref(), Some("ended"));
    }
}
