use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of the currently published exclusion file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionStats {
    pub total_count: usize,
    pub movie_count: usize,
    pub tv_count: usize,
    pub last_build: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Movie,
    Tv,
    Other,
}

const MOVIE_SEGMENTS: &[&str] = &["movies", "movie"];
const TV_SEGMENTS: &[&str] = &["tv", "shows", "series"];

/// Classify an entry by its directory names, case-insensitively.
pub fn classify(path: &str) -> MediaClass {
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        let segment = segment.to_ascii_lowercase();
        if MOVIE_SEGMENTS.contains(&segment.as_str()) {
            return MediaClass::Movie;
        }
        if TV_SEGMENTS.contains(&segment.as_str()) {
            return MediaClass::Tv;
        }
    }
    MediaClass::Other
}

impl ExclusionStats {
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a str>,
        last_build: Option<DateTime<Utc>>,
    ) -> Self {
        let mut stats = ExclusionStats {
            last_build,
            ..Default::default()
        };
        for entry in entries {
            stats.total_count += 1;
            match classify(entry) {
                MediaClass::Movie => stats.movie_count += 1,
                MediaClass::Tv => stats.tv_count += 1,
                MediaClass::Other => {}
            }
        }
        stats
    }
}
