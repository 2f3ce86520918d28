//! Reads the mover plugin's own logs to confirm exclusions are honoured.
//!
//! The plugin writes `Summary_<timestamp>.txt` (header line, then
//! `cache|files_moved|bytes_moved|...`) and `Filtered_files_<timestamp>.list`
//! after every run. The filtered list holds either bare paths or the
//! plugin's pipe-separated records, where field 3 is the action, field 6
//! the size in bytes and field 10 the path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SUMMARY_PREFIX: &str = "Summary_";
const SUMMARY_SUFFIX: &str = ".txt";
const FILTERED_PREFIX: &str = "Filtered_files_";
const FILTERED_SUFFIX: &str = ".list";
const STAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S";
const RECORD_FIELDS: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoverState {
    /// The last run filtered at least one file.
    Working,
    /// The mover ran but excluded nothing.
    Configured,
    NoLogs,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoverStatus {
    pub status: MoverState,
    pub cache_name: Option<String>,
    pub files_moved: u64,
    pub bytes_moved: u64,
    pub files_excluded: u64,
    pub last_run: Option<DateTime<Local>>,
    /// Files the last run left on the cache, largest first.
    #[serde(default)]
    pub skipped: Vec<SkippedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    /// Bytes; 0 when the list only carries the path.
    pub size: u64,
}

impl MoverStatus {
    fn empty(status: MoverState) -> Self {
        Self {
            status,
            cache_name: None,
            files_moved: 0,
            bytes_moved: 0,
            files_excluded: 0,
            last_run: None,
            skipped: Vec::new(),
            error: None,
        }
    }
}

/// Newest file in `dir` matching `prefix*suffix`. Timestamps in the names
/// sort lexicographically.
fn newest(
    dir: &Path,
    prefix: &str,
    suffix: &str,
) -> io::Result<Option<PathBuf>> {
    let mut newest: Option<(String, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) || !name.ends_with(suffix) {
            continue;
        }
        if newest.as_ref().is_none_or(|(best, _)| name > *best) {
            newest = Some((name, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

fn run_time(summary: &Path) -> Option<DateTime<Local>> {
    let stem = summary.file_stem()?.to_string_lossy();
    let stamp = stem.strip_prefix(SUMMARY_PREFIX)?;
    let parsed = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).single());

    parsed.or_else(|| {
        let modified = fs::metadata(summary).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Local>::from(modified))
    })
}

fn parse_summary(body: &str) -> Result<(String, u64, u64), String> {
    let Some(data) = body.lines().nth(1) else {
        return Err("summary has no data line".into());
    };
    let fields: Vec<&str> = data.trim().split('|').collect();
    if fields.len() < 4 {
        return Err(format!(
            "expected at least 4 fields, got {}",
            fields.len()
        ));
    }
    let files = fields[1]
        .trim()
        .parse::<u64>()
        .map_err(|err| format!("bad files_moved {:?}: {err}", fields[1]))?;
    let bytes = fields[2]
        .trim()
        .parse::<u64>()
        .map_err(|err| format!("bad bytes_moved {:?}: {err}", fields[2]))?;
    Ok((fields[0].trim().to_string(), files, bytes))
}

fn parse_skipped_line(line: &str) -> Option<SkippedFile> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.contains('|') {
        return Some(SkippedFile {
            path: line.to_string(),
            size: 0,
        });
    }

    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < RECORD_FIELDS
        || !fields[3].trim().eq_ignore_ascii_case("skipped")
    {
        return None;
    }
    let path = fields[10].trim();
    (!path.is_empty()).then(|| SkippedFile {
        path: path.to_string(),
        size: fields[6].trim().parse().unwrap_or(0),
    })
}

/// Skipped files from a filtered list body, largest first.
pub fn parse_skipped(body: &str) -> Vec<SkippedFile> {
    let mut skipped: Vec<SkippedFile> =
        body.lines().filter_map(parse_skipped_line).collect();
    skipped.sort_by(|a, b| b.size.cmp(&a.size).then(a.path.cmp(&b.path)));
    skipped
}

/// Summarise the newest mover run found in `log_dir`. Never fails; problems
/// are reported through [`MoverState::Error`].
pub fn read_mover_status(log_dir: &Path) -> MoverStatus {
    let summary = match newest(log_dir, SUMMARY_PREFIX, SUMMARY_SUFFIX) {
        Ok(Some(path)) => path,
        Ok(None) => return MoverStatus::empty(MoverState::NoLogs),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %log_dir.display(), "mover log directory missing");
            return MoverStatus::empty(MoverState::NoLogs);
        }
        Err(err) => {
            warn!(
                dir = %log_dir.display(),
                error = %err,
                "cannot list mover logs"
            );
            let mut status = MoverStatus::empty(MoverState::Error);
            status.error = Some(err.to_string());
            return status;
        }
    };

    let mut status = MoverStatus::empty(MoverState::Configured);
    status.last_run = run_time(&summary);

    let parsed = fs::read_to_string(&summary)
        .map_err(|err| err.to_string())
        .and_then(|body| parse_summary(&body));
    match parsed {
        Ok((cache, files, bytes)) => {
            status.cache_name = Some(cache);
            status.files_moved = files;
            status.bytes_moved = bytes;
        }
        Err(reason) => {
            warn!(
                file = %summary.display(),
                reason = %reason,
                "unreadable mover summary"
            );
            status.status = MoverState::Error;
            status.error = Some(reason);
            return status;
        }
    }

    if let Ok(Some(filtered)) =
        newest(log_dir, FILTERED_PREFIX, FILTERED_SUFFIX)
        && let Ok(body) = fs::read_to_string(&filtered)
    {
        status.skipped = parse_skipped(&body);
        status.files_excluded = status.skipped.len() as u64;
    }

    if status.files_excluded > 0 {
        status.status = MoverState::Working;
    }
    status
}

/// Human readable byte count, binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use tempfile::TempDir;

    #[test]
    fn missing_directory_reports_no_logs() {
        let dir = TempDir::new().unwrap();
        let status = read_mover_status(&dir.path().join("absent"));
        assert_eq!(status.status, MoverState::NoLogs);
    }

    #[test]
    fn newest_summary_and_filtered_list_are_used() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Summary_2024-01-01T030000.txt"),
            "cache|files|bytes|x\ncache|1|1|0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("Summary_2024-03-05T041500.txt"),
            "cache|files|bytes|x\ncache|12|4096|0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("Filtered_files_2024-03-05T041500.list"),
            "/mnt/cache/a\n\n/mnt/cache/b\n",
        )
        .unwrap();

        let status = read_mover_status(dir.path());
        assert_eq!(status.status, MoverState::Working);
        assert_eq!(status.cache_name.as_deref(), Some("cache"));
        assert_eq!(status.files_moved, 12);
        assert_eq!(status.bytes_moved, 4096);
        assert_eq!(status.files_excluded, 2);
        assert_eq!(status.skipped[0].path, "/mnt/cache/a");

        let last_run = status.last_run.unwrap();
        assert_eq!((last_run.month(), last_run.day()), (3, 5));
        assert_eq!((last_run.hour(), last_run.minute()), (4, 15));
    }

    #[test]
    fn run_without_filtered_files_is_configured() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Summary_2024-03-05T041500.txt"),
            "h\ncache|0|0|0\n",
        )
        .unwrap();
        assert_eq!(
            read_mover_status(dir.path()).status,
            MoverState::Configured
        );
    }

    #[test]
    fn malformed_summary_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Summary_bad.txt"), "only header\n").unwrap();
        let status = read_mover_status(dir.path());
        assert_eq!(status.status, MoverState::Error);
        assert!(status.error.is_some());
    }

    #[test]
    fn skipped_records_are_sorted_by_size() {
        let body = "\
            x|y|z|skipped|a|b|100|c|d|e|/mnt/cache/small.mkv\n\
            x|y|z|moved|a|b|999|c|d|e|/mnt/cache/moved.mkv\n\
            x|y|z|Skipped|a|b|5000|c|d|e|/mnt/cache/large.mkv\n\
            x|y|z|skipped|a|b|n/a|c|d|e|/mnt/cache/unknown.mkv\n\
            short|record\n";
        let skipped = parse_skipped(body);
        let paths: Vec<&str> =
            skipped.iter().map(|file| file.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/mnt/cache/large.mkv",
                "/mnt/cache/small.mkv",
                "/mnt/cache/unknown.mkv"
            ]
        );
        assert_eq!(skipped[0].size, 5000);
        assert_eq!(skipped[2].size, 0);
    }

    #[test]
    fn bytes_are_humanised() {
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
    }
}
