use std::io;
use std::path::Path;

pub const DEFAULT_TAIL_LINES: usize = 100;
pub const MAX_TAIL_LINES: usize = 1000;

/// Last `lines` lines of `path`, oldest first. Invalid UTF-8 is replaced.
pub async fn tail(path: &Path, lines: usize) -> io::Result<Vec<String>> {
    let raw = tokio::fs::read(path).await?;
    let text = String::from_utf8_lossy(&raw);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].iter().map(|line| line.to_string()).collect())
}

pub fn clamp_lines(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_TAIL_LINES)
        .clamp(1, MAX_TAIL_LINES)
}
