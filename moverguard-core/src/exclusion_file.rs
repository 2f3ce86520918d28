//! The flat file handed to the mover: one absolute path per line, sorted,
//! unique, newline terminated.
//!
//! Publishing writes a temp file next to the target, syncs it, reads it
//! back to verify, keeps a `.bak` of the previous good file and finally
//! renames the temp file over the target. Readers only ever observe a
//! complete file.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ExclusionError, Result};

/// Render a sorted set into the on-disk format.
pub fn render(entries: &BTreeSet<String>) -> String {
    let mut body = String::with_capacity(
        entries.iter().map(|entry| entry.len() + 1).sum(),
    );
    for entry in entries {
        body.push_str(entry);
        body.push('\n');
    }
    body
}

/// Split file contents into entries, ignoring blank lines.
pub fn parse(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Current entries of `path`. A missing file reads as empty.
pub async fn read_entries(path: &Path) -> Result<Vec<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(body) => Ok(parse(&body)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(ExclusionError::file_io(path, err)),
    }
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// Check that `body` is exactly what [`render`] produces for `expected`.
fn verify(path: &Path, body: &str, expected: &BTreeSet<String>) -> Result<()> {
    let invalid = |reason: String| ExclusionError::ValidationFailure {
        path: path.to_path_buf(),
        reason,
    };

    if !body.is_empty() && !body.ends_with('\n') {
        return Err(invalid("missing trailing newline".into()));
    }

    let mut previous: Option<&str> = None;
    let mut count = 0usize;
    for line in body.lines() {
        if line.is_empty() {
            return Err(invalid(format!("blank line after {count} entries")));
        }
        if !line.starts_with('/') {
            return Err(invalid(format!("relative entry {line:?}")));
        }
        if let Some(prev) = previous
            && prev >= line
        {
            return Err(invalid(format!("entry {line:?} out of order")));
        }
        previous = Some(line);
        count += 1;
    }

    if count != expected.len() {
        return Err(invalid(format!(
            "read back {count} entries, expected {}",
            expected.len()
        )));
    }
    Ok(())
}

/// Atomically replace `target` with `entries`. Blocking; run it on the
/// blocking pool from async code.
pub fn publish(target: &Path, entries: &BTreeSet<String>) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|err| ExclusionError::file_io(&dir, err))?;

    let body = render(entries);

    let mut tmp = tempfile::Builder::new()
        .prefix(".mover_exclusions.")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|err| ExclusionError::file_io(&dir, err))?;

    tmp.write_all(body.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|err| ExclusionError::file_io(tmp.path(), err))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644))
            .map_err(|err| ExclusionError::file_io(tmp.path(), err))?;
    }

    let written = fs::read_to_string(tmp.path())
        .map_err(|err| ExclusionError::file_io(tmp.path(), err))?;
    verify(tmp.path(), &written, entries)?;

    if target.exists() {
        let backup = backup_path(target);
        if let Err(err) = fs::copy(target, &backup) {
            warn!(
                backup = %backup.display(),
                error = %err,
                "could not back up previous exclusion file"
            );
        }
    }

    tmp.persist(target)
        .map_err(|err| ExclusionError::file_io(target, err.error))?;

    // Make the rename itself durable where the platform allows it.
    if let Ok(handle) = fs::File::open(&dir)
        && let Err(err) = handle.sync_all()
    {
        debug!(dir = %dir.display(), error = %err, "directory sync skipped");
    }

    debug!(
        path = %target.display(),
        entries = entries.len(),
        "exclusion file published"
    );
    Ok(())
}
