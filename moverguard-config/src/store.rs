//! JSON settings store with `.bak` fallback.
//!
//! Loading never fails: a missing or corrupt primary falls back to the
//! backup, then to defaults. Saving validates, rotates the current primary
//! into `.bak` and replaces the primary via temp file + rename.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moverguard_core::{BuildLedger, BuildResult, ExclusionError};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::settings::UserSettings;
use crate::validation::{SettingsValidationError, validate};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file {path} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize settings")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] SettingsValidationError),
}

impl From<SettingsError> for ExclusionError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Io { path, source } => {
                ExclusionError::file_io(path, source)
            }
            other => ExclusionError::ConfigCorrupt(other.to_string()),
        }
    }
}

/// Which document the store ended up using at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSource {
    Primary,
    Backup,
    Defaults,
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<UserSettings>,
    source: SettingsSource,
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

fn io_error(path: &Path, source: io::Error) -> SettingsError {
    SettingsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_document(path: &Path) -> Result<UserSettings, SettingsError> {
    let raw =
        fs::read_to_string(path).map_err(|source| io_error(path, source))?;
    let settings: UserSettings =
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    validate(&settings)?;
    Ok(settings)
}

impl SettingsStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let (settings, source) = match read_document(&path) {
            Ok(settings) => (settings, SettingsSource::Primary),
            Err(SettingsError::Io { source, .. })
                if source.kind() == io::ErrorKind::NotFound =>
            {
                info!(
                    path = %path.display(),
                    "no settings file yet, using defaults"
                );
                (UserSettings::default(), SettingsSource::Defaults)
            }
            Err(primary_err) => {
                let corrupt = ExclusionError::from(primary_err);
                warn!(
                    error = %corrupt,
                    "primary settings unusable, trying backup"
                );

                let backup = backup_path(&path);
                match read_document(&backup) {
                    Ok(settings) => {
                        warn!(
                            backup = %backup.display(),
                            "settings restored from backup"
                        );
                        (settings, SettingsSource::Backup)
                    }
                    Err(backup_err) => {
                        warn!(
                            error = %backup_err,
                            "backup unusable, using defaults"
                        );
                        (UserSettings::default(), SettingsSource::Defaults)
                    }
                }
            }
        };

        Self {
            path,
            current: RwLock::new(settings),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> SettingsSource {
        self.source
    }

    pub fn current(&self) -> UserSettings {
        self.current.read().clone()
    }

    /// Validate and persist `settings`, replacing the in-memory copy.
    pub fn save(&self, settings: UserSettings) -> Result<(), SettingsError> {
        validate(&settings)?;
        let mut current = self.current.write();
        self.write_document(&settings)?;
        *current = settings;
        Ok(())
    }

    /// Apply `edit` to the current settings and persist the result.
    pub fn update<F>(&self, edit: F) -> Result<UserSettings, SettingsError>
    where
        F: FnOnce(&mut UserSettings),
    {
        let mut current = self.current.write();
        let mut next = current.clone();
        edit(&mut next);
        validate(&next)?;
        self.write_document(&next)?;
        *current = next.clone();
        Ok(next)
    }

    fn write_document(
        &self,
        settings: &UserSettings,
    ) -> Result<(), SettingsError> {
        let body = serde_json::to_vec_pretty(settings)
            .map_err(SettingsError::Serialize)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

        if self.path.exists() {
            let backup = backup_path(&self.path);
            fs::copy(&self.path, &backup)
                .map_err(|source| io_error(&backup, source))?;
        }

        let mut tmp = tempfile::Builder::new()
            .prefix(".settings.")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| io_error(dir, source))?;
        let tmp_path = tmp.path().to_path_buf();
        tmp.write_all(&body)
            .and_then(|()| tmp.write_all(b"\n"))
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|source| io_error(&tmp_path, source))?;
        tmp.persist(&self.path)
            .map_err(|err| io_error(&self.path, err.error))?;

        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

#[async_trait]
impl BuildLedger for SettingsStore {
    async fn record_build(
        &self,
        result: &BuildResult,
    ) -> moverguard_core::Result<()> {
        self.update(|settings| settings.last_build = Some(result.timestamp))?;
        Ok(())
    }

    async fn last_build(&self) -> Option<DateTime<Utc>> {
        self.current.read().last_build
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json"));
        assert_eq!(store.source(), SettingsSource::Defaults);
        assert_eq!(store.current(), UserSettings::default());
    }

    #[test]
    fn save_rotates_previous_primary_into_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::load(&path);

        let mut first = UserSettings::default();
        first.radarr.api_key = "one".into();
        store.save(first).unwrap();

        let mut second = UserSettings::default();
        second.radarr.api_key = "two".into();
        store.save(second).unwrap();

        let backup: UserSettings = serde_json::from_str(
            &fs::read_to_string(backup_path(&path)).unwrap(),
        )
        .unwrap();
        assert_eq!(backup.radarr.api_key, "one");
        assert_eq!(store.current().radarr.api_key, "two");
    }

    #[test]
    fn invalid_settings_are_not_saved() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json"));

        let mut bad = UserSettings::default();
        bad.webhooks.cooldown_seconds = 1;
        assert!(matches!(store.save(bad), Err(SettingsError::Invalid(_))));
        assert!(!store.path().exists());
    }
}
