//! Recent build and webhook events shown on the dashboard.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub const MAX_ALERTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Success => "success",
            AlertLevel::Error => "error",
            AlertLevel::Warning => "warning",
            AlertLevel::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub level: AlertLevel,
    pub source: String,
    pub message: String,
}

/// Newest-first list capped at [`MAX_ALERTS`], mirrored to a JSON file.
#[derive(Debug)]
pub struct AlertLog {
    path: PathBuf,
    alerts: Mutex<VecDeque<Alert>>,
}

impl AlertLog {
    /// Load persisted alerts. An unreadable file starts an empty log.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let alerts = match fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<VecDeque<Alert>>(&raw) {
                Ok(mut alerts) => {
                    alerts.truncate(MAX_ALERTS);
                    debug!(count = alerts.len(), "alert log loaded");
                    alerts
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "alert log unreadable, starting empty"
                    );
                    VecDeque::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                VecDeque::new()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "alert log unreadable, starting empty"
                );
                VecDeque::new()
            }
        };

        Self {
            path,
            alerts: Mutex::new(alerts),
        }
    }

    pub fn add(
        &self,
        level: AlertLevel,
        source: &str,
        message: impl Into<String>,
    ) -> Alert {
        let alert = Alert {
            timestamp: Utc::now(),
            level,
            source: source.to_string(),
            message: message.into(),
        };
        info!(
            level = level.as_str(),
            source,
            message = %alert.message,
            "alert recorded"
        );

        let mut alerts = self.alerts.lock();
        alerts.push_front(alert.clone());
        alerts.truncate(MAX_ALERTS);
        self.persist(&alerts);
        alert
    }

    pub fn all(&self) -> Vec<Alert> {
        self.alerts.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut alerts = self.alerts.lock();
        alerts.clear();
        self.persist(&alerts);
    }

    fn persist(&self, alerts: &VecDeque<Alert>) {
        if let Err(err) = write_atomic(&self.path, alerts) {
            error!(
                path = %self.path.display(),
                error = %err,
                "failed to save alert log"
            );
        }
    }
}

fn write_atomic(path: &Path, alerts: &VecDeque<Alert>) -> io::Result<()> {
    let body = serde_json::to_vec_pretty(alerts)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".alert_log.")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(&body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn newest_first_and_bounded() {
        let dir = TempDir::new().unwrap();
        let log = AlertLog::load(dir.path().join("alert_log.json"));

        for i in 0..(MAX_ALERTS + 5) {
            log.add(AlertLevel::Info, "webhook", format!("event {i}"));
        }

        let alerts = log.all();
        assert_eq!(alerts.len(), MAX_ALERTS);
        assert_eq!(alerts[0].message, format!("event {}", MAX_ALERTS + 4));
    }

    #[test]
    fn alerts_survive_reload_and_clear_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alert_log.json");

        let log = AlertLog::load(&path);
        log.add(AlertLevel::Error, "builder", "write failed");
        let reloaded = AlertLog::load(&path);
        assert_eq!(reloaded.all().len(), 1);
        assert_eq!(reloaded.all()[0].level, AlertLevel::Error);

        reloaded.clear();
        assert!(AlertLog::load(&path).all().is_empty());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alert_log.json");
        fs::write(&path, "not json").unwrap();
        assert!(AlertLog::load(&path).all().is_empty());
    }
}
