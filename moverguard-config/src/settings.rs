//! User-editable settings persisted as `settings.json`.
//!
//! Every field has a default so older or partial documents still load.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use moverguard_core::library::ArrConnection;
use moverguard_core::{
    CacheRoots, ExclusionPlan, MappingTable, PathMapping, SourcePlan,
};
use serde::{Deserialize, Serialize};

/// Placeholder returned instead of stored API keys.
pub const MASKED_SECRET: &str = "********";

pub const MIN_WEBHOOK_COOLDOWN_SECS: u64 = 30;
pub const MAX_WEBHOOK_COOLDOWN_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub radarr: ServiceSettings,
    pub sonarr: ServiceSettings,
    pub exclusions: ExclusionSettings,
    pub paths: PathSettings,
    pub tag_operation: TagOperationSettings,
    pub scheduler: SchedulerSettings,
    pub webhooks: WebhookSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_build: Option<DateTime<Utc>>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            radarr: ServiceSettings::with_url("http://localhost:7878"),
            sonarr: ServiceSettings::with_url("http://localhost:8989"),
            exclusions: ExclusionSettings::default(),
            paths: PathSettings::default(),
            tag_operation: TagOperationSettings::default(),
            scheduler: SchedulerSettings::default(),
            webhooks: WebhookSettings::default(),
            last_build: None,
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub url: String,
    pub api_key: String,
}

impl std::fmt::Debug for ServiceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSettings")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ServiceSettings {
    fn with_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            api_key: String::new(),
        }
    }

    pub fn connection(&self) -> ArrConnection {
        ArrConnection::new(self.url.clone(), self.api_key.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.connection().is_configured()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionSettings {
    /// Folders (host namespace) that are always excluded.
    pub custom_folders: Vec<String>,
    pub radarr_exclude_tag_ids: Vec<i32>,
    pub sonarr_exclude_tag_ids: Vec<i32>,
    /// Exclusion list written by PlexCache. Empty disables the source.
    pub plexcache_file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Cache pool as the NAS host sees it. Output entries use this root.
    pub host_cache_path: String,
    /// Cache pool as this process sees it. Empty means same as host.
    pub cache_mount_path: String,
    pub radarr_mappings: Vec<PathMapping>,
    pub sonarr_mappings: Vec<PathMapping>,
    pub plexcache_mappings: Vec<PathMapping>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            host_cache_path: "/mnt/cache".to_string(),
            cache_mount_path: String::new(),
            radarr_mappings: Vec::new(),
            sonarr_mappings: Vec::new(),
            plexcache_mappings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagOperationSettings {
    pub search_tag_id: Option<i32>,
    pub replace_tag_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub enabled: bool,
    /// Standard five-field crontab expression.
    pub cron_expression: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cron_expression: "0 */6 * * *".to_string(),
        }
    }
}

impl SchedulerSettings {
    pub fn schedule(&self) -> Result<Schedule, String> {
        parse_cron(&self.cron_expression)
    }
}

/// Parse a crontab expression. Five-field expressions get a leading
/// seconds field of `0`.
pub fn parse_cron(expression: &str) -> Result<Schedule, String> {
    let trimmed = expression.trim();
    let parsed = if trimmed.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {trimmed}"))
    } else {
        Schedule::from_str(trimmed)
    };
    parsed.map_err(|err| err.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub enabled: bool,
    pub cooldown_seconds: u64,
    pub discord_webhook_url: String,
    pub discord_enabled: bool,
    pub discord_notify_warnings: bool,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_seconds: 60,
            discord_webhook_url: String::new(),
            discord_enabled: false,
            discord_notify_warnings: true,
        }
    }
}

fn non_empty(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

impl UserSettings {
    /// The build inputs described by these settings.
    pub fn exclusion_plan(&self) -> ExclusionPlan {
        let exclusions = &self.exclusions;
        ExclusionPlan {
            sources: SourcePlan {
                custom_folders: exclusions.custom_folders.clone(),
                external_file: non_empty(&exclusions.plexcache_file_path),
                radarr_tag_ids: exclusions
                    .radarr_exclude_tag_ids
                    .iter()
                    .copied()
                    .collect::<BTreeSet<_>>(),
                sonarr_tag_ids: exclusions
                    .sonarr_exclude_tag_ids
                    .iter()
                    .copied()
                    .collect(),
            },
            mappings: MappingTable {
                radarr: self.paths.radarr_mappings.clone(),
                sonarr: self.paths.sonarr_mappings.clone(),
                external_file: self.paths.plexcache_mappings.clone(),
            },
            roots: CacheRoots::new(
                self.paths.host_cache_path.trim(),
                self.paths.cache_mount_path.trim(),
            ),
        }
    }

    /// Copy safe to hand to the browser.
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        for service in [&mut copy.radarr, &mut copy.sonarr] {
            if !service.api_key.is_empty() {
                service.api_key = MASKED_SECRET.to_string();
            }
        }
        copy
    }

    /// Apply an edited document on top of `current`. Masked keys keep their
    /// stored value and `last_build` is never client-controlled.
    pub fn merged_onto(mut self, current: &UserSettings) -> Self {
        if self.radarr.api_key == MASKED_SECRET {
            self.radarr.api_key = current.radarr.api_key.clone();
        }
        if self.sonarr.api_key == MASKED_SECRET {
            self.sonarr.api_key = current.sonarr.api_key.clone();
        }
        self.last_build = current.last_build;
        self
    }
}
