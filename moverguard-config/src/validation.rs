use thiserror::Error;
use url::Url;

use crate::settings::{
    MAX_WEBHOOK_COOLDOWN_SECS, MIN_WEBHOOK_COOLDOWN_SECS, UserSettings,
    parse_cron,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsValidationError {
    #[error("{service} URL {url:?} is invalid: {reason}")]
    InvalidServiceUrl {
        service: &'static str,
        url: String,
        reason: String,
    },
    #[error("{field} prefix {prefix:?} must be an absolute path")]
    RelativePrefix { field: &'static str, prefix: String },
    #[error("cron expression {expression:?} is invalid: {reason}")]
    InvalidCron { expression: String, reason: String },
    #[error(
        "webhook cooldown {value}s is outside {}..={}s",
        MIN_WEBHOOK_COOLDOWN_SECS,
        MAX_WEBHOOK_COOLDOWN_SECS
    )]
    CooldownOutOfRange { value: u64 },
    #[error("Discord webhook URL is invalid: {reason}")]
    InvalidDiscordUrl { reason: String },
}

fn check_url(
    service: &'static str,
    raw: &str,
) -> Result<(), SettingsValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(SettingsValidationError::InvalidServiceUrl {
            service,
            url: trimmed.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        }),
        Err(err) => Err(SettingsValidationError::InvalidServiceUrl {
            service,
            url: trimmed.to_string(),
            reason: err.to_string(),
        }),
    }
}

fn check_absolute(
    field: &'static str,
    prefix: &str,
) -> Result<(), SettingsValidationError> {
    if prefix.is_empty() || prefix.starts_with('/') {
        Ok(())
    } else {
        Err(SettingsValidationError::RelativePrefix {
            field,
            prefix: prefix.to_string(),
        })
    }
}

/// Reject documents the pipeline cannot run with.
pub fn validate(
    settings: &UserSettings,
) -> Result<(), SettingsValidationError> {
    check_url("radarr", &settings.radarr.url)?;
    check_url("sonarr", &settings.sonarr.url)?;

    check_absolute("host_cache_path", &settings.paths.host_cache_path)?;
    check_absolute("cache_mount_path", &settings.paths.cache_mount_path)?;

    let mapping_lists = [
        ("radarr_mappings", &settings.paths.radarr_mappings),
        ("sonarr_mappings", &settings.paths.sonarr_mappings),
        ("plexcache_mappings", &settings.paths.plexcache_mappings),
    ];
    for (field, mappings) in mapping_lists {
        for mapping in mappings {
            if mapping.from_prefix.is_empty() {
                return Err(SettingsValidationError::RelativePrefix {
                    field,
                    prefix: String::new(),
                });
            }
            check_absolute(field, &mapping.from_prefix)?;
            check_absolute(field, &mapping.to_prefix)?;
        }
    }

    parse_cron(&settings.scheduler.cron_expression).map_err(|reason| {
        SettingsValidationError::InvalidCron {
            expression: settings.scheduler.cron_expression.clone(),
            reason,
        }
    })?;

    let cooldown = settings.webhooks.cooldown_seconds;
    let cooldown_range = MIN_WEBHOOK_COOLDOWN_SECS..=MAX_WEBHOOK_COOLDOWN_SECS;
    if !cooldown_range.contains(&cooldown) {
        return Err(SettingsValidationError::CooldownOutOfRange {
            value: cooldown,
        });
    }

    let discord = settings.webhooks.discord_webhook_url.trim();
    if !discord.is_empty() {
        Url::parse(discord).map_err(|err| {
            SettingsValidationError::InvalidDiscordUrl {
                reason: err.to_string(),
            }
        })?;
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

/// Non-fatal findings collected while loading configuration.
#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moverguard_core::PathMapping;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate(&UserSettings::default()), Ok(()));
    }

    #[test]
    fn relative_mapping_prefix_is_rejected() {
        let mut settings = UserSettings::default();
        settings
            .paths
            .sonarr_mappings
            .push(PathMapping::new("tv/", "/mnt/cache/tv"));
        assert!(matches!(
            validate(&settings),
            Err(SettingsValidationError::RelativePrefix {
                field: "sonarr_mappings",
                ..
            })
        ));
    }

    #[test]
    fn cooldown_bounds_are_enforced() {
        let mut settings = UserSettings::default();
        settings.webhooks.cooldown_seconds = 5;
        assert_eq!(
            validate(&settings),
            Err(SettingsValidationError::CooldownOutOfRange { value: 5 })
        );
        settings.webhooks.cooldown_seconds = 300;
        assert_eq!(validate(&settings), Ok(()));
    }

    #[test]
    fn bad_service_url_and_cron_are_rejected() {
        let mut settings = UserSettings::default();
        settings.radarr.url = "radarr:7878".into();
        assert!(validate(&settings).is_err());

        let mut settings = UserSettings::default();
        settings.scheduler.cron_expression = "every hour".into();
        assert!(matches!(
            validate(&settings),
            Err(SettingsValidationError::InvalidCron { .. })
        ));
    }
}
