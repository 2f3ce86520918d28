//! Discord webhook notifications.

use std::time::Duration;

use chrono::{DateTime, Local};
use moverguard_config::WebhookSettings;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error};

use crate::services::alert_log::AlertLevel;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_DESCRIPTION: usize = 1900;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no Discord webhook URL configured")]
    MissingUrl,
    #[error("Discord webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}

fn color(level: AlertLevel) -> u32 {
    match level {
        AlertLevel::Success => 0x2ecc71,
        AlertLevel::Error => 0xe74c3c,
        AlertLevel::Warning => 0xf39c12,
        AlertLevel::Info => 0x3498db,
    }
}

fn icon(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Success => "✅",
        AlertLevel::Error => "❌",
        AlertLevel::Warning => "⚠️",
        AlertLevel::Info => "📥",
    }
}

/// Embed body posted to the webhook.
pub fn embed_payload(
    level: AlertLevel,
    source: &str,
    message: &str,
    now: DateTime<Local>,
) -> Value {
    let description: String = message.chars().take(MAX_DESCRIPTION).collect();
    json!({
        "embeds": [{
            "title": format!(
                "{} MTEM · {}",
                icon(level),
                source.to_uppercase()
            ),
            "description": description,
            "color": color(level),
            "footer": {
                "text": format!(
                    "Mover Tuning Exclusion Manager · {}",
                    now.format("%Y-%m-%d %H:%M:%S")
                ),
            },
        }],
    })
}

/// Whether `settings` allow a notification at `level`.
pub fn should_notify(settings: &WebhookSettings, level: AlertLevel) -> bool {
    if !settings.discord_enabled
        || settings.discord_webhook_url.trim().is_empty()
    {
        return false;
    }
    level != AlertLevel::Warning || settings.discord_notify_warnings
}

#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    http: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Post unconditionally to `url`.
    pub async fn send(
        &self,
        url: &str,
        level: AlertLevel,
        source: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(NotifyError::MissingUrl);
        }
        self.http
            .post(url)
            .timeout(SEND_TIMEOUT)
            .json(&embed_payload(level, source, message, Local::now()))
            .send()
            .await?
            .error_for_status()?;
        debug!(level = level.as_str(), source, "Discord notification sent");
        Ok(())
    }

    /// Post when `settings` allow it. Failures are logged only.
    pub async fn notify(
        &self,
        settings: &WebhookSettings,
        level: AlertLevel,
        source: &str,
        message: &str,
    ) {
        if !should_notify(settings, level) {
            return;
        }
        if let Err(err) = self
            .send(&settings.discord_webhook_url, level, source, message)
            .await
        {
            error!(error = %err, "failed to send Discord notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn enabled() -> WebhookSettings {
        WebhookSettings {
            discord_enabled: true,
            discord_webhook_url: "https://discord.example/api/webhooks/1"
                .into(),
            ..WebhookSettings::default()
        }
    }

    #[test]
    fn payload_carries_level_styling() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let payload =
            embed_payload(AlertLevel::Error, "builder", "write failed", now);
        let embed = &payload["embeds"][0];

        assert_eq!(embed["color"], 0xe74c3c);
        assert_eq!(embed["description"], "write failed");
        assert!(embed["title"].as_str().unwrap().ends_with("BUILDER"));
        assert_eq!(
            embed["footer"]["text"],
            "Mover Tuning Exclusion Manager · 2024-03-09 14:05:00"
        );
    }

    #[test]
    fn long_messages_are_truncated() {
        let message = "x".repeat(MAX_DESCRIPTION + 100);
        let payload =
            embed_payload(AlertLevel::Info, "radarr", &message, Local::now());
        let description = payload["embeds"][0]["description"].as_str().unwrap();
        assert_eq!(description.len(), MAX_DESCRIPTION);
    }

    #[test]
    fn gating_follows_settings() {
        assert!(!should_notify(&WebhookSettings::default(), AlertLevel::Error));

        let mut settings = enabled();
        assert!(should_notify(&settings, AlertLevel::Warning));
        settings.discord_notify_warnings = false;
        assert!(!should_notify(&settings, AlertLevel::Warning));
        assert!(should_notify(&settings, AlertLevel::Success));

        settings.discord_webhook_url = "  ".into();
        assert!(!should_notify(&settings, AlertLevel::Error));
    }
}
