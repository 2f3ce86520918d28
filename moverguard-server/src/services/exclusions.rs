//! Wires settings, library clients and the builder together for each
//! trigger, and turns outcomes into alerts and notifications.

use std::sync::Arc;
use std::time::Duration;

use moverguard_config::{SettingsStore, UserSettings};
use moverguard_core::library::{
    LibraryError, MovieLibrary, RadarrClient, SeriesLibrary, SonarrClient,
    Tag,
};
use moverguard_core::{
    BuildResult, CollectorSources, ExclusionBuilder, ExclusionError,
    ExclusionStats, ProtectedMovie, ProtectedShow, TagOperationResult,
    protected_movies, protected_shows, run_tag_operation,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::services::alert_log::{AlertLevel, AlertLog};
use crate::services::debounce::Debouncer;
use crate::services::notifier::DiscordNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Radarr,
    Sonarr,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Radarr => "radarr",
            Service::Sonarr => "sonarr",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Service::Radarr => "Radarr",
            Service::Sonarr => "Sonarr",
        }
    }
}

/// Who asked for a build. Manual requests are rejected while a build is
/// running; the others queue behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTrigger {
    Manual,
    /// Manual request already acknowledged to the caller, run in the
    /// background. Waits for the gate instead of being dropped.
    ManualAccepted,
    Scheduler,
    Webhook(Service),
}

impl BuildTrigger {
    pub fn waits_for_gate(self) -> bool {
        !matches!(self, BuildTrigger::Manual)
    }

    pub fn notifies(self) -> bool {
        matches!(self, BuildTrigger::Scheduler | BuildTrigger::Webhook(_))
    }

    pub fn label(self) -> &'static str {
        match self {
            BuildTrigger::Manual | BuildTrigger::ManualAccepted => {
                "manual request"
            }
            BuildTrigger::Scheduler => "scheduler",
            BuildTrigger::Webhook(service) => service.as_str(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FullOperationResult {
    pub tags: Option<TagOperationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_error: Option<String>,
    pub build: BuildResult,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionTest {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ExclusionService {
    settings: Arc<SettingsStore>,
    builder: ExclusionBuilder,
    alerts: Arc<AlertLog>,
    notifier: DiscordNotifier,
    http: reqwest::Client,
    upstream_timeout: Duration,
    webhooks: Debouncer<Service>,
}

impl ExclusionService {
    pub fn new(
        settings: Arc<SettingsStore>,
        builder: ExclusionBuilder,
        alerts: Arc<AlertLog>,
        http: reqwest::Client,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            settings,
            builder,
            alerts,
            notifier: DiscordNotifier::new(http.clone()),
            http,
            upstream_timeout,
            webhooks: Debouncer::new(),
        }
    }

    pub fn builder(&self) -> &ExclusionBuilder {
        &self.builder
    }

    pub fn notifier(&self) -> &DiscordNotifier {
        &self.notifier
    }

    pub fn webhook_pending(&self, service: Service) -> bool {
        self.webhooks.is_pending(&service)
    }

    fn radarr(
        &self,
        settings: &UserSettings,
    ) -> Result<RadarrClient, LibraryError> {
        RadarrClient::with_client(
            &settings.radarr.connection(),
            self.http.clone(),
            self.upstream_timeout,
        )
    }

    fn sonarr(
        &self,
        settings: &UserSettings,
    ) -> Result<SonarrClient, LibraryError> {
        SonarrClient::with_client(
            &settings.sonarr.connection(),
            self.http.clone(),
            self.upstream_timeout,
        )
    }

    /// `None` for a service that is unconfigured or whose URL is unusable.
    fn optional<T>(client: Result<T, LibraryError>) -> Option<T> {
        match client {
            Ok(client) => Some(client),
            Err(LibraryError::NotConfigured { .. }) => None,
            Err(err) => {
                warn!(service = err.service(), error = %err, "library skipped");
                None
            }
        }
    }

    pub async fn build(
        &self,
        trigger: BuildTrigger,
    ) -> moverguard_core::Result<BuildResult> {
        let settings = self.settings.current();
        let plan = settings.exclusion_plan();
        let radarr = Self::optional(self.radarr(&settings));
        let sonarr = Self::optional(self.sonarr(&settings));
        let sources = CollectorSources {
            movies: radarr.as_ref().map(|client| client as &dyn MovieLibrary),
            series: sonarr.as_ref().map(|client| client as &dyn SeriesLibrary),
        };

        info!(trigger = trigger.label(), "exclusion build requested");
        let outcome = if trigger.waits_for_gate() {
            self.builder
                .build_exclusions(&plan, sources, self.settings.as_ref())
                .await
        } else {
            self.builder
                .try_build_exclusions(&plan, sources, self.settings.as_ref())
                .await
        };

        match &outcome {
            Ok(result) => {
                self.report(
                    trigger,
                    &settings,
                    AlertLevel::Success,
                    format!(
                        "Exclusion build triggered by {} completed: \
                         {} exclusions written",
                        trigger.label(),
                        result.included_count
                    ),
                )
                .await;
                for warning in &result.warnings {
                    self.report(
                        trigger,
                        &settings,
                        AlertLevel::Warning,
                        warning.clone(),
                    )
                    .await;
                }
            }
            Err(ExclusionError::BuildInProgress) => {}
            Err(err) => {
                self.report(
                    trigger,
                    &settings,
                    AlertLevel::Error,
                    format!(
                        "Exclusion build triggered by {} failed: {err}",
                        trigger.label()
                    ),
                )
                .await;
            }
        }
        outcome
    }

    async fn report(
        &self,
        trigger: BuildTrigger,
        settings: &UserSettings,
        level: AlertLevel,
        message: String,
    ) {
        self.alerts.add(level, "builder", message.clone());
        if trigger.notifies() {
            self.notifier
                .notify(&settings.webhooks, level, "builder", &message)
                .await;
        }
    }

    /// Relabel Radarr tags. `Ok(None)` when no search tag is configured.
    pub async fn run_tag_operation(
        &self,
    ) -> Result<Option<TagOperationResult>, LibraryError> {
        let settings = self.settings.current();
        let Some(search_tag_id) = settings.tag_operation.search_tag_id else {
            info!("tag operation skipped: no search tag configured");
            return Ok(None);
        };

        let radarr = self.radarr(&settings)?;
        match run_tag_operation(
            &radarr,
            search_tag_id,
            settings.tag_operation.replace_tag_id,
        )
        .await
        {
            Ok(result) => {
                self.alerts.add(
                    AlertLevel::Success,
                    Service::Radarr.as_str(),
                    format!(
                        "Tag operation found {} movies, updated {}",
                        result.movies_found, result.movies_updated
                    ),
                );
                Ok(Some(result))
            }
            Err(err) => {
                self.alerts.add(
                    AlertLevel::Error,
                    Service::Radarr.as_str(),
                    format!("Tag operation failed: {err}"),
                );
                Err(err)
            }
        }
    }

    /// Tag operation (when configured) followed by a build. A failed tag
    /// operation is reported but does not stop the build.
    pub async fn run_full(
        &self,
        trigger: BuildTrigger,
    ) -> moverguard_core::Result<FullOperationResult> {
        if !trigger.waits_for_gate() && self.builder.is_running() {
            return Err(ExclusionError::BuildInProgress);
        }

        let (tags, tag_error) = match self.run_tag_operation().await {
            Ok(tags) => (tags, None),
            Err(err) => (None, Some(err.to_string())),
        };
        let build = self.build(trigger).await?;
        Ok(FullOperationResult {
            tags,
            tag_error,
            build,
        })
    }

    pub async fn test_connection(&self, service: Service) -> ConnectionTest {
        let settings = self.settings.current();
        let status = match service {
            Service::Radarr => match self.radarr(&settings) {
                Ok(client) => client.system_status().await,
                Err(err) => Err(err),
            },
            Service::Sonarr => match self.sonarr(&settings) {
                Ok(client) => client.system_status().await,
                Err(err) => Err(err),
            },
        };

        match status {
            Ok(status) => {
                info!(
                    service = service.as_str(),
                    version = %status.version,
                    "connection test passed"
                );
                ConnectionTest {
                    connected: true,
                    app_name: status.app_name,
                    version: Some(status.version),
                    error: None,
                }
            }
            Err(err) => {
                warn!(
                    service = service.as_str(),
                    error = %err,
                    "connection test failed"
                );
                ConnectionTest {
                    connected: false,
                    error: Some(err.to_string()),
                    ..ConnectionTest::default()
                }
            }
        }
    }

    pub async fn tags(
        &self,
        service: Service,
    ) -> Result<Vec<Tag>, LibraryError> {
        let settings = self.settings.current();
        match service {
            Service::Radarr => self.radarr(&settings)?.tags().await,
            Service::Sonarr => self.sonarr(&settings)?.tags().await,
        }
    }

    /// Radarr movies carrying one of the exclude tags.
    pub async fn protected_movies(
        &self,
    ) -> Result<Vec<ProtectedMovie>, LibraryError> {
        let settings = self.settings.current();
        let tag_ids = settings.exclusion_plan().sources.radarr_tag_ids;
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        protected_movies(&self.radarr(&settings)?, &tag_ids).await
    }

    /// Sonarr series carrying one of the exclude tags.
    pub async fn protected_shows(
        &self,
    ) -> Result<Vec<ProtectedShow>, LibraryError> {
        let settings = self.settings.current();
        let tag_ids = settings.exclusion_plan().sources.sonarr_tag_ids;
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        protected_shows(&self.sonarr(&settings)?, &tag_ids).await
    }

    pub async fn exclusions(&self) -> moverguard_core::Result<Vec<String>> {
        self.builder.read_exclusions().await
    }

    pub async fn stats(&self) -> moverguard_core::Result<ExclusionStats> {
        self.builder.get_exclusion_stats(self.settings.as_ref()).await
    }

    /// Record an inbound webhook and arm the debounced rebuild. Returns
    /// false when webhooks are disabled.
    pub fn webhook_received(
        self: &Arc<Self>,
        service: Service,
        event: &str,
    ) -> bool {
        self.alerts.add(
            AlertLevel::Info,
            service.as_str(),
            format!("{} webhook received: {event}", service.title()),
        );

        let webhooks = self.settings.current().webhooks;
        if !webhooks.enabled {
            info!(
                service = service.as_str(),
                "webhooks disabled, ignoring trigger"
            );
            return false;
        }

        let cooldown = Duration::from_secs(webhooks.cooldown_seconds);
        self.alerts.add(
            AlertLevel::Info,
            "webhook",
            format!(
                "Webhook received from {}, rebuild scheduled in {}",
                service.as_str(),
                humantime::format_duration(cooldown)
            ),
        );

        let this = Arc::clone(self);
        let rebuild = move || async move {
            // Outcome is already logged and alerted.
            let _ = this.build(BuildTrigger::Webhook(service)).await;
        };
        let reset = self.webhooks.trigger(service, cooldown, rebuild);
        if reset {
            info!(service = service.as_str(), "webhook cooldown reset");
        }
        true
    }

    pub fn shutdown(&self) {
        self.webhooks.cancel_all();
    }
}
