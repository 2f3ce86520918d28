use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use moverguard_config::{
    Config, SettingsError, SettingsSource, SettingsStore, UserSettings,
};
use moverguard_core::ExclusionBuilder;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::services::scheduler::{self, SchedulerHandle};
use crate::services::{AlertLevel, AlertLog, BuildTrigger, ExclusionService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub settings: Arc<SettingsStore>,
    pub alerts: Arc<AlertLog>,
    pub exclusions: Arc<ExclusionService>,
    pub scheduler: SchedulerHandle,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Load persisted state and start the scheduler. Must be called from
    /// inside a tokio runtime.
    pub fn bootstrap(
        config: Arc<Config>,
    ) -> anyhow::Result<(Self, JoinHandle<()>)> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        let settings =
            Arc::new(SettingsStore::load(&config.paths.settings_file));
        let alerts = Arc::new(AlertLog::load(&config.paths.alert_log_file));
        match settings.source() {
            SettingsSource::Primary => {}
            SettingsSource::Backup => {
                alerts.add(
                    AlertLevel::Warning,
                    "settings",
                    "Settings file was unreadable; restored from backup",
                );
            }
            SettingsSource::Defaults if settings.path().exists() => {
                alerts.add(
                    AlertLevel::Error,
                    "settings",
                    "Settings file and backup were unreadable; using defaults",
                );
            }
            SettingsSource::Defaults => {
                info!("starting with default settings");
            }
        }

        let exclusions = Arc::new(ExclusionService::new(
            Arc::clone(&settings),
            ExclusionBuilder::new(&config.paths.exclusions_file),
            Arc::clone(&alerts),
            http,
            config.http.upstream_timeout,
        ));

        let job_service = Arc::clone(&exclusions);
        let (scheduler, scheduler_task) =
            scheduler::spawn(settings.current().scheduler, move || {
                let service = Arc::clone(&job_service);
                async move {
                    if let Err(err) =
                        service.run_full(BuildTrigger::Scheduler).await
                    {
                        warn!(error = %err, "scheduled run failed");
                    }
                }
            });

        Ok((
            Self {
                config,
                settings,
                alerts,
                exclusions,
                scheduler,
            },
            scheduler_task,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Persist an edited settings document and apply it to running
    /// components. Masked API keys keep their stored values.
    pub fn save_settings(
        &self,
        edited: UserSettings,
    ) -> Result<UserSettings, SettingsError> {
        let saved = self
            .settings
            .update(|current| *current = edited.merged_onto(current))?;
        self.scheduler.reload(saved.scheduler.clone());
        info!(
            scheduler_enabled = saved.scheduler.enabled,
            webhooks_enabled = saved.webhooks.enabled,
            "settings saved"
        );
        Ok(saved)
    }

    pub fn shutdown(&self) {
        self.exclusions.shutdown();
    }
}
