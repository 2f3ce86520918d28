//! Cron-driven full operations.
//!
//! The task owns a `watch` receiver for the scheduler settings; saving new
//! settings pushes a fresh value and the task recomputes its next fire time
//! without restarting.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use moverguard_config::SchedulerSettings;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Next fire time strictly after `after`, or `None` when disabled or the
/// expression does not parse.
pub fn next_fire(
    settings: &SchedulerSettings,
    after: DateTime<Local>,
) -> Option<DateTime<Local>> {
    if !settings.enabled {
        return None;
    }
    match settings.schedule() {
        Ok(schedule) => schedule.after(&after).next(),
        Err(reason) => {
            warn!(
                expression = %settings.cron_expression,
                %reason,
                "scheduler disabled: cron expression does not parse"
            );
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    settings: watch::Sender<SchedulerSettings>,
    next_run: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl SchedulerHandle {
    pub fn reload(&self, settings: SchedulerSettings) {
        self.settings.send_replace(settings);
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings.borrow().clone()
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        *self.next_run.read()
    }
}

/// Spawn the scheduler loop. `job` runs once per fire time; a slow job
/// delays the following fire rather than overlapping it.
pub fn spawn<F, Fut>(
    initial: SchedulerSettings,
    job: F,
) -> (SchedulerHandle, JoinHandle<()>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, mut rx) = watch::channel(initial);
    let next_run = Arc::new(RwLock::new(None));
    let handle = SchedulerHandle {
        settings: tx,
        next_run: Arc::clone(&next_run),
    };

    let task = tokio::spawn(async move {
        let mut last_fire: Option<DateTime<Local>> = None;
        loop {
            let settings = rx.borrow_and_update().clone();
            let now = Local::now();
            let from = last_fire.map_or(now, |fired| fired.max(now));
            let next = next_fire(&settings, from);
            *next_run.write() = next.map(|at| at.with_timezone(&Utc));

            let Some(at) = next else {
                info!(enabled = settings.enabled, "scheduler idle");
                if rx.changed().await.is_err() {
                    break;
                }
                continue;
            };

            info!(
                next_run = %at.format("%Y-%m-%d %H:%M:%S"),
                cron = %settings.cron_expression,
                "scheduler armed"
            );
            let wait = (at - Local::now()).to_std().unwrap_or_default();
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    last_fire = None;
                }
                _ = tokio::time::sleep(wait) => {
                    last_fire = Some(at);
                    info!("scheduled run started");
                    job().await;
                }
            }
        }
    });

    (handle, task)
}
