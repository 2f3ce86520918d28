pub mod alert_log;
pub mod debounce;
pub mod exclusions;
pub mod log_tail;
pub mod notifier;
pub mod scheduler;

pub use alert_log::{Alert, AlertLevel, AlertLog};
pub use exclusions::{BuildTrigger, ExclusionService, Service};
pub use notifier::DiscordNotifier;
pub use scheduler::SchedulerHandle;
