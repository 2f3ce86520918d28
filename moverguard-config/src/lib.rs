//! Configuration for moverguard.
//!
//! Two layers live here. [`ConfigLoader`] resolves process bootstrap
//! configuration (bind address, file locations, upstream timeout) from the
//! environment, an optional TOML file and defaults. [`SettingsStore`] owns
//! the user-editable `settings.json` that drives every build.

pub mod loader;
pub mod settings;
pub mod store;
pub mod util;
pub mod validation;

pub use loader::{
    Config, ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
    ConfigMetadata, EnvConfig, HttpConfig, PathsConfig, ServerConfig,
};
pub use settings::{
    ExclusionSettings, MASKED_SECRET, PathSettings, SchedulerSettings,
    ServiceSettings, TagOperationSettings, UserSettings, WebhookSettings,
    parse_cron,
};
pub use store::{SettingsError, SettingsSource, SettingsStore};
pub use validation::{
    ConfigWarning, ConfigWarnings, SettingsValidationError, validate,
};
