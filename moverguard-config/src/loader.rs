//! Process bootstrap configuration.
//!
//! Sources in order of precedence: environment variables (after loading
//! `.env`), an optional `moverguard.toml`, then built-in defaults. CLI
//! flags are applied on top by the server binary.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{parse_csv_var, parse_duration};
use crate::validation::ConfigWarnings;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("moverguard.toml"),
        PathBuf::from("config/moverguard.toml"),
        PathBuf::from("/config/moverguard.toml"),
    ]
});

pub const DEFAULT_PORT: u16 = 5858;
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);
const SLOW_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub http: HttpConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.paths.config_dir)?;
        if let Some(parent) = self.paths.log_file.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    pub exclusions_file: PathBuf,
    pub alert_log_file: PathBuf,
    pub log_file: PathBuf,
    /// Where the mover plugin drops its `Summary_*.txt` files.
    pub mover_log_dir: PathBuf,
}

impl PathsConfig {
    pub fn under(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            settings_file: config_dir.join("settings.json"),
            exclusions_file: config_dir.join("mover_exclusions.txt"),
            alert_log_file: config_dir.join("alert_log.json"),
            log_file: config_dir.join("logs").join("moverguard.log"),
            mover_log_dir: config_dir.join("ca-logs").join("ca.mover.tuning"),
            config_dir,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub upstream_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub paths: FilePathsConfig,
    #[serde(default)]
    pub http: FileHttpConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FilePathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusions_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mover_log_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileHttpConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_timeout_secs: Option<u64>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub config_dir: Option<PathBuf>,
    pub exclusions_file: Option<PathBuf>,
    pub mover_log_dir: Option<PathBuf>,
    pub upstream_timeout: Option<Duration>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        let var = |name: &str| {
            std::env::var(name).ok().filter(|value| !value.trim().is_empty())
        };

        Self {
            config_path: var("MOVERGUARD_CONFIG").map(PathBuf::from),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT").and_then(|s| s.parse().ok()),
            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
            config_dir: var("CONFIG_DIR").map(PathBuf::from),
            exclusions_file: var("EXCLUSIONS_FILE").map(PathBuf::from),
            mover_log_dir: var("MOVER_LOG_DIR").map(PathBuf::from),
            upstream_timeout: var("UPSTREAM_TIMEOUT")
                .and_then(|raw| parse_duration(&raw)),
        }
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("filesystem initialization failed")]
    Filesystem {
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, read the process environment, then compose.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose configuration from an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let load = compose_config(file_config, env, config_path);
        load.config
            .ensure_directories()
            .map_err(|source| ConfigLoadError::Filesystem { source })?;
        Ok(load)
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = if let Some(path) = &self.options.config_path {
            (Some(path.clone()), true)
        } else if let Some(path) = &env.config_path {
            (Some(path.clone()), true)
        } else {
            let found = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
            (found, false)
        };

        let Some(path) = path else {
            return Ok((None, None));
        };
        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;
        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> ConfigLoad {
    let mut warnings = ConfigWarnings::default();
    if config_path.is_none() {
        warnings.push_with_hint(
            "No moverguard.toml detected; using environment and defaults",
            "Set MOVERGUARD_CONFIG or pass --config to use a file",
        );
    }

    let FileConfig {
        server: file_server,
        paths: file_paths,
        http: file_http,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        cors_allowed_origins: env
            .cors_allowed_origins
            .or(file_server.cors_allowed_origins)
            .unwrap_or_default(),
    };

    let config_dir = env
        .config_dir
        .or(file_paths.config_dir)
        .unwrap_or_else(|| PathBuf::from("/config"));
    let mut paths = PathsConfig::under(config_dir);
    if let Some(file) = env.exclusions_file.or(file_paths.exclusions_file) {
        paths.exclusions_file = file;
    }
    if let Some(dir) = env.mover_log_dir.or(file_paths.mover_log_dir) {
        paths.mover_log_dir = dir;
    }
    if !paths.mover_log_dir.is_dir() {
        warnings.push_with_hint(
            format!(
                "Mover log directory {} not found; mover status is unavailable",
                paths.mover_log_dir.display()
            ),
            "Mount the CA Mover Tuning log directory or set MOVER_LOG_DIR",
        );
    }

    let mut upstream_timeout = env
        .upstream_timeout
        .or(file_http.upstream_timeout_secs.map(Duration::from_secs))
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT);
    if upstream_timeout.is_zero() {
        warnings.push("Upstream timeout of 0s ignored; using the default");
        upstream_timeout = DEFAULT_UPSTREAM_TIMEOUT;
    } else if upstream_timeout > SLOW_UPSTREAM_TIMEOUT {
        warnings.push_with_hint(
            format!(
                "Upstream timeout {} is long; a dead service will stall builds",
                humantime::format_duration(upstream_timeout)
            ),
            "A few seconds is usually enough for Radarr and Sonarr",
        );
    }

    ConfigLoad {
        config: Config {
            server,
            paths,
            http: HttpConfig { upstream_timeout },
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        },
        warnings,
    }
}
