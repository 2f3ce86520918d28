#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use moverguard_config::{
    Config, ConfigMetadata, HttpConfig, PathsConfig, ServerConfig,
};
use moverguard_server::{AppState, create_app};
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub dir: TempDir,
    scheduler: JoinHandle<()>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.state.shutdown();
        self.scheduler.abort();
    }
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_allowed_origins: Vec::new(),
        },
        paths: PathsConfig::under(dir.path()),
        http: HttpConfig {
            upstream_timeout: Duration::from_secs(2),
        },
        metadata: ConfigMetadata::default(),
    }
}

/// Router and state backed by a fresh temporary config directory.
pub fn build_test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    config.ensure_directories().unwrap();

    let (state, scheduler) = AppState::bootstrap(Arc::new(config)).unwrap();
    let server = TestServer::new(create_app(state.clone())).unwrap();
    TestApp {
        server,
        state,
        dir,
        scheduler,
    }
}
