use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::{LibraryError, SystemStatus, Tag};

/// Base URL and API key for one *arr instance.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ArrConnection {
    pub url: String,
    pub api_key: String,
}

impl ArrConnection {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Both URL and key are required before any request is attempted.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

impl std::fmt::Debug for ArrConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrConnection")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Shared `/api/v3` client used by the Radarr and Sonarr adapters.
#[derive(Debug, Clone)]
pub struct ArrClient {
    service: &'static str,
    http: Client,
    base: Url,
    api_key: String,
    timeout: Duration,
}

impl ArrClient {
    pub fn new(
        service: &'static str,
        connection: &ArrConnection,
        timeout: Duration,
    ) -> Result<Self, LibraryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| LibraryError::Network { service, source })?;
        Self::with_client(service, connection, http, timeout)
    }

    /// Reuse an existing connection pool. `timeout` applies per request.
    pub fn with_client(
        service: &'static str,
        connection: &ArrConnection,
        http: Client,
        timeout: Duration,
    ) -> Result<Self, LibraryError> {
        if !connection.is_configured() {
            return Err(LibraryError::NotConfigured { service });
        }

        let mut raw = connection.url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|err| LibraryError::InvalidUrl {
            service,
            message: err.to_string(),
        })?;

        Ok(Self {
            service,
            http,
            base,
            api_key: connection.api_key.trim().to_string(),
            timeout,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    fn endpoint(&self, path: &str) -> Result<Url, LibraryError> {
        self.base
            .join(&format!("api/v3/{}", path.trim_start_matches('/')))
            .map_err(|err| LibraryError::InvalidUrl {
                service: self.service,
                message: err.to_string(),
            })
    }

    fn check_status(
        &self,
        status: StatusCode,
        url: &Url,
    ) -> Result<(), LibraryError> {
        if status == StatusCode::UNAUTHORIZED {
            return Err(LibraryError::Unauthorized {
                service: self.service,
            });
        }
        if !status.is_success() {
            return Err(LibraryError::Status {
                service: self.service,
                status,
                url: url.path().to_string(),
            });
        }
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LibraryError> {
        let url = self.endpoint(path)?;
        debug!(service = self.service, path = url.path(), "GET");

        let response = self
            .http
            .get(url.clone())
            .header("X-Api-Key", &self.api_key)
            .timeout(self.timeout)
            .query(query)
            .send()
            .await
            .map_err(|source| self.network(source))?;

        self.check_status(response.status(), &url)?;
        response
            .json::<T>()
            .await
            .map_err(|source| LibraryError::Decode {
                service: self.service,
                source,
            })
    }

    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), LibraryError> {
        let url = self.endpoint(path)?;
        debug!(service = self.service, path = url.path(), "PUT");

        let response = self
            .http
            .put(url.clone())
            .header("X-Api-Key", &self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|source| self.network(source))?;

        self.check_status(response.status(), &url)
    }

    fn network(&self, source: reqwest::Error) -> LibraryError {
        LibraryError::Network {
            service: self.service,
            source,
        }
    }

    /// `GET /system/status`; used by the settings "test connection" button.
    pub async fn system_status(&self) -> Result<SystemStatus, LibraryError> {
        self.get_json("system/status", &[]).await
    }

    pub async fn tags(&self) -> Result<Vec<Tag>, LibraryError> {
        self.get_json("tag", &[]).await
    }
}
