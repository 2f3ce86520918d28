use std::time::Duration;

use async_trait::async_trait;

use super::{
    ArrClient, ArrConnection, EpisodeFile, LibraryError, Series,
    SeriesLibrary, SystemStatus, Tag,
};

pub const SERVICE: &str = "sonarr";

#[derive(Debug, Clone)]
pub struct SonarrClient {
    inner: ArrClient,
}

impl SonarrClient {
    pub fn new(
        connection: &ArrConnection,
        timeout: Duration,
    ) -> Result<Self, LibraryError> {
        Ok(Self {
            inner: ArrClient::new(SERVICE, connection, timeout)?,
        })
    }

    pub fn with_client(
        connection: &ArrConnection,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Result<Self, LibraryError> {
        Ok(Self {
            inner: ArrClient::with_client(SERVICE, connection, http, timeout)?,
        })
    }

    pub async fn system_status(&self) -> Result<SystemStatus, LibraryError> {
        self.inner.system_status().await
    }

    pub async fn tags(&self) -> Result<Vec<Tag>, LibraryError> {
        self.inner.tags().await
    }
}

#[async_trait]
impl SeriesLibrary for SonarrClient {
    async fn series(&self) -> Result<Vec<Series>, LibraryError> {
        self.inner.get_json("series", &[]).await
    }

    async fn episode_files(
        &self,
        series_id: i32,
    ) -> Result<Vec<EpisodeFile>, LibraryError> {
        self.inner
            .get_json("episodefile", &[("seriesId", series_id.to_string())])
            .await
    }
}
