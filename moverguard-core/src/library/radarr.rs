use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{
    ApplyTags, ArrClient, ArrConnection, LibraryError, Movie, MovieLibrary,
    SystemStatus, Tag, TagDetail,
};

pub const SERVICE: &str = "radarr";

#[derive(Debug, Clone)]
pub struct RadarrClient {
    inner: ArrClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MovieEditorRequest<'a> {
    movie_ids: &'a [i32],
    tags: &'a [i32],
    apply_tags: ApplyTags,
}

impl RadarrClient {
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
impl MovieLibrary for RadarrClient {
    async fn movies(&self) -> Result<Vec<Movie>, LibraryError> {
        self.inner.get_json("movie", &[]).await
    }

    async fn movie_ids_for_tag(
        &self,
        tag_id: i32,
    ) -> Result<Vec<i32>, LibraryError> {
        let detail: TagDetail = self
            .inner
            .get_json(&format!("tag/detail/{tag_id}"), &[])
            .await?;
        Ok(detail.movie_ids)
    }

    async fn edit_movie_tags(
        &self,
        movie_ids: Vec<i32>,
        tag_ids: Vec<i32>,
        apply: ApplyTags,
    ) -> Result<(), LibraryError> {
        let body = MovieEditorRequest {
            movie_ids: &movie_ids,
            tags: &tag_ids,
            apply_tags: apply,
        };
        self.inner.put_json("movie/editor", &body).await
    }
}
