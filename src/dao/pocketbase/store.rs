use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use reqwest::{Client, Method, StatusCode};

use crate::dao::{
    models::{MatchRecord, MatchSaveRequest},
    storage::{MatchStore, StorageResult},
};

use super::{
    config::PocketBaseConfig,
    error::{PocketBaseDaoError, PocketBaseResult},
    realtime,
};

/// Match store backed by a PocketBase instance over its REST API.
#[derive(Clone)]
pub struct PocketBaseStore {
    pub(super) client: Client,
    pub(super) base_url: Arc<str>,
    pub(super) collection: Arc<str>,
    pub(super) auth_token: Option<Arc<str>>,
}

impl PocketBaseStore {
    /// Establish a connection to PocketBase and verify it responds.
    pub async fn connect(config: PocketBaseConfig) -> PocketBaseResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| PocketBaseDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            collection: Arc::from(config.collection),
            auth_token: config.auth_token.map(Arc::from),
        };

        store.ping().await?;
        Ok(store)
    }

    pub(super) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        if let Some(ref token) = self.auth_token {
            builder.header("Authorization", token.as_ref())
        } else {
            builder
        }
    }

    fn record_path(&self, id: &str) -> String {
        format!("api/collections/{}/records/{}", self.collection, id)
    }

    async fn ping(&self) -> PocketBaseResult<()> {
        const HEALTH: &str = "api/health";
        let response = self
            .request(Method::GET, HEALTH)
            .send()
            .await
            .map_err(|source| PocketBaseDaoError::RequestSend {
                path: HEALTH.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PocketBaseDaoError::RequestStatus {
                path: HEALTH.to_string(),
                status: response.status(),
            })
        }
    }

    async fn get_record(&self, id: &str) -> PocketBaseResult<Option<MatchRecord>> {
        let path = self.record_path(id);
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|source| PocketBaseDaoError::RequestSend {
                path: path.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<MatchRecord>()
                .await
                .map(Some)
                .map_err(|source| PocketBaseDaoError::DecodeResponse { path, source }),
            other => Err(PocketBaseDaoError::RequestStatus {
                path,
                status: other,
            }),
        }
    }

    async fn patch_record(&self, id: &str, update: &MatchSaveRequest) -> PocketBaseResult<()> {
        let path = self.record_path(id);
        let response = self
            .request(Method::PATCH, &path)
            .json(update)
            .send()
            .await
            .map_err(|source| PocketBaseDaoError::RequestSend {
                path: path.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PocketBaseDaoError::RequestStatus {
                path,
                status: response.status(),
            })
        }
    }
}

impl MatchStore for PocketBaseStore {
    fn find_match(&self, id: String) -> BoxFuture<'static, StorageResult<Option<MatchRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.get_record(&id).await.map_err(Into::into) })
    }

    fn save_match(
        &self,
        id: String,
        update: MatchSaveRequest,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.patch_record(&id, &update).await.map_err(Into::into) })
    }

    fn changes(&self) -> BoxFuture<'static, StorageResult<BoxStream<'static, MatchRecord>>> {
        let store = self.clone();
        Box::pin(async move { realtime::subscribe(store).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
