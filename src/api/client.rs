use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::data_models::DocumentId;
use crate::error::{ControllerError, Result};

use super::SearchApi;
use super::endpoints;
use super::models::{ApiResponse, BulkDeletePayload, FileListPayload, RemoveRequest, SearchPayload};

/// `SearchApi` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSearchApi {
    client: Client,
    base: Url,
}

impl HttpSearchApi {
    pub fn new(api_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), api_url)
    }

    pub fn with_client(client: Client, api_url: &str) -> Result<Self> {
        // Endpoints are joined relative to the base, so it must end in '/'.
        let normalized = if api_url.ends_with('/') {
            api_url.to_string()
        } else {
            format!("{api_url}/")
        };
        let base = Url::parse(&normalized).map_err(|e| ControllerError::InvalidBaseUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ControllerError::InvalidBaseUrl {
                url: api_url.to_string(),
                reason: "not a base url".to_string(),
            });
        }
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &'static str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| ControllerError::InvalidBaseUrl {
                url: self.base.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_json<T>(
        &self,
        path: &'static str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        log::debug!("GET {url} {params:?}");
        let res = self.client.get(url).query(params).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Ok(ApiResponse::Failed(status));
        }

        let body = res.bytes().await?;
        let payload = serde_json::from_slice(&body).map_err(|source| ControllerError::Decode {
            endpoint: path,
            source,
        })?;
        Ok(ApiResponse::Success(payload))
    }
}

impl SearchApi for HttpSearchApi {
    async fn search(&self, query: &str) -> Result<ApiResponse<SearchPayload>> {
        self.get_json(endpoints::SEARCH, &[("query", query)]).await
    }

    async fn search_delete(&self, query: &str) -> Result<ApiResponse<BulkDeletePayload>> {
        self.get_json(endpoints::SEARCH_DELETE, &[("query", query)])
            .await
    }

    async fn remove(&self, file_id: &DocumentId) -> Result<()> {
        let url = self.endpoint(endpoints::REMOVE)?;
        log::debug!("POST {url} file_id={file_id}");
        let res = self
            .client
            .post(url)
            .json(&RemoveRequest { file_id })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(ControllerError::Status {
                endpoint: endpoints::REMOVE,
                status,
            });
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<ApiResponse<FileListPayload>> {
        self.get_json(endpoints::LIST_ALL, &[]).await
    }
}

#[test]
fn test_endpoints_join_under_base_path() {
    let api = HttpSearchApi::new("http://localhost:8080").unwrap();
    assert_eq!(
        api.endpoint(endpoints::SEARCH).unwrap().as_str(),
        "http://localhost:8080/api/search"
    );

    let prefixed = HttpSearchApi::new("http://example.com/drive").unwrap();
    assert_eq!(
        prefixed.endpoint(endpoints::REMOVE).unwrap().as_str(),
        "http://example.com/drive/api/remove"
    );
}

#[test]
fn test_rejects_unusable_base_url() {
    assert!(matches!(
        HttpSearchApi::new("not a url"),
        Err(ControllerError::InvalidBaseUrl { .. })
    ));
    assert!(matches!(
        HttpSearchApi::new("mailto:someone@example.com"),
        Err(ControllerError::InvalidBaseUrl { .. })
    ));
}
