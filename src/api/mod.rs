use std::future::Future;

use crate::data_models::DocumentId;
use crate::error::Result;

pub mod client;
pub mod models;

pub use client::HttpSearchApi;
use models::{ApiResponse, BulkDeletePayload, FileListPayload, SearchPayload};

/// Endpoint paths, relative to the configured api url.
pub mod endpoints {
    pub const SEARCH: &str = "api/search";
    pub const SEARCH_DELETE: &str = "api/search_delete";
    pub const REMOVE: &str = "api/remove";
    pub const LIST_ALL: &str = "api/test";
}

/// The document index server, seen from the controller.
///
/// Each call is a single request: no retries, no timeout beyond what the
/// implementation's transport imposes.
pub trait SearchApi: Send + Sync {
    fn search(&self, query: &str) -> impl Future<Output = Result<ApiResponse<SearchPayload>>> + Send;

    /// Deletes every document matching `query` on the server, then lists
    /// the names of what was deleted.
    fn search_delete(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<ApiResponse<BulkDeletePayload>>> + Send;

    /// Deletes exactly one document. Any non-success status is an error.
    fn remove(&self, file_id: &DocumentId) -> impl Future<Output = Result<()>> + Send;

    fn list_all(&self) -> impl Future<Output = Result<ApiResponse<FileListPayload>>> + Send;
}
