use crate::api::SearchApi;
use crate::api::models::{ApiResponse, BulkDeletePayload, SearchPayload};
use crate::data_models::{Query, QueryMode};
use crate::error::Result;
use crate::prompt::{BULK_DELETE_PROMPT, Confirm};

/// Visibility of the search-side controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub search_visible: bool,
    pub bulk_toggle_visible: bool,
    pub reset_visible: bool,
}

impl Controls {
    pub fn initial() -> Controls {
        Controls {
            search_visible: true,
            bulk_toggle_visible: true,
            reset_visible: false,
        }
    }

    /// Once a query is sent only reset is offered.
    pub fn engaged() -> Controls {
        Controls {
            search_visible: false,
            bulk_toggle_visible: false,
            reset_visible: true,
        }
    }
}

impl Default for Controls {
    fn default() -> Self {
        Controls::initial()
    }
}

#[derive(Debug)]
pub enum QueryResponse {
    Search(ApiResponse<SearchPayload>),
    BulkDelete(ApiResponse<BulkDeletePayload>),
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// Bulk delete was not confirmed. Nothing was sent.
    Declined,
    Sent(QueryResponse),
}

/// Sends exactly one request per accepted query.
pub struct QueryDispatcher<'a, A, P> {
    api: &'a A,
    prompt: &'a P,
}

impl<'a, A, P> QueryDispatcher<'a, A, P>
where
    A: SearchApi,
    P: Confirm,
{
    pub fn new(api: &'a A, prompt: &'a P) -> Self {
        Self { api, prompt }
    }

    /// Controls flip to `engaged` only once the request is actually going out.
    /// On a transport failure they stay that way.
    pub async fn dispatch(&self, query: &Query, controls: &mut Controls) -> Result<DispatchOutcome> {
        match query.mode() {
            QueryMode::Search => {
                *controls = Controls::engaged();
                let response = self.api.search(&query.text).await.inspect_err(|e| {
                    log::error!("search {:?} failed: {e}", query.text);
                })?;
                Ok(DispatchOutcome::Sent(QueryResponse::Search(response)))
            }
            QueryMode::BulkDelete => {
                if !self.prompt.confirm(BULK_DELETE_PROMPT).await {
                    log::debug!("bulk delete of {:?} declined", query.text);
                    return Ok(DispatchOutcome::Declined);
                }
                *controls = Controls::engaged();
                let response = self
                    .api
                    .search_delete(&query.text)
                    .await
                    .inspect_err(|e| {
                        log::error!("bulk delete {:?} failed: {e}", query.text);
                    })?;
                Ok(DispatchOutcome::Sent(QueryResponse::BulkDelete(response)))
            }
        }
    }
}
