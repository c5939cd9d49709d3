use std::future::Future;
use std::sync::Arc;

use reqwest::StatusCode;

use crate::api::SearchApi;
use crate::binder::{self, Binding, NOT_FOUND_MESSAGE};
use crate::data_models::{DocumentId, Query};
use crate::delete_handler::{DeleteOutcome, DeleteStart, RowDeleteHandler};
use crate::dispatcher::{Controls, DispatchOutcome, QueryDispatcher, QueryResponse};
use crate::error::Result;
use crate::prompt::Confirm;
use crate::table::TableHandle;

/// What the results container currently holds.
pub enum ResultsView<A, P> {
    Empty,
    Table {
        table: TableHandle,
        /// Only search results get one.
        deletes: Option<Arc<RowDeleteHandler<A, P>>>,
    },
    NotFound(&'static str),
}

impl<A, P> ResultsView<A, P> {
    pub fn table(&self) -> Option<&TableHandle> {
        match self {
            ResultsView::Table { table, .. } => Some(table),
            ResultsView::Empty | ResultsView::NotFound(_) => None,
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            ResultsView::NotFound(message) => Some(*message),
            ResultsView::Empty | ResultsView::Table { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Declined,
    Bound { rows: usize },
    NotFound,
    /// Server answered with a non-success status; the view is unchanged.
    Skipped(StatusCode),
}

/// Owns the results view and routes queries and row deletes.
pub struct ResultListController<A, P> {
    api: Arc<A>,
    prompt: Arc<P>,
    page_length: usize,
    controls: Controls,
    view: ResultsView<A, P>,
}

impl<A, P> ResultListController<A, P>
where
    A: SearchApi + 'static,
    P: Confirm + 'static,
{
    pub fn new(api: A, prompt: P, page_length: usize) -> Self {
        Self::with_shared(Arc::new(api), Arc::new(prompt), page_length)
    }

    pub fn with_shared(api: Arc<A>, prompt: Arc<P>, page_length: usize) -> Self {
        Self {
            api,
            prompt,
            page_length: page_length.max(1),
            controls: Controls::initial(),
            view: ResultsView::Empty,
        }
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn view(&self) -> &ResultsView<A, P> {
        &self.view
    }

    pub fn table(&self) -> Option<TableHandle> {
        self.view.table().cloned()
    }

    /// Dispatches `query` and, if the server answered, replaces the view.
    ///
    /// Transport and decode errors are logged and returned; the view is not
    /// touched and controls keep whatever state the dispatch left them in.
    pub async fn run_query(&mut self, query: &Query) -> Result<QueryOutcome> {
        let dispatcher = QueryDispatcher::new(&*self.api, &*self.prompt);
        let response = match dispatcher.dispatch(query, &mut self.controls).await? {
            DispatchOutcome::Declined => return Ok(QueryOutcome::Declined),
            DispatchOutcome::Sent(response) => response,
        };

        let (binding, deletable) = match response {
            QueryResponse::Search(r) => (binder::bind_search(r, self.page_length), true),
            QueryResponse::BulkDelete(r) => (binder::bind_bulk_delete(r, self.page_length), false),
        };
        Ok(self.show(binding, deletable))
    }

    /// Read-only listing of every file; rows carry no delete affordance.
    pub async fn list_all(&mut self) -> Result<QueryOutcome> {
        let response = self.api.list_all().await.inspect_err(|e| {
            log::error!("listing files failed: {e}");
        })?;
        Ok(self.show(binder::bind_listing(response, self.page_length), false))
    }

    /// Back to the initial state. Deletes still in flight finish against the
    /// detached table.
    pub fn reset(&mut self) {
        self.view = ResultsView::Empty;
        self.controls = Controls::initial();
    }

    /// Starts a delete for the row tagged `id` in the table shown right now.
    ///
    /// The returned future owns the handler of that table, so it can outlive
    /// a later `run_query` or `reset`.
    pub fn delete_row(
        &self,
        id: DocumentId,
    ) -> impl Future<Output = Result<DeleteOutcome>> + Send + use<A, P> {
        let handler = self.delete_handler();
        async move {
            match handler {
                Some(handler) => handler.on_delete(&id).await,
                None => Ok(DeleteOutcome::NotInTable),
            }
        }
    }

    /// First half of [`Self::delete_row`]: asks the user while the caller
    /// waits. A confirmed delete comes back unsent, ready to be spawned.
    pub async fn confirm_delete(&self, id: DocumentId) -> DeleteStart<A, P> {
        match self.delete_handler() {
            Some(handler) => handler.confirm_delete(id).await,
            None => DeleteStart::Finished(DeleteOutcome::NotInTable),
        }
    }

    fn delete_handler(&self) -> Option<Arc<RowDeleteHandler<A, P>>> {
        match &self.view {
            ResultsView::Table {
                deletes: Some(handler),
                ..
            } => Some(Arc::clone(handler)),
            _ => None,
        }
    }

    fn show(&mut self, binding: Binding, deletable: bool) -> QueryOutcome {
        match binding {
            Binding::Table(table) => {
                let rows = table.len();
                let table = table.into_handle();
                let deletes = deletable.then(|| {
                    RowDeleteHandler::attach(
                        Arc::clone(&table),
                        Arc::clone(&self.api),
                        Arc::clone(&self.prompt),
                    )
                });
                self.view = ResultsView::Table { table, deletes };
                QueryOutcome::Bound { rows }
            }
            Binding::NotFound => {
                self.view = ResultsView::NotFound(NOT_FOUND_MESSAGE);
                QueryOutcome::NotFound
            }
            Binding::Skipped(status) => QueryOutcome::Skipped(status),
        }
    }
}
