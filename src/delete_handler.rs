use std::sync::Arc;

use dashmap::DashSet;

use crate::api::SearchApi;
use crate::data_models::DocumentId;
use crate::error::Result;
use crate::prompt::{Confirm, ROW_DELETE_PROMPT};
use crate::table::{Row, TableHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Server confirmed; the row is gone from the table.
    Deleted(Row),
    Declined,
    /// A delete for this id is still in flight.
    AlreadyPending,
    /// No row in this handler's table carries that id.
    NotInTable,
}

/// Per-row delete, bound to the one table it was attached to.
///
/// Several deletes may be in flight at once; each targets its own row and
/// completes independently.
pub struct RowDeleteHandler<A, P> {
    table: TableHandle,
    api: Arc<A>,
    prompt: Arc<P>,
    pending: DashSet<DocumentId>,
}

impl<A, P> RowDeleteHandler<A, P>
where
    A: SearchApi,
    P: Confirm,
{
    pub fn attach(table: TableHandle, api: Arc<A>, prompt: Arc<P>) -> Arc<Self> {
        Arc::new(Self {
            table,
            api,
            prompt,
            pending: DashSet::new(),
        })
    }

    /// Asks for confirmation and reserves `id` as in flight. Only the
    /// returned [`PendingDelete`] sends the request.
    pub async fn confirm_delete(self: &Arc<Self>, id: DocumentId) -> DeleteStart<A, P> {
        if !self.table.lock().await.contains(&id) {
            log::debug!("no row for {id} in this table");
            return DeleteStart::Finished(DeleteOutcome::NotInTable);
        }
        if self.pending.contains(&id) {
            return DeleteStart::Finished(DeleteOutcome::AlreadyPending);
        }
        if !self.prompt.confirm(ROW_DELETE_PROMPT).await {
            log::debug!("delete of {id} declined");
            return DeleteStart::Finished(DeleteOutcome::Declined);
        }
        if !self.pending.insert(id.clone()) {
            return DeleteStart::Finished(DeleteOutcome::AlreadyPending);
        }
        DeleteStart::Confirmed(PendingDelete {
            handler: Arc::clone(self),
            id,
        })
    }

    pub async fn on_delete(self: &Arc<Self>, id: &DocumentId) -> Result<DeleteOutcome> {
        match self.confirm_delete(id.clone()).await {
            DeleteStart::Confirmed(pending) => pending.send().await,
            DeleteStart::Finished(outcome) => Ok(outcome),
        }
    }

    async fn remove_confirmed(&self, id: &DocumentId) -> Result<DeleteOutcome> {
        if let Err(e) = self.api.remove(id).await {
            log::error!("error deleting {id}, row kept: {e}");
            return Err(e);
        }

        match self.table.lock().await.remove_by_id(id) {
            Some(row) => {
                log::info!("deleted {id}");
                Ok(DeleteOutcome::Deleted(row))
            }
            None => Ok(DeleteOutcome::NotInTable),
        }
    }
}

pub enum DeleteStart<A, P> {
    /// The user said yes; nothing has been sent yet.
    Confirmed(PendingDelete<A, P>),
    Finished(DeleteOutcome),
}

/// A confirmed delete that owns its handler, so the request can run on its
/// own task. The id stays in flight until this is dropped.
pub struct PendingDelete<A, P> {
    handler: Arc<RowDeleteHandler<A, P>>,
    id: DocumentId,
}

impl<A, P> PendingDelete<A, P>
where
    A: SearchApi,
    P: Confirm,
{
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub async fn send(self) -> Result<DeleteOutcome> {
        self.handler.remove_confirmed(&self.id).await
    }
}

impl<A, P> Drop for PendingDelete<A, P> {
    fn drop(&mut self) {
        self.handler.pending.remove(&self.id);
    }
}
