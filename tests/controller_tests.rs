use anyhow::Result;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use drivesearch::api::models::ApiResponse;
use drivesearch::api::{HttpSearchApi, SearchApi};
use drivesearch::binder::NOT_FOUND_MESSAGE;
use drivesearch::console::{Command, Shell};
use drivesearch::controller::{QueryOutcome, ResultListController, ResultsView};
use drivesearch::data_models::{DocumentId, Query};
use drivesearch::delete_handler::DeleteOutcome;
use drivesearch::dispatcher::Controls;
use drivesearch::error::ControllerError;
use drivesearch::prompt::{BULK_DELETE_PROMPT, ROW_DELETE_PROMPT, TerminalPrompt, line_source};
use drivesearch::table::{FileCell, Row};

mod test_helpers {
    use super::*;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::extract::{Query as QueryParams, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde::Deserialize;
    use serde_json::{Value, json};
    use tokio::sync::oneshot;
    use tower::ServiceBuilder;
    use tower_http::trace::TraceLayer;

    use drivesearch::prompt::Confirm;

    #[derive(Debug, Clone)]
    pub struct StubDoc {
        pub id: String,
        pub name: String,
        pub text: String,
    }

    pub fn doc(id: &str, name: &str, text: &str) -> StubDoc {
        StubDoc {
            id: id.to_string(),
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    pub fn link_for(id: &str) -> String {
        format!("http://x/{id}")
    }

    /// In-process stand-in for the index server. Records every request it sees.
    #[derive(Default)]
    pub struct StubIndex {
        docs: Mutex<Vec<StubDoc>>,
        requests: Mutex<Vec<String>>,
        failing_removes: Mutex<HashSet<String>>,
        held_removes: Mutex<HashMap<String, oneshot::Receiver<()>>>,
        forced_status: Mutex<Option<StatusCode>>,
        garbage: AtomicBool,
    }

    impl StubIndex {
        pub fn new(docs: Vec<StubDoc>) -> Arc<Self> {
            Arc::new(Self {
                docs: Mutex::new(docs),
                ..Default::default()
            })
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn doc_ids(&self) -> Vec<String> {
            self.docs
                .lock()
                .unwrap()
                .iter()
                .map(|d| d.id.clone())
                .collect()
        }

        pub fn fail_remove(&self, id: &str) {
            self.failing_removes.lock().unwrap().insert(id.to_string());
        }

        /// Keeps the remove request for `id` pending until the sender fires
        /// (or is dropped).
        pub fn hold_remove(&self, id: &str) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.held_removes.lock().unwrap().insert(id.to_string(), rx);
            tx
        }

        /// Every GET answers with this status and an empty body.
        pub fn force_status(&self, status: StatusCode) {
            *self.forced_status.lock().unwrap() = Some(status);
        }

        /// Every GET answers 200 with a body that is not JSON.
        pub fn send_garbage(&self) {
            self.garbage.store(true, Ordering::SeqCst);
        }

        pub async fn wait_for_request(&self, expected: &str) {
            tokio::time::timeout(Duration::from_secs(5), async {
                while !self.requests().iter().any(|r| r == expected) {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .unwrap_or_else(|_| panic!("stub never saw {expected:?}"));
        }

        fn record(&self, line: String) {
            self.requests.lock().unwrap().push(line);
        }

        fn matching(&self, query: &str) -> Vec<StubDoc> {
            let terms: Vec<String> = query
                .split_whitespace()
                .map(|t| t.to_lowercase())
                .collect();
            if terms.is_empty() {
                return Vec::new();
            }
            self.docs
                .lock()
                .unwrap()
                .iter()
                .filter(|d| {
                    let text = d.text.to_lowercase();
                    terms.iter().all(|t| text.contains(t.as_str()))
                })
                .cloned()
                .collect()
        }

        fn canned_failure(&self) -> Option<Response> {
            if let Some(status) = *self.forced_status.lock().unwrap() {
                return Some(status.into_response());
            }
            if self.garbage.load(Ordering::SeqCst) {
                return Some((StatusCode::OK, "<html>oops</html>").into_response());
            }
            None
        }
    }

    async fn search(
        State(stub): State<Arc<StubIndex>>,
        QueryParams(params): QueryParams<HashMap<String, String>>,
    ) -> Response {
        let query = params.get("query").cloned();
        stub.record(format!(
            "GET /api/search?query={}",
            query.as_deref().unwrap_or_default()
        ));
        if let Some(failure) = stub.canned_failure() {
            return failure;
        }
        let Some(query) = query else {
            return Json(json!({ "search": false })).into_response();
        };
        let hits = stub.matching(&query);
        let docs: Value = if hits.is_empty() {
            Value::Null
        } else {
            hits.iter()
                .map(|d| json!([d.name, { "id": d.id, "link": link_for(&d.id) }]))
                .collect()
        };
        Json(json!({ "search": true, "query": query, "docs": docs })).into_response()
    }

    async fn search_delete(
        State(stub): State<Arc<StubIndex>>,
        QueryParams(params): QueryParams<HashMap<String, String>>,
    ) -> Response {
        let query = params.get("query").cloned().unwrap_or_default();
        stub.record(format!("GET /api/search_delete?query={query}"));
        if let Some(failure) = stub.canned_failure() {
            return failure;
        }
        let hits = stub.matching(&query);
        let gone: HashSet<&str> = hits.iter().map(|d| d.id.as_str()).collect();
        stub.docs
            .lock()
            .unwrap()
            .retain(|d| !gone.contains(d.id.as_str()));
        let docs: Value = if hits.is_empty() {
            Value::Null
        } else {
            hits.iter().map(|d| json!([d.name])).collect()
        };
        Json(json!({ "query": query, "docs": docs })).into_response()
    }

    #[derive(Deserialize)]
    struct RemoveBody {
        file_id: String,
    }

    async fn remove(State(stub): State<Arc<StubIndex>>, Json(body): Json<RemoveBody>) -> Response {
        stub.record(format!("POST /api/remove {}", body.file_id));
        let held = stub.held_removes.lock().unwrap().remove(&body.file_id);
        if let Some(release) = held {
            let _ = release.await;
        }
        if stub.failing_removes.lock().unwrap().contains(&body.file_id) {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        let mut docs = stub.docs.lock().unwrap();
        match docs.iter().position(|d| d.id == body.file_id) {
            Some(idx) => {
                docs.remove(idx);
                Json(json!({ "removed": body.file_id })).into_response()
            }
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn list_all(State(stub): State<Arc<StubIndex>>) -> Response {
        stub.record("GET /api/test".to_string());
        if let Some(failure) = stub.canned_failure() {
            return failure;
        }
        let files: Vec<Value> = stub
            .docs
            .lock()
            .unwrap()
            .iter()
            .map(|d| {
                json!({
                    "id": d.id,
                    "name": d.name,
                    "mimeType": "application/pdf",
                    "webViewLink": link_for(&d.id),
                })
            })
            .collect();
        Json(json!({ "files": files })).into_response()
    }

    pub async fn spawn_stub(stub: Arc<StubIndex>) -> Result<SocketAddr> {
        let app = Router::new()
            .route("/api/search", get(search))
            .route("/api/search_delete", get(search_delete))
            .route("/api/remove", post(remove))
            .route("/api/test", get(list_all))
            .with_state(stub)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Ok(addr)
    }

    /// An address nothing listens on.
    pub async fn dead_addr() -> Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);
        Ok(addr)
    }

    /// Replays scripted answers and remembers every question.
    #[derive(Default)]
    pub struct ScriptedPrompt {
        answers: Mutex<VecDeque<bool>>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompt {
        pub fn answering(answers: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                asked: Mutex::new(Vec::new()),
            })
        }

        pub fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    impl Confirm for ScriptedPrompt {
        async fn confirm(&self, message: &str) -> bool {
            self.asked.lock().unwrap().push(message.to_string());
            self.answers.lock().unwrap().pop_front().unwrap_or(false)
        }
    }

    pub async fn api_for(stub: &Arc<StubIndex>) -> Result<HttpSearchApi> {
        let addr = spawn_stub(Arc::clone(stub)).await?;
        Ok(HttpSearchApi::new(&format!("http://{addr}/"))?)
    }

    pub type TestController = ResultListController<HttpSearchApi, ScriptedPrompt>;

    pub async fn controller_for(
        stub: &Arc<StubIndex>,
        prompt: &Arc<ScriptedPrompt>,
        page_length: usize,
    ) -> Result<TestController> {
        let api = api_for(stub).await?;
        Ok(ResultListController::with_shared(
            Arc::new(api),
            Arc::clone(prompt),
            page_length,
        ))
    }

    pub async fn table_rows(controller: &TestController) -> Vec<Row> {
        match controller.table() {
            Some(table) => table.lock().await.rows().to_vec(),
            None => Vec::new(),
        }
    }

    pub fn budget_docs() -> Vec<StubDoc> {
        vec![
            doc("a1", "Q1.pdf", "budget first quarter"),
            doc("a2", "Q2.pdf", "budget second quarter"),
            doc("n1", "notes.txt", "meeting notes"),
            doc("o1", "old-reports/jan.pdf", "old-reports january"),
        ]
    }
}

use test_helpers::*;

fn linked(rank: usize, name: &str, id: &str) -> Row {
    Row {
        rank,
        file: FileCell::Linked {
            name: name.to_string(),
            link: link_for(id),
        },
        delete_id: Some(DocumentId::new(id)),
    }
}

#[tokio::test]
async fn test_search_binds_one_row_per_document_in_server_order() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;

    assert_eq!(controller.controls(), Controls::initial());
    let outcome = controller.run_query(&Query::search("budget")).await?;

    assert_eq!(outcome, QueryOutcome::Bound { rows: 2 });
    assert_eq!(
        table_rows(&controller).await,
        vec![linked(1, "Q1.pdf", "a1"), linked(2, "Q2.pdf", "a2")]
    );
    assert_eq!(controller.controls(), Controls::engaged());
    // Plain searches never ask.
    assert!(prompt.asked().is_empty());
    assert_eq!(stub.requests(), vec!["GET /api/search?query=budget"]);
    Ok(())
}

#[tokio::test]
async fn test_confirmed_delete_removes_exactly_that_row() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[true]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;
    controller.run_query(&Query::search("budget")).await?;

    let outcome = controller.delete_row(DocumentId::new("a1")).await?;

    assert_eq!(outcome, DeleteOutcome::Deleted(linked(1, "Q1.pdf", "a1")));
    // Rank 2 keeps its number.
    assert_eq!(table_rows(&controller).await, vec![linked(2, "Q2.pdf", "a2")]);
    assert_eq!(prompt.asked(), vec![ROW_DELETE_PROMPT]);
    assert!(!stub.doc_ids().contains(&"a1".to_string()));
    assert_eq!(
        stub.requests().last().map(String::as_str),
        Some("POST /api/remove a1")
    );

    // The affordance is gone with its row.
    let again = controller.delete_row(DocumentId::new("a1")).await?;
    assert_eq!(again, DeleteOutcome::NotInTable);
    assert_eq!(prompt.asked().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_declined_delete_leaves_table_identical() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[false]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;
    controller.run_query(&Query::search("budget")).await?;
    let before = table_rows(&controller).await;

    let outcome = controller.delete_row(DocumentId::new("a2")).await?;

    assert_eq!(outcome, DeleteOutcome::Declined);
    assert_eq!(table_rows(&controller).await, before);
    assert!(!stub.requests().iter().any(|r| r.starts_with("POST")));
    Ok(())
}

#[tokio::test]
async fn test_null_docs_shows_not_found_instead_of_table() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;

    let outcome = controller.run_query(&Query::search("nonexistent")).await?;

    assert_eq!(outcome, QueryOutcome::NotFound);
    assert!(controller.table().is_none());
    assert_eq!(controller.view().message(), Some(NOT_FOUND_MESSAGE));
    Ok(())
}

#[tokio::test]
async fn test_empty_query_is_sent_as_is() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;

    let outcome = controller.run_query(&Query::search("")).await?;

    assert_eq!(outcome, QueryOutcome::NotFound);
    assert_eq!(stub.requests(), vec!["GET /api/search?query="]);
    Ok(())
}

#[tokio::test]
async fn test_declined_bulk_delete_sends_nothing() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[false]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;

    let outcome = controller.run_query(&Query::bulk_delete("old-reports")).await?;

    assert_eq!(outcome, QueryOutcome::Declined);
    assert_eq!(prompt.asked(), vec![BULK_DELETE_PROMPT]);
    assert!(stub.requests().is_empty());
    assert_eq!(controller.controls(), Controls::initial());
    assert!(matches!(controller.view(), ResultsView::Empty));
    assert_eq!(stub.doc_ids().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_confirmed_bulk_delete_lists_names_without_affordance() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[true]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;

    let outcome = controller.run_query(&Query::bulk_delete("old-reports")).await?;

    assert_eq!(outcome, QueryOutcome::Bound { rows: 1 });
    assert_eq!(
        table_rows(&controller).await,
        vec![Row {
            rank: 1,
            file: FileCell::Plain {
                name: "old-reports/jan.pdf".to_string()
            },
            delete_id: None,
        }]
    );
    assert_eq!(
        stub.requests(),
        vec!["GET /api/search_delete?query=old-reports"]
    );
    assert!(!stub.doc_ids().contains(&"o1".to_string()));

    // No handler is attached to bulk-delete results.
    let outcome = controller.delete_row(DocumentId::new("o1")).await?;
    assert_eq!(outcome, DeleteOutcome::NotInTable);
    assert_eq!(prompt.asked(), vec![BULK_DELETE_PROMPT]);
    Ok(())
}

#[tokio::test]
async fn test_confirmed_bulk_delete_without_matches_shows_not_found() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[true]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;

    let outcome = controller.run_query(&Query::bulk_delete("nothing-matches")).await?;

    assert_eq!(outcome, QueryOutcome::NotFound);
    assert!(controller.table().is_none());
    assert_eq!(controller.view().message(), Some(NOT_FOUND_MESSAGE));
    assert_eq!(controller.controls(), Controls::engaged());
    assert_eq!(
        stub.requests(),
        vec!["GET /api/search_delete?query=nothing-matches"]
    );
    assert_eq!(stub.doc_ids().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_failed_remove_keeps_the_row() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    stub.fail_remove("a2");
    let prompt = ScriptedPrompt::answering(&[true, true]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;
    controller.run_query(&Query::search("budget")).await?;

    let err = controller
        .delete_row(DocumentId::new("a2"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
    ));
    assert_eq!(table_rows(&controller).await.len(), 2);

    // Failure does not block further interaction.
    let outcome = controller.delete_row(DocumentId::new("a1")).await?;
    assert!(matches!(outcome, DeleteOutcome::Deleted(_)));
    assert_eq!(table_rows(&controller).await, vec![linked(2, "Q2.pdf", "a2")]);
    Ok(())
}

#[tokio::test]
async fn test_non_success_status_builds_nothing() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;
    controller.run_query(&Query::search("budget")).await?;

    stub.force_status(StatusCode::INTERNAL_SERVER_ERROR);
    let outcome = controller.run_query(&Query::search("notes")).await?;

    assert_eq!(
        outcome,
        QueryOutcome::Skipped(StatusCode::INTERNAL_SERVER_ERROR)
    );
    // The previous table is left as it was.
    assert_eq!(table_rows(&controller).await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_undecodable_payload_is_an_error() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    stub.send_garbage();
    let prompt = ScriptedPrompt::answering(&[]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;

    let err = controller
        .run_query(&Query::search("budget"))
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::Decode { .. }));
    assert!(controller.table().is_none());
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_leaves_view_untouched() -> Result<()> {
    let addr = dead_addr().await?;
    let api = HttpSearchApi::new(&format!("http://{addr}"))?;
    let prompt = ScriptedPrompt::answering(&[]);
    let mut controller = ResultListController::with_shared(Arc::new(api), prompt, 10);

    let err = controller
        .run_query(&Query::search("budget"))
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::Transport(_)));
    assert!(matches!(controller.view(), ResultsView::Empty));
    // Controls stay in their in-flight state.
    assert_eq!(controller.controls(), Controls::engaged());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_deletes_complete_independently() -> Result<()> {
    let stub = StubIndex::new(vec![
        doc("a1", "Q1.pdf", "budget"),
        doc("a2", "Q2.pdf", "budget"),
        doc("a3", "Q3.pdf", "budget"),
    ]);
    let release_a1 = stub.hold_remove("a1");
    let prompt = ScriptedPrompt::answering(&[true, true]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;
    controller.run_query(&Query::search("budget")).await?;

    let first = tokio::spawn(controller.delete_row(DocumentId::new("a1")));
    stub.wait_for_request("POST /api/remove a1").await;

    // a3 finishes while a1 is still pending.
    let third = controller.delete_row(DocumentId::new("a3")).await?;
    assert!(matches!(third, DeleteOutcome::Deleted(_)));
    assert_eq!(
        table_rows(&controller).await,
        vec![linked(1, "Q1.pdf", "a1"), linked(2, "Q2.pdf", "a2")]
    );

    release_a1.send(()).ok();
    let first = first.await??;
    assert!(matches!(first, DeleteOutcome::Deleted(_)));
    assert_eq!(table_rows(&controller).await, vec![linked(2, "Q2.pdf", "a2")]);
    Ok(())
}

#[tokio::test]
async fn test_second_activation_while_pending_is_ignored() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let release = stub.hold_remove("a1");
    let prompt = ScriptedPrompt::answering(&[true, true]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;
    controller.run_query(&Query::search("budget")).await?;

    let first = tokio::spawn(controller.delete_row(DocumentId::new("a1")));
    stub.wait_for_request("POST /api/remove a1").await;

    let second = controller.delete_row(DocumentId::new("a1")).await?;
    assert_eq!(second, DeleteOutcome::AlreadyPending);
    assert_eq!(prompt.asked().len(), 1);

    release.send(()).ok();
    assert!(matches!(first.await??, DeleteOutcome::Deleted(_)));
    let removes = stub
        .requests()
        .iter()
        .filter(|r| r.starts_with("POST"))
        .count();
    assert_eq!(removes, 1);
    Ok(())
}

#[tokio::test]
async fn test_late_delete_only_touches_the_discarded_table() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let release = stub.hold_remove("a1");
    let prompt = ScriptedPrompt::answering(&[true]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;
    controller.run_query(&Query::search("budget")).await?;
    let old_table = controller.table().unwrap();

    let pending = tokio::spawn(controller.delete_row(DocumentId::new("a1")));
    stub.wait_for_request("POST /api/remove a1").await;

    controller.run_query(&Query::search("quarter")).await?;
    let fresh = table_rows(&controller).await;
    assert_eq!(fresh.len(), 2);

    release.send(()).ok();
    assert!(matches!(pending.await??, DeleteOutcome::Deleted(_)));

    // The detached table took the removal; the live one did not.
    assert_eq!(old_table.lock().await.len(), 1);
    assert_eq!(table_rows(&controller).await, fresh);
    Ok(())
}

#[tokio::test]
async fn test_reset_returns_to_initial_state() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[true]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;
    controller.run_query(&Query::search("budget")).await?;

    controller.reset();

    assert!(matches!(controller.view(), ResultsView::Empty));
    assert_eq!(controller.controls(), Controls::initial());
    let outcome = controller.delete_row(DocumentId::new("a1")).await?;
    assert_eq!(outcome, DeleteOutcome::NotInTable);
    assert!(prompt.asked().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_new_query_replaces_table() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[]);
    let mut controller = controller_for(&stub, &prompt, 10).await?;

    controller.run_query(&Query::search("budget")).await?;
    controller.run_query(&Query::search("notes")).await?;

    assert_eq!(table_rows(&controller).await, vec![linked(1, "notes.txt", "n1")]);
    Ok(())
}

#[tokio::test]
async fn test_list_all_renders_read_only_table() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[true]);
    let mut controller = controller_for(&stub, &prompt, 3).await?;

    let outcome = controller.list_all().await?;

    assert_eq!(outcome, QueryOutcome::Bound { rows: 4 });
    let table = controller.table().unwrap();
    {
        let table = table.lock().await;
        assert_eq!(table.page_count(), 2);
        assert!(table.rows().iter().all(|r| r.delete_id.is_none()));
        assert_eq!(table.rows()[3].file.name(), "old-reports/jan.pdf");
    }
    let outcome = controller.delete_row(DocumentId::new("a1")).await?;
    assert_eq!(outcome, DeleteOutcome::NotInTable);
    assert!(prompt.asked().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_search_encodes_query_and_decodes_hits() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let api = api_for(&stub).await?;

    let response = api.search("budget second").await?;

    let ApiResponse::Success(payload) = response else {
        panic!("expected success");
    };
    assert_eq!(payload.query.as_deref(), Some("budget second"));
    let docs: Vec<_> = payload.into_result_set().unwrap().ranked().collect();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].1.id, DocumentId::new("a2"));
    assert_eq!(docs[0].1.link, link_for("a2"));
    assert_eq!(stub.requests(), vec!["GET /api/search?query=budget second"]);
    Ok(())
}

#[tokio::test]
async fn test_failed_status_is_reported_not_decoded() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    stub.force_status(StatusCode::BAD_GATEWAY);
    let api = api_for(&stub).await?;

    assert!(matches!(
        api.search("budget").await?,
        ApiResponse::Failed(s) if s == StatusCode::BAD_GATEWAY
    ));
    assert!(matches!(
        api.search_delete("budget").await?,
        ApiResponse::Failed(s) if s == StatusCode::BAD_GATEWAY
    ));
    assert!(matches!(
        api.list_all().await?,
        ApiResponse::Failed(s) if s == StatusCode::BAD_GATEWAY
    ));
    // Bulk delete did not run.
    assert_eq!(stub.doc_ids().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_remove_unknown_id_is_a_status_error() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let api = api_for(&stub).await?;

    let err = api.remove(&DocumentId::new("missing")).await.unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Status { status, .. } if status == StatusCode::NOT_FOUND
    ));
    Ok(())
}

#[tokio::test]
async fn test_remove_deletes_on_server() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let api = api_for(&stub).await?;

    api.remove(&DocumentId::new("n1")).await?;

    assert_eq!(stub.doc_ids(), vec!["a1", "a2", "o1"]);
    assert_eq!(stub.requests(), vec!["POST /api/remove n1"]);
    Ok(())
}

#[tokio::test]
async fn test_shell_takes_a_second_rm_while_the_first_is_held() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let release_a1 = stub.hold_remove("a1");
    let prompt = ScriptedPrompt::answering(&[true, true]);
    let controller = controller_for(&stub, &prompt, 10).await?;
    let mut shell = Shell::new(controller, line_source(&b""[..]));
    shell.execute(Command::Search(Query::search("budget"))).await;

    timeout(
        Duration::from_millis(500),
        shell.execute(Command::Remove(DocumentId::new("a1"))),
    )
    .await?;
    stub.wait_for_request("POST /api/remove a1").await;

    timeout(
        Duration::from_millis(500),
        shell.execute(Command::Remove(DocumentId::new("a2"))),
    )
    .await?;
    assert_eq!(shell.in_flight(), 2);
    assert_eq!(prompt.asked(), vec![ROW_DELETE_PROMPT, ROW_DELETE_PROMPT]);

    // a2 completes while a1 is still held by the server.
    let (id, result) = timeout(Duration::from_secs(5), shell.next_finished())
        .await?
        .unwrap();
    assert_eq!(id, DocumentId::new("a2"));
    assert!(matches!(result?, DeleteOutcome::Deleted(_)));
    assert_eq!(
        table_rows(shell.controller()).await,
        vec![linked(1, "Q1.pdf", "a1")]
    );
    assert_eq!(shell.in_flight(), 1);

    release_a1.send(()).ok();
    let (id, result) = timeout(Duration::from_secs(5), shell.next_finished())
        .await?
        .unwrap();
    assert_eq!(id, DocumentId::new("a1"));
    assert!(matches!(result?, DeleteOutcome::Deleted(_)));
    assert!(table_rows(shell.controller()).await.is_empty());
    assert_eq!(shell.in_flight(), 0);
    Ok(())
}

#[tokio::test]
async fn test_shell_declined_rm_sends_nothing() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let prompt = ScriptedPrompt::answering(&[false]);
    let controller = controller_for(&stub, &prompt, 10).await?;
    let mut shell = Shell::new(controller, line_source(&b""[..]));
    shell.execute(Command::Search(Query::search("budget"))).await;

    shell.execute(Command::Remove(DocumentId::new("a1"))).await;

    assert_eq!(shell.in_flight(), 0);
    assert_eq!(table_rows(shell.controller()).await.len(), 2);
    assert_eq!(stub.requests(), vec!["GET /api/search?query=budget"]);
    Ok(())
}

#[tokio::test]
async fn test_shell_confirmation_is_read_from_the_shell_input() -> Result<()> {
    let stub = StubIndex::new(budget_docs());
    let input = line_source(&b"y\nsearch notes\n"[..]);
    let prompt = TerminalPrompt::new(false, input.clone());
    let controller = ResultListController::new(api_for(&stub).await?, prompt, 10);
    let mut shell = Shell::new(controller, input.clone());
    shell.execute(Command::Search(Query::search("budget"))).await;

    shell.execute(Command::Remove(DocumentId::new("a2"))).await;
    let (id, result) = timeout(Duration::from_secs(5), shell.next_finished())
        .await?
        .unwrap();

    assert_eq!(id, DocumentId::new("a2"));
    assert!(matches!(result?, DeleteOutcome::Deleted(_)));
    assert_eq!(stub.doc_ids(), vec!["a1", "n1", "o1"]);
    // The answer took exactly one line; the command after it is untouched.
    let next = input.lock().await.next_line().await?;
    assert_eq!(next.as_deref(), Some("search notes"));
    Ok(())
}
