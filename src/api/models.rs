use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::data_models::{DeletedFile, Document, DocumentId, ListedFile, ResultSet};

/// Outcome of a GET whose payload is only meaningful on a success status.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failed(StatusCode),
}

/// `GET /api/search` body: `{"search": true, "query": "..", "docs": [[name, {id, link}], ..] | null}`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPayload {
    #[serde(default)]
    pub search: bool,
    pub query: Option<String>,
    pub docs: Option<Vec<SearchHit>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit(pub String, pub HitRef);

#[derive(Debug, Clone, Deserialize)]
pub struct HitRef {
    pub id: DocumentId,
    pub link: String,
}

impl From<SearchHit> for Document {
    fn from(SearchHit(display_name, hit): SearchHit) -> Self {
        Document {
            display_name,
            link: hit.link,
            id: hit.id,
        }
    }
}

impl SearchPayload {
    /// `None` means the server found nothing for this query.
    pub fn into_result_set(self) -> Option<ResultSet<Document>> {
        self.docs
            .map(|docs| docs.into_iter().map(Document::from).collect::<Vec<_>>().into())
    }
}

/// `GET /api/search_delete` body: `{"docs": [[name], ..] | null}`
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeletePayload {
    pub query: Option<String>,
    pub docs: Option<Vec<(String,)>>,
}

impl BulkDeletePayload {
    pub fn into_result_set(self) -> Option<ResultSet<DeletedFile>> {
        self.docs.map(|docs| {
            docs.into_iter()
                .map(|(name,)| DeletedFile { name })
                .collect::<Vec<_>>()
                .into()
        })
    }
}

/// `POST /api/remove` body.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveRequest<'a> {
    pub file_id: &'a DocumentId,
}

/// `GET /api/test` body. Only `files` is read.
#[derive(Debug, Clone, Deserialize)]
pub struct FileListPayload {
    #[serde(default)]
    pub files: Vec<ListedFile>,
}

#[test]
fn test_search_payload_decodes_hit_tuples() {
    let raw = r#"{"search": true, "query": "budget", "docs": [
        ["Q1.pdf", {"id": "a1", "link": "http://x/a1"}],
        ["Q2.pdf", {"id": "a2", "link": "http://x/a2"}]
    ]}"#;
    let payload: SearchPayload = serde_json::from_str(raw).unwrap();
    assert!(payload.search);
    let docs: Vec<_> = payload.into_result_set().unwrap().ranked().collect();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].0, 1);
    assert_eq!(docs[0].1.display_name, "Q1.pdf");
    assert_eq!(docs[0].1.id, DocumentId::new("a1"));
    assert_eq!(docs[1].1.link, "http://x/a2");
}

#[test]
fn test_null_and_missing_docs_mean_not_found() {
    let null_docs: SearchPayload =
        serde_json::from_str(r#"{"search": true, "query": "x", "docs": null}"#).unwrap();
    assert!(null_docs.into_result_set().is_none());

    let missing: SearchPayload = serde_json::from_str(r#"{"search": false}"#).unwrap();
    assert!(missing.into_result_set().is_none());

    let bulk: BulkDeletePayload = serde_json::from_str(r#"{"docs": null}"#).unwrap();
    assert!(bulk.into_result_set().is_none());
}

#[test]
fn test_bulk_delete_payload_decodes_name_only_rows() {
    let payload: BulkDeletePayload =
        serde_json::from_str(r#"{"docs": [["old-reports/jan.pdf"]]}"#).unwrap();
    let files: Vec<_> = payload.into_result_set().unwrap().ranked().collect();
    assert_eq!(
        files,
        vec![(1, DeletedFile { name: "old-reports/jan.pdf".to_string() })]
    );
}

#[test]
fn test_remove_request_shape() {
    let id = DocumentId::new("a1");
    let body = serde_json::to_value(RemoveRequest { file_id: &id }).unwrap();
    assert_eq!(body, serde_json::json!({"file_id": "a1"}));
}
