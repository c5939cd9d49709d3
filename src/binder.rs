use reqwest::StatusCode;

use crate::api::models::{ApiResponse, BulkDeletePayload, FileListPayload, SearchPayload};
use crate::data_models::{DeletedFile, Document, ListedFile, ResultSet};
use crate::table::{DELETE_COLUMN, FILE_COLUMN, FileCell, RANK_COLUMN, ResultTable, Row};

pub const NOT_FOUND_MESSAGE: &str = "Files for this query not found";

/// What a response turns into. A fresh table every time, never a diff
/// against whatever was shown before.
#[derive(Debug)]
pub enum Binding {
    Table(ResultTable),
    /// `docs` was null: show the message instead of a table.
    NotFound,
    /// Non-success status: nothing is built.
    Skipped(StatusCode),
}

pub fn search_rows(docs: ResultSet<Document>) -> Vec<Row> {
    docs.ranked()
        .map(|(rank, doc)| Row {
            rank,
            file: FileCell::Linked {
                name: doc.display_name,
                link: doc.link,
            },
            delete_id: Some(doc.id),
        })
        .collect()
}

/// Bulk-deleted files are already gone server-side, so no affordance.
pub fn deleted_rows(docs: ResultSet<DeletedFile>) -> Vec<Row> {
    docs.ranked()
        .map(|(rank, doc)| Row {
            rank,
            file: FileCell::Plain { name: doc.name },
            delete_id: None,
        })
        .collect()
}

pub fn listing_rows(files: ResultSet<ListedFile>) -> Vec<Row> {
    files
        .ranked()
        .map(|(rank, file)| Row {
            rank,
            file: FileCell::Linked {
                name: file.name,
                link: file.web_view_link,
            },
            delete_id: None,
        })
        .collect()
}

pub fn bind_search(response: ApiResponse<SearchPayload>, page_length: usize) -> Binding {
    let payload = match response {
        ApiResponse::Success(payload) => payload,
        ApiResponse::Failed(status) => return skipped("search", status),
    };
    log::debug!("binding search results for {:?}", payload.query);
    match payload.into_result_set() {
        Some(docs) => {
            log::info!("search returned {} documents", docs.len());
            Binding::Table(ResultTable::new(
                vec![RANK_COLUMN, FILE_COLUMN, DELETE_COLUMN],
                search_rows(docs),
                page_length,
            ))
        }
        None => Binding::NotFound,
    }
}

pub fn bind_bulk_delete(response: ApiResponse<BulkDeletePayload>, page_length: usize) -> Binding {
    let payload = match response {
        ApiResponse::Success(payload) => payload,
        ApiResponse::Failed(status) => return skipped("search_delete", status),
    };
    match payload.into_result_set() {
        Some(docs) => {
            log::info!("server deleted {} documents", docs.len());
            Binding::Table(ResultTable::new(
                vec![RANK_COLUMN, FILE_COLUMN],
                deleted_rows(docs),
                page_length,
            ))
        }
        None => Binding::NotFound,
    }
}

pub fn bind_listing(response: ApiResponse<FileListPayload>, page_length: usize) -> Binding {
    match response {
        ApiResponse::Success(payload) => Binding::Table(ResultTable::new(
            vec![RANK_COLUMN, FILE_COLUMN],
            listing_rows(payload.files.into()),
            page_length,
        )),
        ApiResponse::Failed(status) => skipped("list", status),
    }
}

fn skipped(endpoint: &str, status: StatusCode) -> Binding {
    log::error!("{endpoint} request failed with status {status}, nothing rendered");
    Binding::Skipped(status)
}

#[cfg(test)]
fn search_payload(raw: &str) -> SearchPayload {
    serde_json::from_str(raw).unwrap()
}

#[test]
fn test_bind_search_one_row_per_document_in_server_order() {
    let payload = search_payload(
        r#"{"search": true, "query": "budget", "docs": [
            ["Q1.pdf", {"id": "a1", "link": "http://x/a1"}],
            ["Q2.pdf", {"id": "a2", "link": "http://x/a2"}]
        ]}"#,
    );
    let Binding::Table(table) = bind_search(ApiResponse::Success(payload), 10) else {
        panic!("expected a table");
    };
    assert_eq!(table.columns(), &[RANK_COLUMN, FILE_COLUMN, DELETE_COLUMN]);
    assert_eq!(
        table.rows(),
        &[
            Row {
                rank: 1,
                file: FileCell::Linked {
                    name: "Q1.pdf".into(),
                    link: "http://x/a1".into()
                },
                delete_id: Some("a1".into()),
            },
            Row {
                rank: 2,
                file: FileCell::Linked {
                    name: "Q2.pdf".into(),
                    link: "http://x/a2".into()
                },
                delete_id: Some("a2".into()),
            },
        ]
    );
}

#[test]
fn test_bind_search_null_docs_is_not_found() {
    let payload = search_payload(r#"{"search": true, "query": "nothing", "docs": null}"#);
    assert!(matches!(
        bind_search(ApiResponse::Success(payload), 10),
        Binding::NotFound
    ));
}

#[test]
fn test_bind_search_empty_docs_is_an_empty_table() {
    let payload = search_payload(r#"{"search": true, "docs": []}"#);
    let Binding::Table(table) = bind_search(ApiResponse::Success(payload), 10) else {
        panic!("expected a table");
    };
    assert!(table.is_empty());
}

#[test]
fn test_failed_status_builds_nothing() {
    assert!(matches!(
        bind_search(ApiResponse::Failed(StatusCode::INTERNAL_SERVER_ERROR), 10),
        Binding::Skipped(s) if s == StatusCode::INTERNAL_SERVER_ERROR
    ));
    assert!(matches!(
        bind_bulk_delete(ApiResponse::Failed(StatusCode::FORBIDDEN), 10),
        Binding::Skipped(s) if s == StatusCode::FORBIDDEN
    ));
    assert!(matches!(
        bind_listing(ApiResponse::Failed(StatusCode::UNAUTHORIZED), 10),
        Binding::Skipped(s) if s == StatusCode::UNAUTHORIZED
    ));
}

#[test]
fn test_bind_bulk_delete_has_no_affordance() {
    let payload: BulkDeletePayload =
        serde_json::from_str(r#"{"docs": [["old-reports/jan.pdf"]]}"#).unwrap();
    let Binding::Table(table) = bind_bulk_delete(ApiResponse::Success(payload), 10) else {
        panic!("expected a table");
    };
    assert_eq!(table.columns(), &[RANK_COLUMN, FILE_COLUMN]);
    assert_eq!(
        table.rows(),
        &[Row {
            rank: 1,
            file: FileCell::Plain {
                name: "old-reports/jan.pdf".into()
            },
            delete_id: None,
        }]
    );
}

#[test]
fn test_bind_bulk_delete_null_docs_is_not_found() {
    let payload: BulkDeletePayload =
        serde_json::from_str(r#"{"query": "nothing here", "docs": null}"#).unwrap();
    assert!(matches!(
        bind_bulk_delete(ApiResponse::Success(payload), 10),
        Binding::NotFound
    ));
}

#[test]
fn test_bind_listing_links_every_file() {
    let payload: FileListPayload = serde_json::from_str(
        r#"{"nextPageToken": "t", "files": [
            {"id": "f1", "name": "notes.txt", "mimeType": "text/plain", "webViewLink": "http://x/f1"},
            {"id": "f2", "name": "plan.pdf", "mimeType": "application/pdf", "webViewLink": "http://x/f2"}
        ]}"#,
    )
    .unwrap();
    let Binding::Table(table) = bind_listing(ApiResponse::Success(payload), 10) else {
        panic!("expected a table");
    };
    let names: Vec<&str> = table.rows().iter().map(|r| r.file.name()).collect();
    assert_eq!(names, vec!["notes.txt", "plan.pdf"]);
    assert!(table.rows().iter().all(|r| r.delete_id.is_none()));
}
