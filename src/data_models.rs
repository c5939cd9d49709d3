use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, server-issued identifier of an indexed file.
///
/// This is the only key that links a rendered row to a file on the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> DocumentId {
        DocumentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        DocumentId::new(id)
    }
}

/// What the user typed plus the state of the "delete all matching" toggle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub text: String,
    pub bulk_delete: bool,
}

impl Query {
    pub fn search(text: impl Into<String>) -> Query {
        Query {
            text: text.into(),
            bulk_delete: false,
        }
    }

    pub fn bulk_delete(text: impl Into<String>) -> Query {
        Query {
            text: text.into(),
            bulk_delete: true,
        }
    }

    pub fn mode(&self) -> QueryMode {
        if self.bulk_delete {
            QueryMode::BulkDelete
        } else {
            QueryMode::Search
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Search,
    BulkDelete,
}

/// A search hit as the controller sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub display_name: String,
    pub link: String,
    pub id: DocumentId,
}

/// A file the server already removed while answering a bulk-delete query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedFile {
    pub name: String,
}

/// Entry of the read-only "list all files" view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    #[serde(rename = "webViewLink")]
    pub web_view_link: String,
}

/// Ordered answer to one query. Position `i` is displayed with rank `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet<T> {
    docs: Vec<T>,
}

impl<T> ResultSet<T> {
    pub fn new(docs: Vec<T>) -> ResultSet<T> {
        ResultSet { docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Pairs every entry with its 1-based display rank, in server order.
    pub fn ranked(self) -> impl Iterator<Item = (usize, T)> {
        self.docs.into_iter().enumerate().map(|(i, doc)| (i + 1, doc))
    }
}

impl<T> From<Vec<T>> for ResultSet<T> {
    fn from(docs: Vec<T>) -> Self {
        ResultSet::new(docs)
    }
}

#[test]
fn test_result_set_ranks_follow_server_order() {
    let set = ResultSet::new(vec!["c", "a", "b"]);
    let ranked: Vec<(usize, &str)> = set.ranked().collect();
    assert_eq!(ranked, vec![(1, "c"), (2, "a"), (3, "b")]);
}

#[test]
fn test_query_mode() {
    assert_eq!(Query::search("budget").mode(), QueryMode::Search);
    assert_eq!(Query::bulk_delete("old").mode(), QueryMode::BulkDelete);
    assert_eq!(Query::default().mode(), QueryMode::Search);
}
