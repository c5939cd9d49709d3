use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::data_models::DocumentId;

/// A live table shared between the results view and the delete handler
/// registered on it. Replacing the view detaches the old handle; anything
/// still holding it keeps mutating a table nobody renders.
pub type TableHandle = Arc<Mutex<ResultTable>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Rank,
    File,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub column: Column,
    pub title: &'static str,
    pub orderable: bool,
}

pub const RANK_COLUMN: ColumnSpec = ColumnSpec {
    column: Column::Rank,
    title: "#",
    orderable: true,
};

pub const FILE_COLUMN: ColumnSpec = ColumnSpec {
    column: Column::File,
    title: "File",
    orderable: true,
};

pub const DELETE_COLUMN: ColumnSpec = ColumnSpec {
    column: Column::Delete,
    title: "",
    orderable: false,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCell {
    Linked { name: String, link: String },
    Plain { name: String },
}

impl FileCell {
    pub fn name(&self) -> &str {
        match self {
            FileCell::Linked { name, .. } | FileCell::Plain { name } => name,
        }
    }
}

/// One rendered result. `delete_id` is the tag on the row's delete
/// affordance; rows without one cannot be deleted individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub rank: usize,
    pub file: FileCell,
    pub delete_id: Option<DocumentId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Full-numbers pager buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNav {
    First,
    Previous,
    Next,
    Last,
    /// 1-based page number.
    Number(usize),
}

/// In-memory paginated, sortable table with no search box.
///
/// Rows are stored in the order they were bound and that order is never
/// changed; sorting only affects what `display_rows` and `page_rows` return.
#[derive(Debug, Clone)]
pub struct ResultTable {
    columns: Vec<ColumnSpec>,
    rows: Vec<Row>,
    page_length: usize,
    page: usize,
    order: (Column, SortDirection),
}

impl ResultTable {
    pub fn new(columns: Vec<ColumnSpec>, rows: Vec<Row>, page_length: usize) -> ResultTable {
        ResultTable {
            columns,
            rows,
            page_length: page_length.max(1),
            page: 0,
            order: (Column::Rank, SortDirection::Ascending),
        }
    }

    pub fn into_handle(self) -> TableHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.iter().any(|c| c.column == column)
    }

    /// Rows in bound order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.rows.iter().any(|r| r.delete_id.as_ref() == Some(id))
    }

    /// Removes the single row tagged with `id`. Other rows keep their rank
    /// and relative order.
    pub fn remove_by_id(&mut self, id: &DocumentId) -> Option<Row> {
        let idx = self
            .rows
            .iter()
            .position(|r| r.delete_id.as_ref() == Some(id))?;
        let removed = self.rows.remove(idx);
        // Redraw: a now-empty trailing page falls back to the last one.
        self.page = self.page.min(self.page_count() - 1);
        Some(removed)
    }

    pub fn order(&self) -> (Column, SortDirection) {
        self.order
    }

    /// Returns false, leaving the order untouched, when the column is not
    /// orderable or not part of this table.
    pub fn sort(&mut self, column: Column, direction: SortDirection) -> bool {
        let orderable = self
            .columns
            .iter()
            .any(|c| c.column == column && c.orderable);
        if !orderable {
            return false;
        }
        self.order = (column, direction);
        self.page = 0;
        true
    }

    pub fn display_rows(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self.rows.iter().collect();
        let (column, direction) = self.order;
        rows.sort_by(|a, b| {
            let ord = match column {
                Column::File => compare_names(a.file.name(), b.file.name())
                    .then_with(|| a.rank.cmp(&b.rank)),
                Column::Rank | Column::Delete => a.rank.cmp(&b.rank),
            };
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        rows
    }

    pub fn page_length(&self) -> usize {
        self.page_length
    }

    /// Always at least one, an empty table still shows an empty page.
    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_length).max(1)
    }

    /// 1-based.
    pub fn current_page(&self) -> usize {
        self.page + 1
    }

    pub fn navigate(&mut self, nav: PageNav) -> usize {
        let last = self.page_count() - 1;
        self.page = match nav {
            PageNav::First => 0,
            PageNav::Previous => self.page.saturating_sub(1),
            PageNav::Next => (self.page + 1).min(last),
            PageNav::Last => last,
            PageNav::Number(n) => n.saturating_sub(1).min(last),
        };
        self.current_page()
    }

    pub fn page_rows(&self) -> Vec<&Row> {
        self.display_rows()
            .into_iter()
            .skip(self.page * self.page_length)
            .take(self.page_length)
            .collect()
    }

    /// 1-based inclusive bounds of the visible entries, `None` when empty.
    pub fn page_bounds(&self) -> Option<(usize, usize)> {
        if self.rows.is_empty() {
            return None;
        }
        let start = self.page * self.page_length;
        let end = (start + self.page_length).min(self.rows.len());
        Some((start + 1, end))
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
fn sample_table(n: usize, page_length: usize) -> ResultTable {
    let rows = (1..=n)
        .map(|rank| Row {
            rank,
            file: FileCell::Plain {
                name: format!("file-{rank:02}.pdf"),
            },
            delete_id: Some(DocumentId::new(format!("id{rank}"))),
        })
        .collect();
    ResultTable::new(vec![RANK_COLUMN, FILE_COLUMN, DELETE_COLUMN], rows, page_length)
}

#[test]
fn test_remove_by_id_removes_exactly_one_row() {
    let mut table = sample_table(4, 10);
    let removed = table.remove_by_id(&DocumentId::new("id2")).unwrap();
    assert_eq!(removed.rank, 2);
    assert_eq!(table.len(), 3);
    assert!(!table.contains(&DocumentId::new("id2")));
    // Ranks are not renumbered.
    let ranks: Vec<usize> = table.rows().iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 3, 4]);

    assert!(table.remove_by_id(&DocumentId::new("id2")).is_none());
    assert_eq!(table.len(), 3);
}

#[test]
fn test_remove_ignores_rows_without_affordance() {
    let rows = vec![Row {
        rank: 1,
        file: FileCell::Plain {
            name: "gone.pdf".into(),
        },
        delete_id: None,
    }];
    let mut table = ResultTable::new(vec![RANK_COLUMN, FILE_COLUMN], rows, 10);
    assert!(table.remove_by_id(&DocumentId::new("gone.pdf")).is_none());
    assert_eq!(table.len(), 1);
}

#[test]
fn test_pagination_full_numbers() {
    let mut table = sample_table(23, 10);
    assert_eq!(table.page_count(), 3);
    assert_eq!(table.current_page(), 1);
    assert_eq!(table.page_bounds(), Some((1, 10)));

    assert_eq!(table.navigate(PageNav::Next), 2);
    assert_eq!(table.navigate(PageNav::Last), 3);
    assert_eq!(table.page_rows().len(), 3);
    assert_eq!(table.page_bounds(), Some((21, 23)));
    assert_eq!(table.navigate(PageNav::Next), 3);
    assert_eq!(table.navigate(PageNav::Previous), 2);
    assert_eq!(table.navigate(PageNav::First), 1);
    assert_eq!(table.navigate(PageNav::Previous), 1);
    assert_eq!(table.navigate(PageNav::Number(3)), 3);
    assert_eq!(table.navigate(PageNav::Number(99)), 3);
    assert_eq!(table.navigate(PageNav::Number(0)), 1);
}

#[test]
fn test_emptied_last_page_falls_back() {
    let mut table = sample_table(11, 10);
    table.navigate(PageNav::Last);
    assert_eq!(table.current_page(), 2);
    table.remove_by_id(&DocumentId::new("id11")).unwrap();
    assert_eq!(table.page_count(), 1);
    assert_eq!(table.current_page(), 1);
    assert_eq!(table.page_rows().len(), 10);
}

#[test]
fn test_empty_table_has_one_empty_page() {
    let table = sample_table(0, 10);
    assert_eq!(table.page_count(), 1);
    assert!(table.page_rows().is_empty());
    assert_eq!(table.page_bounds(), None);
}

#[test]
fn test_sort_reorders_display_only() {
    let rows = vec![
        Row {
            rank: 1,
            file: FileCell::Plain { name: "b.pdf".into() },
            delete_id: Some(DocumentId::new("b")),
        },
        Row {
            rank: 2,
            file: FileCell::Plain { name: "C.pdf".into() },
            delete_id: Some(DocumentId::new("c")),
        },
        Row {
            rank: 3,
            file: FileCell::Plain { name: "a.pdf".into() },
            delete_id: Some(DocumentId::new("a")),
        },
    ];
    let mut table = ResultTable::new(vec![RANK_COLUMN, FILE_COLUMN, DELETE_COLUMN], rows, 10);

    assert!(table.sort(Column::File, SortDirection::Ascending));
    let names: Vec<&str> = table.display_rows().iter().map(|r| r.file.name()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf", "C.pdf"]);

    assert!(table.sort(Column::Rank, SortDirection::Descending));
    let ranks: Vec<usize> = table.display_rows().iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![3, 2, 1]);

    // Stored order is untouched.
    let stored: Vec<usize> = table.rows().iter().map(|r| r.rank).collect();
    assert_eq!(stored, vec![1, 2, 3]);
}

#[test]
fn test_delete_column_is_not_orderable() {
    let mut table = sample_table(3, 10);
    table.sort(Column::Rank, SortDirection::Descending);
    assert!(!table.sort(Column::Delete, SortDirection::Ascending));
    assert_eq!(table.order(), (Column::Rank, SortDirection::Descending));

    let mut two_columns = ResultTable::new(vec![RANK_COLUMN, FILE_COLUMN], vec![], 10);
    assert!(!two_columns.sort(Column::Delete, SortDirection::Ascending));
}

#[test]
fn test_sort_resets_to_first_page() {
    let mut table = sample_table(25, 10);
    table.navigate(PageNav::Last);
    table.sort(Column::File, SortDirection::Descending);
    assert_eq!(table.current_page(), 1);
    assert_eq!(table.page_rows()[0].rank, 25);
}
