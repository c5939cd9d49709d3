use std::fmt::Write;

use crate::dispatcher::Controls;
use crate::table::{Column, FileCell, ResultTable, Row, SortDirection};

const EMPTY_TABLE: &str = "No data available in table";

fn cell(row: &Row, column: Column) -> String {
    match column {
        Column::Rank => row.rank.to_string(),
        Column::File => match &row.file {
            FileCell::Linked { name, link } => format!("{name} <{link}>"),
            FileCell::Plain { name } => name.clone(),
        },
        Column::Delete => match &row.delete_id {
            Some(id) => format!("[x] {id}"),
            None => String::new(),
        },
    }
}

/// Current page of `table` as aligned text, followed by the entry count
/// and a full-numbers pager.
pub fn render_table(table: &ResultTable) -> String {
    let columns = table.columns();
    let (sorted_by, direction) = table.order();

    let headers: Vec<String> = columns
        .iter()
        .map(|c| {
            if c.column == sorted_by && c.orderable {
                let arrow = match direction {
                    SortDirection::Ascending => "^",
                    SortDirection::Descending => "v",
                };
                format!("{}{arrow}", c.title)
            } else {
                c.title.to_string()
            }
        })
        .collect();

    let body: Vec<Vec<String>> = table
        .page_rows()
        .into_iter()
        .map(|row| columns.iter().map(|c| cell(row, c.column)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (w, c) in widths.iter_mut().zip(cells) {
            *w = (*w).max(c.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    if body.is_empty() {
        out.push_str(EMPTY_TABLE);
        out.push('\n');
    }
    for cells in &body {
        push_line(&mut out, cells, &widths);
    }

    match table.page_bounds() {
        Some((start, end)) => {
            let _ = writeln!(out, "Showing {start} to {end} of {} entries", table.len());
        }
        None => out.push_str("Showing 0 to 0 of 0 entries\n"),
    }
    out.push_str(&render_pager(table.current_page(), table.page_count()));
    out.push('\n');
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

pub fn render_pager(current: usize, count: usize) -> String {
    let mut parts = vec!["First".to_string(), "Previous".to_string()];
    parts.extend((1..=count).map(|n| {
        if n == current {
            format!("[{n}]")
        } else {
            n.to_string()
        }
    }));
    parts.push("Next".to_string());
    parts.push("Last".to_string());
    parts.join(" ")
}

pub fn render_controls(controls: &Controls) -> String {
    let mut shown = Vec::new();
    if controls.search_visible {
        shown.push("search");
    }
    if controls.bulk_toggle_visible {
        shown.push("delete-all");
    }
    if controls.reset_visible {
        shown.push("reset");
    }
    format!("available: {}", shown.join(", "))
}

#[cfg(test)]
use crate::table::{DELETE_COLUMN, FILE_COLUMN, RANK_COLUMN};

#[test]
fn test_render_search_table() {
    let rows = vec![
        Row {
            rank: 1,
            file: FileCell::Linked {
                name: "Q1.pdf".into(),
                link: "http://x/a1".into(),
            },
            delete_id: Some("a1".into()),
        },
        Row {
            rank: 2,
            file: FileCell::Linked {
                name: "Q2.pdf".into(),
                link: "http://x/a2".into(),
            },
            delete_id: Some("a2".into()),
        },
    ];
    let table = ResultTable::new(vec![RANK_COLUMN, FILE_COLUMN, DELETE_COLUMN], rows, 10);
    let text = render_table(&table);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "#^  File");
    assert_eq!(lines[1], "--  --------------------  ------");
    assert_eq!(lines[2], "1   Q1.pdf <http://x/a1>  [x] a1");
    assert_eq!(lines[3], "2   Q2.pdf <http://x/a2>  [x] a2");
    assert_eq!(lines[4], "Showing 1 to 2 of 2 entries");
    assert_eq!(lines[5], "First Previous [1] Next Last");
}

#[test]
fn test_render_empty_table() {
    let table = ResultTable::new(vec![RANK_COLUMN, FILE_COLUMN], vec![], 10);
    let text = render_table(&table);
    assert!(text.contains(EMPTY_TABLE));
    assert!(text.contains("Showing 0 to 0 of 0 entries"));
}

#[test]
fn test_render_pager_marks_current_page() {
    assert_eq!(render_pager(2, 3), "First Previous 1 [2] 3 Next Last");
}

#[test]
fn test_render_controls() {
    assert_eq!(
        render_controls(&Controls::initial()),
        "available: search, delete-all"
    );
    assert_eq!(render_controls(&Controls::engaged()), "available: reset");
}
