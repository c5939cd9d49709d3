use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::api::SearchApi;
use crate::controller::{QueryOutcome, ResultListController, ResultsView};
use crate::data_models::{DocumentId, Query};
use crate::delete_handler::{DeleteOutcome, DeleteStart, PendingDelete};
use crate::prompt::{Confirm, LineSource};
use crate::render::{render_controls, render_table};
use crate::table::{Column, PageNav, SortDirection};

pub const HELP: &str = "\
commands:
  search <query>          search the index
  delete-all <query>      delete every file matching <query>
  rm <id>                 delete the row tagged <id>
  page <n|first|prev|next|last>
  sort <#|file> [asc|desc]
  list                    list every file
  reset                   clear results
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(Query),
    Remove(DocumentId),
    Page(PageNav),
    Sort(Column, SortDirection),
    List,
    Reset,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word {
        // Query text is passed as typed, empty included.
        "search" | "s" => Ok(Command::Search(Query::search(rest))),
        "delete-all" => Ok(Command::Search(Query::bulk_delete(rest))),
        "rm" | "delete" if !rest.is_empty() => Ok(Command::Remove(DocumentId::new(rest))),
        "rm" | "delete" => Err(ParseError("rm needs a file id".into())),
        "page" => parse_page(rest).map(Command::Page),
        "sort" => parse_sort(rest),
        "list" => Ok(Command::List),
        "reset" => Ok(Command::Reset),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(ParseError(format!("unknown command {other:?}"))),
    }
}

fn parse_page(arg: &str) -> Result<PageNav, ParseError> {
    match arg {
        "first" => Ok(PageNav::First),
        "prev" | "previous" => Ok(PageNav::Previous),
        "next" => Ok(PageNav::Next),
        "last" => Ok(PageNav::Last),
        n => n
            .parse::<usize>()
            .map(PageNav::Number)
            .map_err(|_| ParseError(format!("bad page {n:?}"))),
    }
}

fn parse_sort(args: &str) -> Result<Command, ParseError> {
    let mut parts = args.split_whitespace();
    let column = match parts.next() {
        Some("#") | Some("rank") => Column::Rank,
        Some("file") => Column::File,
        other => return Err(ParseError(format!("cannot sort by {other:?}"))),
    };
    let direction = match parts.next() {
        None | Some("asc") => SortDirection::Ascending,
        Some("desc") => SortDirection::Descending,
        Some(other) => return Err(ParseError(format!("bad direction {other:?}"))),
    };
    Ok(Command::Sort(column, direction))
}

/// Text of whatever the results container holds.
pub async fn render_view<A, P>(view: &ResultsView<A, P>) -> String {
    match view {
        ResultsView::Empty => String::new(),
        ResultsView::NotFound(message) => format!("{message}\n"),
        ResultsView::Table { table, .. } => render_table(&*table.lock().await),
    }
}

/// `None` when the rendered view says it all.
pub fn describe_query<A, P>(outcome: QueryOutcome, view: &ResultsView<A, P>) -> Option<String> {
    match outcome {
        QueryOutcome::Declined => Some("cancelled".into()),
        QueryOutcome::Skipped(status) if view.table().is_some() => Some(format!(
            "server answered {status}; the rows below are from the previous query"
        )),
        QueryOutcome::Skipped(status) => Some(format!("server answered {status}")),
        QueryOutcome::Bound { .. } | QueryOutcome::NotFound => None,
    }
}

pub fn describe_delete(id: &DocumentId, outcome: &DeleteOutcome) -> String {
    match outcome {
        DeleteOutcome::Deleted(row) => format!("deleted {} ({id})", row.file.name()),
        DeleteOutcome::Declined => "cancelled".into(),
        DeleteOutcome::AlreadyPending => format!("delete of {id} already in progress"),
        DeleteOutcome::NotInTable => format!("no deletable row {id}"),
    }
}

/// A delete request that ran on its own task.
pub type FinishedDelete = (DocumentId, crate::error::Result<DeleteOutcome>);

enum Event {
    Line(Option<String>),
    Finished(FinishedDelete),
}

/// Line-oriented session over a [`LineSource`] and stdout. Request failures
/// are printed and the session carries on.
///
/// Row deletes are confirmed in line, then sent on a spawned task; the shell
/// keeps taking commands and prints each delete when it finishes.
pub struct Shell<A, P> {
    controller: ResultListController<A, P>,
    input: LineSource,
    finished_tx: mpsc::UnboundedSender<FinishedDelete>,
    finished_rx: mpsc::UnboundedReceiver<FinishedDelete>,
    in_flight: usize,
}

impl<A, P> Shell<A, P>
where
    A: SearchApi + 'static,
    P: Confirm + 'static,
{
    /// `input` must be the same source the controller's prompt reads from.
    pub fn new(controller: ResultListController<A, P>, input: LineSource) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            input,
            finished_tx,
            finished_rx,
            in_flight: 0,
        }
    }

    pub fn controller(&self) -> &ResultListController<A, P> {
        &self.controller
    }

    /// Row deletes sent but not yet reported.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("{HELP}");
        loop {
            print!("> ");
            io::stdout().flush()?;
            let event = tokio::select! {
                line = next_line(&self.input) => Event::Line(line?),
                Some(finished) = self.finished_rx.recv() => Event::Finished(finished),
            };
            match event {
                Event::Finished(finished) => {
                    self.in_flight -= 1;
                    println!();
                    self.report(&finished).await;
                }
                Event::Line(None) => break,
                Event::Line(Some(line)) if line.trim().is_empty() => continue,
                Event::Line(Some(line)) => match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => self.execute(command).await,
                    Err(ParseError(msg)) => println!("{msg}"),
                },
            }
        }
        while self.in_flight > 0 {
            log::info!("waiting for {} delete(s) to finish", self.in_flight);
            match self.next_finished().await {
                Some(finished) => self.report(&finished).await,
                None => break,
            }
        }
        Ok(())
    }

    /// Waits for the next spawned delete to finish.
    pub async fn next_finished(&mut self) -> Option<FinishedDelete> {
        let finished = self.finished_rx.recv().await?;
        self.in_flight -= 1;
        Some(finished)
    }

    pub async fn execute(&mut self, command: Command) {
        match command {
            Command::Search(query) => match self.controller.run_query(&query).await {
                Ok(outcome) => {
                    if let Some(msg) = describe_query(outcome, self.controller.view()) {
                        println!("{msg}");
                    }
                }
                Err(e) => println!("error: {e}"),
            },
            Command::List => match self.controller.list_all().await {
                Ok(outcome) => {
                    if let Some(msg) = describe_query(outcome, self.controller.view()) {
                        println!("{msg}");
                    }
                }
                Err(e) => println!("error: {e}"),
            },
            Command::Remove(id) => match self.controller.confirm_delete(id.clone()).await {
                DeleteStart::Confirmed(pending) => {
                    println!("deleting {id}");
                    self.spawn_delete(pending);
                    return;
                }
                DeleteStart::Finished(outcome) => println!("{}", describe_delete(&id, &outcome)),
            },
            Command::Page(nav) => match self.controller.table() {
                Some(table) => {
                    table.lock().await.navigate(nav);
                }
                None => println!("no table"),
            },
            Command::Sort(column, direction) => match self.controller.table() {
                Some(table) => {
                    if !table.lock().await.sort(column, direction) {
                        println!("column is not sortable");
                    }
                }
                None => println!("no table"),
            },
            Command::Reset => self.controller.reset(),
            Command::Help => {
                println!("{HELP}");
                return;
            }
            Command::Quit => return,
        }
        self.render().await;
    }

    fn spawn_delete(&mut self, pending: PendingDelete<A, P>) {
        let finished = self.finished_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let id = pending.id().clone();
            let result = pending.send().await;
            // Shell gone: nobody left to tell.
            let _ = finished.send((id, result));
        });
    }

    async fn report(&self, (id, result): &FinishedDelete) {
        match result {
            Ok(outcome) => println!("{}", describe_delete(id, outcome)),
            Err(e) => println!("error deleting {id}: {e}"),
        }
        self.render().await;
    }

    async fn render(&self) {
        print!("{}", render_view(self.controller.view()).await);
        println!("{}", render_controls(&self.controller.controls()));
    }
}

async fn next_line(input: &LineSource) -> io::Result<Option<String>> {
    input.lock().await.next_line().await
}

#[test]
fn test_parse_search_commands() {
    assert_eq!(
        parse_command("search  budget 2024 "),
        Ok(Command::Search(Query::search("budget 2024")))
    );
    assert_eq!(parse_command("search"), Ok(Command::Search(Query::search(""))));
    assert_eq!(
        parse_command("delete-all old-reports"),
        Ok(Command::Search(Query::bulk_delete("old-reports")))
    );
}

#[test]
fn test_parse_row_and_table_commands() {
    assert_eq!(
        parse_command("rm a1"),
        Ok(Command::Remove(DocumentId::new("a1")))
    );
    assert!(parse_command("rm").is_err());
    assert_eq!(parse_command("page 3"), Ok(Command::Page(PageNav::Number(3))));
    assert_eq!(parse_command("page prev"), Ok(Command::Page(PageNav::Previous)));
    assert!(parse_command("page x").is_err());
    assert_eq!(
        parse_command("sort file desc"),
        Ok(Command::Sort(Column::File, SortDirection::Descending))
    );
    assert_eq!(
        parse_command("sort #"),
        Ok(Command::Sort(Column::Rank, SortDirection::Ascending))
    );
    assert!(parse_command("sort size").is_err());
    assert_eq!(parse_command("quit"), Ok(Command::Quit));
    assert!(parse_command("frobnicate").is_err());
}

#[test]
fn test_describe_query_flags_stale_rows() {
    use reqwest::StatusCode;

    use crate::api::HttpSearchApi;
    use crate::prompt::TerminalPrompt;
    use crate::table::{FILE_COLUMN, RANK_COLUMN, ResultTable};

    let skipped = QueryOutcome::Skipped(StatusCode::BAD_GATEWAY);
    let empty: ResultsView<HttpSearchApi, TerminalPrompt> = ResultsView::Empty;
    assert_eq!(
        describe_query(skipped, &empty).as_deref(),
        Some("server answered 502 Bad Gateway")
    );

    let stale: ResultsView<HttpSearchApi, TerminalPrompt> = ResultsView::Table {
        table: ResultTable::new(vec![RANK_COLUMN, FILE_COLUMN], Vec::new(), 10).into_handle(),
        deletes: None,
    };
    let msg = describe_query(skipped, &stale).unwrap();
    assert!(msg.contains("502 Bad Gateway"));
    assert!(msg.contains("from the previous query"));
    assert_eq!(describe_query(QueryOutcome::NotFound, &stale), None);
    assert_eq!(
        describe_query(QueryOutcome::Declined, &empty).as_deref(),
        Some("cancelled")
    );
}
