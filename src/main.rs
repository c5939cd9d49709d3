use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing_subscriber::EnvFilter;

use drivesearch::api::HttpSearchApi;
use drivesearch::config::CONFIG;
use drivesearch::console::{Shell, describe_delete, describe_query, render_view};
use drivesearch::controller::ResultListController;
use drivesearch::data_models::{DocumentId, Query};
use drivesearch::prompt::{TerminalPrompt, stdin_lines};
use drivesearch::table::PageNav;

#[derive(Parser)]
#[command(name = "drivesearch", about = "Search a document index and prune its results")]
struct Cli {
    /// Base url of the index server
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Rows per page
    #[arg(long, global = true)]
    page_length: Option<usize>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query and print the results
    Search {
        query: String,
        /// Delete every matching file on the server instead of listing them
        #[arg(long)]
        delete_all: bool,
        /// Delete the row with this id afterwards (repeatable)
        #[arg(long = "remove", value_name = "ID")]
        remove: Vec<String>,
        /// Page of the table to print
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// List every file the server knows about
    List,
    /// Interactive session
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let api_url = cli.api_url.as_deref().unwrap_or(&CONFIG.api_url);
    let page_length = match cli.page_length {
        Some(n) if n > 0 => n,
        _ => CONFIG.page_length,
    };

    let api = HttpSearchApi::new(api_url)?;
    tracing::info!("using index server at {}", api.base_url());
    let input = stdin_lines();
    let prompt = TerminalPrompt::new(cli.yes, input.clone());
    let mut controller = ResultListController::new(api, prompt, page_length);

    match cli.command {
        Commands::Search {
            query,
            delete_all,
            remove,
            page,
        } => {
            let query = Query {
                text: query,
                bulk_delete: delete_all,
            };
            let outcome = controller.run_query(&query).await?;
            if let Some(msg) = describe_query(outcome, controller.view()) {
                println!("{msg}");
            }

            let ids: Vec<DocumentId> = remove.into_iter().map(DocumentId::new).collect();
            let deletes = ids.iter().map(|id| controller.delete_row(id.clone()));
            for (id, result) in ids.iter().zip(join_all(deletes).await) {
                match result {
                    Ok(outcome) => println!("{}", describe_delete(id, &outcome)),
                    Err(e) => println!("error deleting {id}: {e}"),
                }
            }

            if let Some(table) = controller.table() {
                table.lock().await.navigate(PageNav::Number(page));
            }
            print!("{}", render_view(controller.view()).await);
        }
        Commands::List => {
            let outcome = controller.list_all().await?;
            if let Some(msg) = describe_query(outcome, controller.view()) {
                println!("{msg}");
            }
            print!("{}", render_view(controller.view()).await);
        }
        Commands::Shell => Shell::new(controller, input).run().await?,
    }
    Ok(())
}
