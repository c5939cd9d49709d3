use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;

pub const ROW_DELETE_PROMPT: &str = "Are you sure to delete this file?";
pub const BULK_DELETE_PROMPT: &str = "Are you sure to delete? \
If you agree all files that refer to this query will be deleted permanently.";

/// Yes/no question to the user. The caller waits for the answer.
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str) -> impl Future<Output = bool> + Send;
}

/// The one reader of terminal input. The shell and the prompt share it, so
/// an answer is never taken by the command loop or the other way round.
pub type LineSource = Arc<Mutex<Lines<Box<dyn AsyncBufRead + Send + Unpin>>>>;

pub fn line_source(reader: impl AsyncBufRead + Send + Unpin + 'static) -> LineSource {
    let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
    Arc::new(Mutex::new(reader.lines()))
}

pub fn stdin_lines() -> LineSource {
    line_source(BufReader::new(tokio::io::stdin()))
}

/// Asks on stdout, reads the answer from the shared input.
#[derive(Clone)]
pub struct TerminalPrompt {
    pub assume_yes: bool,
    input: LineSource,
}

impl TerminalPrompt {
    pub fn new(assume_yes: bool, input: LineSource) -> Self {
        Self { assume_yes, input }
    }
}

impl Confirm for TerminalPrompt {
    async fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            log::debug!("auto-confirmed: {message}");
            return true;
        }
        // Held until answered, so concurrent questions are asked one at a time.
        let mut input = self.input.lock().await;
        print!("{message} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        match input.next_line().await {
            Ok(Some(answer)) => is_yes(&answer),
            Ok(None) => false,
            Err(e) => {
                log::error!("could not read confirmation: {e}");
                false
            }
        }
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[test]
fn test_is_yes() {
    assert!(is_yes("y\n"));
    assert!(is_yes(" YES "));
    assert!(!is_yes(""));
    assert!(!is_yes("n"));
    assert!(!is_yes("yep"));
}

#[tokio::test]
async fn test_terminal_prompt_reads_answers_from_shared_input() {
    let input = line_source(&b"y\nn\nsearch budget\n"[..]);
    let prompt = TerminalPrompt::new(false, input.clone());

    assert!(prompt.confirm(ROW_DELETE_PROMPT).await);
    assert!(!prompt.confirm(ROW_DELETE_PROMPT).await);
    // The next line is left for whoever reads the input next.
    let next = input.lock().await.next_line().await.unwrap();
    assert_eq!(next.as_deref(), Some("search budget"));
    // Input closed: treated as no.
    assert!(!prompt.confirm(BULK_DELETE_PROMPT).await);
}
