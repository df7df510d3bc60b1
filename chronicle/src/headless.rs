//! Line-oriented shell.
//!
//! One command per line. Output lines are plain text; problems are
//! prefixed with `[ERROR]` or `[WARN]` so scripts can pick them out.

use crate::commands::{self, Command};
use chronicle_core::{LoadOutcome, Store};
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Print a warning if the last write did not reach storage.
fn report_write_error(store: &Store) {
    if let Some(err) = store.last_write_error() {
        println!("[WARN] Changes may not be saved: {err}");
    }
}

/// How a single command line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Done,
    Failed,
    Quit,
}

/// Run one command and print its output.
pub fn run_line(store: &mut Store, words: &[String]) -> LineOutcome {
    let command = match commands::parse(words) {
        Ok(Command::Quit) => return LineOutcome::Quit,
        Ok(command) => command,
        Err(e) => {
            println!("[ERROR] {e}");
            return LineOutcome::Failed;
        }
    };

    debug!(?command, "running command");
    let mutates = command.mutates();
    let outcome = match commands::execute(store, command) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            LineOutcome::Done
        }
        Err(e) => {
            println!("[ERROR] {e:#}");
            LineOutcome::Failed
        }
    };
    if mutates {
        report_write_error(store);
    }
    outcome
}

/// Run the shell until `quit` or end of input.
pub fn run(store: &mut Store) -> anyhow::Result<()> {
    println!("=== Campaign Chronicle ===");
    println!("Data: {}", store.config().data_path.display());
    match store.load_outcome() {
        LoadOutcome::Loaded | LoadOutcome::Empty => {}
        LoadOutcome::Seeded => println!("Loaded the example campaign."),
        LoadOutcome::Recovered { reason } => {
            println!("[WARN] Stored data could not be read ({reason}); a backup was kept and fresh data loaded.");
        }
    }
    report_write_error(store);
    match store.current_campaign() {
        Some(campaign) => println!("Campaign: {}", campaign.name),
        None => println!("No campaign selected. Try: campaigns, then use <campaign-id>"),
    }
    println!("Type help for commands.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("> ");
    stdout.flush().ok();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if !line.is_empty() {
            match commands::tokenize(line) {
                Ok(words) => {
                    if run_line(store, &words) == LineOutcome::Quit {
                        println!("Goodbye!");
                        break;
                    }
                }
                Err(e) => println!("[ERROR] {e}"),
            }
        }

        print!("> ");
        stdout.flush().ok();
    }

    store.flush()?;
    Ok(())
}
