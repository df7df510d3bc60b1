//! Campaign chronicle shell.
//!
//! Keeps a campaign's characters, locations, items, notes and relationships
//! in a JSON file and lets you browse and edit them from the terminal.
//!
//! ```bash
//! chronicle                                   # interactive shell
//! chronicle list characters search=rock       # one command, then exit
//! chronicle --data party.json --no-seed
//! ```
//!
//! `CHRONICLE_DATA_PATH` and `CHRONICLE_ID_SCHEME` may also be set in the
//! environment or a `.env` file. Logging goes to stderr and follows
//! `RUST_LOG` (default `warn`). A one-shot command that fails exits with
//! status 1.

mod commands;
mod forms;
mod headless;

use chronicle_core::{IdScheme, Store, StoreConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chronicle", version, about = "Campaign notes and world tracker")]
struct Cli {
    /// Data file to load and save
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Id scheme for new records: timestamp or uuid
    #[arg(long)]
    id_scheme: Option<IdScheme>,

    /// Start empty instead of loading the example campaign
    #[arg(long)]
    no_seed: bool,

    /// Run a single command and exit
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = StoreConfig::from_env()?;
    if let Some(path) = cli.data {
        config = config.with_data_path(path);
    }
    if let Some(scheme) = cli.id_scheme {
        config = config.with_id_scheme(scheme);
    }
    if cli.no_seed {
        config = config.without_seed();
    }

    let mut store = Store::open_file(config);

    if cli.command.is_empty() {
        return headless::run(&mut store);
    }

    let outcome = headless::run_line(&mut store, &cli.command);
    store.flush()?;
    if outcome == headless::LineOutcome::Failed {
        std::process::exit(1);
    }
    Ok(())
}
