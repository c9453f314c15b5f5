//! Liftlog CLI - search index maintenance for a Liftlog database.
//!
//! Rebuilds search namespaces from the relational store, runs ad-hoc
//! searches and reports backend status. Output is JSON on stdout.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{Namespace, ReindexTarget};
use liftlog_core::config::SearchConfig;
use liftlog_core::{FailurePolicy, Liftlog, Settings};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "liftlog")]
#[command(about = "Search index maintenance for Liftlog")]
struct Args {
    /// SQLite database file (defaults to $DATABASE_PATH or ./liftlog.db)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Search endpoint: http(s) URL, fts5:<path> or memory: (defaults to $ELASTICSEARCH_URL)
    #[arg(long)]
    search_url: Option<String>,

    /// How index failures after a commit are handled (defaults to $SEARCH_FAILURE_POLICY)
    #[arg(long, value_enum)]
    failure_policy: Option<PolicyArg>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Command-line spelling of [`FailurePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Log failing documents and keep going
    Isolate,
    /// Stop at the first failure and exit with an error
    Propagate,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Isolate => FailurePolicy::Isolate,
            PolicyArg::Propagate => FailurePolicy::Propagate,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upsert every stored record into the search index
    Reindex {
        #[arg(value_enum, default_value = "all")]
        target: ReindexTarget,
    },
    /// Search one namespace
    Search {
        #[arg(value_enum)]
        namespace: Namespace,
        expression: String,
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long, default_value_t = SearchConfig::DEFAULT_PER_PAGE)]
        per_page: usize,
    },
    /// Show database and search backend status
    Status,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the JSON report
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut settings = Settings::from_env();
    if let Some(path) = args.database {
        settings.database_path = path;
    }
    if args.search_url.is_some() {
        settings.search_url = args.search_url;
    }
    if let Some(policy) = args.failure_policy {
        settings.failure_policy = policy.into();
    }

    info!("Opening {}", settings.database_path.display());
    let app = Liftlog::open(&settings)?;

    match args.command {
        Command::Reindex { target } => print_json(&commands::reindex(&app, target).await?),
        Command::Search {
            namespace,
            expression,
            page,
            per_page,
        } => print_json(&commands::search(&app, namespace, &expression, page, per_page).await?),
        Command::Status => print_json(&commands::status(&app).await?),
    }
}
