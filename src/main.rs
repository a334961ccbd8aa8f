mod clients;
mod config;
mod console;
mod error;
mod models;
mod notify;
mod outbox;
mod query;
mod render;
#[cfg(test)]
mod test_support;

use std::process::ExitCode;

use crate::config::Config;
use crate::console::{Recheck, load_page, recheck, retry};
use crate::models::MessageStatus;
use crate::outbox::OutboxGateway;
use crate::query::{DateRange, ListFilter, Page, StatusFilter};
use crate::render::render_table;

use chrono::{DateTime, Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Lists outbox messages kept by the backend and retries failed sends.
#[derive(Debug, Parser)]
#[command(name = "outbox-console", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show one page of outbox messages.
    List(ListArgs),
    /// Ask the backend to send one message again.
    Retry(RetryArgs),
}

#[derive(Debug, Args)]
struct Selector {
    /// Business the messages belong to.
    #[arg(long)]
    biz: String,
    /// Database shard; leave empty when not sharded.
    #[arg(long, default_value = "")]
    db: String,
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Physical table, when sharded by table.
    #[arg(long)]
    table: Option<String>,
    /// Exact message key.
    #[arg(long)]
    key: Option<String>,
    /// all, initialized, success, failure, or the raw code (-1, 0, 1, 2).
    #[arg(long, default_value = "all")]
    status: StatusFilter,
    /// Created at or after, as `YYYY-MM-DD HH:MM:SS` local time.
    #[arg(long, value_parser = parse_local_time, requires = "to")]
    from: Option<DateTime<Local>>,
    /// Created at or before, as `YYYY-MM-DD HH:MM:SS` local time.
    #[arg(long, value_parser = parse_local_time, requires = "from")]
    to: Option<DateTime<Local>>,
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Rows per page. Falls back to `OUTBOX_PAGE_SIZE`.
    #[arg(long)]
    page_size: Option<u32>,
}

impl FilterArgs {
    fn filter(&self) -> ListFilter {
        ListFilter {
            table: self.table.clone(),
            key: self.key.clone(),
            status: self.status,
            date_range: self.from.zip(self.to).map(|(from, to)| DateRange::new(from, to)),
        }
    }
}

#[derive(Debug, Args)]
struct ListArgs {
    #[command(flatten)]
    selector: Selector,
    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Debug, Args)]
struct RetryArgs {
    #[command(flatten)]
    selector: Selector,
    /// Table holding the message.
    #[arg(long, default_value = "")]
    table: String,
    /// Message id.
    #[arg(long)]
    id: i64,
    /// List page 1 of the same table afterwards and report the message's status.
    #[arg(long)]
    recheck: bool,
    /// Status the message had before the retry (initialized, success, failure or 0-2).
    /// Used with --recheck to flag an unexpected transition.
    #[arg(long, value_parser = parse_known_status, requires = "recheck")]
    was: Option<MessageStatus>,
}

fn parse_local_time(raw: &str) -> Result<DateTime<Local>, String> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("expected YYYY-MM-DD HH:MM:SS: {e}"))?;
    naive
        .and_local_timezone(Local)
        .earliest()
        .ok_or_else(|| format!("{raw} does not exist in the local time zone"))
}

fn parse_known_status(raw: &str) -> Result<MessageStatus, String> {
    match raw.parse::<StatusFilter>().map_err(|e| e.to_string())? {
        StatusFilter::Only(status) => Ok(status),
        StatusFilter::All => Err("expected a single status, not all".to_string()),
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(sentry::integrations::tracing::layer())
        .init();
}

async fn run_list(
    gateway: &OutboxGateway,
    args: ListArgs,
    default_page_size: u32,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let page = Page::new(args.filter.page, args.filter.page_size.unwrap_or(default_page_size))?;
    let filter = args.filter.filter();

    let outcome = load_page(gateway, &args.selector.biz, &args.selector.db, &filter, page).await;
    if let Some(notice) = &outcome.notice {
        eprintln!("{notice}");
    }
    if !outcome.page.success {
        return Ok(ExitCode::FAILURE);
    }

    print!("{}", render_table(&outcome.page.rows));
    Ok(ExitCode::SUCCESS)
}

async fn run_retry(
    gateway: &OutboxGateway,
    args: RetryArgs,
    default_page_size: u32,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Selector { biz, db } = &args.selector;

    let outcome = retry(gateway, biz, db, &args.table, args.id).await;
    eprintln!("{}", outcome.notice);
    if outcome.notice.is_error() {
        return Ok(ExitCode::FAILURE);
    }

    if args.recheck {
        let filter = ListFilter {
            table: Some(args.table.clone()),
            ..ListFilter::default()
        };
        let page = Page::new(1, default_page_size)?;
        let relisted = load_page(gateway, biz, db, &filter, page).await;
        if let Some(notice) = &relisted.notice {
            eprintln!("{notice}");
            return Ok(ExitCode::FAILURE);
        }
        match recheck(args.id, args.was, &relisted.page) {
            Recheck::Delivered(delivered) => println!(
                "message {} delivered after {} attempts",
                delivered.id, delivered.send_times
            ),
            Recheck::NotYet(status) => println!("message {} is still {}", args.id, status.label()),
            Recheck::NotOnPage => println!("message {} is not on the first page", args.id),
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging
    init_logging();

    // --- Configuration ---
    info!("Loading configuration...");
    let config = Config::load()?;
    let gateway_config = config.gateway()?;
    info!(base_url = %gateway_config.base_url, "Configuration loaded.");

    // Error reporting stays off unless a DSN is configured
    let _sentry = match config.sentry_dsn.as_deref() {
        Some(raw) => Some(sentry::init(sentry::ClientOptions {
            dsn: Some(raw.parse::<sentry::types::Dsn>()?),
            release: sentry::release_name!(),
            ..Default::default()
        })),
        None => None,
    };

    let gateway = OutboxGateway::new(gateway_config)?;

    match cli.command {
        Command::List(args) => run_list(&gateway, args, config.outbox_page_size).await,
        Command::Retry(args) => run_retry(&gateway, args, config.outbox_page_size).await,
    }
}
