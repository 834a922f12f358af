use clap::{ArgAction, Parser, Subcommand};
use shelfsync_catalog::{HttpCatalog, RetryPolicy};
use shelfsync_config::{Config, Overrides};
use shelfsync_sync::{Options, RunSummary};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// A run that completed but gave up on some items.
const EXIT_ITEM_FAILURES: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "shelfsync", version)]
#[command(about = "Mirror an Audiobookshelf ebook library onto a USB-mounted Kobo reader", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download new books, remove deleted ones and update the reader's metadata
    Sync {
        /// Configuration file (defaults to the platform config directory)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Audiobookshelf server URL
        #[arg(long)]
        server: Option<String>,
        /// Audiobookshelf API token
        #[arg(long)]
        token: Option<String>,
        /// Library name or ID
        #[arg(long)]
        library: Option<String>,
        /// Mount point of the reader
        #[arg(long)]
        device: Option<PathBuf>,
        /// Do not mark finished books as finished on the reader
        #[arg(long)]
        no_progress_sync: bool,
        /// Show what would change without touching the reader
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Report an error that ended the run.
fn fatal<K>(err: exn::Exn<K>) -> ExitCode
where
    K: std::error::Error + Send + Sync + 'static,
{
    let kind: &K = &err;
    eprintln!("error: {kind}");
    tracing::debug!("{err:?}");
    ExitCode::FAILURE
}

fn print_summary(summary: &RunSummary) {
    let prefix = if summary.dry_run { "would have " } else { "" };
    println!("{prefix}removed: {}", summary.removed);
    println!("{prefix}downloaded: {}", summary.downloaded);
    println!("{prefix}updated metadata: {}", summary.metadata_updated);
    println!("{prefix}marked finished: {}", summary.status_updated);
    if summary.unregistered > 0 {
        println!("not yet indexed by the reader: {}", summary.unregistered);
    }
    for failure in &summary.failures {
        println!("failed ({}) {}: {}", failure.stage, failure.id, failure.reason);
    }
    println!("took {:.1}s", summary.duration().as_seconds_f64());
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Commands::Sync { config, server, token, library, device, no_progress_sync, dry_run } = cli.command;
    let overrides = Overrides {
        server,
        token,
        library,
        device,
        progress_sync: no_progress_sync.then_some(false),
        dry_run: dry_run.then_some(true),
    };
    let settings = match Config::load(config.as_deref(), &overrides).and_then(Config::validate) {
        Ok(settings) => settings,
        Err(err) => return fatal(err),
    };

    let retry = RetryPolicy::new(settings.retry.attempts, settings.retry.backoff());
    let catalog = match HttpCatalog::new(&settings.server, settings.token.clone(), settings.timeout, retry) {
        Ok(catalog) => catalog,
        Err(err) => return fatal(err),
    };
    let options = Options {
        library: settings.library.clone(),
        progress_sync: settings.progress_sync,
        dry_run: settings.dry_run,
    };
    match shelfsync_sync::sync(&catalog, &settings.device, &options).await {
        Ok(summary) => {
            print_summary(&summary);
            match summary.is_clean() {
                true => ExitCode::SUCCESS,
                false => ExitCode::from(EXIT_ITEM_FAILURES),
            }
        },
        Err(err) => fatal(err),
    }
}
