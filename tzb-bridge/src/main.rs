//! Trello to Zulip bridge
//!
//! Polls the activity feed of a Trello organization and posts every action
//! as a message to a Zulip stream.

mod config;
mod shutdown;

use anyhow::Context;
use clap::Parser;
use config::ConfigLoader;
use shutdown::spawn_shutdown_listener;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tzb_core::processors::{PollLoop, PollOptions};
use tzb_core::watermark::{FileWatermarkStore, StartMode};

/// Read actions from Trello and post them to Zulip
#[derive(Parser, Debug)]
#[command(name = "tzb-bridge")]
#[command(version, about, long_about = None)]
struct Args {
    /// Read all available actions instead of only new ones
    #[arg(short, long)]
    all: bool,

    /// Do not post messages or record progress
    #[arg(short, long)]
    no_post: bool,

    /// Read actions once and exit
    #[arg(short, long)]
    once: bool,

    /// Verbose progress output
    #[arg(short, long)]
    verbose: bool,

    /// TOML file to load settings from (environment takes priority)
    #[arg(short, long, value_name = "C")]
    config: Option<PathBuf>,

    /// Seconds to sleep between reads
    #[arg(short, long, value_name = "S", default_value_t = 60)]
    sleep: u64,

    /// Read actions from file(s) instead of Trello (`-` for stdin)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

impl Args {
    fn poll_options(&self) -> PollOptions {
        PollOptions {
            start: if self.all {
                StartMode::Backfill
            } else {
                StartMode::Incremental
            },
            dry_run: self.no_post,
            once: self.once,
            interval: Duration::from_secs(self.sleep),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.verbose);

    tracing::info!("Starting tzb-bridge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ConfigLoader::new(args.config.as_ref())
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;

    let store = FileWatermarkStore::new(&config.watermark_file).with_dry_run(args.no_post);
    let source = config.trello.client();
    let sink = config.zulip.sink()?;
    let poll_loop = PollLoop::new(source, sink, store, args.poll_options());

    if !args.files.is_empty() {
        let payloads = read_payloads(&args.files).await?;
        tracing::info!("Replaying {} payload file(s)", payloads.len());
        poll_loop.replay(payloads).await?;
        return Ok(());
    }

    let shutdown_rx = spawn_shutdown_listener();
    poll_loop.run(shutdown_rx).await?;

    Ok(())
}

/// Read every replay file into memory.
async fn read_payloads(files: &[PathBuf]) -> anyhow::Result<Vec<String>> {
    let mut payloads = Vec::with_capacity(files.len());
    for path in files {
        payloads.push(read_payload(path).await?);
    }
    Ok(payloads)
}

async fn read_payload(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut payload = String::new();
        tokio::io::stdin()
            .read_to_string(&mut payload)
            .await
            .context("failed to read payload from stdin")?;
        return Ok(payload);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read payload file {}", path.display()))
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// Logs go to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "debug,reqwest=info,hyper_util=info"
    } else {
        "info,reqwest=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from(["tzb-bridge", "-a", "-n", "-o", "-s", "5"]).unwrap();
        let options = args.poll_options();
        assert_eq!(options.start, StartMode::Backfill);
        assert!(options.dry_run);
        assert!(options.once);
        assert_eq!(options.interval, Duration::from_secs(5));
        assert!(args.files.is_empty());
    }

    #[test]
    fn test_defaults_and_replay_files() {
        let args = Args::try_parse_from(["tzb-bridge", "a.json", "-"]).unwrap();
        let options = args.poll_options();
        assert_eq!(options.start, StartMode::Incremental);
        assert!(!options.dry_run);
        assert!(!options.once);
        assert_eq!(options.interval, Duration::from_secs(60));
        assert_eq!(args.files, [PathBuf::from("a.json"), PathBuf::from("-")]);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
