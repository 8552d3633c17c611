use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use torrent_feeder::cli::{Cli, Commands};
use torrent_feeder::config::{validate_feed_url, Config};
use torrent_feeder::errors::FeederResult;
use torrent_feeder::services::{Aggregator, CommandNotifier};
use torrent_feeder::sources::HttpFeedFetcher;
use torrent_feeder::storage::SeenFileStore;

type FeedAggregator = Aggregator<HttpFeedFetcher, SeenFileStore>;

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> FeederResult<()> {
    // Listing only needs the seen file, not a valid feed setup
    if let Commands::Seen = cli.command {
        return cmd_seen(&Config::seen_file_from_env(cli.seen_file)?);
    }

    // Load configuration
    let mut config = Config::from_env_with(cli.seen_file)?;

    match cli.command {
        Commands::Run {
            interval,
            feeds,
            skip_notify,
        } => {
            if let Some(secs) = interval {
                config.interval = std::time::Duration::from_secs(secs);
            }
            cmd_run(&config, feeds, skip_notify)
        }
        Commands::Once {
            feeds,
            dry_run,
            skip_notify,
            json,
        } => cmd_once(&config, feeds, dry_run, skip_notify, json),
        Commands::Seen => cmd_seen(&config.seen_file),
    }
}

/// Logs go to stderr so `seen` and `--json` output stay machine readable.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if quiet => EnvFilter::new("error"),
        Err(_) => match verbose {
            0 => EnvFilter::new("torrent_feeder=info,warn"),
            1 => EnvFilter::new("torrent_feeder=debug,info"),
            _ => EnvFilter::new("trace"),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_aggregator(
    config: &Config,
    feeds: Vec<String>,
    skip_notify: bool,
) -> FeederResult<FeedAggregator> {
    let feeds = if feeds.is_empty() {
        config.feeds.clone()
    } else {
        for feed in &feeds {
            validate_feed_url(feed)?;
        }
        feeds
    };

    if feeds.is_empty() {
        tracing::warn!("no feeds configured; set FEEDER_FEEDS or pass --feed");
    }

    // Initialize storage
    let store = SeenFileStore::load(&config.seen_file)?;
    let fetcher = HttpFeedFetcher::new(config.fetch_settings());

    let mut aggregator = Aggregator::new(feeds, fetcher, store).with_interval(config.interval);

    if skip_notify {
        tracing::info!("skip-notify mode: new links are marked seen without running the notify command");
    } else if let Some(command) = &config.notify_command {
        aggregator.on_new_link(CommandNotifier::new(command.clone()));
    } else {
        tracing::warn!("FEEDER_NOTIFY_COMMAND not set; new links are only marked seen");
    }

    Ok(aggregator)
}

fn cmd_run(config: &Config, feeds: Vec<String>, skip_notify: bool) -> FeederResult<()> {
    let mut aggregator = build_aggregator(config, feeds, skip_notify)?;
    aggregator.run()
}

fn cmd_once(
    config: &Config,
    feeds: Vec<String>,
    dry_run: bool,
    skip_notify: bool,
    json: bool,
) -> FeederResult<()> {
    let mut aggregator = build_aggregator(config, feeds, skip_notify)?;

    if dry_run {
        let unseen = aggregator.dry_run_cycle();
        for link in &unseen {
            println!("[DRY RUN] {}", link);
        }
        println!("Dry run complete. Would notify {} links.", unseen.len());
        return Ok(());
    }

    let report = aggregator.run_cycle();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
    }

    Ok(())
}

fn cmd_seen(seen_file: &Path) -> FeederResult<()> {
    let store = SeenFileStore::load(seen_file)?;

    for link in store.links() {
        println!("{}", link);
    }

    Ok(())
}
