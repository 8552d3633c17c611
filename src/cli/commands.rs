use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "torrent-feeder")]
#[command(about = "Watch feeds and run a command once for every new torrent link")]
#[command(version)]
pub struct Cli {
    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Seen-links file (overrides FEEDER_SEEN_FILE)
    #[arg(long, global = true, value_name = "PATH")]
    pub seen_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the feeds forever
    Run {
        /// Seconds to sleep between polls (overrides FEEDER_INTERVAL_SECS)
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Feed URL to poll; repeat for several (replaces configured feeds)
        #[arg(long = "feed", value_name = "URL")]
        feeds: Vec<String>,

        /// Skip notifications but still mark links as seen
        #[arg(long)]
        skip_notify: bool,
    },

    /// Poll every feed once and exit
    Once {
        /// Feed URL to poll; repeat for several (replaces configured feeds)
        #[arg(long = "feed", value_name = "URL")]
        feeds: Vec<String>,

        /// Dry run - list new links without notifying or marking them seen
        #[arg(long)]
        dry_run: bool,

        /// Skip notifications but still mark links as seen
        #[arg(long)]
        skip_notify: bool,

        /// Print the cycle report as JSON
        #[arg(long, conflicts_with = "dry_run")]
        json: bool,
    },

    /// Print every link already seen
    Seen,
}
