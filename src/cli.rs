//! Command-line interface for the `nylas-delta` binary

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::delta::{Delta, DeltaFeed, DeltaView, DeltasOptions};
use crate::error::{NylasError, Result};

#[derive(Parser, Debug)]
#[command(name = "nylas-delta")]
#[command(version = "0.1.0")]
#[command(about = "Follow the change feed of a Nylas account", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "nylas.toml")]
    pub config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the account's latest delta cursor
    Cursor,

    /// Fetch deltas after a cursor
    Fetch {
        #[arg(long)]
        cursor: String,

        /// Object types to include (comma separated)
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        /// Object types to exclude (comma separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// count, ids or expanded
        #[arg(long)]
        view: Option<DeltaView>,

        /// Keep fetching until caught up, then print the final cursor
        #[arg(long)]
        follow: bool,
    },

    /// Stream deltas as JSON lines until interrupted
    Stream {
        /// Start position; defaults to the latest cursor
        #[arg(long)]
        cursor: Option<String>,
    },

    /// Receive webhook notifications and log each delta
    Webhook {
        /// Listen address; defaults to webhook.listen_addr from the config
        #[arg(long)]
        addr: Option<SocketAddr>,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "nylas.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Filters for `fetch`; `None` when no flag was given
pub fn deltas_options(
    include: Vec<String>,
    exclude: Vec<String>,
    view: Option<DeltaView>,
) -> Option<DeltasOptions> {
    if include.is_empty() && exclude.is_empty() && view.is_none() {
        return None;
    }
    Some(DeltasOptions {
        include_types: include,
        exclude_types: exclude,
        view,
    })
}

/// Load the config file, overlay the environment, then validate
pub async fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load(path).await?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Outcome of [`follow_deltas`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowSummary {
    /// Cursor to resume from next time
    pub cursor: String,
    pub batches: usize,
    pub deltas: usize,
}

/// Page through the feed from `cursor` until a batch reports it is caught up.
///
/// `on_delta` sees every delta once, in feed order.
pub async fn follow_deltas<F, H>(
    feed: &F,
    cursor: &str,
    opts: Option<&DeltasOptions>,
    mut on_delta: H,
) -> Result<FollowSummary>
where
    F: DeltaFeed + ?Sized,
    H: FnMut(&Delta),
{
    let mut summary = FollowSummary {
        cursor: cursor.to_string(),
        ..Default::default()
    };

    loop {
        let batch = feed.deltas(&summary.cursor, opts).await?;
        summary.batches += 1;
        summary.deltas += batch.deltas.len();
        batch.deltas.iter().for_each(&mut on_delta);

        debug!(
            batch = summary.batches,
            cursor_end = %batch.cursor_end,
            "processed delta batch"
        );

        let caught_up = batch.is_caught_up();
        summary.cursor = batch.cursor_end;
        if caught_up {
            break;
        }
    }

    info!(
        batches = summary.batches,
        deltas = summary.deltas,
        "delta feed caught up"
    );
    Ok(summary)
}

/// One JSON line per delta, as printed by `fetch` and `stream`
pub fn delta_json_line(delta: &Delta) -> Result<String> {
    Ok(serde_json::to_string(delta)?)
}

/// What `stream` has printed so far, for reporting where to resume
#[derive(Debug, Default)]
pub struct StreamProgress {
    /// Cursor of the last delta printed
    pub last_cursor: Option<String>,
    pub printed: usize,
    /// First delta that could not be printed; nothing is printed after it
    pub error: Option<NylasError>,
}

impl StreamProgress {
    /// The line to print for `delta`, or `None` once printing has failed
    pub fn record(&mut self, delta: &Delta) -> Option<String> {
        if self.error.is_some() {
            return None;
        }
        match delta_json_line(delta) {
            Ok(line) => {
                self.last_cursor = Some(delta.cursor.clone());
                self.printed += 1;
                Some(line)
            }
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }

    /// Cursor to pass to the next `stream` run
    pub fn resume_cursor<'a>(&'a self, start: &'a str) -> &'a str {
        self.last_cursor.as_deref().unwrap_or(start)
    }
}
