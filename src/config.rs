use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;

use crate::market::{resolve_sport, FeedSettings};
use crate::odds::books::parse_book_entry;
use crate::odds::freshness::MAX_THRESHOLD_SECS;
use crate::odds::{BookTable, FreshnessPolicy, OddsFormat};

/// Sportsbook odds tracker
#[derive(Parser, Debug, Clone)]
#[command(name = "odds-tracker", version, about)]
pub struct Config {
    /// The Odds API key (required for anything that fetches)
    #[arg(long, env = "THE_ODDS_API_KEY", hide_env_values = true)]
    pub odds_api_key: Option<String>,

    /// The Odds API base URL
    #[arg(
        long,
        env = "ODDS_API_URL",
        default_value = "https://api.the-odds-api.com/v4"
    )]
    pub odds_api_url: String,

    /// Sport to track: "nba", "nfl" or any upstream sport key
    #[arg(long, env = "SPORT", default_value = "nba")]
    pub sport: String,

    /// Bookmaker regions to request
    #[arg(long, env = "ODDS_REGIONS", default_value = "us")]
    pub regions: String,

    /// Price format requested from the feed
    #[arg(long, env = "ODDS_FORMAT", value_enum, default_value = "decimal")]
    pub odds_format: OddsFormat,

    /// How many days back the completed-events feed looks
    #[arg(long, env = "SCORES_DAYS_FROM", default_value = "3")]
    pub scores_days_from: u32,

    /// Quotes updated longer ago than this are stale
    #[arg(long, env = "FRESH_THRESHOLD_SECS", default_value = "3600")]
    pub fresh_threshold_secs: u64,

    /// Per-request timeout; a timeout counts as a failed fetch
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,

    /// Snapshot vault file
    #[arg(long, env = "SNAPSHOT_PATH", default_value = "snapshots.json")]
    pub snapshot_path: String,

    /// Extra tracked book as key=Label (repeatable)
    #[arg(long = "book", env = "ODDS_BOOKS", value_delimiter = ',')]
    pub books: Vec<String>,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "127.0.0.1:8080")]
    pub dashboard_addr: String,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List live and recently completed events
    Events,
    /// Snapshot every tracked book's prices for one matchup
    Scan {
        /// Matchup label, e.g. "Lakers @ Celtics"
        matchup: String,
        /// Pick the completed event with this label instead of the live one
        #[arg(long)]
        completed: bool,
    },
    /// Print saved snapshots without fetching anything
    Show {
        /// Only this matchup
        matchup: Option<String>,
    },
    /// Serve the JSON dashboard API
    Serve,
}

impl Command {
    fn fetches(&self) -> bool {
        !matches!(self, Command::Show { .. })
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.command.fetches() && self.odds_api_key.as_deref().map_or(true, str::is_empty) {
            anyhow::bail!("THE_ODDS_API_KEY is required to fetch odds (use --odds-api-key or set the env var)");
        }
        if !(1..=3).contains(&self.scores_days_from) {
            anyhow::bail!("scores_days_from must be between 1 and 3");
        }
        if !(1..=MAX_THRESHOLD_SECS).contains(&self.fresh_threshold_secs) {
            anyhow::bail!("fresh_threshold_secs must be between 1 and {}", MAX_THRESHOLD_SECS);
        }
        if !(1..=60).contains(&self.request_timeout_secs) {
            anyhow::bail!("request_timeout_secs must be between 1 and 60");
        }
        if self.sport.trim().is_empty() {
            anyhow::bail!("sport must not be empty");
        }
        if self.book_table()?.is_empty() {
            anyhow::bail!("no bookmakers to track");
        }
        Ok(())
    }

    /// Default allow-list extended by any `--book` entries.
    pub fn book_table(&self) -> Result<BookTable> {
        let mut table = BookTable::default();
        let extra = self
            .books
            .iter()
            .filter(|b| !b.trim().is_empty())
            .map(|b| parse_book_entry(b))
            .collect::<Result<Vec<_>>>()?;
        table.extend(extra);
        Ok(table)
    }

    pub fn sport_key(&self) -> String {
        resolve_sport(&self.sport)
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            regions: self.regions.clone(),
            odds_format: self.odds_format,
            scores_days_from: self.scores_days_from,
        }
    }

    pub fn freshness(&self) -> FreshnessPolicy {
        FreshnessPolicy::from_secs(self.fresh_threshold_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
