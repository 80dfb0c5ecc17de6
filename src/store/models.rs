use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which upstream feed an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Live or upcoming, from the odds feed
    Live,
    /// Recently finished, from the scores feed
    Completed,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Live => write!(f, "live"),
            Origin::Completed => write!(f, "completed"),
        }
    }
}

/// One side of a final score: `{ "name": "Lakers", "score": 112 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    pub name: String,
    pub score: i64,
}

/// A sporting event as normalized from either upstream feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Upstream event ID when present
    pub id: Option<String>,
    pub sport_key: String,
    pub away_team: String,
    pub home_team: String,
    pub commence_time: Option<DateTime<Utc>>,
    pub origin: Origin,
    pub completed: bool,
    /// Exactly two entries when the feed reported a final score
    pub scores: Option<Vec<TeamScore>>,
    #[serde(skip)]
    pub bookmakers: Vec<RawBook>,
}

impl Event {
    /// Human-readable key used for selection and for the snapshot vault
    pub fn matchup(&self) -> String {
        matchup_label(&self.away_team, &self.home_team)
    }
}

pub fn matchup_label(away_team: &str, home_team: &str) -> String {
    format!("{} @ {}", away_team, home_team)
}

/// The upstream-reported moment a book last moved its prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UpdateStamp {
    /// Unix epoch seconds
    Epoch(f64),
    /// ISO-8601 text, usually with a trailing `Z`
    Text(String),
}

/// Bookmaker entry exactly as the feed listed it (before allow-listing)
#[derive(Debug, Clone, PartialEq)]
pub struct RawBook {
    pub key: String,
    pub title: String,
    pub last_update: Option<UpdateStamp>,
    pub markets: Vec<RawMarket>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawMarket {
    /// "h2h" | "totals" | anything else the feed sends
    pub key: String,
    pub outcomes: Vec<RawOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawOutcome {
    pub name: String,
    pub price: Option<f64>,
    pub point: Option<f64>,
}

/// How current a quote's upstream update time is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Stale,
    Unknown,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Fresh => write!(f, "fresh"),
            Freshness::Stale => write!(f, "stale"),
            Freshness::Unknown => write!(f, "unknown"),
        }
    }
}

/// Over/under line for one book. Recorded only when both sides priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsLine {
    pub point: f64,
    /// American odds
    pub over: i32,
    /// American odds
    pub under: i32,
}

/// One sportsbook's priced view of a matchup at one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerQuote {
    /// Canonical display label, never the raw feed key
    pub book: String,
    /// American odds for the away side; `None` when unavailable
    pub away_ml: Option<i32>,
    /// American odds for the home side; `None` when unavailable
    pub home_ml: Option<i32>,
    pub totals: Option<TotalsLine>,
    pub status: Freshness,
    /// Upstream update time rendered in local time
    pub updated: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// All allow-listed book quotes for one matchup captured at one scan.
/// Serializes as a plain JSON array.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteSet {
    pub quotes: Vec<BookmakerQuote>,
}

impl QuoteSet {
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }
}

/// Which price of a quote a history entry tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSide {
    AwayMl,
    HomeMl,
    Over,
    Under,
}

impl fmt::Display for QuoteSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteSide::AwayMl => write!(f, "Away ML"),
            QuoteSide::HomeMl => write!(f, "Home ML"),
            QuoteSide::Over => write!(f, "Over"),
            QuoteSide::Under => write!(f, "Under"),
        }
    }
}

/// A single price observation for charting line movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    pub matchup: String,
    pub bookmaker: String,
    pub side: QuoteSide,
    /// American odds
    pub price: i32,
    /// Same price in decimal form
    pub decimal: Option<f64>,
}
