pub mod catalogue;
pub mod source;

pub use catalogue::{parse_events, Catalogue};
pub use source::{FeedKind, FeedSettings, OddsSource, TheOddsApi};

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::store::models::Event;

/// Friendly sport names accepted on the command line.
const SPORT_ALIASES: &[(&str, &str)] = &[
    ("nba", "basketball_nba"),
    ("nba basketball", "basketball_nba"),
    ("nfl", "americanfootball_nfl"),
    ("nfl football", "americanfootball_nfl"),
];

/// Map a friendly alias to the upstream sport key; unknown values are
/// assumed to already be sport keys.
pub fn resolve_sport(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    SPORT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, key)| key.to_string())
        .unwrap_or(lowered)
}

/// Fetches both feeds for a sport and merges them into one catalogue.
#[derive(Clone)]
pub struct MarketClient {
    source: Arc<dyn OddsSource>,
}

impl MarketClient {
    pub fn new(source: Arc<dyn OddsSource>) -> Self {
        MarketClient { source }
    }

    /// One request per feed, sequentially. A failing feed contributes no
    /// events and a notice; it never fails the whole catalogue.
    pub async fn catalogue(&self, sport_key: &str) -> Catalogue {
        let mut catalogue = Catalogue::empty(sport_key);

        for feed in [FeedKind::Odds, FeedKind::Scores] {
            match self.load_feed(feed, sport_key).await {
                Ok(mut events) => {
                    info!(
                        "{}: {} {} event(s) for {}",
                        self.source.name(),
                        events.len(),
                        feed.origin(),
                        sport_key
                    );
                    catalogue.events.append(&mut events);
                }
                Err(e) => {
                    warn!("{} {} feed failed: {}", self.source.name(), feed, e);
                    catalogue
                        .notices
                        .push(format!("{} feed unavailable: {}", feed, e));
                }
            }
        }

        catalogue
    }

    async fn load_feed(&self, feed: FeedKind, sport_key: &str) -> Result<Vec<Event>, FetchError> {
        let raw = self.source.fetch_feed(feed, sport_key).await?;
        parse_events(&raw, feed.origin(), sport_key)
    }
}
