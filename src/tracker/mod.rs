pub mod history;

pub use history::PriceHistory;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::ScanError;
use crate::market::{Catalogue, MarketClient};
use crate::odds::QuoteExtractor;
use crate::store::models::{Origin, QuoteSet};
use crate::store::{SnapshotStore, Vault};

/// Result of one user-triggered scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub matchup: String,
    pub origin: Origin,
    pub quotes: QuoteSet,
    pub history_added: usize,
    /// Set when the snapshot could not be written; the session keeps it
    pub persist_error: Option<String>,
    /// Feed failures encountered while refreshing the catalogue
    pub notices: Vec<String>,
}

/// One user session: the feeds, the vault and the line-movement log.
pub struct Tracker {
    market: MarketClient,
    extractor: QuoteExtractor,
    store: SnapshotStore,
    history: PriceHistory,
    catalogue: Option<Catalogue>,
}

impl Tracker {
    /// Start a session, merging the snapshot file into memory.
    pub fn open(market: MarketClient, extractor: QuoteExtractor, snapshot_path: impl Into<PathBuf>) -> Self {
        Tracker {
            market,
            extractor,
            store: SnapshotStore::open(snapshot_path),
            history: PriceHistory::new(),
            catalogue: None,
        }
    }

    /// Fetch both feeds and replace the cached catalogue.
    pub async fn refresh(&mut self, sport_key: &str) -> &Catalogue {
        let catalogue = self.market.catalogue(sport_key).await;
        info!(
            "Catalogue for {}: {} live, {} completed",
            sport_key,
            catalogue.count(Origin::Live),
            catalogue.count(Origin::Completed)
        );
        self.catalogue.insert(catalogue)
    }

    /// Refresh, then scan `matchup` from the fresh catalogue.
    pub async fn scan(
        &mut self,
        sport_key: &str,
        matchup: &str,
        origin: Option<Origin>,
    ) -> Result<ScanOutcome, ScanError> {
        self.refresh(sport_key).await;
        self.scan_cached(matchup, origin, Utc::now())
    }

    /// Scan against the catalogue already held by the session.
    ///
    /// The snapshot replaces any previous one for the matchup and is written
    /// out at once; a write failure is reported in the outcome, not raised.
    pub fn scan_cached(
        &mut self,
        matchup: &str,
        origin: Option<Origin>,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, ScanError> {
        let catalogue = self.catalogue.as_ref().ok_or_else(|| ScanError::UnknownMatchup {
            matchup: matchup.to_string(),
            notices: Vec::new(),
        })?;
        let event = catalogue
            .find(matchup, origin)
            .ok_or_else(|| ScanError::UnknownMatchup {
                matchup: matchup.to_string(),
                notices: catalogue.notices.clone(),
            })?;

        let label = event.matchup();
        let event_origin = event.origin;
        let quotes = self.extractor.extract(event, now);
        let notices = catalogue.notices.clone();

        let history_added = self.history.record_scan(&label, &quotes, now);
        let persist_error = match self.store.put(&label, quotes.clone()) {
            Ok(()) => None,
            Err(e) => {
                warn!("Snapshot for {} kept in memory only: {}", label, e);
                Some(e.to_string())
            }
        };

        info!("Scanned {}: {} book(s)", label, quotes.len());
        Ok(ScanOutcome {
            matchup: label,
            origin: event_origin,
            quotes,
            history_added,
            persist_error,
            notices,
        })
    }

    pub fn snapshot(&self, matchup: &str) -> Option<&QuoteSet> {
        self.store.get(matchup)
    }

    pub fn snapshots(&self) -> &Vault {
        self.store.entries()
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    /// Forget recorded line movement. The vault is untouched.
    pub fn clear_history(&mut self) {
        if self.history.is_empty() {
            return;
        }
        info!("Clearing {} history entries", self.history.len());
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::testing::CannedSource;
    use crate::odds::{BookTable, FreshnessPolicy, OddsFormat};
    use crate::store::models::{Freshness, QuoteSide};
    use crate::store::testing::scratch_dir;
    use serde_json::json;
    use std::sync::Arc;

    fn lakers_celtics(last_update: i64, celtics: f64, lakers: f64) -> serde_json::Value {
        json!([{
            "id": "e1",
            "away_team": "Lakers",
            "home_team": "Celtics",
            "bookmakers": [
                {
                    "key": "draftkings",
                    "title": "DraftKings",
                    "last_update": last_update,
                    "markets": [{"key": "h2h", "outcomes": [
                        {"name": "Celtics", "price": celtics},
                        {"name": "Lakers", "price": lakers}
                    ]}]
                },
                {
                    "key": "bovada",
                    "title": "Bovada",
                    "last_update": last_update,
                    "markets": [{"key": "h2h", "outcomes": [
                        {"name": "Celtics", "price": 1.8},
                        {"name": "Lakers", "price": 2.0}
                    ]}]
                }
            ]
        }])
    }

    fn tracker(source: Arc<CannedSource>, dir: &std::path::Path) -> Tracker {
        let extractor = QuoteExtractor::new(
            BookTable::default(),
            OddsFormat::Decimal,
            FreshnessPolicy::from_secs(3600),
        );
        Tracker::open(MarketClient::new(source), extractor, dir.join("snapshots.json"))
    }

    #[tokio::test]
    async fn test_scan_end_to_end() {
        let dir = scratch_dir("e2e");
        let now = Utc::now().timestamp();
        let source = Arc::new(CannedSource::new(Some(lakers_celtics(now - 10, 1.91, 1.95)), Some(json!([]))));
        let mut tracker = tracker(source, &dir);

        let outcome = tracker
            .scan("basketball_nba", "Lakers @ Celtics", None)
            .await
            .unwrap();

        assert_eq!(outcome.matchup, "Lakers @ Celtics");
        assert_eq!(outcome.origin, Origin::Live);
        assert_eq!(outcome.quotes.len(), 1);
        let q = &outcome.quotes.quotes[0];
        assert_eq!(q.book, "DraftKings");
        assert_eq!(q.away_ml, Some(-105));
        assert_eq!(q.home_ml, Some(-110));
        assert_eq!(q.status, Freshness::Fresh);
        assert!(outcome.persist_error.is_none());
        assert_eq!(outcome.history_added, 2);

        assert_eq!(tracker.snapshot("Lakers @ Celtics"), Some(&outcome.quotes));
        let reopened = SnapshotStore::open(dir.join("snapshots.json"));
        assert_eq!(reopened.get("Lakers @ Celtics"), Some(&outcome.quotes));

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_rescan_overwrites_snapshot_and_appends_history() {
        let dir = scratch_dir("rescan");
        let now = Utc::now().timestamp();
        let source = Arc::new(CannedSource::new(Some(lakers_celtics(now, 1.91, 1.95)), Some(json!([]))));
        let mut tracker = tracker(source.clone(), &dir);

        tracker.scan("basketball_nba", "Lakers @ Celtics", None).await.unwrap();
        source.set_odds(Some(lakers_celtics(now, 1.5, 2.75)));
        tracker.scan("basketball_nba", "Lakers @ Celtics", None).await.unwrap();

        let snap = tracker.snapshot("Lakers @ Celtics").unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.quotes[0].away_ml, Some(175));
        assert_eq!(snap.quotes[0].home_ml, Some(-200));

        let away: Vec<i32> = tracker
            .history()
            .for_matchup("Lakers @ Celtics")
            .filter(|e| e.side == QuoteSide::AwayMl)
            .map(|e| e.price)
            .collect();
        assert_eq!(away, vec![-105, 175]);

        tracker.clear_history();
        assert!(tracker.history().is_empty());
        assert!(tracker.snapshot("Lakers @ Celtics").is_some());

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_unknown_matchup() {
        let dir = scratch_dir("unknown");
        let source = Arc::new(CannedSource::new(None, None));
        let mut tracker = tracker(source, &dir);

        let err = tracker
            .scan("basketball_nba", "Lakers @ Celtics", None)
            .await
            .unwrap_err();
        match err {
            ScanError::UnknownMatchup { matchup, notices } => {
                assert_eq!(matchup, "Lakers @ Celtics");
                assert_eq!(notices.len(), 2);
                assert!(notices[0].starts_with("odds feed unavailable"));
            }
        }
        assert!(tracker.snapshots().is_empty());

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_scan_completed_event() {
        let dir = scratch_dir("completed");
        let scores = json!([{
            "away_team": "Lakers",
            "home_team": "Celtics",
            "completed": true,
            "scores": [{"name": "Celtics", "score": "110"}, {"name": "Lakers", "score": "104"}],
            "bookmakers": [{
                "key": "fanduel",
                "title": "FanDuel",
                "markets": [{"key": "h2h", "outcomes": [
                    {"name": "Lakers", "price": 2.2},
                    {"name": "Celtics", "price": 1.7}
                ]}]
            }]
        }]);
        let now = Utc::now().timestamp();
        let source = Arc::new(CannedSource::new(Some(lakers_celtics(now, 1.91, 1.95)), Some(scores)));
        let mut tracker = tracker(source, &dir);

        let outcome = tracker
            .scan("basketball_nba", "Lakers @ Celtics", Some(Origin::Completed))
            .await
            .unwrap();
        assert_eq!(outcome.origin, Origin::Completed);
        let q = &outcome.quotes.quotes[0];
        assert_eq!(q.book, "FanDuel");
        assert_eq!(q.away_ml, Some(120));
        assert_eq!(q.home_ml, Some(-143));
        assert_eq!(q.status, Freshness::Unknown);

        std::fs::remove_dir_all(dir).ok();
    }
}
