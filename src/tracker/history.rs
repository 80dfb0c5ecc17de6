use chrono::{DateTime, Utc};
use tracing::debug;

use crate::odds::convert::american_to_decimal;
use crate::store::models::{HistoryEntry, QuoteSet, QuoteSide};

/// Append-only log of every price observed by a scan, for charting line
/// movement. Lives for one session; cleared only on request.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    entries: Vec<HistoryEntry>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per (book, side) that carried a price in this scan.
    /// Returns the number of entries appended.
    pub fn record_scan(&mut self, matchup: &str, set: &QuoteSet, time: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        for quote in &set.quotes {
            let totals = quote.totals.as_ref();
            let sides = [
                (QuoteSide::AwayMl, quote.away_ml),
                (QuoteSide::HomeMl, quote.home_ml),
                (QuoteSide::Over, totals.map(|t| t.over)),
                (QuoteSide::Under, totals.map(|t| t.under)),
            ];
            for (side, price) in sides {
                let Some(price) = price else { continue };
                self.entries.push(HistoryEntry {
                    time,
                    matchup: matchup.to_string(),
                    bookmaker: quote.book.clone(),
                    side,
                    price,
                    decimal: american_to_decimal(price),
                });
            }
        }
        let added = self.entries.len() - before;
        debug!("History: +{} observation(s) for {}", added, matchup);
        added
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Observations for one matchup, oldest first.
    pub fn for_matchup<'a>(&'a self, matchup: &'a str) -> impl Iterator<Item = &'a HistoryEntry> + 'a {
        self.entries.iter().filter(move |e| e.matchup == matchup)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{BookmakerQuote, Freshness, TotalsLine};
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn quote(book: &str, away: Option<i32>, home: Option<i32>, totals: Option<TotalsLine>) -> BookmakerQuote {
        BookmakerQuote {
            book: book.into(),
            away_ml: away,
            home_ml: home,
            totals,
            status: Freshness::Unknown,
            updated: None,
            captured_at: Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_one_entry_per_priced_side() {
        let set = QuoteSet {
            quotes: vec![
                quote(
                    "DraftKings",
                    Some(-105),
                    Some(-110),
                    Some(TotalsLine { point: 228.5, over: -110, under: -110 }),
                ),
                quote("FanDuel", Some(150), None, None),
            ],
        };
        let mut history = PriceHistory::new();
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap();
        assert_eq!(history.record_scan("Lakers @ Celtics", &set, t), 5);

        let sides: Vec<_> = history
            .entries()
            .iter()
            .map(|e| (e.bookmaker.as_str(), e.side, e.price))
            .collect();
        assert_eq!(
            sides,
            vec![
                ("DraftKings", QuoteSide::AwayMl, -105),
                ("DraftKings", QuoteSide::HomeMl, -110),
                ("DraftKings", QuoteSide::Over, -110),
                ("DraftKings", QuoteSide::Under, -110),
                ("FanDuel", QuoteSide::AwayMl, 150),
            ]
        );
        assert_relative_eq!(history.entries()[4].decimal.unwrap(), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_filter_and_clear() {
        let set = QuoteSet {
            quotes: vec![quote("Caesars", Some(120), Some(-140), None)],
        };
        let mut history = PriceHistory::new();
        let t = Utc::now();
        history.record_scan("A @ B", &set, t);
        history.record_scan("C @ D", &set, t);
        history.record_scan("A @ B", &set, t);

        assert_eq!(history.len(), 6);
        assert_eq!(history.for_matchup("A @ B").count(), 4);
        assert_eq!(history.for_matchup("C @ D").count(), 2);

        history.clear();
        assert!(history.is_empty());
    }
}
