//! Builds the canonical [`QuoteSet`] for one event out of the raw bookmaker
//! list the feed returned.
//!
//! Moneyline outcomes are assigned to away/home by team name.  Outcome
//! order differs between books and between the live and historical feeds,
//! so array position carries no meaning here.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::books::BookTable;
use super::convert::OddsFormat;
use super::freshness::FreshnessPolicy;
use crate::store::models::{
    BookmakerQuote, Event, Freshness, QuoteSet, RawBook, RawMarket, RawOutcome, TotalsLine,
};

pub const H2H_MARKET: &str = "h2h";
pub const TOTALS_MARKET: &str = "totals";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeamSide {
    Away,
    Home,
}

#[derive(Debug, Clone)]
pub struct QuoteExtractor {
    books: BookTable,
    format: OddsFormat,
    freshness: FreshnessPolicy,
}

impl QuoteExtractor {
    pub fn new(books: BookTable, format: OddsFormat, freshness: FreshnessPolicy) -> Self {
        QuoteExtractor {
            books,
            format,
            freshness,
        }
    }

    pub fn books(&self) -> &BookTable {
        &self.books
    }

    /// One quote per tracked label, in feed order. Books outside the
    /// allow-list are dropped without complaint; when two keys share a
    /// label the first one listed wins.
    pub fn extract(&self, event: &Event, now: DateTime<Utc>) -> QuoteSet {
        let mut seen = HashSet::new();
        let quotes = event
            .bookmakers
            .iter()
            .filter_map(|book| {
                let Some(label) = self.books.label_for(&book.key) else {
                    debug!("Skipping non-tracked book '{}'", book.key);
                    return None;
                };
                if !seen.insert(label) {
                    debug!("'{}' already quoted as {}, skipping", book.key, label);
                    return None;
                }
                Some(self.quote_for(event, book, label, now))
            })
            .collect();
        QuoteSet { quotes }
    }

    fn quote_for(
        &self,
        event: &Event,
        book: &RawBook,
        label: &str,
        now: DateTime<Utc>,
    ) -> BookmakerQuote {
        let (away_ml, home_ml) = find_market(book, H2H_MARKET)
            .map(|m| self.moneyline(event, m, label))
            .unwrap_or((None, None));
        let totals = find_market(book, TOTALS_MARKET).and_then(|m| self.totals(m, label));
        let report = self.freshness.classify(book.last_update.as_ref(), now);
        if let (Freshness::Stale, Some(age)) = (report.status, report.age) {
            debug!("{}: last update {}s ago", label, age.num_seconds());
        }

        BookmakerQuote {
            book: label.to_string(),
            away_ml,
            home_ml,
            totals,
            status: report.status,
            updated: report.display,
            captured_at: now,
        }
    }

    fn moneyline(&self, event: &Event, market: &RawMarket, label: &str) -> (Option<i32>, Option<i32>) {
        let mut away = None;
        let mut home = None;
        for outcome in &market.outcomes {
            let slot = match side_of(event, &outcome.name) {
                Some(TeamSide::Away) => &mut away,
                Some(TeamSide::Home) => &mut home,
                None => {
                    debug!("{}: h2h outcome '{}' matches neither team", label, outcome.name);
                    continue;
                }
            };
            if slot.is_none() {
                *slot = self.price_of(outcome, label);
            }
        }
        (away, home)
    }

    fn totals(&self, market: &RawMarket, label: &str) -> Option<TotalsLine> {
        let over = named_outcome(market, "Over")?;
        let under = named_outcome(market, "Under")?;
        let point = over.point.or(under.point)?;
        Some(TotalsLine {
            point,
            over: self.price_of(over, label)?,
            under: self.price_of(under, label)?,
        })
    }

    fn price_of(&self, outcome: &RawOutcome, label: &str) -> Option<i32> {
        let raw = outcome.price?;
        let converted = self.format.to_american(raw);
        if converted.is_none() {
            warn!(
                "{}: price {} for '{}' is not valid {} odds",
                label,
                raw,
                outcome.name,
                self.format.as_param()
            );
        }
        converted
    }
}

fn find_market<'a>(book: &'a RawBook, key: &str) -> Option<&'a RawMarket> {
    book.markets.iter().find(|m| m.key == key)
}

fn named_outcome<'a>(market: &'a RawMarket, name: &str) -> Option<&'a RawOutcome> {
    market
        .outcomes
        .iter()
        .find(|o| o.name.trim().eq_ignore_ascii_case(name))
}

/// Exact name match first, then a trimmed case-insensitive comparison.
fn side_of(event: &Event, name: &str) -> Option<TeamSide> {
    if name == event.away_team {
        return Some(TeamSide::Away);
    }
    if name == event.home_team {
        return Some(TeamSide::Home);
    }
    let name = name.trim().to_lowercase();
    if name == event.away_team.trim().to_lowercase() {
        Some(TeamSide::Away)
    } else if name == event.home_team.trim().to_lowercase() {
        Some(TeamSide::Home)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{Freshness, Origin, UpdateStamp};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap()
    }

    fn outcome(name: &str, price: f64, point: Option<f64>) -> RawOutcome {
        RawOutcome {
            name: name.into(),
            price: Some(price),
            point,
        }
    }

    fn h2h(outcomes: Vec<RawOutcome>) -> RawMarket {
        RawMarket {
            key: H2H_MARKET.into(),
            outcomes,
        }
    }

    fn totals(outcomes: Vec<RawOutcome>) -> RawMarket {
        RawMarket {
            key: TOTALS_MARKET.into(),
            outcomes,
        }
    }

    fn book(key: &str, title: &str, markets: Vec<RawMarket>) -> RawBook {
        RawBook {
            key: key.into(),
            title: title.into(),
            last_update: Some(UpdateStamp::Epoch((now() - Duration::seconds(10)).timestamp() as f64)),
            markets,
        }
    }

    fn event(bookmakers: Vec<RawBook>) -> Event {
        Event {
            id: Some("evt1".into()),
            sport_key: "basketball_nba".into(),
            away_team: "Lakers".into(),
            home_team: "Celtics".into(),
            commence_time: None,
            origin: Origin::Live,
            completed: false,
            scores: None,
            bookmakers,
        }
    }

    fn extractor() -> QuoteExtractor {
        QuoteExtractor::new(
            BookTable::default(),
            OddsFormat::Decimal,
            FreshnessPolicy::from_secs(3600),
        )
    }

    #[test]
    fn test_reversed_outcomes_match_by_name() {
        let ev = event(vec![book(
            "draftkings",
            "DraftKings",
            vec![h2h(vec![
                outcome("Celtics", 1.91, None),
                outcome("Lakers", 1.95, None),
            ])],
        )]);
        let set = extractor().extract(&ev, now());
        assert_eq!(set.len(), 1);
        let q = &set.quotes[0];
        assert_eq!(q.book, "DraftKings");
        assert_eq!(q.away_ml, Some(-105));
        assert_eq!(q.home_ml, Some(-110));
        assert_eq!(q.status, Freshness::Fresh);
        assert_eq!(q.captured_at, now());
        assert!(q.totals.is_none());
    }

    #[test]
    fn test_allow_list_drops_unknown_books() {
        let market = || vec![h2h(vec![outcome("Lakers", 2.1, None), outcome("Celtics", 1.8, None)])];
        let ev = event(vec![
            book("betmgm", "BetMGM", market()),
            book("fanduel", "FanDuel", market()),
            book("pointsbetus", "PointsBet", market()),
        ]);
        let set = extractor().extract(&ev, now());
        assert_eq!(set.len(), 1);
        assert_eq!(set.quotes[0].book, "FanDuel");
    }

    #[test]
    fn test_both_caesars_keys_yield_one_quote() {
        let ev = event(vec![
            book("williamhill_us", "William Hill (US)", vec![h2h(vec![
                outcome("Lakers", 2.5, None),
                outcome("Celtics", 1.6, None),
            ])]),
            book("fanduel", "FanDuel", vec![]),
            book("caesars", "Caesars Sportsbook", vec![h2h(vec![
                outcome("Lakers", 2.2, None),
                outcome("Celtics", 1.7, None),
            ])]),
        ]);
        let set = extractor().extract(&ev, now());
        let labels: Vec<_> = set.quotes.iter().map(|q| q.book.as_str()).collect();
        assert_eq!(labels, vec!["Caesars", "FanDuel"]);
        assert_eq!(set.quotes[0].away_ml, Some(150));
    }

    #[test]
    fn test_feed_order_is_kept() {
        let ev = event(vec![
            book("fanduel", "FanDuel", vec![]),
            book("caesars", "Caesars", vec![]),
            book("draftkings", "DraftKings", vec![]),
        ]);
        let labels: Vec<_> = extractor()
            .extract(&ev, now())
            .quotes
            .into_iter()
            .map(|q| q.book)
            .collect();
        assert_eq!(labels, vec!["FanDuel", "Caesars", "DraftKings"]);
    }

    #[test]
    fn test_totals_recorded_when_both_sides_present() {
        let ev = event(vec![book(
            "fanduel",
            "FanDuel",
            vec![totals(vec![
                outcome("Under", 1.87, Some(228.5)),
                outcome("Over", 1.95, Some(228.5)),
            ])],
        )]);
        let q = &extractor().extract(&ev, now()).quotes[0];
        assert_eq!(
            q.totals,
            Some(TotalsLine {
                point: 228.5,
                over: -105,
                under: -115,
            })
        );
        // No h2h market: moneyline stays absent rather than zero
        assert_eq!(q.away_ml, None);
        assert_eq!(q.home_ml, None);
    }

    #[test]
    fn test_partial_totals_are_dropped() {
        let ev = event(vec![book(
            "fanduel",
            "FanDuel",
            vec![totals(vec![outcome("Over", 1.95, Some(228.5))])],
        )]);
        assert!(extractor().extract(&ev, now()).quotes[0].totals.is_none());
    }

    #[test]
    fn test_totals_without_point_are_dropped() {
        let ev = event(vec![book(
            "fanduel",
            "FanDuel",
            vec![totals(vec![outcome("Over", 1.95, None), outcome("Under", 1.87, None)])],
        )]);
        assert!(extractor().extract(&ev, now()).quotes[0].totals.is_none());
    }

    #[test]
    fn test_unconvertible_price_is_absent() {
        let ev = event(vec![book(
            "draftkings",
            "DraftKings",
            vec![h2h(vec![
                outcome("Lakers", 1.0, None),
                RawOutcome {
                    name: "Celtics".into(),
                    price: None,
                    point: None,
                },
            ])],
        )]);
        let q = &extractor().extract(&ev, now()).quotes[0];
        assert_eq!(q.away_ml, None);
        assert_eq!(q.home_ml, None);
    }

    #[test]
    fn test_name_match_tolerates_case_and_whitespace() {
        let ev = event(vec![book(
            "draftkings",
            "DraftKings",
            vec![h2h(vec![
                outcome(" celtics", 1.5, None),
                outcome("LAKERS ", 2.75, None),
                outcome("Draw", 15.0, None),
            ])],
        )]);
        let q = &extractor().extract(&ev, now()).quotes[0];
        assert_eq!(q.away_ml, Some(175));
        assert_eq!(q.home_ml, Some(-200));
    }

    #[test]
    fn test_american_feed_prices() {
        let ex = QuoteExtractor::new(
            BookTable::default(),
            OddsFormat::American,
            FreshnessPolicy::from_secs(3600),
        );
        let ev = event(vec![book(
            "draftkings",
            "DraftKings",
            vec![
                h2h(vec![outcome("Celtics", -120.0, None), outcome("Lakers", 100.0, None)]),
                totals(vec![outcome("Over", -110.0, Some(221.0)), outcome("Under", -110.0, Some(221.0))]),
            ],
        )]);
        let q = &ex.extract(&ev, now()).quotes[0];
        assert_eq!(q.away_ml, Some(100));
        assert_eq!(q.home_ml, Some(-120));
        assert_eq!(q.totals.as_ref().map(|t| t.over), Some(-110));
    }

    #[test]
    fn test_stale_and_unknown_status() {
        let mut stale = book("draftkings", "DraftKings", vec![]);
        stale.last_update = Some(UpdateStamp::Text("2024-01-14T20:00:00Z".into()));
        let mut missing = book("fanduel", "FanDuel", vec![]);
        missing.last_update = None;
        let set = extractor().extract(&event(vec![stale, missing]), now());
        assert_eq!(set.quotes[0].status, Freshness::Stale);
        assert_eq!(set.quotes[1].status, Freshness::Unknown);
        assert!(set.quotes[1].updated.is_none());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let ev = event(vec![
            book(
                "draftkings",
                "DraftKings",
                vec![h2h(vec![outcome("Celtics", 1.91, None), outcome("Lakers", 1.95, None)])],
            ),
            book(
                "williamhill_us",
                "William Hill",
                vec![totals(vec![outcome("Over", 1.9, Some(230.0)), outcome("Under", 1.9, Some(230.0))])],
            ),
        ]);
        let ex = extractor();
        assert_eq!(ex.extract(&ev, now()), ex.extract(&ev, now()));
    }
}
