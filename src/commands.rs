use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::dashboard::{self, AppState};
use crate::error::ScanError;
use crate::market::{MarketClient, TheOddsApi};
use crate::odds::QuoteExtractor;
use crate::output::{self, EventRow, OutputMode};
use crate::store::models::Origin;
use crate::store::SnapshotStore;
use crate::tracker::Tracker;

/// Wire the feed client, extractor and vault into one session.
pub fn build_tracker(config: &Config) -> Result<Tracker> {
    let api_key = config.odds_api_key.as_deref().unwrap_or_default();
    let api = TheOddsApi::new(
        &config.odds_api_url,
        api_key,
        config.feed_settings(),
        config.request_timeout(),
    )?;
    let freshness = config.freshness();
    let extractor = QuoteExtractor::new(config.book_table()?, config.odds_format, freshness);
    info!(
        "Tracking {} book key(s) on {}; quotes go stale after {}s",
        extractor.books().len(),
        config.sport_key(),
        freshness.threshold().num_seconds()
    );
    Ok(Tracker::open(
        MarketClient::new(Arc::new(api)),
        extractor,
        &config.snapshot_path,
    ))
}

pub async fn events(config: &Config, mode: OutputMode) -> Result<()> {
    let mut tracker = build_tracker(config)?;
    let catalogue = tracker.refresh(&config.sport_key()).await;
    for notice in &catalogue.notices {
        output::print_warn(notice);
    }
    let rows: Vec<EventRow> = catalogue.events.iter().map(EventRow::from).collect();
    output::print_rows(&rows, catalogue, mode)
}

pub async fn scan(config: &Config, matchup: &str, completed: bool, mode: OutputMode) -> Result<()> {
    let mut tracker = build_tracker(config)?;
    let origin = completed.then_some(Origin::Completed);
    let outcome = match tracker.scan(&config.sport_key(), matchup, origin).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let ScanError::UnknownMatchup { notices, .. } = &err;
            for notice in notices {
                output::print_warn(notice);
            }
            return Err(err).with_context(|| format!("Scan of '{}' failed", matchup));
        }
    };

    for notice in &outcome.notices {
        output::print_warn(notice);
    }
    if let Some(err) = &outcome.persist_error {
        output::print_warn(&format!("Snapshot not saved: {}", err));
    }
    if outcome.quotes.is_empty() {
        output::print_warn(&format!("No tracked bookmaker quoted {}", outcome.matchup));
    }
    output::print_heading(&format!("{} ({})", outcome.matchup, outcome.origin), mode);
    output::print_rows(&output::quote_rows(&outcome.quotes), &outcome, mode)
}

pub fn show(config: &Config, matchup: Option<&str>, mode: OutputMode) -> Result<()> {
    let store = SnapshotStore::open(&config.snapshot_path);

    if let Some(matchup) = matchup {
        let set = store
            .get(matchup)
            .with_context(|| format!("No snapshot saved for '{}'", matchup))?;
        output::print_heading(matchup, mode);
        return output::print_rows(&output::quote_rows(set), set, mode);
    }

    match mode {
        OutputMode::Json => output::print_rows::<EventRow, _>(&[], store.entries(), mode),
        OutputMode::Table => {
            if store.entries().is_empty() {
                println!("(no snapshots in {})", store.path().display());
            }
            for (matchup, set) in store.entries() {
                output::print_heading(matchup, mode);
                output::print_rows(&output::quote_rows(set), set, mode)?;
            }
            Ok(())
        }
    }
}

pub async fn serve(config: &Config) -> Result<()> {
    let tracker = build_tracker(config)?;
    let state = AppState {
        tracker: Arc::new(Mutex::new(tracker)),
        sport_key: config.sport_key(),
    };
    let app = dashboard::router(state);
    let addr: SocketAddr = config
        .dashboard_addr
        .parse()
        .with_context(|| format!("Invalid dashboard address '{}'", config.dashboard_addr))?;
    info!("Dashboard API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
