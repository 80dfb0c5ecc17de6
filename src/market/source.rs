use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::odds::OddsFormat;
use crate::store::models::Origin;

/// The two upstream feeds every catalogue is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Live and upcoming events with current prices
    Odds,
    /// Recently completed events with final scores
    Scores,
}

impl FeedKind {
    pub fn origin(&self) -> Origin {
        match self {
            FeedKind::Odds => Origin::Live,
            FeedKind::Scores => Origin::Completed,
        }
    }

    fn path(&self) -> &'static str {
        match self {
            FeedKind::Odds => "odds",
            FeedKind::Scores => "scores",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Anything that can hand back the raw JSON of a feed.
#[async_trait]
pub trait OddsSource: Send + Sync {
    /// Raw feed body. Shape is checked by the caller.
    async fn fetch_feed(&self, feed: FeedKind, sport: &str) -> Result<serde_json::Value, FetchError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Request parameters shared by both feeds.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub regions: String,
    pub odds_format: OddsFormat,
    /// Look-back window of the scores feed, in days
    pub scores_days_from: u32,
}

/// The Odds API v4.
/// Docs: <https://the-odds-api.com/liveapi/guides/v4/>
pub struct TheOddsApi {
    http: Client,
    base_url: String,
    api_key: String,
    settings: FeedSettings,
    timeout: Duration,
}

impl TheOddsApi {
    pub fn new(
        base_url: &str,
        api_key: &str,
        settings: FeedSettings,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(TheOddsApi {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            settings,
            timeout,
        })
    }

    /// Build the request URL. `now` becomes the `_` cache-busting parameter
    /// so intermediaries never answer from a stale cache.
    pub fn feed_url(&self, feed: FeedKind, sport: &str, now: DateTime<Utc>) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Network(format!("invalid base URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("base URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(&["sports", sport, feed.path()]);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("apiKey", &self.api_key);
            match feed {
                FeedKind::Odds => {
                    query
                        .append_pair("regions", &self.settings.regions)
                        .append_pair("markets", "h2h,totals")
                        .append_pair("oddsFormat", self.settings.odds_format.as_param());
                }
                FeedKind::Scores => {
                    query.append_pair("daysFrom", &self.settings.scores_days_from.to_string());
                }
            }
            query
                .append_pair("dateFormat", "iso")
                .append_pair("_", &now.timestamp_millis().to_string());
        }
        Ok(url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            // The URL carries the API key; keep it out of logs.
            FetchError::Network(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl OddsSource for TheOddsApi {
    fn name(&self) -> &str {
        "TheOddsAPI"
    }

    async fn fetch_feed(&self, feed: FeedKind, sport: &str) -> Result<serde_json::Value, FetchError> {
        let url = self.feed_url(feed, sport, Utc::now())?;
        debug!("Fetching {} feed for {}", feed, sport);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let remaining = header_str(&resp, "x-requests-remaining");
        let used = header_str(&resp, "x-requests-used");
        if remaining.is_some() || used.is_some() {
            debug!(
                "Odds API quota: remaining={} used={}",
                remaining.as_deref().unwrap_or("?"),
                used.as_deref().unwrap_or("?")
            );
        }

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: "invalid API key".into(),
            });
        }
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: format!("sport '{}' not available on this plan", sport),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        resp.json::<serde_json::Value>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Decode(e.without_url().to_string())
            }
        })
    }
}

fn header_str(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
