//! Staleness classification for a book's reported update time.
//!
//! All arithmetic happens in UTC; only the display string is converted to
//! the local timezone.

use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use tracing::debug;

use crate::store::models::{Freshness, UpdateStamp};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest accepted freshness threshold: one week.
pub const MAX_THRESHOLD_SECS: u64 = 7 * 86_400;

/// Freshness threshold shared by every quote in a session.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    threshold: Duration,
}

/// Result of classifying one update stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshnessReport {
    pub status: Freshness,
    pub age: Option<Duration>,
    /// Local-time rendering of the update instant
    pub display: Option<String>,
}

impl FreshnessPolicy {
    pub fn new(threshold: Duration) -> Self {
        FreshnessPolicy { threshold }
    }

    /// Thresholds above [`MAX_THRESHOLD_SECS`] are clamped to it.
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::seconds(secs.min(MAX_THRESHOLD_SECS) as i64))
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// `now − updated <= threshold` is fresh (inclusive boundary). A stamp
    /// that is missing, zero or unparseable is always unknown.
    pub fn classify(&self, stamp: Option<&UpdateStamp>, now: DateTime<Utc>) -> FreshnessReport {
        let Some(updated_at) = stamp.and_then(parse_update_stamp) else {
            return FreshnessReport {
                status: Freshness::Unknown,
                age: None,
                display: None,
            };
        };

        let age = now.signed_duration_since(updated_at);
        let status = if age <= self.threshold {
            Freshness::Fresh
        } else {
            Freshness::Stale
        };

        FreshnessReport {
            status,
            age: Some(age),
            display: Some(
                updated_at
                    .with_timezone(&Local)
                    .format(DISPLAY_FORMAT)
                    .to_string(),
            ),
        }
    }
}

/// Interpret a feed timestamp as a UTC instant.
///
/// Numbers (and numeric strings) are epoch seconds. Strings are RFC 3339;
/// offset-less ISO strings are taken as UTC.
pub fn parse_update_stamp(stamp: &UpdateStamp) -> Option<DateTime<Utc>> {
    match stamp {
        UpdateStamp::Epoch(secs) => from_epoch_secs(*secs),
        UpdateStamp::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            if let Ok(secs) = text.parse::<f64>() {
                return from_epoch_secs(secs);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"));
            match naive {
                Ok(n) => Some(n.and_utc()),
                Err(e) => {
                    debug!("Unparseable update time '{}': {}", text, e);
                    None
                }
            }
        }
    }
}

fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    let whole = secs.trunc();
    let nanos = ((secs - whole) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}
