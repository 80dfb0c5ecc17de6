//! Conversion between decimal (European) and American odds.
//!
//! Decimal odds `d` are the total payout per unit staked, so `d > 1.0` for
//! any bet worth placing.  American odds are a signed integer:
//!   d >= 2.0  (underdog)  →  +(d − 1)·100        profit on a $100 stake
//!   d <  2.0  (favorite)  →  −100 / (d − 1)      stake needed to win $100
//!
//! Rounding policy:
//!   * underdog prices are floored, so the displayed payout never exceeds
//!     the real one;
//!   * favorite prices are rounded to the nearest integer (half away from
//!     zero), which is what the major US books print.
//!
//! `d == 2.0` is the boundary and converts to exactly `+100`.
//!
//! Degenerate input (`d <= 1.0`, NaN, infinities, or a result outside the
//! `i32` range) yields `None`, the "unavailable" sentinel. Callers render it
//! with [`format_american`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Absorbs binary representation error before flooring, e.g.
/// `(2.3 − 1.0) · 100 == 129.99999999999997`.
const FLOOR_EPS: f64 = 1e-9;

/// Display marker for an unavailable price.
pub const UNAVAILABLE: &str = "N/A";

/// Price unit requested from the upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddsFormat {
    #[default]
    Decimal,
    American,
}

impl OddsFormat {
    /// Query parameter value understood by the feed.
    pub fn as_param(&self) -> &'static str {
        match self {
            OddsFormat::Decimal => "decimal",
            OddsFormat::American => "american",
        }
    }

    /// Normalize a raw feed price in this format to American odds.
    pub fn to_american(&self, raw_price: f64) -> Option<i32> {
        match self {
            OddsFormat::Decimal => decimal_to_american(raw_price),
            OddsFormat::American => american_from_raw(raw_price),
        }
    }
}

/// Convert decimal odds to American odds using the policy described above.
pub fn decimal_to_american(decimal: f64) -> Option<i32> {
    if !decimal.is_finite() || decimal <= 1.0 {
        debug!("Decimal odds {} cannot be converted", decimal);
        return None;
    }

    let american = if decimal >= 2.0 {
        ((decimal - 1.0) * 100.0 + FLOOR_EPS).floor()
    } else {
        (-100.0 / (decimal - 1.0)).round()
    };

    to_i32(american)
}

/// Accept an American price delivered by the feed. Anything with a
/// magnitude below 100 is not a valid American price.
pub fn american_from_raw(raw: f64) -> Option<i32> {
    if !raw.is_finite() || raw.abs() < 100.0 {
        debug!("American odds {} rejected", raw);
        return None;
    }
    to_i32(raw.round())
}

/// Inverse conversion, used for charting decimal prices.
pub fn american_to_decimal(american: i32) -> Option<f64> {
    match american {
        a if a >= 100 => Some(1.0 + a as f64 / 100.0),
        a if a <= -100 => Some(1.0 + 100.0 / (a as f64).abs()),
        _ => None,
    }
}

/// `+150`, `-110`, or the unavailable marker.
pub fn format_american(american: Option<i32>) -> String {
    match american {
        Some(a) if a >= 0 => format!("+{}", a),
        Some(a) => a.to_string(),
        None => UNAVAILABLE.to_string(),
    }
}

fn to_i32(value: f64) -> Option<i32> {
    if value.is_finite() && value.abs() <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        debug!("Converted odds {} out of range", value);
        None
    }
}
