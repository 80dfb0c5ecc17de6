//! Failure taxonomy for the tracker.
//!
//! Every variant here is recoverable: fetch failures degrade to "no events",
//! persistence failures leave the in-memory vault intact.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Upstream feed could not produce a usable event list.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, DNS or TLS failure
    #[error("request failed: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response
    #[error("upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Body was not valid JSON
    #[error("malformed response body: {0}")]
    Decode(String),

    /// Valid JSON, but not the list of events we asked for
    #[error("expected a list of events, got {0}")]
    Shape(String),
}

/// Snapshot file could not be read or written.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshots: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A scan could not start.
#[derive(Error, Debug)]
pub enum ScanError {
    /// `notices` carries any feed failures from the refresh, which are
    /// usually why the event is missing.
    #[error("no event '{matchup}' in the current catalogue")]
    UnknownMatchup {
        matchup: String,
        notices: Vec<String>,
    },
}
