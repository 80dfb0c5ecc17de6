use anyhow::Result;
use std::collections::HashMap;

/// Feed keys that pass the allow-list, with the label each one displays as.
/// Several keys may share a label (Caesars is listed under its old William
/// Hill key by some regions).
pub const DEFAULT_BOOKS: &[(&str, &str)] = &[
    ("draftkings", "DraftKings"),
    ("fanduel", "FanDuel"),
    ("caesars", "Caesars"),
    ("williamhill_us", "Caesars"),
];

/// Allow-list of bookmakers keyed by the feed's bookmaker key.
///
/// Lookups are exact on the (lower-cased) key so that a key which merely
/// contains a known name never matches by accident.
#[derive(Debug, Clone, PartialEq)]
pub struct BookTable {
    labels: HashMap<String, String>,
}

impl Default for BookTable {
    fn default() -> Self {
        BookTable::new(DEFAULT_BOOKS.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }
}

impl BookTable {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut table = BookTable {
            labels: HashMap::new(),
        };
        table.extend(entries);
        table
    }

    /// Add books or relabel existing ones.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, String)>) {
        for (key, label) in entries {
            self.labels.insert(key.trim().to_lowercase(), label.trim().to_string());
        }
    }

    /// Canonical label for an allow-listed key, `None` for everything else.
    pub fn label_for(&self, key: &str) -> Option<&str> {
        self.labels.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Parse a `key=Label` pair as given on the command line.
pub fn parse_book_entry(raw: &str) -> Result<(String, String)> {
    let Some((key, label)) = raw.split_once('=') else {
        anyhow::bail!("book entry '{}' must look like key=Label", raw);
    };
    let (key, label) = (key.trim(), label.trim());
    if key.is_empty() || label.is_empty() {
        anyhow::bail!("book entry '{}' has an empty key or label", raw);
    }
    Ok((key.to_string(), label.to_string()))
}
