//! Durable snapshot vault: matchup label → most recent [`QuoteSet`].
//!
//! The backing file is one JSON object mapping each label to an array of
//! quotes. Every `put` rewrites the whole file (temp file + rename), so the
//! file on disk is always a complete document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub mod models;
use models::QuoteSet;

use crate::error::PersistenceError;

pub type Vault = BTreeMap<String, QuoteSet>;

pub struct SnapshotStore {
    path: PathBuf,
    entries: Vault,
}

impl SnapshotStore {
    /// Open the vault at `path`, loading whatever is on disk. Never fails:
    /// a missing or corrupt file starts an empty vault.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = SnapshotStore {
            path: path.into(),
            entries: Vault::new(),
        };
        let added = store.reload();
        info!("Snapshot vault {}: {} matchup(s)", store.path.display(), added);
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the backing file. Failures are logged and yield an empty map.
    pub fn load(&self) -> Vault {
        match read_vault(&self.path) {
            Ok(vault) => vault,
            Err(e) => {
                warn!("Ignoring unreadable snapshot file: {}", e);
                Vault::new()
            }
        }
    }

    /// Merge the backing file into memory; entries already in memory win.
    /// Returns how many matchups were added.
    pub fn reload(&mut self) -> usize {
        let disk = self.load();
        merge_into(disk, &mut self.entries)
    }

    pub fn get(&self, matchup: &str) -> Option<&QuoteSet> {
        self.entries.get(matchup)
    }

    pub fn entries(&self) -> &Vault {
        &self.entries
    }

    /// Replace the snapshot for `matchup` and persist immediately.
    ///
    /// The in-memory entry is kept even when the write fails.
    pub fn put(&mut self, matchup: &str, set: QuoteSet) -> Result<(), PersistenceError> {
        self.entries.insert(matchup.to_string(), set);
        self.save()
    }

    /// Rewrite the backing file with the full in-memory vault.
    pub fn save(&self) -> Result<(), PersistenceError> {
        let contents = serde_json::to_string_pretty(&self.entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, contents).map_err(|source| PersistenceError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            "Saved {} snapshot(s) to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Read and parse a vault file. A missing file is an empty vault.
pub fn read_vault(path: &Path) -> Result<Vault, PersistenceError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No snapshot file at {}, starting fresh", path.display());
            return Ok(Vault::new());
        }
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&contents).map_err(|source| PersistenceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Add the `disk` entries that `memory` does not already hold.
pub fn merge_into(disk: Vault, memory: &mut Vault) -> usize {
    let mut added = 0;
    for (matchup, set) in disk {
        if !memory.contains_key(&matchup) {
            memory.insert(matchup, set);
            added += 1;
        }
    }
    added
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
