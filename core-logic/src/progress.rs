//! # Progress Store
//!
//! Durable set of recipient addresses that already received their tokens.
//! The file is a JSON array of canonical address strings and is replaced
//! atomically (temp file + rename) on every save, so a crash mid-write
//! leaves either the previous or the new contents on disk.
//!
//! Transfers confirmed for a batch that is not fully paid yet live in a
//! pending ledger next to it (`<stem>.pending.json`, token -> addresses),
//! written the same way. A restart skips those (token, address) pairs and
//! the entries are dropped once the addresses are marked paid.
//!
//! Only one process may use a given file at a time; concurrent writers
//! silently overwrite each other.

use crate::error::PersistenceError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    paid: BTreeSet<String>,
    pending_path: PathBuf,
    pending: BTreeMap<String, BTreeSet<String>>,
}

impl ProgressStore {
    pub const DEFAULT_FILE: &'static str = "processed_addresses.json";

    /// Load the persisted set. Absent file means empty; unreadable or
    /// corrupt content is logged and also treated as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let paid: BTreeSet<String> = read_json(&path).unwrap_or_default();
        info!(
            "Loaded {} processed addresses from {}",
            paid.len(),
            path.display()
        );

        let pending_path = pending_path_for(&path);
        let pending: BTreeMap<String, BTreeSet<String>> =
            read_json(&pending_path).unwrap_or_default();
        if !pending.is_empty() {
            info!(
                "Resuming with {} tokens already confirmed for an unfinished batch",
                pending.len()
            );
        }

        Self {
            path,
            paid,
            pending_path,
            pending,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, address: &str) -> bool {
        self.paid.contains(address)
    }

    pub fn len(&self) -> usize {
        self.paid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paid.is_empty()
    }

    pub fn addresses(&self) -> &BTreeSet<String> {
        &self.paid
    }

    pub fn pending_path(&self) -> &Path {
        &self.pending_path
    }

    /// True when `token` already went out to `address` in a batch that has
    /// not been marked paid.
    pub fn is_confirmed(&self, token: &str, address: &str) -> bool {
        self.pending
            .get(token)
            .is_some_and(|addresses| addresses.contains(address))
    }

    /// Record a confirmed transfer of `token` to `addresses` and persist the
    /// pending ledger before returning. Memory is updated even on failure.
    pub fn mark_confirmed<I, S>(
        &mut self,
        token: &str,
        addresses: I,
    ) -> Result<(), PersistenceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending
            .entry(token.to_string())
            .or_default()
            .extend(addresses.into_iter().map(Into::into));
        write_json(&self.pending_path, &self.pending)
    }

    /// Record addresses as paid and persist before returning.
    ///
    /// The in-memory set is updated even when the write fails, so this run
    /// will not pay them twice; only a restart could.
    pub fn mark_paid<I, S>(&mut self, addresses: I) -> Result<usize, PersistenceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let addresses: Vec<String> = addresses.into_iter().map(Into::into).collect();
        let mut added = 0;
        for address in &addresses {
            if self.paid.insert(address.clone()) {
                added += 1;
            }
        }

        self.save()?;
        debug!("Marked {} new addresses as paid ({} total)", added, self.len());
        self.settle_pending(&addresses)?;
        Ok(added)
    }

    /// Write the whole set atomically.
    pub fn save(&self) -> Result<(), PersistenceError> {
        write_json(&self.path, &self.paid)
    }

    /// Drop pending entries for addresses that are now paid.
    fn settle_pending(&mut self, addresses: &[String]) -> Result<(), PersistenceError> {
        let mut changed = false;
        for confirmed in self.pending.values_mut() {
            for address in addresses {
                changed |= confirmed.remove(address);
            }
        }
        self.pending.retain(|_, confirmed| !confirmed.is_empty());

        if !changed {
            return Ok(());
        }
        if self.pending.is_empty() {
            return match fs::remove_file(&self.pending_path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    Err(PersistenceError::Write {
                        path: self.pending_path.display().to_string(),
                        source: e,
                    })
                }
                _ => Ok(()),
            };
        }
        write_json(&self.pending_path, &self.pending)
    }
}

fn pending_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "progress".to_string());
    path.with_file_name(format!("{}.pending.json", stem))
}

/// `None` when the file is absent or unusable; the latter is logged.
fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Error reading progress file {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                "Progress file {} is not valid JSON, starting empty: {}",
                path.display(),
                e
            );
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let json = serde_json::to_vec_pretty(value)?;

    let io_err = |source: std::io::Error| PersistenceError::Write {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&json).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}
