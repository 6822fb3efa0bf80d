//! Durable record of the images already shown since the last reset.
//!
//! The record is a single JSON object holding the identifiers under the
//! `visitedPaths` key. It is rewritten in full on every mutation so a crash
//! loses at most the image being marked. Any other keys found in the file are
//! carried over on rewrite.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::events::ImageId;

#[derive(Debug, Default, Deserialize)]
struct VisitedRecord {
    #[serde(rename = "visitedPaths", default)]
    visited_paths: Vec<ImageId>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default)]
struct VisitedState {
    ids: HashSet<ImageId>,
    // Insertion order, mirrored into the file.
    order: Vec<ImageId>,
    extra: serde_json::Map<String, serde_json::Value>,
    resets: u64,
}

/// Set of visited images, persisted to a JSON file.
///
/// All access goes through one lock that is never shared with the frame
/// buffer. The visited count is mirrored into an atomic so the foreground
/// loop can read it without waiting on a write in progress.
#[derive(Debug)]
pub struct VisitedStore {
    path: PathBuf,
    state: Mutex<VisitedState>,
    count: AtomicUsize,
}

impl VisitedStore {
    /// Load the persisted set from `path`.
    ///
    /// A missing or malformed file yields an empty set and a warning; the
    /// process continues without history.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record = match read_record(&path) {
            Ok(Some(record)) => {
                info!(
                    path = %path.display(),
                    visited = record.visited_paths.len(),
                    "loaded visited history"
                );
                record
            }
            Ok(None) => {
                warn!(path = %path.display(), "visited db not found; starting with empty history");
                VisitedRecord::default()
            }
            Err(err) => {
                warn!(path = %path.display(), "failed to read visited db; starting with empty history: {err:#}");
                VisitedRecord::default()
            }
        };

        let mut state = VisitedState {
            extra: record.extra,
            ..VisitedState::default()
        };
        for id in record.visited_paths {
            if state.ids.insert(id.clone()) {
                state.order.push(id);
            }
        }
        let count = AtomicUsize::new(state.ids.len());
        Self {
            path,
            state: Mutex::new(state),
            count,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of visited images; never blocks on persistence.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times the history was cleared during this process.
    pub fn resets(&self) -> u64 {
        self.lock().resets
    }

    /// `true` when every catalog entry has been visited. This is a subset
    /// test; equal sizes alone do not count.
    pub fn covers(&self, catalog: &Catalog) -> bool {
        let state = self.lock();
        catalog.iter().all(|id| state.ids.contains(id))
    }

    pub fn contains(&self, id: &ImageId) -> bool {
        self.lock().ids.contains(id)
    }

    /// Run `f` against the in-memory set while holding the store lock.
    pub fn with_visited<R>(&self, f: impl FnOnce(&HashSet<ImageId>) -> R) -> R {
        f(&self.lock().ids)
    }

    /// Record `id` as shown and persist the full set.
    ///
    /// Returns `false` (and touches nothing) when `id` was already recorded.
    /// A failed write is logged; the in-memory set stays authoritative.
    pub fn mark_visited(&self, id: &ImageId) -> bool {
        let mut state = self.lock();
        if !state.ids.insert(id.clone()) {
            return false;
        }
        state.order.push(id.clone());
        self.count.store(state.ids.len(), Ordering::Release);
        debug!(path = %id, visited = state.ids.len(), "marked visited");
        self.persist(&state);
        true
    }

    /// Forget every visited image, in memory and on disk.
    pub fn clear(&self) {
        let mut state = self.lock();
        self.clear_locked(&mut state);
    }

    /// Clear the history if it covers every catalog entry, counting the
    /// `skipped` images as covered.
    ///
    /// The check and the clear happen under one lock acquisition, so a single
    /// exhaustion event produces exactly one reset. Returns whether it reset.
    pub fn reset_if_covers(&self, catalog: &Catalog, skipped: &HashSet<ImageId>) -> bool {
        let mut state = self.lock();
        let ids = &state.ids;
        if !catalog.iter().all(|id| ids.contains(id) || skipped.contains(id)) {
            return false;
        }
        info!(
            visited = state.ids.len(),
            skipped = skipped.len(),
            catalog = catalog.len(),
            "all images have been visited; resetting history"
        );
        self.clear_locked(&mut state);
        true
    }

    /// Drop entries that are not part of `catalog`, rewriting the file if
    /// anything was removed. Returns the number of pruned entries.
    pub fn retain_catalog(&self, catalog: &Catalog) -> usize {
        let known: HashSet<&ImageId> = catalog.iter().collect();
        let mut state = self.lock();
        let before = state.ids.len();
        state.ids.retain(|id| known.contains(id));
        let VisitedState { ids, order, .. } = &mut *state;
        order.retain(|id| ids.contains(id));
        let pruned = before - state.ids.len();
        if pruned > 0 {
            self.count.store(state.ids.len(), Ordering::Release);
            info!(pruned, remaining = state.ids.len(), "pruned stale visited entries");
            self.persist(&state);
        }
        pruned
    }

    fn clear_locked(&self, state: &mut VisitedState) {
        state.ids.clear();
        state.order.clear();
        state.resets += 1;
        self.count.store(0, Ordering::Release);
        self.persist(state);
    }

    fn persist(&self, state: &VisitedState) {
        if let Err(err) = write_record(&self.path, state) {
            warn!(path = %self.path.display(), "failed to persist visited history: {err:#}");
        }
    }

    fn lock(&self) -> MutexGuard<'_, VisitedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_record(path: &Path) -> Result<Option<VisitedRecord>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("failed to read {}", path.display())),
    };
    let record = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(record))
}

#[derive(Serialize)]
struct VisitedRecordRef<'a> {
    #[serde(rename = "visitedPaths")]
    visited_paths: &'a [ImageId],
    #[serde(flatten)]
    extra: &'a serde_json::Map<String, serde_json::Value>,
}

fn write_record(path: &Path, state: &VisitedState) -> Result<()> {
    let record = VisitedRecordRef {
        visited_paths: &state.order,
        extra: &state.extra,
    };
    let mut body = serde_json::to_string_pretty(&record)?;
    body.push('\n');

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
