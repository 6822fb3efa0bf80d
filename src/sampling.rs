//! Uniform sampling without replacement over the not-yet-visited images.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{trace, warn};

use crate::catalog::Catalog;
use crate::events::ImageId;
use crate::visited::VisitedStore;

/// Picks the next image to preload. Owns its RNG; one instance per thread.
///
/// Images that failed to decode are skipped for the rest of the current
/// cycle but never marked visited, so they are retried after the next reset
/// and cannot stall the cycle.
#[derive(Debug)]
pub struct SamplingPolicy {
    rng: StdRng,
    skipped: HashSet<ImageId>,
}

impl SamplingPolicy {
    /// Deterministic sampling, for reproducible runs and tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_os_rng, Self::seeded)
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            skipped: HashSet::new(),
        }
    }

    /// Exclude `id` from sampling until the next reset.
    pub fn skip_for_cycle(&mut self, id: ImageId) {
        self.skipped.insert(id);
    }

    pub fn skipped(&self) -> usize {
        self.skipped.len()
    }

    /// Reset the visited history once every catalog entry has been visited
    /// (or skipped this cycle).
    ///
    /// A skipped image counts as covered, so one failed decode, even a
    /// transient one, keeps that image out for the rest of the cycle rather
    /// than only for that attempt. It becomes eligible again after the reset.
    ///
    /// Returns `true` when a reset happened. Once cleared, the history no
    /// longer covers the non-empty catalog, so repeated calls do not clear
    /// again until the next cycle completes.
    pub fn reset_if_exhausted(&mut self, catalog: &Catalog, visited: &VisitedStore) -> bool {
        if !visited.reset_if_covers(catalog, &self.skipped) {
            return false;
        }
        if !self.skipped.is_empty() {
            warn!(
                skipped = self.skipped.len(),
                "cycle ended with undecodable images; they will be retried"
            );
            self.skipped.clear();
        }
        true
    }

    /// Choose one unvisited, unskipped image uniformly at random.
    ///
    /// Returns `None` when nothing is left; the caller is expected to reset
    /// the history and retry after a short backoff.
    pub fn pick_unvisited(&mut self, catalog: &Catalog, visited: &VisitedStore) -> Option<ImageId> {
        let skipped = &self.skipped;
        let candidates: Vec<&ImageId> = visited.with_visited(|seen| {
            catalog
                .iter()
                .filter(|id| !seen.contains(*id) && !skipped.contains(*id))
                .collect()
        });
        trace!(candidates = candidates.len(), "sampling unvisited image");
        candidates.choose(&mut self.rng).map(|id| (*id).clone())
    }
}
