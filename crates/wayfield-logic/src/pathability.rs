//! Pathability cache and adjacency generation.
//!
//! The navigation layer asks "would I route through this cell?" far more
//! often than terrain changes, so answers are memoized per cell. Most cells
//! decide once and stay decided; some (a keyed door, a member-only passage)
//! are pathable only for movers satisfying a condition. Caching a single
//! boolean for those would be wrong for every other mover, so they classify
//! as `Unstable` and bypass the cache on every query while the static
//! majority stays fast.
//!
//! The cache is owned by the world collaborator and is expected to be
//! rebuilt or surgically invalidated as cells change; a stale
//! `Pathable`/`Impathable` entry must never outlive a mutation to the cell
//! it describes.

use crate::grid::{GridKey, SparseChunkedMap};
use crate::heatmap::SourceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-cell cache state.
///
/// `Unknown` is the initial and post-invalidation state. `Unstable` entries
/// are never reused across calls — they mean "recompute every time, the
/// answer depends on the mover".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pathability {
    #[default]
    Unknown,
    Unstable,
    Pathable,
    Impathable,
}

/// Tri-state answer from the terrain collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathVerdict {
    Pathable,
    Impathable,
    /// Depends on who is asking; resolved per mover, never cached.
    MoverDependent,
}

/// Terrain collaborator seam.
pub trait PathOracle {
    /// Classify a cell independent of any mover.
    fn classify(&self, location: GridKey) -> PathVerdict;

    /// Resolve a mover-dependent cell for one mover. Only consulted for
    /// cells that classified `MoverDependent`.
    fn pathable_for(&self, mover: SourceId, location: GridKey) -> bool;
}

/// Memoized pathability answers plus non-geometric connections.
#[derive(Debug, Clone, Default)]
pub struct PathabilityCache {
    cells: SparseChunkedMap<Pathability>,
    /// Portal-style links: source cell to reachable far cells.
    links: HashMap<GridKey, Vec<GridKey>>,
}

impl PathabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is `location` pathable for `mover`?
    ///
    /// Cached `Pathable`/`Impathable` answers return directly. `Unstable`
    /// cells recompute through the oracle every call. `Unknown` cells
    /// classify once and cache the verdict.
    pub fn query(
        &mut self,
        mover: SourceId,
        location: GridKey,
        oracle: &impl PathOracle,
    ) -> bool {
        match self.cells.get(location) {
            Pathability::Pathable => true,
            Pathability::Impathable => false,
            Pathability::Unstable => oracle.pathable_for(mover, location),
            Pathability::Unknown => match oracle.classify(location) {
                PathVerdict::Pathable => {
                    self.cells.set(location, Pathability::Pathable);
                    true
                }
                PathVerdict::Impathable => {
                    self.cells.set(location, Pathability::Impathable);
                    false
                }
                PathVerdict::MoverDependent => {
                    self.cells.set(location, Pathability::Unstable);
                    oracle.pathable_for(mover, location)
                }
            },
        }
    }

    /// Force a cell back to `Unknown`. Call whenever terrain, blockers, or
    /// carried items change at that cell.
    pub fn invalidate(&mut self, location: GridKey) {
        if self.cells.get_ref(location).is_some() {
            self.cells.set(location, Pathability::Unknown);
        }
    }

    /// Drop every cached answer (links are kept).
    pub fn invalidate_all(&mut self) {
        self.cells.clear();
    }

    /// Register a non-geometric connection (teleporter, ladder, portal).
    pub fn add_link(&mut self, from: GridKey, to: GridKey) {
        let targets = self.links.entry(from).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    /// Link targets reachable from a cell.
    pub fn links_from(&self, location: GridKey) -> &[GridKey] {
        self.links.get(&location).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Fill `out` with the cells `mover` can route to from `location`:
    /// the 4 orthogonal neighbors that pass [`Self::query`], plus any link
    /// targets passing the same filter, de-duplicated against the
    /// orthogonal set.
    pub fn adjacent(
        &mut self,
        mover: SourceId,
        location: GridKey,
        oracle: &impl PathOracle,
        out: &mut Vec<GridKey>,
    ) {
        out.clear();
        for neighbor in location.orthogonal_neighbors() {
            if self.query(mover, neighbor, oracle) {
                out.push(neighbor);
            }
        }
        let linked: Vec<GridKey> = self.links_from(location).to_vec();
        for target in linked {
            if !out.contains(&target) && self.query(mover, target, oracle) {
                out.push(target);
            }
        }
    }

    /// Current cache state of a cell (diagnostics and tests).
    pub fn cached_state(&self, location: GridKey) -> Pathability {
        self.cells.get(location)
    }

    /// Every cell holding a decided (non-`Unknown`) state, with that state.
    pub fn cached_cells(&self) -> Vec<(GridKey, Pathability)> {
        self.cells
            .locations()
            .filter_map(|key| match self.cells.get(key) {
                Pathability::Unknown => None,
                state => Some((key, state)),
            })
            .collect()
    }
}
