//! Influence maps: signed heat fields with decay, diffusion, and move picking.
//!
//! Heat is a signed `i32` per cell — positive attracts, negative repels,
//! zero means "no data / fully cooled". Each turn a map is cooled, re-seeded
//! from its sources, and diffused a bounded number of steps. Diffusion is a
//! relaxation over the 4-neighborhood: each cell offers a one-step-decayed
//! copy of its heat to passable neighbors that hold less. The result is a
//! bounded-radius potential field, exact Manhattan distance through passable
//! terrain up to the map's range, at a fraction of the cost of pathfinding.
//!
//! All updates within one diffusion round are computed from a pre-round
//! snapshot and applied at the end of the round, so the outcome never
//! depends on internal iteration order.

use crate::grid::{cell_at, GridKey, SparseChunkedMap};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Signed heat magnitude stored per cell.
pub type Heat = i32;

/// Weak handle to the entity a heat contribution came from.
///
/// Deliberately not a live reference — the map must never keep entities
/// alive or dangle when they die. `wayfield-core` packs `hecs::Entity` bits
/// in here; tests use arbitrary integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u64);

/// Read-only snapshot of why a cell has heat, taken at injection time.
///
/// The label is cosmetic — it survives into debug output and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatSource {
    pub id: SourceId,
    pub label: String,
}

impl HeatSource {
    pub fn new(id: SourceId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// One cell of an influence map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub source: Option<HeatSource>,
    pub heat: Heat,
}

/// Move `value` toward zero by `amount`, never crossing zero.
pub fn reduce_toward_zero(value: Heat, amount: i32) -> Heat {
    if amount <= 0 {
        return value;
    }
    let magnitude = value.saturating_abs().saturating_sub(amount).max(0);
    if value < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Scale heat by a float factor, saturating at the `i32` bounds.
pub fn scale_heat(heat: Heat, factor: f32) -> Heat {
    // f64 -> i32 casts saturate (and map NaN to 0), which is exactly the
    // recovery policy for overflow during scaling.
    (heat as f64 * factor as f64) as Heat
}

/// One update's worth of source contributions, staged before injection.
///
/// Contributions targeting the same cell sum (saturating); the stored
/// source is the contributor with the largest absolute single contribution.
#[derive(Debug, Default)]
pub struct InjectionBatch {
    staged: HashMap<GridKey, StagedCell>,
}

#[derive(Debug)]
struct StagedCell {
    sum: Heat,
    dominant_abs: u32,
    dominant: HeatSource,
}

impl InjectionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage one contribution. Zero heat contributes nothing.
    pub fn add(&mut self, location: GridKey, source: HeatSource, heat: Heat) {
        if heat == 0 {
            return;
        }
        let abs = heat.unsigned_abs();
        match self.staged.get_mut(&location) {
            Some(cell) => {
                cell.sum = cell.sum.saturating_add(heat);
                if abs > cell.dominant_abs {
                    cell.dominant_abs = abs;
                    cell.dominant = source;
                }
            }
            None => {
                self.staged.insert(
                    location,
                    StagedCell {
                        sum: heat,
                        dominant_abs: abs,
                        dominant: source,
                    },
                );
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// A named signed-heat field over the sparse grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluenceMap {
    /// Display tag for debugging; carries no semantics.
    pub name: String,
    cells: SparseChunkedMap<Slot>,
    /// Fractional cooling carried across turns so sub-1.0 rates still bite.
    residual_cooling: f32,
}

impl InfluenceMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: SparseChunkedMap::new(),
            residual_cooling: 0.0,
        }
    }

    /// Heat at a cell; zero if unset.
    pub fn heat_at(&self, location: GridKey) -> Heat {
        self.cells.get_ref(location).map_or(0, |slot| slot.heat)
    }

    /// Source label at a cell, if any.
    pub fn source_at(&self, location: GridKey) -> Option<&HeatSource> {
        self.cells.get_ref(location).and_then(|slot| slot.source.as_ref())
    }

    /// True if no cell holds nonzero heat.
    pub fn is_cold(&self) -> bool {
        let mut cold = true;
        self.cells.for_each_chunk(|_, slots| {
            if slots.iter().any(|slot| slot.heat != 0) {
                cold = false;
            }
        });
        cold
    }

    /// Move every nonzero cell toward zero by `amount`, then drop chunks
    /// that cooled all the way down.
    pub fn reduce(&mut self, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.cells.for_each_chunk_mut(|_, slots| {
            for slot in slots.iter_mut() {
                if slot.heat == 0 {
                    continue;
                }
                slot.heat = reduce_toward_zero(slot.heat, amount);
                if slot.heat == 0 {
                    slot.source = None;
                }
            }
        });
        self.cells
            .purge(|slots| slots.iter().all(|slot| slot.heat == 0 && slot.source.is_none()));
    }

    /// Accumulate a fractional cooling rate and apply the whole part.
    ///
    /// The remainder carries over, so a rate of 0.5 reduces by 1 every
    /// second call instead of never.
    pub fn cool(&mut self, rate: f32) {
        if rate > 0.0 {
            self.residual_cooling += rate;
        }
        let whole = self.residual_cooling.floor();
        if whole >= 1.0 {
            self.reduce(whole as i32);
            self.residual_cooling -= whole;
        }
    }

    /// Set each staged cell's slot directly (source cells, before diffusion).
    pub fn inject(&mut self, batch: InjectionBatch) {
        for (location, staged) in batch.staged {
            let slot = if staged.sum == 0 {
                // Contributions cancelled exactly; the cell carries no data.
                Slot::default()
            } else {
                Slot {
                    source: Some(staged.dominant),
                    heat: staged.sum,
                }
            };
            self.cells.set(location, slot);
        }
    }

    /// Convenience for a single source cell.
    pub fn inject_one(&mut self, location: GridKey, source: HeatSource, heat: Heat) {
        let mut batch = InjectionBatch::new();
        batch.add(location, source, heat);
        self.inject(batch);
    }

    /// Run up to `steps` relaxation rounds, stopping early once stable.
    ///
    /// One round: every cell with heat `h` offers `m = |h|-1` (sign kept) to
    /// each passable orthogonal neighbor currently holding less magnitude.
    /// Rounds read a consistent pre-round snapshot; staged writes are
    /// applied together at the end, largest magnitude winning when two
    /// spreads target the same cell and equal magnitudes resolving to the
    /// larger signed value.
    pub fn diffuse(&mut self, steps: i32, passable: impl Fn(GridKey) -> bool) {
        for _ in 0..steps.max(0) {
            if !self.diffuse_round(&passable) {
                break;
            }
        }
    }

    fn diffuse_round(&mut self, passable: &impl Fn(GridKey) -> bool) -> bool {
        let mut sources: Vec<(GridKey, Slot)> = Vec::new();
        self.cells.for_each_chunk(|origin, slots| {
            for (index, slot) in slots.iter().enumerate() {
                if slot.heat != 0 {
                    sources.push((cell_at(origin, index), slot.clone()));
                }
            }
        });
        if sources.is_empty() {
            return false;
        }

        let mut pending: HashMap<GridKey, Slot> = HashMap::new();
        for (location, slot) in &sources {
            let spread = reduce_toward_zero(slot.heat, 1);
            if spread == 0 {
                continue;
            }
            let spread_abs = spread.unsigned_abs();
            for neighbor in location.orthogonal_neighbors() {
                if !passable(neighbor) {
                    continue;
                }
                if self.heat_at(neighbor).unsigned_abs() >= spread_abs {
                    continue;
                }
                let stronger = pending.get(&neighbor).map_or(true, |staged| {
                    let staged_abs = staged.heat.unsigned_abs();
                    // equal magnitudes resolve by signed value so the
                    // outcome never depends on chunk iteration order
                    staged_abs < spread_abs
                        || (staged_abs == spread_abs && staged.heat < spread)
                });
                if stronger {
                    pending.insert(
                        neighbor,
                        Slot {
                            source: slot.source.clone(),
                            heat: spread,
                        },
                    );
                }
            }
        }

        if pending.is_empty() {
            return false;
        }
        for (location, slot) in pending {
            self.cells.set(location, slot);
        }
        true
    }

    /// Pick the candidate with the numerically largest nonzero heat.
    ///
    /// Selection is by signed value, not magnitude — attraction beats
    /// repulsion when both are on offer, because the caller already
    /// filtered to cells the agent is willing to enter. Ties are broken
    /// uniformly at random. Returns `None` when every candidate reads zero.
    pub fn pick_best_move(
        &self,
        candidates: &[GridKey],
        rng: &mut impl Rng,
    ) -> Option<GridKey> {
        let mut best: Heat = 0;
        let mut winners: Vec<GridKey> = Vec::new();
        for &candidate in candidates {
            let heat = self.heat_at(candidate);
            if heat == 0 {
                continue;
            }
            if winners.is_empty() || heat > best {
                best = heat;
                winners.clear();
                winners.push(candidate);
            } else if heat == best {
                winners.push(candidate);
            }
        }
        match winners.len() {
            0 => None,
            1 => Some(winners[0]),
            n => Some(winners[rng.gen_range(0..n)]),
        }
    }

    /// Drop all heat and reset the cooling accumulator.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.residual_cooling = 0.0;
    }

    #[cfg(test)]
    fn residual(&self) -> f32 {
        self.residual_cooling
    }
}
