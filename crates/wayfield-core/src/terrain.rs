//! Terrain model and the pathability oracle over it.
//!
//! Tiles live in the same sparse chunked store as everything else.
//! Unwritten cells read as a configurable default — `Open` for outdoor
//! maps, `Wall` for carved-out dungeons.

use crate::components::{CarriedBy, PortalKey};
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use wayfield_logic::grid::{GridKey, SparseChunkedMap};
use wayfield_logic::heatmap::SourceId;
use wayfield_logic::pathability::{PathOracle, PathVerdict};

/// One terrain cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Open,
    Wall,
    /// Passage only for movers carrying a [`PortalKey`] matching `key_tag`.
    Keyed { key_tag: String },
}

/// Sparse tile storage with a default for unwritten cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainGrid {
    tiles: SparseChunkedMap<Option<Tile>>,
    default_tile: Tile,
}

impl TerrainGrid {
    pub fn new(default_tile: Tile) -> Self {
        Self {
            tiles: SparseChunkedMap::new(),
            default_tile,
        }
    }

    /// Open-by-default grid, the common case for overland maps.
    pub fn open() -> Self {
        Self::new(Tile::Open)
    }

    pub fn set(&mut self, location: GridKey, tile: Tile) {
        self.tiles.set(location, Some(tile));
    }

    pub fn tile_at(&self, location: GridKey) -> &Tile {
        match self.tiles.get_ref(location) {
            Some(Some(tile)) => tile,
            _ => &self.default_tile,
        }
    }
}

/// [`PathOracle`] view bundling terrain with the world, so keyed tiles can
/// be resolved against what a mover actually carries.
pub struct TerrainView<'a> {
    pub terrain: &'a TerrainGrid,
    pub world: &'a World,
}

impl<'a> TerrainView<'a> {
    pub fn new(terrain: &'a TerrainGrid, world: &'a World) -> Self {
        Self { terrain, world }
    }

    /// Does `mover` carry (directly or nested) a key with this tag?
    fn mover_has_key(&self, mover: Entity, key_tag: &str) -> bool {
        for (_, (key, carried)) in self.world.query::<(&PortalKey, &CarriedBy)>().iter() {
            if key.0 == key_tag && self.is_in_inventory_of(carried.0, mover) {
                return true;
            }
        }
        false
    }

    fn is_in_inventory_of(&self, holder: Entity, mover: Entity) -> bool {
        let mut current = holder;
        for _ in 0..8 {
            if current == mover {
                return true;
            }
            match self.world.get::<&CarriedBy>(current) {
                Ok(carried) => current = carried.0,
                Err(_) => return false,
            }
        }
        false
    }
}

impl PathOracle for TerrainView<'_> {
    fn classify(&self, location: GridKey) -> PathVerdict {
        match self.terrain.tile_at(location) {
            Tile::Open => PathVerdict::Pathable,
            Tile::Wall => PathVerdict::Impathable,
            Tile::Keyed { .. } => PathVerdict::MoverDependent,
        }
    }

    fn pathable_for(&self, mover: SourceId, location: GridKey) -> bool {
        match self.terrain.tile_at(location) {
            Tile::Keyed { key_tag } => match Entity::from_bits(mover.0) {
                Some(entity) => self.mover_has_key(entity, key_tag),
                None => false,
            },
            // A cell that changed under a stale Unstable entry still
            // answers; statically this time.
            Tile::Open => true,
            Tile::Wall => false,
        }
    }
}
