//! Navigation system - one turn of influence-map move planning.
//!
//! Two-phase like the other systems: collect acting agents from an
//! immutable world view, then plan each agent's move and hand the planned
//! moves back for the engine to apply. Occupancy is respected at planning
//! time — a cell under another blocker is not a candidate even when the
//! terrain there is pathable.

use crate::components::{Agent, Blocker, Position, Preferences, Suspended};
use crate::registry::{source_id, WorldRegistry};
use crate::terrain::{TerrainGrid, TerrainView};
use hecs::{Entity, World};
use rand::Rng;
use std::cell::RefCell;
use std::collections::HashSet;
use wayfield_logic::grid::GridKey;
use wayfield_logic::heatmap::SourceId;
use wayfield_logic::pathability::PathabilityCache;

/// One agent's chosen destination for this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedMove {
    pub entity: Entity,
    pub from: GridKey,
    pub to: GridKey,
}

/// Plan moves for every non-suspended agent, in spawn order.
///
/// Per agent: update its preference set (cool, re-seed, diffuse through the
/// pathability cache), ask it to choose among the agent's currently
/// passable neighbors, and fall back to a uniformly random passable
/// neighbor when every map is cold. Agents with no passable neighbor stay
/// put.
pub fn plan_moves(
    world: &World,
    terrain: &TerrainGrid,
    cache: &mut PathabilityCache,
    rng: &mut impl Rng,
    item_scale: Option<&dyn Fn(SourceId) -> f32>,
) -> Vec<PlannedMove> {
    let mut acting: Vec<(Entity, GridKey)> = Vec::new();
    for (entity, (_, pos)) in world.query::<(&Agent, &Position)>().iter() {
        if world.get::<&Suspended>(entity).is_ok() {
            continue;
        }
        acting.push((entity, pos.0));
    }
    if acting.is_empty() {
        return Vec::new();
    }

    // occupancy: cells held by blockers, kept current as each agent in
    // turn order commits a move
    let mut occupied: HashSet<GridKey> = world
        .query::<(&Blocker, &Position)>()
        .iter()
        .map(|(_, (_, pos))| pos.0)
        .collect();

    let oracle = TerrainView::new(terrain, world);
    let registry = WorldRegistry::new(world);
    let cache = RefCell::new(cache);

    let mut moves = Vec::new();
    let mut neighbors = Vec::new();
    for (entity, from) in acting {
        let mover = source_id(entity);
        cache
            .borrow_mut()
            .adjacent(mover, from, &oracle, &mut neighbors);
        let candidates: Vec<GridKey> = neighbors
            .iter()
            .copied()
            .filter(|cell| !occupied.contains(cell))
            .collect();

        let Ok(mut prefs) = world.get::<&mut Preferences>(entity) else {
            continue;
        };
        let Preferences { set, awareness } = &mut *prefs;
        set.update(
            &registry,
            |cell| cache.borrow_mut().query(mover, cell, &oracle),
            awareness,
            item_scale,
        );

        if candidates.is_empty() {
            continue;
        }
        let to = match set.choose_move(&candidates, rng) {
            Some(choice) => choice,
            // every map cold over the candidates: wander
            None => candidates[rng.gen_range(0..candidates.len())],
        };
        drop(prefs);
        if world.get::<&Blocker>(entity).is_ok() {
            occupied.remove(&from);
            occupied.insert(to);
        }
        moves.push(PlannedMove { entity, from, to });
    }
    moves
}

/// Apply planned moves to the world.
pub fn apply_moves(world: &mut World, moves: &[PlannedMove]) {
    for planned in moves {
        let _ = world.insert_one(planned.entity, Position(planned.to));
    }
}
