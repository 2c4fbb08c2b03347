//! Turn engine - main entry point for running the navigation simulation.

use crate::components::*;
use crate::systems::{apply_moves, plan_moves, PlannedMove};
use crate::terrain::{TerrainGrid, Tile};
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wayfield_logic::grid::GridKey;
use wayfield_logic::heatmap::SourceId;
use wayfield_logic::pathability::PathabilityCache;
use wayfield_logic::preference::PreferenceSet;

/// Owns the world, terrain, and pathability cache, and advances turns.
///
/// One call to [`advance_turn`](Self::advance_turn) runs every
/// non-suspended agent once, in spawn order, each agent planning against
/// the occupancy left by the agents before it.
pub struct TurnEngine {
    /// ECS world containing all entities
    pub world: World,
    /// Terrain tiles
    pub terrain: TerrainGrid,
    /// Memoized pathability answers
    pub cache: PathabilityCache,
    rng: StdRng,
    turn: u64,
    item_scale: Option<Box<dyn Fn(SourceId) -> f32>>,
}

impl TurnEngine {
    /// Engine over the given terrain, seeded for reproducible tie-breaks.
    pub fn new(terrain: TerrainGrid, seed: u64) -> Self {
        Self {
            world: World::new(),
            terrain,
            cache: PathabilityCache::new(),
            rng: StdRng::seed_from_u64(seed),
            turn: 0,
            item_scale: None,
        }
    }

    /// Install a per-item-type scaling callback for carried-item heat.
    pub fn set_item_scale(&mut self, scale: impl Fn(SourceId) -> f32 + 'static) {
        self.item_scale = Some(Box::new(scale));
    }

    /// Run one turn: every non-suspended agent updates its preference set
    /// and moves. Returns the moves that were applied.
    pub fn advance_turn(&mut self) -> Vec<PlannedMove> {
        let moves = plan_moves(
            &self.world,
            &self.terrain,
            &mut self.cache,
            &mut self.rng,
            self.item_scale.as_deref(),
        );
        apply_moves(&mut self.world, &moves);
        self.turn += 1;
        moves
    }

    /// Turns advanced so far.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Change a terrain tile, invalidating its cached pathability.
    pub fn set_tile(&mut self, location: GridKey, tile: Tile) {
        self.terrain.set(location, tile);
        self.cache.invalidate(location);
    }

    /// Register a non-geometric connection (teleporter, ladder).
    pub fn add_link(&mut self, from: GridKey, to: GridKey) {
        self.cache.add_link(from, to);
    }

    /// Suspend an agent: its preference update and move are skipped until
    /// resumed, heat state untouched.
    pub fn suspend(&mut self, agent: Entity) {
        let _ = self.world.insert_one(agent, Suspended);
    }

    pub fn resume(&mut self, agent: Entity) {
        let _ = self.world.remove_one::<Suspended>(agent);
    }

    /// Spawn a moving agent. Agents occupy their cell.
    pub fn spawn_agent(
        &mut self,
        identity: Identity,
        at: GridKey,
        preferences: PreferenceSet,
    ) -> Entity {
        self.world.spawn((
            Agent,
            Blocker,
            identity,
            Position(at),
            Preferences::new(preferences),
        ))
    }

    /// Spawn a stationary entity on the grid (heat source, scenery).
    pub fn spawn_at(&mut self, identity: Identity, at: GridKey) -> Entity {
        self.world.spawn((identity, Position(at)))
    }

    /// Spawn an entity inside another entity's inventory.
    pub fn spawn_carried(&mut self, identity: Identity, carrier: Entity) -> Entity {
        self.world.spawn((identity, CarriedBy(carrier)))
    }

    /// Move an entity from the grid into a carrier's inventory.
    ///
    /// The vacated cell's pathability is invalidated — a picked-up blocker
    /// or door-relevant item may change the answer there.
    pub fn pick_up(&mut self, item: Entity, carrier: Entity) {
        if let Ok(Position(cell)) = self.world.remove_one::<Position>(item) {
            self.cache.invalidate(cell);
        }
        let _ = self.world.insert_one(item, CarriedBy(carrier));
    }

    /// Drop a carried entity onto the grid.
    pub fn drop_at(&mut self, item: Entity, at: GridKey) {
        let _ = self.world.remove_one::<CarriedBy>(item);
        let _ = self.world.insert_one(item, Position(at));
        self.cache.invalidate(at);
    }

    /// Current cell of an entity, if it stands on the grid.
    pub fn position_of(&self, entity: Entity) -> Option<GridKey> {
        self.world.get::<&Position>(entity).ok().map(|pos| pos.0)
    }

    /// Count agents.
    pub fn agent_count(&self) -> usize {
        self.world.query::<&Agent>().iter().count()
    }

    /// Count registry-visible entities.
    pub fn entity_count(&self) -> usize {
        self.world.query::<&Identity>().iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfield_logic::preference::PreferenceMapConfig;

    fn at(x: i32, y: i32) -> GridKey {
        GridKey::new(x, y, 0)
    }

    fn seek(rules: &str, range: i32) -> PreferenceSet {
        let mut set = PreferenceSet::new();
        set.add_map(PreferenceMapConfig::from_lines("seek", 0, range, 1.0, rules).unwrap());
        set
    }

    #[test]
    fn test_engine_creation() {
        let engine = TurnEngine::new(TerrainGrid::open(), 0);
        assert_eq!(engine.agent_count(), 0);
        assert_eq!(engine.turn(), 0);
    }

    #[test]
    fn test_agent_walks_to_attractor() {
        let mut engine = TurnEngine::new(TerrainGrid::open(), 7);
        let rat = engine.spawn_agent(
            Identity::new("rat", "Creature"),
            at(0, 0),
            seek("Food=12", 6),
        );
        engine.spawn_at(Identity::new("bread", "Food"), at(3, 0));

        for _ in 0..3 {
            engine.advance_turn();
        }
        assert_eq!(engine.position_of(rat), Some(at(3, 0)));
        assert_eq!(engine.turn(), 3);
    }

    #[test]
    fn test_agent_routes_around_wall() {
        let mut terrain = TerrainGrid::open();
        // vertical wall at x=2 with a gap at y=3
        for y in -3..=6 {
            if y != 3 {
                terrain.set(at(2, y), Tile::Wall);
            }
        }
        let mut engine = TurnEngine::new(terrain, 7);
        let rat = engine.spawn_agent(
            Identity::new("rat", "Creature"),
            at(0, 0),
            seek("Food=20", 12),
        );
        engine.spawn_at(Identity::new("bread", "Food"), at(4, 0));

        for _ in 0..20 {
            engine.advance_turn();
        }
        assert_eq!(engine.position_of(rat), Some(at(4, 0)));
    }

    #[test]
    fn test_set_tile_invalidates_and_reroutes() {
        let mut engine = TurnEngine::new(TerrainGrid::open(), 7);
        let rat = engine.spawn_agent(
            Identity::new("rat", "Creature"),
            at(0, 0),
            seek("Food=12", 6),
        );
        engine.spawn_at(Identity::new("bread", "Food"), at(2, 0));
        engine.advance_turn();
        assert_eq!(engine.position_of(rat), Some(at(1, 0)));

        // a wall drops onto the bread's own cell
        engine.set_tile(at(2, 0), Tile::Wall);
        for _ in 0..6 {
            engine.advance_turn();
            // the cache saw the change; the rat never steps onto the wall
            assert_ne!(engine.position_of(rat), Some(at(2, 0)));
        }
        let final_pos = engine.position_of(rat).unwrap();
        assert!(final_pos.manhattan_distance(&at(2, 0)).unwrap() <= 2);
    }

    #[test]
    fn test_keyed_door_gates_by_carried_key() {
        // corridor 0..=4 at y=0, walls elsewhere; keyed door at (2,0)
        let mut terrain = TerrainGrid::new(Tile::Wall);
        for x in 0..=4 {
            terrain.set(at(x, 0), Tile::Open);
        }
        terrain.set(at(2, 0), Tile::Keyed { key_tag: "brass".into() });

        let mut engine = TurnEngine::new(terrain, 7);
        let keyless = engine.spawn_agent(
            Identity::new("stranger", "Creature"),
            at(0, 0),
            seek("Food=10", 8),
        );
        engine.spawn_at(Identity::new("bread", "Food"), at(4, 0));

        for _ in 0..6 {
            engine.advance_turn();
            // stuck on the near side of the door
            assert!(engine.position_of(keyless).unwrap().x <= 1);
        }

        // hand over the key; the door now answers differently for this
        // mover with no cache invalidation at all
        let key = engine.spawn_carried(Identity::new("brass key", "Key"), keyless);
        engine.world.insert_one(key, PortalKey("brass".into())).unwrap();

        for _ in 0..6 {
            engine.advance_turn();
        }
        assert_eq!(engine.position_of(keyless), Some(at(4, 0)));
    }

    #[test]
    fn test_portal_link_shortcuts() {
        // two open pockets separated by wall, joined by a portal
        let mut terrain = TerrainGrid::new(Tile::Wall);
        terrain.set(at(0, 0), Tile::Open);
        terrain.set(at(10, 10), Tile::Open);
        terrain.set(at(11, 10), Tile::Open);
        let mut engine = TurnEngine::new(terrain, 7);
        engine.add_link(at(0, 0), at(10, 10));
        let rat = engine.spawn_agent(
            Identity::new("rat", "Creature"),
            at(0, 0),
            seek("Food=10", 4),
        );
        engine.spawn_at(Identity::new("bread", "Food"), at(11, 10));

        engine.advance_turn();
        // the portal target is the only passable "neighbor"
        assert_eq!(engine.position_of(rat), Some(at(10, 10)));
        engine.advance_turn();
        assert_eq!(engine.position_of(rat), Some(at(11, 10)));
    }

    #[test]
    fn test_two_agents_never_stack() {
        let mut engine = TurnEngine::new(TerrainGrid::open(), 7);
        let a = engine.spawn_agent(
            Identity::new("rat-a", "Creature"),
            at(0, 1),
            seek("Food=12", 6),
        );
        let b = engine.spawn_agent(
            Identity::new("rat-b", "Creature"),
            at(0, -1),
            seek("Food=12", 6),
        );
        engine.spawn_at(Identity::new("bread", "Food"), at(2, 0));

        for _ in 0..8 {
            engine.advance_turn();
            let pa = engine.position_of(a).unwrap();
            let pb = engine.position_of(b).unwrap();
            assert_ne!(pa, pb);
        }
    }

    #[test]
    fn test_suspend_resume() {
        let mut engine = TurnEngine::new(TerrainGrid::open(), 7);
        let rat = engine.spawn_agent(
            Identity::new("rat", "Creature"),
            at(0, 0),
            seek("Food=12", 6),
        );
        engine.spawn_at(Identity::new("bread", "Food"), at(4, 0));

        engine.suspend(rat);
        engine.advance_turn();
        assert_eq!(engine.position_of(rat), Some(at(0, 0)));

        engine.resume(rat);
        engine.advance_turn();
        assert_eq!(engine.position_of(rat), Some(at(1, 0)));
    }
}
