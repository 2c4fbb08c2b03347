//! End-to-end scenarios over the pure navigation logic.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use wayfield_logic::grid::{GridKey, SparseChunkedMap, CHUNK_SIZE};
use wayfield_logic::heatmap::{reduce_toward_zero, HeatSource, InfluenceMap, SourceId};
use wayfield_logic::pathability::{PathOracle, PathVerdict, PathabilityCache};
use wayfield_logic::preference::{
    CarriedAwareness, Disposition, EntityRegistry, PreferenceMapConfig, PreferenceSet,
};

fn at(x: i32, y: i32) -> GridKey {
    GridKey::new(x, y, 0)
}

fn src(id: u64) -> HeatSource {
    HeatSource::new(SourceId(id), "scenario")
}

// ── heat field properties ──

#[test]
fn decay_is_monotone_and_sign_preserving() {
    for v in [-100, -3, -1, 0, 1, 3, 100] {
        for a in 0..6 {
            let r = reduce_toward_zero(v, a);
            assert!(r.unsigned_abs() <= v.unsigned_abs());
            assert!(r == 0 || r.signum() == v.signum());
        }
    }
}

#[test]
fn diffusion_never_exceeds_strongest_source() {
    let mut map = InfluenceMap::new("field");
    map.inject_one(at(0, 0), src(1), 16);
    map.inject_one(at(5, 5), src(2), -11);
    map.diffuse(10, |_| true);
    for x in -20..20 {
        for y in -20..20 {
            assert!(map.heat_at(at(x, y)).unsigned_abs() <= 16);
        }
    }
}

#[test]
fn diffusing_an_empty_map_stays_empty() {
    let mut map = InfluenceMap::new("field");
    map.diffuse(25, |_| true);
    assert!(map.is_cold());
}

#[test]
fn single_attractor_on_open_grid() {
    // 5x5 open grid, +16 at the center, diffused its full radius.
    let mut map = InfluenceMap::new("field");
    map.inject_one(at(2, 2), src(1), 16);
    let open = |k: GridKey| (0..5).contains(&k.x) && (0..5).contains(&k.y);
    map.diffuse(4, open);

    // one decay step applies before spreading: neighbors read 15, not 16
    for n in at(2, 2).orthogonal_neighbors() {
        assert_eq!(map.heat_at(n), 15);
    }

    // an agent at (0,2) prefers (1,2) over the off-axis cells
    let mut rng = StdRng::seed_from_u64(11);
    let pick = map.pick_best_move(&[at(1, 2), at(0, 3), at(0, 1)], &mut rng);
    assert_eq!(pick, Some(at(1, 2)));
    assert!(map.heat_at(at(1, 2)) > map.heat_at(at(0, 3)));
}

#[test]
fn attraction_beats_repulsion_of_equal_magnitude() {
    let mut map = InfluenceMap::new("field");
    map.inject_one(at(0, 0), src(1), 5);
    map.inject_one(at(1, 0), src(2), -5);
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..20 {
        assert_eq!(
            map.pick_best_move(&[at(0, 0), at(1, 0)], &mut rng),
            Some(at(0, 0))
        );
    }
}

#[test]
fn tied_winners_are_uniform_under_a_seed() {
    let mut map = InfluenceMap::new("field");
    map.inject_one(at(0, 0), src(1), 7);
    map.inject_one(at(4, 0), src(2), 7);
    let candidates = [at(0, 0), at(4, 0)];
    let mut rng = StdRng::seed_from_u64(1234);
    let mut first = 0u32;
    for _ in 0..2000 {
        if map.pick_best_move(&candidates, &mut rng) == Some(at(0, 0)) {
            first += 1;
        }
    }
    assert!((850..1150).contains(&first), "skew: {first}/2000");
}

// ── chunked storage ──

#[test]
fn chunk_boundaries_round_trip() {
    let mut map: SparseChunkedMap<u8> = SparseChunkedMap::new();
    let cases = [
        at(CHUNK_SIZE - 1, 0),
        at(CHUNK_SIZE, 0),
        at(-1, -1),
        at(-CHUNK_SIZE, -CHUNK_SIZE),
        GridKey::new(17, 17, 3),
    ];
    for (i, &key) in cases.iter().enumerate() {
        map.set(key, i as u8 + 1);
    }
    for (i, &key) in cases.iter().enumerate() {
        assert_eq!(map.get(key), i as u8 + 1);
    }
    assert_ne!(
        at(CHUNK_SIZE - 1, 0).chunk_origin(),
        at(CHUNK_SIZE, 0).chunk_origin()
    );
}

// ── pathability ──

struct DoorOracle {
    keyed: Vec<SourceId>,
    door: GridKey,
}

impl PathOracle for DoorOracle {
    fn classify(&self, location: GridKey) -> PathVerdict {
        if location == self.door {
            PathVerdict::MoverDependent
        } else {
            PathVerdict::Pathable
        }
    }

    fn pathable_for(&self, mover: SourceId, _location: GridKey) -> bool {
        self.keyed.contains(&mover)
    }
}

#[test]
fn unstable_cells_never_serve_stale_answers() {
    let oracle = DoorOracle {
        keyed: vec![SourceId(1)],
        door: at(3, 3),
    };
    let mut cache = PathabilityCache::new();
    // mover A (has key) queries first; mover B (no key) must still be
    // refused on the same cache instance with no invalidation in between
    assert!(cache.query(SourceId(1), at(3, 3), &oracle));
    assert!(!cache.query(SourceId(2), at(3, 3), &oracle));
    assert!(cache.query(SourceId(1), at(3, 3), &oracle));
}

// ── preference sets ──

#[derive(Default)]
struct Registry {
    tags: HashMap<SourceId, String>,
    names: HashMap<SourceId, String>,
    locations: HashMap<SourceId, GridKey>,
}

impl Registry {
    fn spawn(&mut self, id: u64, tag: &str, name: &str, location: GridKey) -> SourceId {
        let id = SourceId(id);
        self.tags.insert(id, tag.to_string());
        self.names.insert(id, name.to_string());
        self.locations.insert(id, location);
        id
    }
}

impl EntityRegistry for Registry {
    fn entities_by_tag(&self, tag: &str, out: &mut Vec<SourceId>) {
        out.extend(self.tags.iter().filter(|(_, t)| *t == tag).map(|(id, _)| *id));
    }
    fn entities_by_name(&self, name: &str, out: &mut Vec<SourceId>) {
        out.extend(
            self.names
                .iter()
                .filter(|(_, n)| *n == name)
                .map(|(id, _)| *id),
        );
    }
    fn all_entities(&self, out: &mut Vec<SourceId>) {
        out.extend(self.tags.keys().copied());
    }
    fn location_of(&self, entity: SourceId) -> Option<GridKey> {
        self.locations.get(&entity).copied()
    }
    fn carrier_of(&self, _entity: SourceId) -> Option<SourceId> {
        None
    }
    fn disposition_of(&self, _entity: SourceId) -> Disposition {
        Disposition::Neutral
    }
    fn display_name(&self, entity: SourceId) -> String {
        self.names.get(&entity).cloned().unwrap_or_default()
    }
}

#[test]
fn cold_high_priority_map_falls_through() {
    let mut registry = Registry::default();
    registry.spawn(1, "Food", "bread", at(2, 0));

    let mut set = PreferenceSet::new();
    // the flee map outranks eating but matches nothing this turn
    set.add_map(PreferenceMapConfig::from_lines("flee", 100, 3, 1.0, "Threat=-9").unwrap());
    set.add_map(PreferenceMapConfig::from_lines("eat", 1, 3, 1.0, "Food=9").unwrap());
    set.update(&registry, |_| true, &CarriedAwareness::default(), None);

    assert!(set.map("flee").unwrap().is_cold());
    let mut rng = StdRng::seed_from_u64(2);
    let choice = set.choose_move(&[at(1, 0), at(-1, 0)], &mut rng);
    assert_eq!(choice, Some(at(1, 0)));
}

#[test]
fn repeated_turns_keep_the_field_fresh() {
    let mut registry = Registry::default();
    registry.spawn(1, "Food", "bread", at(4, 0));
    let mut set = PreferenceSet::new();
    set.add_map(PreferenceMapConfig::from_lines("eat", 0, 5, 1.0, "Food=10").unwrap());

    for _ in 0..10 {
        set.update(&registry, |_| true, &CarriedAwareness::default(), None);
    }
    let map = set.map("eat").unwrap();
    // cooling and re-injection balance out: the field stays at full strength
    assert_eq!(map.heat_at(at(4, 0)), 10);
    assert_eq!(map.heat_at(at(3, 0)), 9);
}

#[test]
fn fractional_cooling_eventually_fades_a_stale_field() {
    let mut registry = Registry::default();
    let bread = registry.spawn(1, "Food", "bread", at(0, 0));
    let mut set = PreferenceSet::new();
    set.add_map(PreferenceMapConfig::from_lines("eat", 0, 2, 0.5, "Food=3").unwrap());
    set.update(&registry, |_| true, &CarriedAwareness::default(), None);
    assert_eq!(set.map("eat").unwrap().heat_at(at(0, 0)), 3);

    // the bread is gone; half-rate cooling clears the residue over turns
    registry.locations.remove(&bread);
    registry.tags.remove(&bread);
    for _ in 0..12 {
        set.update(&registry, |_| true, &CarriedAwareness::default(), None);
    }
    assert!(set.map("eat").unwrap().is_cold());
}
