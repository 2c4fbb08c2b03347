//! Wayfield Headless Scenario Harness
//!
//! Validates the navigation engine end to end without any host engine.
//! Runs entirely in-process — no rendering, no I/O beyond the report.
//!
//! Usage:
//!   cargo run -p wayfield-simtest
//!   cargo run -p wayfield-simtest -- --verbose
//!   cargo run -p wayfield-simtest -- --json

use serde::Serialize;
use wayfield_core::prelude::*;
use wayfield_logic::grid::GridKey;
use wayfield_logic::heatmap::{HeatSource, InfluenceMap, SourceId};
use wayfield_logic::preference::{parse_rule, PreferenceMapConfig, PreferenceSet};

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(results: &mut Vec<TestResult>, name: &str, passed: bool, detail: String) {
    results.push(TestResult {
        name: name.to_string(),
        passed,
        detail,
    });
}

fn at(x: i32, y: i32) -> GridKey {
    GridKey::new(x, y, 0)
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    let json = std::env::args().any(|a| a == "--json");
    if !json {
        println!("=== Wayfield Scenario Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Preference rule grammar sweep
    validate_rule_grammar(&mut results);

    // 2. Influence field shape around a single attractor
    validate_field_shape(&mut results);

    // 3. Agent chases an attractor across open ground
    validate_chase(&mut results);

    // 4. Agent flees a repulsor
    validate_flight(&mut results);

    // 5. Keyed door answers per mover on one cache
    validate_keyed_door(&mut results);

    // 6. Priority fallback past a cold map
    validate_priority_fallback(&mut results);

    if !json {
        for r in &results {
            let mark = if r.passed { "PASS" } else { "FAIL" };
            if verbose || !r.passed {
                println!("[{}] {} — {}", mark, r.name, r.detail);
            } else {
                println!("[{}] {}", mark, r.name);
            }
        }
        println!();
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    if json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": passed,
            "failed": failed,
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
    } else {
        println!("{} passed, {} failed, {} total", passed, failed, results.len());
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── Scenarios ───────────────────────────────────────────────────────────

fn validate_rule_grammar(results: &mut Vec<TestResult>) {
    let good = [
        "Corpse=8",
        "Creature[Hostile]=-12",
        "\"rusty key\"=20",
        "*=1",
        "Exit",
    ];
    for line in good {
        let parsed = parse_rule(line);
        check(
            results,
            "rule grammar accepts valid line",
            parsed.is_ok(),
            format!("{:?} -> {:?}", line, parsed),
        );
    }
    let bad = ["Corpse=", "Corpse=lots", "\"open quote=3", "Tag[Angry]=1", "=5"];
    for line in bad {
        let parsed = parse_rule(line);
        check(
            results,
            "rule grammar rejects malformed line",
            parsed.is_err(),
            format!("{:?} -> {:?}", line, parsed),
        );
    }
}

fn validate_field_shape(results: &mut Vec<TestResult>) {
    let mut map = InfluenceMap::new("shape");
    map.inject_one(at(2, 2), HeatSource::new(SourceId(1), "beacon"), 16);
    map.diffuse(4, |_| true);

    let neighbors_ok = at(2, 2)
        .orthogonal_neighbors()
        .iter()
        .all(|n| map.heat_at(*n) == 15);
    check(
        results,
        "attractor neighbors read source minus one",
        neighbors_ok,
        format!("(1,2) reads {}", map.heat_at(at(1, 2))),
    );
    check(
        results,
        "field follows manhattan distance",
        map.heat_at(at(2, 6)) == 12 && map.heat_at(at(2, 7)) == 0,
        format!(
            "dist4 reads {}, dist5 reads {}",
            map.heat_at(at(2, 6)),
            map.heat_at(at(2, 7))
        ),
    );
}

fn seek(rules: &str, range: i32) -> PreferenceSet {
    let mut set = PreferenceSet::new();
    set.add_map(PreferenceMapConfig::from_lines("seek", 0, range, 1.0, rules).unwrap());
    set
}

fn validate_chase(results: &mut Vec<TestResult>) {
    let mut engine = TurnEngine::new(TerrainGrid::open(), 42);
    let rat = engine.spawn_agent(Identity::new("rat", "Creature"), at(0, 0), seek("Food=12", 8));
    engine.spawn_at(Identity::new("bread", "Food"), at(5, 0));

    for _ in 0..5 {
        engine.advance_turn();
    }
    let pos = engine.position_of(rat);
    check(
        results,
        "agent reaches attractor in straight-line turns",
        pos == Some(at(5, 0)),
        format!("after 5 turns agent sits at {:?}", pos),
    );
}

fn validate_flight(results: &mut Vec<TestResult>) {
    let mut engine = TurnEngine::new(TerrainGrid::open(), 42);
    let deer = engine.spawn_agent(
        Identity::new("deer", "Creature"),
        at(0, 0),
        seek("Threat=-10", 6),
    );
    engine.spawn_at(Identity::new("wolf", "Threat"), at(-2, 0));

    for _ in 0..4 {
        engine.advance_turn();
    }
    let pos = engine.position_of(deer).unwrap();
    let dist = pos.manhattan_distance(&at(-2, 0)).unwrap();
    check(
        results,
        "agent flees repulsor along the gradient",
        dist > 2,
        format!("after 4 turns agent is {} cells from the wolf", dist),
    );
}

fn validate_keyed_door(results: &mut Vec<TestResult>) {
    let mut terrain = TerrainGrid::new(Tile::Wall);
    for x in 0..=4 {
        terrain.set(at(x, 0), Tile::Open);
    }
    terrain.set(at(2, 0), Tile::Keyed { key_tag: "brass".into() });

    let mut engine = TurnEngine::new(terrain, 42);
    let rat = engine.spawn_agent(
        Identity::new("rat", "Creature"),
        at(0, 0),
        seek("Food=10", 8),
    );
    engine.spawn_at(Identity::new("bread", "Food"), at(4, 0));

    for _ in 0..6 {
        engine.advance_turn();
    }
    let blocked = engine.position_of(rat).unwrap().x <= 1;
    check(
        results,
        "keyless agent stays behind the keyed door",
        blocked,
        format!("agent at {:?}", engine.position_of(rat)),
    );

    let key = engine.spawn_carried(Identity::new("brass key", "Key"), rat);
    engine.world.insert_one(key, PortalKey("brass".into())).unwrap();
    for _ in 0..8 {
        engine.advance_turn();
    }
    check(
        results,
        "keyed agent passes with no cache invalidation",
        engine.position_of(rat) == Some(at(4, 0)),
        format!("agent at {:?}", engine.position_of(rat)),
    );
}

fn validate_priority_fallback(results: &mut Vec<TestResult>) {
    let mut engine = TurnEngine::new(TerrainGrid::open(), 42);
    let mut prefs = PreferenceSet::new();
    // flee outranks eating but no threat exists, so it stays cold
    prefs.add_map(PreferenceMapConfig::from_lines("flee", 100, 4, 1.0, "Threat=-9").unwrap());
    prefs.add_map(PreferenceMapConfig::from_lines("eat", 1, 4, 1.0, "Food=9").unwrap());
    let rat = engine.spawn_agent(Identity::new("rat", "Creature"), at(0, 0), prefs);
    engine.spawn_at(Identity::new("bread", "Food"), at(3, 0));

    engine.advance_turn();
    check(
        results,
        "cold higher-priority map falls through to the next",
        engine.position_of(rat) == Some(at(1, 0)),
        format!("agent at {:?}", engine.position_of(rat)),
    );
}
