//! Preference rules and per-agent preference sets.
//!
//! A preference set is how an agent wants to move: one or more named,
//! prioritized influence maps, each seeded from rules that select source
//! entities by tag, exact name, or everything, optionally filtered by
//! disposition. Each turn the set cools, re-seeds, and diffuses every map,
//! then asks them in priority order for a move.
//!
//! # Rule grammar
//!
//! One rule per line, `<selector>=<heat>`:
//!
//! | Line | Meaning |
//! |------|---------|
//! | `Corpse=8` | entities tagged `Corpse`, heat +8 |
//! | `Creature[Hostile]=-12` | hostile-disposition `Creature` entities, heat −12 |
//! | `"rusty key"=20` | the entity named exactly `rusty key` |
//! | `*=1` (or `all=1`) | every entity |
//! | `Exit` | tag `Exit`, heat defaulting to the map's range |
//!
//! An empty heat after `=` is an error. Malformed rules are fatal at load
//! time — they are never silently defaulted.

use crate::grid::GridKey;
use crate::heatmap::{scale_heat, Heat, HeatSource, InfluenceMap, InjectionBatch, SourceId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Carrier chains longer than this stop resolving; guards against cycles
/// in a malformed inventory graph.
const MAX_CARRIER_DEPTH: u32 = 8;

/// How a source entity stands toward the asking agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    Allied,
    Neutral,
    Hostile,
}

impl FromStr for Disposition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allied" => Ok(Disposition::Allied),
            "neutral" => Ok(Disposition::Neutral),
            "hostile" => Ok(Disposition::Hostile),
            _ => Err(()),
        }
    }
}

/// What a rule matches against the entity registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSelector {
    /// Every registered entity.
    All,
    /// Entities carrying this tag.
    Tag(String),
    /// The entity with exactly this name.
    Name(String),
}

/// One parsed `<selector>=<heat>` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRule {
    pub selector: SourceSelector,
    pub filter: Option<Disposition>,
    /// `None` means "use the map's range as the magnitude".
    pub heat: Option<Heat>,
}

/// Configuration rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceError {
    /// A rule line with nothing before the `=`.
    EmptySelector(String),
    /// `Tag=` with no heat value.
    EmptyHeat(String),
    /// Heat value that does not parse as an integer.
    InvalidHeat { line: String, value: String },
    /// Quoted name missing its closing quote.
    UnterminatedName(String),
    /// `[...]` filter missing its closing bracket.
    UnterminatedFilter(String),
    /// Bracketed disposition that is not Allied, Neutral, or Hostile.
    UnknownDisposition { line: String, value: String },
    /// A preference map configured without a name.
    EmptyMapName,
}

impl std::fmt::Display for PreferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferenceError::EmptySelector(line) => {
                write!(f, "rule '{}' has no selector before '='", line)
            }
            PreferenceError::EmptyHeat(line) => {
                write!(f, "rule '{}' has an empty heat value", line)
            }
            PreferenceError::InvalidHeat { line, value } => {
                write!(f, "rule '{}': heat '{}' is not an integer", line, value)
            }
            PreferenceError::UnterminatedName(line) => {
                write!(f, "rule '{}' has an unterminated quoted name", line)
            }
            PreferenceError::UnterminatedFilter(line) => {
                write!(f, "rule '{}' has an unterminated [filter]", line)
            }
            PreferenceError::UnknownDisposition { line, value } => {
                write!(f, "rule '{}': unknown disposition '{}'", line, value)
            }
            PreferenceError::EmptyMapName => write!(f, "preference map has no name"),
        }
    }
}

impl std::error::Error for PreferenceError {}

/// Parse one rule line. See the module docs for the grammar.
pub fn parse_rule(line: &str) -> Result<PreferenceRule, PreferenceError> {
    let line = line.trim();
    let (selector_text, heat) = match line.split_once('=') {
        Some((left, right)) => {
            let right = right.trim();
            if right.is_empty() {
                return Err(PreferenceError::EmptyHeat(line.to_string()));
            }
            let heat = right.parse::<Heat>().map_err(|_| PreferenceError::InvalidHeat {
                line: line.to_string(),
                value: right.to_string(),
            })?;
            (left.trim(), Some(heat))
        }
        None => (line, None),
    };

    if selector_text.is_empty() {
        return Err(PreferenceError::EmptySelector(line.to_string()));
    }

    // Quoted exact name; no filter applies.
    if let Some(rest) = selector_text.strip_prefix('"') {
        let name = rest
            .strip_suffix('"')
            .ok_or_else(|| PreferenceError::UnterminatedName(line.to_string()))?;
        return Ok(PreferenceRule {
            selector: SourceSelector::Name(name.to_string()),
            filter: None,
            heat,
        });
    }

    // Optional bracketed disposition on tag / all selectors.
    let (base, filter) = match selector_text.split_once('[') {
        Some((base, rest)) => {
            let inner = rest
                .strip_suffix(']')
                .ok_or_else(|| PreferenceError::UnterminatedFilter(line.to_string()))?;
            let disposition =
                Disposition::from_str(inner).map_err(|_| PreferenceError::UnknownDisposition {
                    line: line.to_string(),
                    value: inner.to_string(),
                })?;
            (base.trim(), Some(disposition))
        }
        None => (selector_text, None),
    };

    if base.is_empty() {
        return Err(PreferenceError::EmptySelector(line.to_string()));
    }

    let selector = if base == "*" || base.eq_ignore_ascii_case("all") {
        SourceSelector::All
    } else {
        SourceSelector::Tag(base.to_string())
    };

    Ok(PreferenceRule {
        selector,
        filter,
        heat,
    })
}

/// Parse a rules block, one rule per line. Blank lines and `#` comments
/// are skipped; any malformed rule aborts the whole parse.
pub fn parse_rules(text: &str) -> Result<Vec<PreferenceRule>, PreferenceError> {
    let mut rules = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        rules.push(parse_rule(line)?);
    }
    Ok(rules)
}

/// Injected entity-registry collaborator.
///
/// The engine never enumerates entities itself; everything it knows about
/// them comes through here, keyed by weak [`SourceId`] handles.
pub trait EntityRegistry {
    fn entities_by_tag(&self, tag: &str, out: &mut Vec<SourceId>);
    fn entities_by_name(&self, name: &str, out: &mut Vec<SourceId>);
    fn all_entities(&self, out: &mut Vec<SourceId>);
    /// Grid cell of an entity, `None` when it is carried (or gone).
    fn location_of(&self, entity: SourceId) -> Option<GridKey>;
    /// Immediate carrier of an entity, `None` for top-level entities.
    fn carrier_of(&self, entity: SourceId) -> Option<SourceId>;
    fn disposition_of(&self, entity: SourceId) -> Disposition;
    /// Display name, cosmetic only (heat source labels).
    fn display_name(&self, entity: SourceId) -> String;
}

/// How strongly an agent notices items that are not on the ground.
///
/// `held` applies when the item's direct carrier stands on the grid;
/// `carried` applies when the chain is longer (item inside a container
/// inside a creature). An optional per-item callback multiplies on top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarriedAwareness {
    pub held: f32,
    pub carried: f32,
}

impl Default for CarriedAwareness {
    fn default() -> Self {
        Self {
            held: 1.0,
            carried: 0.5,
        }
    }
}

/// Static configuration for one influence map in a preference set.
///
/// Deserialization funnels through [`PreferenceMapConfig::new`], so a
/// config loaded from serialized form is held to the same validation as
/// one built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPreferenceMapConfig")]
pub struct PreferenceMapConfig {
    pub name: String,
    /// Higher evaluates first when choosing a move.
    pub priority: i32,
    /// Diffusion steps per turn; also the default heat magnitude.
    pub range: i32,
    /// Heat removed per turn, fractional rates accumulate.
    pub cooling: f32,
    pub rules: Vec<PreferenceRule>,
}

impl PreferenceMapConfig {
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        range: i32,
        cooling: f32,
        rules: Vec<PreferenceRule>,
    ) -> Result<Self, PreferenceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PreferenceError::EmptyMapName);
        }
        Ok(Self {
            name,
            priority,
            range,
            cooling,
            rules,
        })
    }

    /// Build a config from a rules text block.
    pub fn from_lines(
        name: impl Into<String>,
        priority: i32,
        range: i32,
        cooling: f32,
        text: &str,
    ) -> Result<Self, PreferenceError> {
        Self::new(name, priority, range, cooling, parse_rules(text)?)
    }
}

/// Unvalidated mirror of [`PreferenceMapConfig`] for deserialization.
#[derive(Deserialize)]
struct RawPreferenceMapConfig {
    name: String,
    priority: i32,
    range: i32,
    cooling: f32,
    rules: Vec<PreferenceRule>,
}

impl TryFrom<RawPreferenceMapConfig> for PreferenceMapConfig {
    type Error = PreferenceError;

    fn try_from(raw: RawPreferenceMapConfig) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.priority, raw.range, raw.cooling, raw.rules)
    }
}

/// A configured influence map plus its live heat state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceMap {
    pub config: PreferenceMapConfig,
    pub map: InfluenceMap,
}

/// Per-agent collection of prioritized influence maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceSet {
    maps: Vec<PreferenceMap>,
}

impl PreferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_map(&mut self, config: PreferenceMapConfig) {
        let map = InfluenceMap::new(config.name.clone());
        self.maps.push(PreferenceMap { config, map });
    }

    pub fn maps(&self) -> &[PreferenceMap] {
        &self.maps
    }

    /// Look up a map by name, mostly for tests and debug overlays.
    pub fn map(&self, name: &str) -> Option<&InfluenceMap> {
        self.maps
            .iter()
            .find(|m| m.config.name == name)
            .map(|m| &m.map)
    }

    /// Run one turn's heat update on every map, in list order.
    ///
    /// Per map: cool, resolve each rule against the registry, inject the
    /// summed contributions, then diffuse `range` steps through `passable`.
    /// Callers must skip this entirely while the agent is suspended — heat
    /// state is preserved unchanged, not rewound.
    ///
    /// Rules apply in declaration order and every matching rule contributes
    /// to the same sum; an entity matched by both a tag rule and a name rule
    /// receives both contributions.
    pub fn update(
        &mut self,
        registry: &impl EntityRegistry,
        passable: impl Fn(GridKey) -> bool,
        awareness: &CarriedAwareness,
        item_scale: Option<&dyn Fn(SourceId) -> f32>,
    ) {
        let mut matches: Vec<SourceId> = Vec::new();
        for entry in &mut self.maps {
            entry.map.cool(entry.config.cooling);

            let mut batch = InjectionBatch::new();
            for rule in &entry.config.rules {
                matches.clear();
                match &rule.selector {
                    SourceSelector::All => registry.all_entities(&mut matches),
                    SourceSelector::Tag(tag) => registry.entities_by_tag(tag, &mut matches),
                    SourceSelector::Name(name) => registry.entities_by_name(name, &mut matches),
                }
                // Zero matches is not an error; the rule just contributes
                // nothing this turn.
                for &entity in &matches {
                    if let Some(filter) = rule.filter {
                        if registry.disposition_of(entity) != filter {
                            continue;
                        }
                    }
                    let heat = rule.heat.unwrap_or(entry.config.range);
                    stage_contribution(
                        &mut batch,
                        registry,
                        entity,
                        heat,
                        awareness,
                        item_scale,
                    );
                }
            }

            if !batch.is_empty() {
                entry.map.inject(batch);
            }
            entry.map.diffuse(entry.config.range, &passable);
        }
    }

    /// Choose a destination from `candidates`.
    ///
    /// Maps are consulted in descending priority, ties broken by ascending
    /// range then descending cooling; the first nonzero pick wins. `None`
    /// means every map was cold over the candidates and the caller should
    /// fall back to a random passable neighbor.
    pub fn choose_move(
        &self,
        candidates: &[GridKey],
        rng: &mut impl Rng,
    ) -> Option<GridKey> {
        let mut order: Vec<usize> = (0..self.maps.len()).collect();
        order.sort_by(|&a, &b| {
            let (ca, cb) = (&self.maps[a].config, &self.maps[b].config);
            cb.priority
                .cmp(&ca.priority)
                .then(ca.range.cmp(&cb.range))
                .then(
                    cb.cooling
                        .partial_cmp(&ca.cooling)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });
        for index in order {
            if let Some(choice) = self.maps[index].map.pick_best_move(candidates, rng) {
                return Some(choice);
            }
        }
        None
    }
}

/// Stage one entity's heat, attributing carried items to their carrier.
fn stage_contribution(
    batch: &mut InjectionBatch,
    registry: &impl EntityRegistry,
    entity: SourceId,
    heat: Heat,
    awareness: &CarriedAwareness,
    item_scale: Option<&dyn Fn(SourceId) -> f32>,
) {
    let source = HeatSource::new(entity, registry.display_name(entity));

    if let Some(location) = registry.location_of(entity) {
        batch.add(location, source, heat);
        return;
    }

    // No grid cell: walk the carrier chain to whoever stands on the grid.
    let mut current = entity;
    let mut links = 0u32;
    while links < MAX_CARRIER_DEPTH {
        let Some(carrier) = registry.carrier_of(current) else {
            return;
        };
        links += 1;
        if let Some(location) = registry.location_of(carrier) {
            let factor = if links == 1 {
                awareness.held
            } else {
                awareness.carried
            };
            let factor = factor * item_scale.map_or(1.0, |scale| scale(entity));
            batch.add(location, source, scale_heat(heat, factor));
            return;
        }
        current = carrier;
    }
}
