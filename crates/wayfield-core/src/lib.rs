//! Wayfield Core - ECS integration for the influence-map navigation engine
//!
//! Hosts the pure logic of `wayfield-logic` inside a `hecs` world:
//! - **Entities**: agents, heat sources, carried items, scenery
//! - **Components**: pure data (Position, Identity, Preferences, ...)
//! - **Systems**: per-turn move planning over the components
//!
//! # Example
//!
//! ```rust,no_run
//! use wayfield_core::prelude::*;
//! use wayfield_logic::grid::GridKey;
//! use wayfield_logic::preference::{PreferenceMapConfig, PreferenceSet};
//!
//! let mut engine = TurnEngine::new(TerrainGrid::open(), 0);
//!
//! let mut prefs = PreferenceSet::new();
//! prefs.add_map(
//!     PreferenceMapConfig::from_lines("eat", 0, 6, 1.0, "Food=12").unwrap(),
//! );
//! engine.spawn_agent(
//!     Identity::new("rat", "Creature"),
//!     GridKey::new(0, 0, 0),
//!     prefs,
//! );
//! engine.spawn_at(Identity::new("bread", "Food"), GridKey::new(4, 0, 0));
//!
//! loop {
//!     engine.advance_turn();
//! }
//! ```

pub mod components;
pub mod engine;
pub mod registry;
pub mod systems;
pub mod terrain;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::TurnEngine;
    pub use crate::registry::{source_id, WorldRegistry};
    pub use crate::terrain::{TerrainGrid, TerrainView, Tile};
}
