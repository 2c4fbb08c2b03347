//! Agent components: entities that choose moves.

use serde::{Deserialize, Serialize};
use wayfield_logic::preference::{CarriedAwareness, PreferenceSet};

/// Marker: this entity acts each turn through its preference set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Agent;

/// The agent's configured influence maps plus live heat state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub set: PreferenceSet,
    pub awareness: CarriedAwareness,
}

impl Preferences {
    pub fn new(set: PreferenceSet) -> Self {
        Self {
            set,
            awareness: CarriedAwareness::default(),
        }
    }
}

/// Marker: the turn scheduler suspended this agent. Its preference update
/// is skipped entirely — heat state is preserved, not rewound.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Suspended;
