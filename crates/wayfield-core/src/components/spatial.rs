//! Spatial components: where entities stand and what they occupy.

use hecs::Entity;
use serde::{Deserialize, Serialize};
use wayfield_logic::grid::GridKey;

/// Grid cell an entity stands on.
///
/// Carried entities do not have a `Position` — their cell is derived from
/// whoever carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position(pub GridKey);

/// This entity sits inside another entity's inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarriedBy(pub Entity);

/// Marker: this entity occupies its cell — no one else may move into it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Blocker;

/// A carried key that opens keyed tiles whose `key_tag` matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalKey(pub String);
