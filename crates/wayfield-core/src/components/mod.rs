//! Component definitions for the ECS integration.
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in systems.

mod agent;
mod identity;
mod spatial;

pub use agent::*;
pub use identity::*;
pub use spatial::*;
