//! `EntityRegistry` adapter over a hecs `World`.
//!
//! Preference sets see entities only through weak `SourceId` handles —
//! `hecs::Entity` bits packed into a `u64`. A handle whose entity has
//! despawned simply stops matching; nothing dangles.

use crate::components::{CarriedBy, Identity, Position};
use hecs::{Entity, World};
use wayfield_logic::grid::GridKey;
use wayfield_logic::heatmap::SourceId;
use wayfield_logic::preference::{Disposition, EntityRegistry};

/// Pack an entity into its weak handle.
pub fn source_id(entity: Entity) -> SourceId {
    SourceId(entity.to_bits().get())
}

/// Unpack a weak handle, if it still denotes a live entity id.
pub fn entity_of(id: SourceId) -> Option<Entity> {
    Entity::from_bits(id.0)
}

/// Read-only registry view over the world.
pub struct WorldRegistry<'a> {
    world: &'a World,
}

impl<'a> WorldRegistry<'a> {
    pub fn new(world: &'a World) -> Self {
        Self { world }
    }
}

impl EntityRegistry for WorldRegistry<'_> {
    fn entities_by_tag(&self, tag: &str, out: &mut Vec<SourceId>) {
        for (entity, identity) in self.world.query::<&Identity>().iter() {
            if identity.tag == tag {
                out.push(source_id(entity));
            }
        }
    }

    fn entities_by_name(&self, name: &str, out: &mut Vec<SourceId>) {
        for (entity, identity) in self.world.query::<&Identity>().iter() {
            if identity.name == name {
                out.push(source_id(entity));
            }
        }
    }

    fn all_entities(&self, out: &mut Vec<SourceId>) {
        for (entity, _) in self.world.query::<&Identity>().iter() {
            out.push(source_id(entity));
        }
    }

    fn location_of(&self, entity: SourceId) -> Option<GridKey> {
        let entity = entity_of(entity)?;
        self.world.get::<&Position>(entity).ok().map(|pos| pos.0)
    }

    fn carrier_of(&self, entity: SourceId) -> Option<SourceId> {
        let entity = entity_of(entity)?;
        self.world
            .get::<&CarriedBy>(entity)
            .ok()
            .map(|carried| source_id(carried.0))
    }

    fn disposition_of(&self, entity: SourceId) -> Disposition {
        entity_of(entity)
            .and_then(|e| self.world.get::<&Disposition>(e).ok().map(|d| *d))
            .unwrap_or(Disposition::Neutral)
    }

    fn display_name(&self, entity: SourceId) -> String {
        entity_of(entity)
            .and_then(|e| self.world.get::<&Identity>(e).ok().map(|i| i.name.clone()))
            .unwrap_or_default()
    }
}
