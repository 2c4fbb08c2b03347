//! Pure navigation logic for Wayfield.
//!
//! This crate contains the influence-map engine independent of any ECS,
//! engine, or runtime. Types take plain data and injected collaborator
//! traits, making them unit-testable and portable across hosts.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`grid`] | Grid keys and the sparse chunked cell store |
//! | [`heatmap`] | Signed heat fields: decay, diffusion, move picking |
//! | [`preference`] | Rule grammar, entity-registry seam, preference sets |
//! | [`pathability`] | 4-state pathability cache and adjacency generation |
//!
//! # Control flow
//!
//! Once per agent per turn, driven by an external scheduler: the agent's
//! [`preference::PreferenceSet`] cools, re-seeds, and diffuses each of its
//! maps (consulting the [`pathability::PathabilityCache`] for which
//! neighbors heat may flow through), then picks a destination from the
//! agent's passable neighbors in map priority order. Everything here is
//! single-threaded, synchronous, in-memory computation.

pub mod grid;
pub mod heatmap;
pub mod pathability;
pub mod preference;
