//! Colony Core -- a tick-stepped colony simulation engine.
//!
//! Nodes sit on a plane, joined by undirected connections. Each node holds a
//! typed, capacity-bounded inventory and may convert resources on its own.
//! Units walk the graph running small step procedures: hauling resources
//! from producers to consumers, working jobs at nodes, eating, wandering.
//!
//! # Tick
//!
//! Each call to [`world::World::update`] advances the simulation by one tick:
//!
//! 1. **Units** -- every unit runs the head step of its procedure.
//! 2. **Nodes** -- every node advances its autonomous conversion.
//! 3. **Bookkeeping** -- the tick counter advances; a [`sim::TickReport`]
//!    lists deaths and job outcomes.
//!
//! Iteration orders are fixed (units by slot, nodes by ascending id), so a
//! world seeded the same way always evolves the same way.
//!
//! # Key Types
//!
//! - [`world::World`] -- owns every entity; commands, tick and queries.
//! - [`graph::ColonyGraph`] -- nodes, connections and the memoized
//!   shortest-path service.
//! - [`unit::Procedure`] -- the ordered step list a unit runs.
//! - [`job::JobRegistry`] -- available / occupied / halted job pools.
//! - [`index::PriorityIndex`] -- priority-bucketed producers and consumers.
//! - [`registry::Registry`] -- immutable resource, node, job and unit
//!   configuration, built once and injected.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`serialize`] -- persistence documents and versioned binary snapshots.

pub mod fixed;
pub mod graph;
pub mod id;
pub mod index;
pub mod inventory;
pub mod job;
pub mod node;
pub mod procedure;
pub mod query;
pub mod registry;
pub mod rng;
pub mod serialize;
pub mod sim;
pub mod unit;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
