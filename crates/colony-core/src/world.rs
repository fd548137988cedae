//! The world aggregate: owns every entity and drives the tick.
//!
//! # Architecture
//!
//! The `World` owns:
//! - A [`ColonyGraph`] (nodes, connections, path cache)
//! - Per-node state in a [`NodeStore`] (inventory, conversion progress)
//! - Units in a `SlotMap` keyed by [`UnitId`]
//! - The [`JobRegistry`] and the [`PriorityIndex`]
//! - A seeded [`SimRng`], the tick counter and the id counters
//!
//! Cross-entity links are ids resolved through the world at use time.
//!
//! # Tick
//!
//! Each `update()` runs:
//! 1. **Units** -- every unit runs its head step, in slot order; starved
//!    units are removed
//! 2. **Nodes** -- every node with a conversion advances it, by ascending id
//! 3. **Bookkeeping** -- the tick counter advances

use crate::fixed::Ticks;
use crate::graph::{ColonyGraph, Connection, GraphError, NodeData, Position};
use crate::id::{IdCounter, JobId, JobTypeId, NodeId, NodeTypeId, ResourceTypeId, UnitId};
use crate::index::PriorityIndex;
use crate::inventory::{ConversionOutcome, Inventory, InventoryError, tick_conversion};
use crate::job::{Job, JobError, JobPool, JobRegistry};
use crate::node::{NodeState, NodeStore};
use crate::procedure::{StepContext, UnitFate};
use crate::registry::Registry;
use crate::rng::SimRng;
use crate::sim::{StateHash, TickReport};
use crate::unit::{Procedure, Step, Unit};
use slotmap::SlotMap;
use std::sync::Arc;

/// Seed used by [`World::new`].
pub const DEFAULT_SEED: u64 = 0x5EED;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by world commands and by restoring a world document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("unknown node type: {0:?}")]
    UnknownNodeType(NodeTypeId),
    #[error("unknown job type: {0:?}")]
    UnknownJobType(JobTypeId),
    #[error("unknown resource type: {0:?}")]
    UnknownResourceType(ResourceTypeId),
    #[error("unknown unit: {0:?}")]
    UnknownUnit(UnitId),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Job(#[from] JobError),
    #[error("invalid world document: {0}")]
    InvalidDocument(String),
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The simulation world.
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) registry: Arc<Registry>,
    pub(crate) graph: ColonyGraph,
    pub(crate) nodes: NodeStore,
    pub(crate) units: SlotMap<UnitId, Unit>,
    pub(crate) jobs: JobRegistry,
    pub(crate) index: PriorityIndex,
    pub(crate) rng: SimRng,
    pub(crate) tick: Ticks,
    pub(crate) node_ids: IdCounter,
    pub(crate) job_ids: IdCounter,
}

impl World {
    /// An empty world seeded with [`DEFAULT_SEED`].
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_seed(registry, DEFAULT_SEED)
    }

    pub fn with_seed(registry: Arc<Registry>, seed: u64) -> Self {
        Self {
            registry,
            graph: ColonyGraph::new(),
            nodes: NodeStore::new(),
            units: SlotMap::with_key(),
            jobs: JobRegistry::new(),
            index: PriorityIndex::new(),
            rng: SimRng::new(seed),
            tick: 0,
            node_ids: IdCounter::default(),
            job_ids: IdCounter::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Add a node of `node_type` at `position`. Registers it in the priority
    /// index and creates one available job per job type the node spawns.
    pub fn add_node(
        &mut self,
        position: Position,
        node_type: NodeTypeId,
    ) -> Result<NodeId, WorldError> {
        let def = self
            .registry
            .get_node(node_type)
            .ok_or(WorldError::UnknownNodeType(node_type))?;

        let id = NodeId(self.node_ids.next());
        self.graph.insert_node(id, NodeData { position, node_type });
        self.nodes.insert(
            id,
            NodeState {
                inventory: Inventory::for_node_type(def),
                ..NodeState::default()
            },
        );
        self.index.register(id, def);

        let job_ids = &mut self.job_ids;
        self.jobs.add(def.jobs.iter().map(|&job_type| Job {
            id: JobId(job_ids.next()),
            node: id,
            job_type,
        }));

        tracing::debug!(node = ?id, kind = %def.name, "node added");
        Ok(id)
    }

    /// Connect two nodes. Idempotent per pair.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<Connection, WorldError> {
        Ok(self.graph.connect(a, b)?)
    }

    /// Place a new unit at `node`, starting at the root step.
    pub fn add_unit(&mut self, node: NodeId) -> Result<UnitId, WorldError> {
        self.graph.node(node)?;
        let id = self.units.insert(Unit::new(node));
        tracing::debug!(unit = ?id, ?node, "unit added");
        Ok(id)
    }

    /// Remove every unit and return every occupied job to available.
    pub fn remove_all_units(&mut self) {
        let removed = self.units.len();
        self.units.clear();
        self.jobs.reset();
        tracing::info!(removed, "removed all units");
    }

    /// Empty every node's inventory.
    pub fn remove_all_resources(&mut self) {
        for (_, state) in self.nodes.iter_mut() {
            state.inventory.clear();
        }
        tracing::info!(nodes = self.nodes.len(), "removed all resources");
    }

    /// Put one unit of `resource` at `node`.
    pub fn add_resource(
        &mut self,
        node: NodeId,
        resource: ResourceTypeId,
    ) -> Result<(), WorldError> {
        self.graph.node(node)?;
        Ok(self.nodes.add_resource(node, resource)?)
    }

    /// Take one unit of `resource` from `node`.
    pub fn take_resource(
        &mut self,
        node: NodeId,
        resource: ResourceTypeId,
    ) -> Result<(), WorldError> {
        self.graph.node(node)?;
        Ok(self.nodes.take_resource(node, resource)?)
    }

    /// Replace a unit's procedure, e.g. to park it on [`Step::DoNothing`].
    pub fn set_procedure(
        &mut self,
        unit: UnitId,
        steps: impl IntoIterator<Item = Step>,
    ) -> Result<(), WorldError> {
        let u = self
            .units
            .get_mut(unit)
            .ok_or(WorldError::UnknownUnit(unit))?;
        u.procedure = Procedure::from_steps(steps);
        u.traversal = None;
        Ok(())
    }

    /// Shortest route between two nodes, memoized. See
    /// [`ColonyGraph::shortest_path`].
    pub fn shortest_path(&mut self, from: NodeId, to: NodeId) -> Result<Vec<NodeId>, WorldError> {
        Ok(self.graph.shortest_path(from, to)?)
    }

    /// Drop memoized routes so later lookups see connections added since.
    pub fn invalidate_path_cache(&mut self) {
        self.graph.invalidate_path_cache();
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the simulation by one tick.
    pub fn update(&mut self) -> TickReport {
        let mut report = TickReport::new(self.tick + 1);

        let keys: Vec<UnitId> = self.units.keys().collect();
        for id in keys {
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            let mut ctx = StepContext {
                registry: &self.registry,
                graph: &mut self.graph,
                nodes: &mut self.nodes,
                jobs: &mut self.jobs,
                index: &self.index,
                rng: &mut self.rng,
                report: &mut report,
            };
            if unit.tick(&mut ctx) == UnitFate::Died {
                self.units.remove(id);
                report.deaths.push(id);
            }
        }

        for (id, state) in self.nodes.iter_mut() {
            let conversion = self
                .graph
                .node(id)
                .ok()
                .and_then(|data| self.registry.get_node(data.node_type))
                .and_then(|def| def.conversion.as_ref());
            let Some(conversion) = conversion else {
                continue;
            };
            let outcome = tick_conversion(
                conversion,
                &mut state.conversion_progress,
                &mut state.inventory,
            );
            if outcome == ConversionOutcome::Wasted {
                tracing::debug!(node = ?id, "conversion cycle spent without input");
            }
        }

        self.tick += 1;
        report
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn graph(&self) -> &ColonyGraph {
        &self.graph
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    pub fn index(&self) -> &PriorityIndex {
        &self.index
    }

    /// Ticks run so far.
    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Units in slot order.
    pub fn units(&self) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.units.iter()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Units of `resource` held at `node`; zero for unknown nodes.
    pub fn resource_count(&self, node: NodeId, resource: ResourceTypeId) -> u32 {
        self.nodes
            .get(node)
            .map_or(0, |s| s.inventory.count(resource))
    }

    /// The node nearest to `position`, or `None` in an empty world.
    pub fn closest_node(&self, position: Position) -> Option<NodeId> {
        self.graph.closest_node(position)
    }

    /// The pool a job currently sits in.
    pub fn job_pool(&self, job: JobId) -> Option<JobPool> {
        self.jobs.pool_of(job)
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    /// Deterministic hash of the simulation state: tick, rng, node
    /// inventories and conversion progress, units, and job pools.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.tick);
        h.write_u64(self.rng.state());

        for (id, state) in self.nodes.iter() {
            h.write_u32(id.0);
            for stack in state.inventory.stacks() {
                h.write_u32(stack.resource.0);
                h.write_u32(stack.count);
            }
            h.write_fixed64(state.conversion_progress);
        }

        for (_, unit) in &self.units {
            h.write_u32(unit.node.0);
            h.write(unit.procedure.head().name().as_bytes());
            h.write_fixed64(unit.hunger);
            h.write_fixed64(unit.job_progress);
            h.write_u32(unit.carried.map_or(u32::MAX, |r| r.0));
            h.write_u32(unit.job.map_or(u32::MAX, |j| j.0));
            if let Some(trav) = &unit.traversal {
                h.write_u64(trav.cursor as u64);
                h.write_fixed64(trav.progress);
            }
        }

        for pool in [JobPool::Available, JobPool::Occupied, JobPool::Halted] {
            h.write(&[pool as u8]);
            for job in self.jobs.pool(pool) {
                h.write_u32(job.id.0);
            }
        }
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed64;
    use crate::registry::{ConversionDef, JobTypeDef, NodeTypeDef, RegistryBuilder, UnitConfig};

    struct Types {
        moss: ResourceTypeId,
        brew: ResourceTypeId,
        farm: NodeTypeId,
        chamber: NodeTypeId,
    }

    fn registry() -> (Arc<Registry>, Types) {
        let mut b = RegistryBuilder::new();
        let moss = b.register_resource("moss");
        let brew = b.register_resource("brew");
        let grow = b.register_job(JobTypeDef {
            name: "grow_moss".into(),
            output: moss,
            rate: Fixed64::from_num(25),
            inputs: Vec::new(),
        });
        let farm = b.register_node(
            NodeTypeDef::new("moss_farm", 12.0)
                .with_capacity(moss, 3)
                .producing(moss, 0)
                .with_job(grow)
                .with_job(grow),
        );
        let chamber = b.register_node(
            NodeTypeDef::new("moss_fermentation_chamber", 12.0)
                .with_capacity(moss, 3)
                .with_capacity(brew, 3)
                .consuming(moss, 0)
                .with_conversion(ConversionDef {
                    input: moss,
                    output: Some(brew),
                    rate: Fixed64::from_num(1),
                    threshold: Fixed64::from_num(2),
                }),
        );
        let types = Types {
            moss,
            brew,
            farm,
            chamber,
        };
        (Arc::new(b.build().unwrap()), types)
    }

    #[test]
    fn add_node_spawns_jobs_and_assigns_ids() {
        let (reg, t) = registry();
        let mut world = World::new(reg);
        let a = world.add_node(Position::new(0.0, 0.0), t.farm).unwrap();
        let b = world.add_node(Position::new(5.0, 0.0), t.chamber).unwrap();
        assert_eq!((a, b), (NodeId(0), NodeId(1)));
        assert_eq!(world.jobs().len(), 2);
        assert_eq!(world.jobs().pool(JobPool::Available).count(), 2);
        assert_eq!(world.index().consumers_at(t.moss, 0), &[b]);
    }

    #[test]
    fn add_node_rejects_unknown_type() {
        let (reg, _) = registry();
        let mut world = World::new(reg);
        assert_eq!(
            world.add_node(Position::default(), NodeTypeId(42)),
            Err(WorldError::UnknownNodeType(NodeTypeId(42)))
        );
        assert_eq!(world.node_count(), 0);
    }

    #[test]
    fn add_unit_requires_existing_node() {
        let (reg, _) = registry();
        let mut world = World::new(reg);
        assert!(matches!(
            world.add_unit(NodeId(0)),
            Err(WorldError::Graph(GraphError::NodeNotFound(_)))
        ));
    }

    #[test]
    fn connect_out_of_range_is_reported() {
        let (reg, t) = registry();
        let mut world = World::new(reg);
        let a = world.add_node(Position::new(0.0, 0.0), t.farm).unwrap();
        let b = world.add_node(Position::new(3e9, 0.0), t.farm).unwrap();
        assert_eq!(
            world.connect(a, b),
            Err(WorldError::Graph(GraphError::LengthOutOfRange { a, b }))
        );
    }

    #[test]
    fn parked_unit_hunger_saturates() {
        let mut b = RegistryBuilder::new();
        let spot = b.register_node(NodeTypeDef::new("spot", 5.0));
        b.set_unit(UnitConfig {
            hunger_rate: Fixed64::from_num(1_000_000),
            ..UnitConfig::default()
        });
        let mut world = World::new(Arc::new(b.build().unwrap()));
        let node = world.add_node(Position::default(), spot).unwrap();
        let unit = world.add_unit(node).unwrap();
        world.set_procedure(unit, [Step::DoNothing]).unwrap();

        for _ in 0..3_000 {
            world.update();
        }
        assert_eq!(world.unit(unit).unwrap().hunger, Fixed64::MAX);
    }

    #[test]
    fn conversion_runs_each_tick() {
        let (reg, t) = registry();
        let mut world = World::new(reg);
        let chamber = world.add_node(Position::default(), t.chamber).unwrap();
        world.add_resource(chamber, t.moss).unwrap();

        world.update();
        assert_eq!(world.resource_count(chamber, t.brew), 0);
        world.update();
        assert_eq!(world.resource_count(chamber, t.moss), 0);
        assert_eq!(world.resource_count(chamber, t.brew), 1);
        assert_eq!(world.tick(), 2);
    }

    #[test]
    fn remove_all_units_releases_jobs() {
        let (reg, t) = registry();
        let mut world = World::new(reg);
        let farm = world.add_node(Position::default(), t.farm).unwrap();
        world.add_unit(farm).unwrap();
        world.add_unit(farm).unwrap();
        // FindTask, then FindJob binds a job each.
        world.update();
        world.update();
        assert_eq!(world.jobs().pool(JobPool::Occupied).count(), 2);

        world.remove_all_units();
        assert_eq!(world.unit_count(), 0);
        assert_eq!(world.jobs().pool(JobPool::Occupied).count(), 0);
        assert_eq!(world.jobs().pool(JobPool::Available).count(), 2);
    }

    #[test]
    fn remove_all_resources_zeroes_inventories() {
        let (reg, t) = registry();
        let mut world = World::new(reg);
        let farm = world.add_node(Position::default(), t.farm).unwrap();
        world.add_resource(farm, t.moss).unwrap();
        world.add_resource(farm, t.moss).unwrap();
        world.remove_all_resources();
        assert_eq!(world.resource_count(farm, t.moss), 0);
    }

    #[test]
    fn set_procedure_parks_unit() {
        let (reg, t) = registry();
        let mut world = World::new(reg);
        let farm = world.add_node(Position::default(), t.farm).unwrap();
        let unit = world.add_unit(farm).unwrap();
        world.set_procedure(unit, [Step::DoNothing]).unwrap();
        for _ in 0..10 {
            world.update();
        }
        assert_eq!(world.unit(unit).unwrap().procedure.head(), Step::DoNothing);
        assert_eq!(world.jobs().pool(JobPool::Available).count(), 2);
    }

    #[test]
    fn state_hash_tracks_changes() {
        let (reg, t) = registry();
        let mut world = World::new(reg);
        let farm = world.add_node(Position::default(), t.farm).unwrap();
        let before = world.state_hash();
        assert_eq!(before, world.state_hash());
        world.add_resource(farm, t.moss).unwrap();
        assert_ne!(before, world.state_hash());
    }
}
