//! Persistence data views and binary snapshots.
//!
//! [`WorldData`] is the plain document an external collaborator writes to a
//! save file. It holds everything needed to resume a world except what is
//! derived: the priority index is rebuilt from node types and the path
//! cache starts empty.
//!
//! Binary snapshots wrap the same document in a versioned header and
//! encode it with `bitcode`.

use crate::fixed::{Fixed64, Ticks};
use crate::graph::{Connection, NodeData, Position};
use crate::id::{IdCounter, NodeId, NodeTypeId};
use crate::inventory::{Inventory, ResourceStack};
use crate::job::{Job, JobPool};
use crate::node::NodeState;
use crate::registry::Registry;
use crate::rng::SimRng;
use crate::unit::{Step, Unit};
use crate::world::{World, WorldError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a colony world snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xC010_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error(transparent)]
    World(#[from] WorldError),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every binary snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: Ticks,
}

impl SnapshotHeader {
    /// Create a header for the current format version.
    pub fn new(tick: Ticks) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    header: SnapshotHeader,
    data: WorldData,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One persisted node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub position: Position,
    pub node_type: NodeTypeId,
    #[serde(default)]
    pub inventory: Vec<ResourceStack>,
    #[serde(default)]
    pub conversion_progress: Fixed64,
}

/// Persisted job pools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPools {
    #[serde(default)]
    pub available: Vec<Job>,
    #[serde(default)]
    pub occupied: Vec<Job>,
    #[serde(default)]
    pub halted: Vec<Job>,
}

/// The full persisted world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    pub tick: Ticks,
    pub next_node_id: u32,
    pub next_job_id: u32,
    pub rng: SimRng,
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub jobs: JobPools,
}

impl World {
    /// Export the world as a plain document. Units are listed in slot order.
    pub fn to_data(&self) -> WorldData {
        let nodes = self
            .graph
            .nodes()
            .map(|(id, data)| {
                let state = self.nodes.get(id);
                NodeRecord {
                    id,
                    position: data.position,
                    node_type: data.node_type,
                    inventory: state.map(|s| s.inventory.stacks()).unwrap_or_default(),
                    conversion_progress: state.map_or(Fixed64::ZERO, |s| s.conversion_progress),
                }
            })
            .collect();

        let pool = |p: JobPool| self.jobs.pool(p).copied().collect::<Vec<_>>();

        WorldData {
            tick: self.tick,
            next_node_id: self.node_ids.peek(),
            next_job_id: self.job_ids.peek(),
            rng: self.rng.clone(),
            nodes,
            connections: self.graph.connections().to_vec(),
            units: self.units.values().cloned().collect(),
            jobs: JobPools {
                available: pool(JobPool::Available),
                occupied: pool(JobPool::Occupied),
                halted: pool(JobPool::Halted),
            },
        }
    }

    /// Rebuild a world from a document, validating every reference against
    /// `registry` and against the document itself.
    pub fn from_data(registry: Arc<Registry>, data: WorldData) -> Result<World, WorldError> {
        let mut world = World::with_seed(Arc::clone(&registry), 0);
        world.rng = data.rng;
        world.tick = data.tick;

        let mut max_node = None;
        for record in data.nodes {
            let def = registry
                .get_node(record.node_type)
                .ok_or(WorldError::UnknownNodeType(record.node_type))?;
            if world.graph.contains_node(record.id) {
                return Err(invalid(format!("node {:?} listed twice", record.id)));
            }

            let mut inventory = Inventory::for_node_type(def);
            for stack in record.inventory {
                if registry.get_resource(stack.resource).is_none() {
                    return Err(WorldError::UnknownResourceType(stack.resource));
                }
                inventory.set_count(stack.resource, stack.count);
            }

            world.graph.insert_node(
                record.id,
                NodeData {
                    position: record.position,
                    node_type: record.node_type,
                },
            );
            world.nodes.insert(
                record.id,
                NodeState {
                    inventory,
                    conversion_progress: record.conversion_progress,
                },
            );
            world.index.register(record.id, def);
            max_node = max_node.max(Some(record.id.0));
        }

        for conn in data.connections {
            world.graph.restore_connection(conn)?;
        }

        let mut max_job = None;
        for (pool, jobs) in [
            (JobPool::Available, data.jobs.available),
            (JobPool::Occupied, data.jobs.occupied),
            (JobPool::Halted, data.jobs.halted),
        ] {
            for job in jobs {
                if registry.get_job(job.job_type).is_none() {
                    return Err(WorldError::UnknownJobType(job.job_type));
                }
                world.graph.node(job.node)?;
                world.jobs.restore(job, pool)?;
                max_job = max_job.max(Some(job.id.0));
            }
        }

        let mut bound = BTreeSet::new();
        for unit in data.units {
            validate_unit(&world, &unit)?;
            if let Some(job) = unit.job {
                if world.jobs.pool_of(job) != Some(JobPool::Occupied) {
                    return Err(invalid(format!("unit bound to job {job:?} which is not occupied")));
                }
                if !bound.insert(job) {
                    return Err(invalid(format!("job {job:?} bound to more than one unit")));
                }
            }
            world.units.insert(unit);
        }

        world.node_ids = IdCounter(data.next_node_id.max(max_node.map_or(0, |m| m + 1)));
        world.job_ids = IdCounter(data.next_job_id.max(max_job.map_or(0, |m| m + 1)));

        tracing::info!(
            tick = world.tick,
            nodes = world.node_count(),
            units = world.unit_count(),
            "world restored"
        );
        Ok(world)
    }

    // -----------------------------------------------------------------------
    // Binary snapshots
    // -----------------------------------------------------------------------

    /// Serialize the world to a versioned binary blob.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = WorldSnapshot {
            header: SnapshotHeader::new(self.tick),
            data: self.to_data(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Deserialize a world from a binary blob. The header is validated
    /// before the document is restored.
    pub fn deserialize(registry: Arc<Registry>, data: &[u8]) -> Result<World, DeserializeError> {
        let snapshot: WorldSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        Ok(World::from_data(registry, snapshot.data)?)
    }
}

fn invalid(reason: String) -> WorldError {
    WorldError::InvalidDocument(reason)
}

/// Every node a unit refers to must exist, and so must its carried resource.
fn validate_unit(world: &World, unit: &Unit) -> Result<(), WorldError> {
    world.graph.node(unit.node)?;
    if let Some(resource) = unit.carried {
        if world.registry.get_resource(resource).is_none() {
            return Err(WorldError::UnknownResourceType(resource));
        }
    }
    for step in unit.procedure.steps() {
        match *step {
            Step::TraverseTo(target) => {
                world.graph.node(target)?;
            }
            Step::PickUpResource(resource) if world.registry.get_resource(resource).is_none() => {
                return Err(WorldError::UnknownResourceType(resource));
            }
            _ => {}
        }
    }
    if let Some(trav) = &unit.traversal {
        for &node in &trav.path {
            world.graph.node(node)?;
        }
        world
            .graph
            .connection(trav.connection.key.a, trav.connection.key.b)?;
        if trav.cursor >= trav.path.len() {
            return Err(invalid(format!(
                "traversal cursor {} past path of length {}",
                trav.cursor,
                trav.path.len()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{JobTypeDef, NodeTypeDef, RegistryBuilder};

    fn registry() -> Arc<Registry> {
        let mut b = RegistryBuilder::new();
        let moss = b.register_resource("moss");
        let grow = b.register_job(JobTypeDef {
            name: "grow_moss".into(),
            output: moss,
            rate: Fixed64::from_num(25),
            inputs: Vec::new(),
        });
        b.register_node(
            NodeTypeDef::new("moss_farm", 12.0)
                .with_capacity(moss, 4)
                .producing(moss, 0)
                .with_job(grow),
        );
        b.register_node(
            NodeTypeDef::new("storage", 20.0)
                .with_capacity(moss, 10)
                .consuming(moss, 9),
        );
        Arc::new(b.build().unwrap())
    }

    fn busy_world() -> World {
        let reg = registry();
        let farm_type = reg.node_id("moss_farm").unwrap();
        let storage_type = reg.node_id("storage").unwrap();
        let mut world = World::with_seed(reg, 99);
        let farm = world.add_node(Position::new(0.0, 0.0), farm_type).unwrap();
        let storage = world.add_node(Position::new(30.0, 0.0), storage_type).unwrap();
        world.connect(farm, storage).unwrap();
        world.add_unit(farm).unwrap();
        world.add_unit(storage).unwrap();
        for _ in 0..17 {
            world.update();
        }
        world
    }

    #[test]
    fn data_round_trip_preserves_state_hash() {
        let world = busy_world();
        let restored = World::from_data(registry(), world.to_data()).unwrap();
        assert_eq!(world.state_hash(), restored.state_hash());
        assert_eq!(restored.graph().cached_path_count(), 0);
        assert_eq!(restored.index().producers_at(crate::id::ResourceTypeId(0), 0), &[NodeId(0)]);
    }

    #[test]
    fn restored_world_continues_identically() {
        let mut world = busy_world();
        let mut restored = World::from_data(registry(), world.to_data()).unwrap();
        for _ in 0..50 {
            world.update();
            restored.update();
        }
        assert_eq!(world.state_hash(), restored.state_hash());
    }

    #[test]
    fn binary_snapshot_round_trip() {
        let world = busy_world();
        let bytes = world.serialize().unwrap();
        let restored = World::deserialize(registry(), &bytes).unwrap();
        assert_eq!(world.state_hash(), restored.state_hash());
        assert_eq!(restored.tick(), 17);
    }

    #[test]
    fn bad_magic_rejected() {
        let world = busy_world();
        let snapshot = WorldSnapshot {
            header: SnapshotHeader {
                magic: 0xDEAD_BEEF,
                version: FORMAT_VERSION,
                tick: 0,
            },
            data: world.to_data(),
        };
        let bytes = bitcode::serialize(&snapshot).unwrap();
        assert!(matches!(
            World::deserialize(registry(), &bytes),
            Err(DeserializeError::InvalidMagic(0xDEAD_BEEF))
        ));
    }

    #[test]
    fn future_version_rejected() {
        let world = busy_world();
        let snapshot = WorldSnapshot {
            header: SnapshotHeader {
                magic: SNAPSHOT_MAGIC,
                version: FORMAT_VERSION + 1,
                tick: 0,
            },
            data: world.to_data(),
        };
        let bytes = bitcode::serialize(&snapshot).unwrap();
        assert!(matches!(
            World::deserialize(registry(), &bytes),
            Err(DeserializeError::FutureVersion(_))
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            World::deserialize(registry(), &[1, 2, 3]),
            Err(DeserializeError::Decode(_))
        ));
    }

    #[test]
    fn dangling_connection_rejected() {
        let mut data = busy_world().to_data();
        data.connections[0].key.b = NodeId(40);
        assert!(matches!(
            World::from_data(registry(), data),
            Err(WorldError::Graph(_))
        ));
    }

    #[test]
    fn unit_bound_to_unoccupied_job_rejected() {
        let mut data = busy_world().to_data();
        let first = crate::id::JobId(0);
        for pool in [
            &mut data.jobs.available,
            &mut data.jobs.occupied,
            &mut data.jobs.halted,
        ] {
            pool.retain(|j| j.id != first);
        }
        data.jobs.halted.push(Job {
            id: first,
            node: NodeId(0),
            job_type: crate::id::JobTypeId(0),
        });
        data.units[0].job = Some(first);
        assert!(matches!(
            World::from_data(registry(), data),
            Err(WorldError::InvalidDocument(_))
        ));
    }

    #[test]
    fn duplicate_job_rejected() {
        let mut data = busy_world().to_data();
        let all: Vec<Job> = data
            .jobs
            .available
            .iter()
            .chain(&data.jobs.occupied)
            .chain(&data.jobs.halted)
            .copied()
            .collect();
        data.jobs.halted.push(all[0]);
        assert!(matches!(
            World::from_data(registry(), data),
            Err(WorldError::Job(_))
        ));
    }

    #[test]
    fn counters_never_reissue_ids() {
        let mut data = busy_world().to_data();
        data.next_node_id = 0;
        data.next_job_id = 0;
        let reg = registry();
        let farm_type = reg.node_id("moss_farm").unwrap();
        let mut world = World::from_data(reg, data).unwrap();
        let node = world.add_node(Position::new(5.0, 5.0), farm_type).unwrap();
        assert_eq!(node, NodeId(2));
        assert_eq!(world.jobs().len(), 2);
        assert!(world.jobs().get(crate::id::JobId(1)).is_some());
    }
}
