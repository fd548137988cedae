//! Read-only query API for rendering and inspection.
//!
//! Snapshot types are owned copies aggregated from world state. No
//! references into internal storage escape.

use crate::fixed::Fixed64;
use crate::graph::Position;
use crate::id::{JobId, NodeId, NodeTypeId, ResourceTypeId, UnitId};
use crate::inventory::ResourceStack;
use crate::world::World;

// ---------------------------------------------------------------------------
// Node snapshot
// ---------------------------------------------------------------------------

/// A read-only view of a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub node_type: NodeTypeId,
    pub position: Position,
    /// Drawing radius from the node type.
    pub radius: f64,
    /// Non-zero inventory counts, ascending by resource id.
    pub inventory: Vec<ResourceStack>,
    /// Conversion progress; zero for node types without a conversion.
    pub conversion_progress: Fixed64,
}

// ---------------------------------------------------------------------------
// Connection snapshot
// ---------------------------------------------------------------------------

/// A read-only view of a single connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionSnapshot {
    /// Lower endpoint id.
    pub a: NodeId,
    /// Higher endpoint id.
    pub b: NodeId,
    pub from: Position,
    pub to: Position,
    pub length: Fixed64,
}

// ---------------------------------------------------------------------------
// Unit snapshot
// ---------------------------------------------------------------------------

/// A read-only view of a single unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSnapshot {
    pub id: UnitId,
    /// The last node the unit reached.
    pub node: NodeId,
    /// Where to draw it: interpolated along an edge while traversing.
    pub position: Position,
    pub carried: Option<ResourceTypeId>,
    pub hunger: Fixed64,
    pub job: Option<JobId>,
    /// Name of the head step, e.g. `"traverse"`.
    pub step: &'static str,
}

impl World {
    pub fn snapshot_node(&self, node: NodeId) -> Option<NodeSnapshot> {
        let data = self.graph.node(node).ok()?;
        let state = self.nodes.get(node)?;
        let radius = self
            .registry
            .get_node(data.node_type)
            .map_or(0.0, |def| def.radius);
        Some(NodeSnapshot {
            id: node,
            node_type: data.node_type,
            position: data.position,
            radius,
            inventory: state.inventory.stacks(),
            conversion_progress: state.conversion_progress,
        })
    }

    /// Snapshots of every node, ascending by id.
    pub fn snapshot_all_nodes(&self) -> Vec<NodeSnapshot> {
        self.graph
            .node_ids()
            .filter_map(|id| self.snapshot_node(id))
            .collect()
    }

    /// Snapshots of every connection, in creation order.
    pub fn snapshot_connections(&self) -> Vec<ConnectionSnapshot> {
        self.graph
            .connections()
            .iter()
            .filter_map(|conn| {
                Some(ConnectionSnapshot {
                    a: conn.key.a,
                    b: conn.key.b,
                    from: self.graph.position(conn.key.a).ok()?,
                    to: self.graph.position(conn.key.b).ok()?,
                    length: conn.length,
                })
            })
            .collect()
    }

    pub fn snapshot_unit(&self, id: UnitId) -> Option<UnitSnapshot> {
        let unit = self.units.get(id)?;
        Some(UnitSnapshot {
            id,
            node: unit.node,
            position: unit.position(&self.graph)?,
            carried: unit.carried,
            hunger: unit.hunger,
            job: unit.job,
            step: unit.procedure.head().name(),
        })
    }

    /// Snapshots of every unit, in slot order.
    pub fn snapshot_all_units(&self) -> Vec<UnitSnapshot> {
        self.units
            .keys()
            .filter_map(|id| self.snapshot_unit(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NodeTypeDef, RegistryBuilder};
    use std::sync::Arc;

    fn world() -> (World, ResourceTypeId, NodeTypeId) {
        let mut b = RegistryBuilder::new();
        let moss = b.register_resource("moss");
        let storage = b.register_node(
            NodeTypeDef::new("storage", 15.0)
                .with_capacity(moss, 5)
                .consuming(moss, 9),
        );
        (World::new(Arc::new(b.build().unwrap())), moss, storage)
    }

    #[test]
    fn node_snapshot_reports_inventory_and_radius() {
        let (mut world, moss, storage) = world();
        let n = world.add_node(Position::new(3.0, 4.0), storage).unwrap();
        world.add_resource(n, moss).unwrap();
        world.add_resource(n, moss).unwrap();

        let snap = world.snapshot_node(n).unwrap();
        assert_eq!(snap.node_type, storage);
        assert_eq!(snap.position, Position::new(3.0, 4.0));
        assert_eq!(snap.radius, 15.0);
        assert_eq!(
            snap.inventory,
            vec![ResourceStack {
                resource: moss,
                count: 2
            }]
        );
        assert!(world.snapshot_node(NodeId(99)).is_none());
    }

    #[test]
    fn connection_snapshot_carries_endpoints() {
        let (mut world, _, storage) = world();
        let a = world.add_node(Position::new(0.0, 0.0), storage).unwrap();
        let b = world.add_node(Position::new(3.0, 4.0), storage).unwrap();
        world.connect(b, a).unwrap();

        let conns = world.snapshot_connections();
        assert_eq!(conns.len(), 1);
        assert_eq!((conns[0].a, conns[0].b), (a, b));
        assert_eq!(conns[0].to, Position::new(3.0, 4.0));
        assert_eq!(conns[0].length, Fixed64::from_num(5));
    }

    #[test]
    fn unit_snapshot_names_head_step() {
        let (mut world, _, storage) = world();
        let n = world.add_node(Position::new(1.0, 1.0), storage).unwrap();
        let u = world.add_unit(n).unwrap();

        let snap = world.snapshot_unit(u).unwrap();
        assert_eq!(snap.step, "find_task");
        assert_eq!(snap.position, Position::new(1.0, 1.0));
        assert_eq!(world.snapshot_all_units().len(), 1);
    }
}
