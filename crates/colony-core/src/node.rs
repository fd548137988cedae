use crate::fixed::Fixed64;
use crate::id::{NodeId, ResourceTypeId};
use crate::index::StockLevels;
use crate::inventory::{Inventory, InventoryError};
use std::collections::BTreeMap;

/// Mutable per-node state: inventory and conversion progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeState {
    pub inventory: Inventory,
    /// Progress towards the next autonomous conversion. Stays zero for node
    /// types without a conversion.
    pub conversion_progress: Fixed64,
}

/// Per-node state keyed by node id, iterated in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    states: BTreeMap<NodeId, NodeState>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, node: NodeId, state: NodeState) {
        self.states.insert(node, state);
    }

    pub fn get(&self, node: NodeId) -> Option<&NodeState> {
        self.states.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeState> {
        self.states.get_mut(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeState)> {
        self.states.iter().map(|(&id, s)| (id, s))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut NodeState)> {
        self.states.iter_mut().map(|(&id, s)| (id, s))
    }

    /// Add one unit of `resource` at `node`. A missing node has no room.
    pub fn add_resource(
        &mut self,
        node: NodeId,
        resource: ResourceTypeId,
    ) -> Result<(), InventoryError> {
        match self.states.get_mut(&node) {
            Some(state) => state.inventory.add(resource),
            None => Err(InventoryError::CapacityExceeded {
                resource,
                capacity: 0,
            }),
        }
    }

    /// Take one unit of `resource` at `node`. A missing node is empty.
    pub fn take_resource(
        &mut self,
        node: NodeId,
        resource: ResourceTypeId,
    ) -> Result<(), InventoryError> {
        match self.states.get_mut(&node) {
            Some(state) => state.inventory.take(resource),
            None => Err(InventoryError::EmptyInventory(resource)),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl StockLevels for NodeStore {
    fn resource_count(&self, node: NodeId, resource: ResourceTypeId) -> u32 {
        self.get(node).map_or(0, |s| s.inventory.count(resource))
    }

    fn available_capacity(&self, node: NodeId, resource: ResourceTypeId) -> u32 {
        self.get(node)
            .map_or(0, |s| s.inventory.available_capacity(resource))
    }
}
