//! Resource-keyed, priority-bucketed lookup of nodes that consume or produce
//! a resource.
//!
//! Membership is fixed when a node is added. Selection always runs against
//! live stock levels supplied through [`StockLevels`].

use crate::id::{NodeId, ResourceTypeId};
use crate::registry::{NodeTypeDef, PRIORITY_LEVELS};
use std::collections::BTreeMap;

/// Errors raised by index lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("no consumer available for {0:?}")]
    NoConsumerAvailable(ResourceTypeId),
    #[error("no producer available")]
    NoProducerAvailable,
}

/// Live inventory state the index selects against.
pub trait StockLevels {
    /// Units of `resource` at `node`.
    fn resource_count(&self, node: NodeId, resource: ResourceTypeId) -> u32;
    /// Free room for `resource` at `node`.
    fn available_capacity(&self, node: NodeId, resource: ResourceTypeId) -> u32;
}

type Buckets = [Vec<NodeId>; PRIORITY_LEVELS];

/// Consumer and producer candidates per resource type, bucketed by priority.
#[derive(Debug, Clone, Default)]
pub struct PriorityIndex {
    consumers: BTreeMap<ResourceTypeId, Buckets>,
    producers: BTreeMap<ResourceTypeId, Buckets>,
}

impl PriorityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under every resource its type consumes or produces.
    pub fn register(&mut self, node: NodeId, def: &NodeTypeDef) {
        for entry in &def.consumes {
            self.consumers.entry(entry.resource).or_default()[usize::from(entry.priority)]
                .push(node);
        }
        for entry in &def.produces {
            self.producers.entry(entry.resource).or_default()[usize::from(entry.priority)]
                .push(node);
        }
    }

    /// The consumer to deliver `resource` to: within the lowest priority level
    /// that has a candidate with free room, the candidate with the most room.
    /// Ties go to the node registered first.
    pub fn consumer_for(
        &self,
        resource: ResourceTypeId,
        stock: &impl StockLevels,
    ) -> Result<NodeId, IndexError> {
        self.consumers
            .get(&resource)
            .and_then(|buckets| {
                select(buckets, |node| stock.available_capacity(node, resource)).map(|(n, _)| n)
            })
            .ok_or(IndexError::NoConsumerAvailable(resource))
    }

    /// The producer to fetch `resource` from: within the lowest priority level
    /// that has a stocked candidate, the candidate holding the most.
    pub fn producer_for(
        &self,
        resource: ResourceTypeId,
        stock: &impl StockLevels,
    ) -> Result<NodeId, IndexError> {
        self.producer_with_count(resource, stock)
            .map(|(node, _)| node)
            .ok_or(IndexError::NoProducerAvailable)
    }

    /// Across every produced resource type, the (node, resource) pair whose
    /// `producer_for` pick holds the most units. Ties go to the lower resource id.
    pub fn best_producer(
        &self,
        stock: &impl StockLevels,
    ) -> Result<(NodeId, ResourceTypeId), IndexError> {
        let mut best: Option<(NodeId, ResourceTypeId, u32)> = None;
        for &resource in self.producers.keys() {
            if let Some((node, count)) = self.producer_with_count(resource, stock) {
                match best {
                    Some((_, _, c)) if count <= c => {}
                    _ => best = Some((node, resource, count)),
                }
            }
        }
        best.map(|(node, resource, _)| (node, resource))
            .ok_or(IndexError::NoProducerAvailable)
    }

    fn producer_with_count(
        &self,
        resource: ResourceTypeId,
        stock: &impl StockLevels,
    ) -> Option<(NodeId, u32)> {
        self.producers
            .get(&resource)
            .and_then(|buckets| select(buckets, |node| stock.resource_count(node, resource)))
    }

    /// Consumers of `resource` at `priority`, in registration order.
    pub fn consumers_at(&self, resource: ResourceTypeId, priority: u8) -> &[NodeId] {
        bucket(&self.consumers, resource, priority)
    }

    /// Producers of `resource` at `priority`, in registration order.
    pub fn producers_at(&self, resource: ResourceTypeId, priority: u8) -> &[NodeId] {
        bucket(&self.producers, resource, priority)
    }
}

fn bucket(
    map: &BTreeMap<ResourceTypeId, Buckets>,
    resource: ResourceTypeId,
    priority: u8,
) -> &[NodeId] {
    map.get(&resource)
        .and_then(|b| b.get(usize::from(priority)))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Scan levels ascending; at the first level where some candidate scores
/// above zero, return the strictly highest scorer.
fn select(buckets: &Buckets, score: impl Fn(NodeId) -> u32) -> Option<(NodeId, u32)> {
    for level in buckets {
        let mut best: Option<(NodeId, u32)> = None;
        for &node in level {
            let s = score(node);
            if s > best.map_or(0, |(_, b)| b) {
                best = Some((node, s));
            }
        }
        if best.is_some() {
            return best;
        }
    }
    None
}
