use crate::fixed::Fixed64;
use crate::id::ResourceTypeId;
use crate::registry::{ConversionDef, NodeTypeDef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors raised by inventory operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("capacity for {resource:?} reached ({capacity})")]
    CapacityExceeded {
        resource: ResourceTypeId,
        capacity: u32,
    },
    #[error("no {0:?} in inventory")]
    EmptyInventory(ResourceTypeId),
}

/// A count of one resource type. Used in snapshots and persisted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStack {
    pub resource: ResourceTypeId,
    pub count: u32,
}

/// Typed resource counts at a node, each bounded by the node type's
/// per-resource capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    counts: BTreeMap<ResourceTypeId, u32>,
    capacity: BTreeMap<ResourceTypeId, u32>,
}

impl Inventory {
    /// An empty inventory with the capacities of `def`.
    pub fn for_node_type(def: &NodeTypeDef) -> Self {
        Self {
            counts: BTreeMap::new(),
            capacity: def.capacity.clone(),
        }
    }

    /// Add one unit of `resource`.
    pub fn add(&mut self, resource: ResourceTypeId) -> Result<(), InventoryError> {
        let capacity = self.capacity(resource);
        let count = self.count(resource);
        if count >= capacity {
            return Err(InventoryError::CapacityExceeded { resource, capacity });
        }
        self.counts.insert(resource, count + 1);
        Ok(())
    }

    /// Take one unit of `resource`.
    pub fn take(&mut self, resource: ResourceTypeId) -> Result<(), InventoryError> {
        match self.counts.get_mut(&resource) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(&resource);
                }
                Ok(())
            }
            _ => Err(InventoryError::EmptyInventory(resource)),
        }
    }

    /// Current count of `resource`.
    pub fn count(&self, resource: ResourceTypeId) -> u32 {
        self.counts.get(&resource).copied().unwrap_or(0)
    }

    /// Configured capacity of `resource`.
    pub fn capacity(&self, resource: ResourceTypeId) -> u32 {
        self.capacity.get(&resource).copied().unwrap_or(0)
    }

    /// How many more units of `resource` fit.
    pub fn available_capacity(&self, resource: ResourceTypeId) -> u32 {
        self.capacity(resource).saturating_sub(self.count(resource))
    }

    /// Total units across all resource types.
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Non-empty stacks in ascending resource id order.
    pub fn stacks(&self) -> Vec<ResourceStack> {
        self.counts
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(&resource, &count)| ResourceStack { resource, count })
            .collect()
    }

    /// Overwrite a count while restoring a persisted world. Counts above the
    /// capacity are clamped.
    pub(crate) fn set_count(&mut self, resource: ResourceTypeId, count: u32) {
        let count = count.min(self.capacity(resource));
        if count == 0 {
            self.counts.remove(&resource);
        } else {
            self.counts.insert(resource, count);
        }
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// What one conversion tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Progress accumulated; no cycle completed.
    Accumulating,
    /// A cycle completed and the input was consumed.
    Converted,
    /// A cycle completed but the input was absent. The cycle is spent anyway.
    Wasted,
}

/// Advance a node's autonomous conversion by one tick.
///
/// On reaching the threshold the progress resets and one unit of the input
/// is taken. The reset happens whether or not the input was there. When the
/// input was taken and the output does not fit, the output is lost.
pub fn tick_conversion(
    conversion: &ConversionDef,
    progress: &mut Fixed64,
    inventory: &mut Inventory,
) -> ConversionOutcome {
    *progress = progress.saturating_add(conversion.rate);
    if *progress < conversion.threshold {
        return ConversionOutcome::Accumulating;
    }
    *progress = Fixed64::ZERO;

    if inventory.take(conversion.input).is_err() {
        return ConversionOutcome::Wasted;
    }
    if let Some(output) = conversion.output {
        if let Err(err) = inventory.add(output) {
            tracing::warn!(%err, ?output, "conversion output discarded");
        }
    }
    ConversionOutcome::Converted
}
