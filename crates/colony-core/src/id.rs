use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a unit (mobile agent) in the world. Generational, so an id
    /// held after the unit died never resolves to a different unit.
    pub struct UnitId;
}

/// Identifies a node in the colony graph. Assigned monotonically by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Identifies a job instance. Assigned monotonically by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u32);

/// Identifies a resource type in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceTypeId(pub u32);

/// Identifies a node type (static node configuration) in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeTypeId(pub u32);

/// Identifies a job type (static job configuration) in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobTypeId(pub u32);

/// Hands out monotonically increasing raw ids. Persisted with the world so a
/// restored world never reissues an id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounter(pub u32);

impl IdCounter {
    /// Return the next raw id and advance the counter.
    pub fn next(&mut self) -> u32 {
        let id = self.0;
        self.0 += 1;
        id
    }

    /// The raw id that will be handed out next.
    pub fn peek(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_order_by_value() {
        assert!(NodeId(1) < NodeId(2));
        assert_eq!(NodeId(3), NodeId(3));
    }

    #[test]
    fn counter_is_monotonic() {
        let mut counter = IdCounter::default();
        assert_eq!(counter.next(), 0);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.peek(), 2);
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ResourceTypeId(0), "moss");
        map.insert(ResourceTypeId(1), "mushroom");
        assert_eq!(map[&ResourceTypeId(0)], "moss");
    }
}
