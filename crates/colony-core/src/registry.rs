use crate::fixed::Fixed64;
use crate::id::*;
use std::collections::{BTreeMap, HashMap};

/// Highest priority level a consumer or producer entry may use. Level 0 is
/// checked first.
pub const MAX_PRIORITY: u8 = 9;

/// Number of priority buckets per resource type.
pub const PRIORITY_LEVELS: usize = MAX_PRIORITY as usize + 1;

/// Errors raised while building the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid resource type reference: {0:?}")]
    InvalidResourceRef(ResourceTypeId),
    #[error("invalid job type reference: {0:?}")]
    InvalidJobRef(JobTypeId),
    #[error("priority {priority} on node type '{node_type}' exceeds {MAX_PRIORITY}")]
    PriorityOutOfRange { node_type: String, priority: u8 },
    #[error("{what} must be positive")]
    NonPositive { what: String },
}

/// A resource type definition.
#[derive(Debug, Clone)]
pub struct ResourceTypeDef {
    pub name: String,
}

/// A resource a node type consumes or produces, with its lookup priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityEntry {
    pub resource: ResourceTypeId,
    pub priority: u8,
}

/// Autonomous conversion performed by a node every time its progress
/// counter reaches `threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionDef {
    /// Resource taken from the node's own inventory each cycle.
    pub input: ResourceTypeId,
    /// Resource emitted into the node's inventory when the input was present.
    pub output: Option<ResourceTypeId>,
    /// Progress added per tick.
    pub rate: Fixed64,
    /// Progress at which one cycle completes.
    pub threshold: Fixed64,
}

/// A node type definition: the immutable configuration a node's type tag
/// selects.
#[derive(Debug, Clone)]
pub struct NodeTypeDef {
    pub name: String,
    pub radius: f64,
    /// Per-resource capacity. Resources absent from the map have capacity 0.
    pub capacity: BTreeMap<ResourceTypeId, u32>,
    pub consumes: Vec<PriorityEntry>,
    pub produces: Vec<PriorityEntry>,
    /// One job of each listed type is spawned when a node of this type is added.
    pub jobs: Vec<JobTypeId>,
    pub conversion: Option<ConversionDef>,
}

impl NodeTypeDef {
    /// A node type with no capacity, no jobs, and no index entries.
    pub fn new(name: &str, radius: f64) -> Self {
        Self {
            name: name.to_string(),
            radius,
            capacity: BTreeMap::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            jobs: Vec::new(),
            conversion: None,
        }
    }

    pub fn with_capacity(mut self, resource: ResourceTypeId, capacity: u32) -> Self {
        self.capacity.insert(resource, capacity);
        self
    }

    pub fn consuming(mut self, resource: ResourceTypeId, priority: u8) -> Self {
        self.consumes.push(PriorityEntry { resource, priority });
        self
    }

    pub fn producing(mut self, resource: ResourceTypeId, priority: u8) -> Self {
        self.produces.push(PriorityEntry { resource, priority });
        self
    }

    pub fn with_job(mut self, job: JobTypeId) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn with_conversion(mut self, conversion: ConversionDef) -> Self {
        self.conversion = Some(conversion);
        self
    }

    /// Configured capacity for a resource type.
    pub fn capacity_for(&self, resource: ResourceTypeId) -> u32 {
        self.capacity.get(&resource).copied().unwrap_or(0)
    }
}

/// A job type definition.
#[derive(Debug, Clone)]
pub struct JobTypeDef {
    pub name: String,
    /// Resource emitted at the job's node on completion.
    pub output: ResourceTypeId,
    /// Progress added per tick while a unit works the job.
    pub rate: Fixed64,
    /// Resources (one unit each) that must be present at the node to start
    /// the job, and that are consumed on completion.
    pub inputs: Vec<ResourceTypeId>,
}

/// Settings shared by every unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitConfig {
    /// Edge progress added per tick while traversing.
    pub speed: Fixed64,
    /// Hunger added every tick.
    pub hunger_rate: Fixed64,
    /// Hunger above which a unit at its root step goes looking for food.
    pub feeding_threshold: Fixed64,
    /// Hunger above which a unit at its root step dies.
    pub death_threshold: Fixed64,
    /// Resource eaten to reset hunger. Without one a unit can never eat.
    pub food: Option<ResourceTypeId>,
    /// Job progress at which a job completes.
    pub job_threshold: Fixed64,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            speed: Fixed64::from_num(2),
            hunger_rate: Fixed64::from_num(1),
            feeding_threshold: Fixed64::from_num(1_000),
            death_threshold: Fixed64::from_num(2_000),
            food: None,
            job_threshold: Fixed64::from_num(100),
        }
    }
}

/// Builder for constructing an immutable Registry.
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    resources: Vec<ResourceTypeDef>,
    resource_name_to_id: HashMap<String, ResourceTypeId>,
    nodes: Vec<NodeTypeDef>,
    node_name_to_id: HashMap<String, NodeTypeId>,
    jobs: Vec<JobTypeDef>,
    job_name_to_id: HashMap<String, JobTypeId>,
    unit: UnitConfig,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type. Returns its ID.
    pub fn register_resource(&mut self, name: &str) -> ResourceTypeId {
        let id = ResourceTypeId(self.resources.len() as u32);
        self.resources.push(ResourceTypeDef {
            name: name.to_string(),
        });
        self.resource_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a job type. Returns its ID.
    pub fn register_job(&mut self, def: JobTypeDef) -> JobTypeId {
        let id = JobTypeId(self.jobs.len() as u32);
        self.job_name_to_id.insert(def.name.clone(), id);
        self.jobs.push(def);
        id
    }

    /// Register a node type. Returns its ID.
    pub fn register_node(&mut self, def: NodeTypeDef) -> NodeTypeId {
        let id = NodeTypeId(self.nodes.len() as u32);
        self.node_name_to_id.insert(def.name.clone(), id);
        self.nodes.push(def);
        id
    }

    /// Replace the unit settings.
    pub fn set_unit(&mut self, unit: UnitConfig) {
        self.unit = unit;
    }

    /// Mutate an existing node type by name.
    pub fn mutate_node<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut NodeTypeDef),
    {
        let id = self
            .node_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.nodes[id.0 as usize]);
        Ok(())
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceTypeId> {
        self.resource_name_to_id.get(name).copied()
    }

    pub fn node_id(&self, name: &str) -> Option<NodeTypeId> {
        self.node_name_to_id.get(name).copied()
    }

    pub fn job_id(&self, name: &str) -> Option<JobTypeId> {
        self.job_name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let resource_ok = |id: ResourceTypeId| (id.0 as usize) < self.resources.len();
        let check_resource = |id: ResourceTypeId| {
            if resource_ok(id) {
                Ok(())
            } else {
                Err(RegistryError::InvalidResourceRef(id))
            }
        };
        let positive = |v: Fixed64, what: String| {
            if v > Fixed64::ZERO {
                Ok(())
            } else {
                Err(RegistryError::NonPositive { what })
            }
        };

        for job in &self.jobs {
            check_resource(job.output)?;
            for &input in &job.inputs {
                check_resource(input)?;
            }
            positive(job.rate, format!("rate of job type '{}'", job.name))?;
        }

        for node in &self.nodes {
            for &resource in node.capacity.keys() {
                check_resource(resource)?;
            }
            for entry in node.consumes.iter().chain(node.produces.iter()) {
                check_resource(entry.resource)?;
                if entry.priority > MAX_PRIORITY {
                    return Err(RegistryError::PriorityOutOfRange {
                        node_type: node.name.clone(),
                        priority: entry.priority,
                    });
                }
            }
            for &job in &node.jobs {
                if job.0 as usize >= self.jobs.len() {
                    return Err(RegistryError::InvalidJobRef(job));
                }
            }
            if let Some(conv) = &node.conversion {
                check_resource(conv.input)?;
                if let Some(output) = conv.output {
                    check_resource(output)?;
                }
                positive(conv.rate, format!("conversion rate of '{}'", node.name))?;
                positive(
                    conv.threshold,
                    format!("conversion threshold of '{}'", node.name),
                )?;
            }
        }

        if let Some(food) = self.unit.food {
            check_resource(food)?;
        }
        positive(self.unit.speed, "unit speed".to_string())?;
        positive(self.unit.job_threshold, "job threshold".to_string())?;

        Ok(Registry {
            resources: self.resources,
            resource_name_to_id: self.resource_name_to_id,
            nodes: self.nodes,
            node_name_to_id: self.node_name_to_id,
            jobs: self.jobs,
            job_name_to_id: self.job_name_to_id,
            unit: self.unit,
        })
    }
}

/// Immutable registry of static configuration. Frozen after build().
#[derive(Debug)]
pub struct Registry {
    resources: Vec<ResourceTypeDef>,
    resource_name_to_id: HashMap<String, ResourceTypeId>,
    nodes: Vec<NodeTypeDef>,
    node_name_to_id: HashMap<String, NodeTypeId>,
    jobs: Vec<JobTypeDef>,
    job_name_to_id: HashMap<String, JobTypeId>,
    unit: UnitConfig,
}

impl Registry {
    pub fn get_resource(&self, id: ResourceTypeId) -> Option<&ResourceTypeDef> {
        self.resources.get(id.0 as usize)
    }

    pub fn get_node(&self, id: NodeTypeId) -> Option<&NodeTypeDef> {
        self.nodes.get(id.0 as usize)
    }

    pub fn get_job(&self, id: JobTypeId) -> Option<&JobTypeDef> {
        self.jobs.get(id.0 as usize)
    }

    pub fn unit(&self) -> &UnitConfig {
        &self.unit
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceTypeId> {
        self.resource_name_to_id.get(name).copied()
    }

    pub fn node_id(&self, name: &str) -> Option<NodeTypeId> {
        self.node_name_to_id.get(name).copied()
    }

    pub fn job_id(&self, name: &str) -> Option<JobTypeId> {
        self.job_name_to_id.get(name).copied()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moss_builder() -> (RegistryBuilder, ResourceTypeId) {
        let mut b = RegistryBuilder::new();
        let moss = b.register_resource("moss");
        (b, moss)
    }

    #[test]
    fn register_and_lookup() {
        let (mut b, moss) = moss_builder();
        let grow = b.register_job(JobTypeDef {
            name: "grow_moss".to_string(),
            output: moss,
            rate: Fixed64::from_num(25),
            inputs: Vec::new(),
        });
        let farm = b.register_node(
            NodeTypeDef::new("moss_farm", 20.0)
                .with_capacity(moss, 5)
                .producing(moss, 0)
                .with_job(grow),
        );
        let reg = b.build().unwrap();

        assert_eq!(reg.resource_id("moss"), Some(moss));
        assert_eq!(reg.node_id("moss_farm"), Some(farm));
        assert_eq!(reg.job_id("grow_moss"), Some(grow));
        assert_eq!(reg.get_node(farm).unwrap().capacity_for(moss), 5);
        assert_eq!(reg.get_node(farm).unwrap().jobs, vec![grow]);
        assert_eq!(reg.resource_count(), 1);
    }

    #[test]
    fn missing_capacity_is_zero() {
        let (b, moss) = moss_builder();
        let def = NodeTypeDef::new("none", 10.0);
        assert_eq!(def.capacity_for(moss), 0);
        b.build().unwrap();
    }

    #[test]
    fn priority_above_nine_rejected() {
        let (mut b, moss) = moss_builder();
        b.register_node(NodeTypeDef::new("storage", 10.0).consuming(moss, 10));
        assert!(matches!(
            b.build(),
            Err(RegistryError::PriorityOutOfRange { priority: 10, .. })
        ));
    }

    #[test]
    fn dangling_resource_rejected() {
        let (mut b, _) = moss_builder();
        b.register_node(NodeTypeDef::new("storage", 10.0).with_capacity(ResourceTypeId(7), 1));
        assert!(matches!(
            b.build(),
            Err(RegistryError::InvalidResourceRef(ResourceTypeId(7)))
        ));
    }

    #[test]
    fn dangling_job_rejected() {
        let (mut b, _) = moss_builder();
        b.register_node(NodeTypeDef::new("farm", 10.0).with_job(JobTypeId(3)));
        assert!(matches!(
            b.build(),
            Err(RegistryError::InvalidJobRef(JobTypeId(3)))
        ));
    }

    #[test]
    fn zero_job_rate_rejected() {
        let (mut b, moss) = moss_builder();
        b.register_job(JobTypeDef {
            name: "idle".to_string(),
            output: moss,
            rate: Fixed64::ZERO,
            inputs: Vec::new(),
        });
        assert!(matches!(b.build(), Err(RegistryError::NonPositive { .. })));
    }

    #[test]
    fn mutate_node_by_name() {
        let (mut b, moss) = moss_builder();
        b.register_node(NodeTypeDef::new("storage", 10.0));
        b.mutate_node("storage", |n| {
            n.capacity.insert(moss, 9);
        })
        .unwrap();
        assert!(b.mutate_node("missing", |_| {}).is_err());
        let reg = b.build().unwrap();
        let id = reg.node_id("storage").unwrap();
        assert_eq!(reg.get_node(id).unwrap().capacity_for(moss), 9);
    }

    #[test]
    fn unknown_food_rejected() {
        let (mut b, _) = moss_builder();
        b.set_unit(UnitConfig {
            food: Some(ResourceTypeId(4)),
            ..UnitConfig::default()
        });
        assert!(b.build().is_err());
    }
}
