//! Serde data file structs for colony configuration.
//!
//! A configuration file holds four sections: resource types, job types,
//! node types and unit settings. Cross references are by name and are
//! resolved into registry ids by the loader. The same structs deserialize
//! from RON, JSON and TOML.

use serde::Deserialize;

// ===========================================================================
// Top level
// ===========================================================================

/// A whole configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColonyConfig {
    #[serde(default)]
    pub resources: Vec<ResourceData>,
    #[serde(default)]
    pub jobs: Vec<JobData>,
    #[serde(default)]
    pub nodes: Vec<NodeData>,
    #[serde(default)]
    pub unit: UnitData,
}

// ===========================================================================
// Resources
// ===========================================================================

/// A resource type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub name: String,
}

// ===========================================================================
// Jobs
// ===========================================================================

/// A job type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct JobData {
    pub name: String,
    /// Resource name emitted on completion.
    pub output: String,
    /// Progress per tick while worked.
    pub rate: f64,
    /// Resource names that must be present to start and are consumed on
    /// completion. Repeat a name to require more than one.
    #[serde(default)]
    pub inputs: Vec<String>,
}

// ===========================================================================
// Nodes
// ===========================================================================

/// A node type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeData {
    pub name: String,
    pub radius: f64,
    /// `(resource, capacity)` pairs. Unlisted resources have capacity 0.
    #[serde(default)]
    pub capacity: Vec<(String, u32)>,
    /// `(resource, priority)` pairs; priority 0 is looked at first.
    #[serde(default)]
    pub consumes: Vec<(String, u8)>,
    #[serde(default)]
    pub produces: Vec<(String, u8)>,
    /// Job type names; one job of each is spawned per node.
    #[serde(default)]
    pub jobs: Vec<String>,
    #[serde(default)]
    pub conversion: Option<ConversionData>,
}

/// Autonomous conversion on a node type.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversionData {
    pub input: String,
    #[serde(default)]
    pub output: Option<String>,
    pub rate: f64,
    pub threshold: f64,
}

// ===========================================================================
// Units
// ===========================================================================

/// Unit settings. Every field is optional and falls back to the engine
/// default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitData {
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub hunger_rate: Option<f64>,
    #[serde(default)]
    pub feeding_threshold: Option<f64>,
    #[serde(default)]
    pub death_threshold: Option<f64>,
    /// Resource name units eat.
    #[serde(default)]
    pub food: Option<String>,
    #[serde(default)]
    pub job_threshold: Option<f64>,
}
