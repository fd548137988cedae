//! Resolution pipeline: reads a configuration file, resolves name
//! references, builds the registry.
//!
//! Format detection (RON/JSON/TOML) and deserialization helpers are shared
//! with the save file module.

use crate::schema::{ColonyConfig, ConversionData, JobData, NodeData, UnitData};
use colony_core::fixed::Fixed64;
use colony_core::id::{JobTypeId, ResourceTypeId};
use colony_core::registry::{
    ConversionDef, JobTypeDef, NodeTypeDef, Registry, RegistryBuilder, RegistryError, UnitConfig,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization (or serialization) error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate {kind} name '{name}' in {file}")]
    DuplicateName {
        file: PathBuf,
        kind: &'static str,
        name: String,
    },

    /// A number that does not fit the engine's fixed-point range, or a
    /// non-finite one.
    #[error("{what} in {file} is out of range: {value}")]
    OutOfRange {
        file: PathBuf,
        what: String,
        value: f64,
    },

    /// The resolved configuration failed registry validation.
    #[error("invalid configuration in {file}: {source}")]
    Registry {
        file: PathBuf,
        #[source]
        source: RegistryError,
    },

    /// A save file held a world document the registry rejects.
    #[error("invalid world in {file}: {source}")]
    World {
        file: PathBuf,
        #[source]
        source: colony_core::world::WorldError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Toml => toml::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
    kind: &'static str,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            kind,
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

fn to_fixed(value: f64, what: impl Into<String>, file: &Path) -> Result<Fixed64, DataLoadError> {
    Fixed64::checked_from_num(value).ok_or_else(|| DataLoadError::OutOfRange {
        file: file.to_path_buf(),
        what: what.into(),
        value,
    })
}

// ===========================================================================
// Registry construction
// ===========================================================================

/// Read a configuration file without resolving it.
pub fn load_config(path: &Path) -> Result<ColonyConfig, DataLoadError> {
    deserialize_file(path)
}

/// Read a configuration file and build the registry it describes.
pub fn load_registry(path: &Path) -> Result<Registry, DataLoadError> {
    let config = load_config(path)?;
    let registry = build_registry(&config, path)?;
    tracing::info!(
        file = %path.display(),
        resources = registry.resource_count(),
        nodes = registry.node_count(),
        jobs = registry.job_count(),
        "configuration loaded"
    );
    Ok(registry)
}

/// Resolve an in-memory configuration. `file` is only used in errors.
pub fn build_registry(config: &ColonyConfig, file: &Path) -> Result<Registry, DataLoadError> {
    let mut builder = RegistryBuilder::new();

    let mut resources: HashMap<String, ResourceTypeId> = HashMap::new();
    for res in &config.resources {
        check_duplicate(&resources, &res.name, file, "resource")?;
        let id = builder.register_resource(&res.name);
        resources.insert(res.name.clone(), id);
    }

    let mut jobs: HashMap<String, JobTypeId> = HashMap::new();
    for job in &config.jobs {
        check_duplicate(&jobs, &job.name, file, "job")?;
        let def = resolve_job(job, &resources, file)?;
        let id = builder.register_job(def);
        jobs.insert(job.name.clone(), id);
    }

    let mut node_names: HashMap<String, ()> = HashMap::new();
    for node in &config.nodes {
        check_duplicate(&node_names, &node.name, file, "node")?;
        let def = resolve_node(node, &resources, &jobs, file)?;
        builder.register_node(def);
        node_names.insert(node.name.clone(), ());
    }

    builder.set_unit(resolve_unit(&config.unit, &resources, file)?);

    builder.build().map_err(|source| DataLoadError::Registry {
        file: file.to_path_buf(),
        source,
    })
}

fn resolve_job(
    job: &JobData,
    resources: &HashMap<String, ResourceTypeId>,
    file: &Path,
) -> Result<JobTypeDef, DataLoadError> {
    let output = *resolve_name(resources, &job.output, file, "resource")?;
    let inputs = job
        .inputs
        .iter()
        .map(|name| resolve_name(resources, name, file, "resource").copied())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(JobTypeDef {
        name: job.name.clone(),
        output,
        rate: to_fixed(job.rate, format!("rate of job '{}'", job.name), file)?,
        inputs,
    })
}

fn resolve_node(
    node: &NodeData,
    resources: &HashMap<String, ResourceTypeId>,
    jobs: &HashMap<String, JobTypeId>,
    file: &Path,
) -> Result<NodeTypeDef, DataLoadError> {
    if !node.radius.is_finite() || node.radius <= 0.0 {
        return Err(DataLoadError::OutOfRange {
            file: file.to_path_buf(),
            what: format!("radius of node '{}'", node.name),
            value: node.radius,
        });
    }

    let mut def = NodeTypeDef::new(&node.name, node.radius);
    for (name, capacity) in &node.capacity {
        let resource = *resolve_name(resources, name, file, "resource")?;
        def = def.with_capacity(resource, *capacity);
    }
    for (name, priority) in &node.consumes {
        let resource = *resolve_name(resources, name, file, "resource")?;
        def = def.consuming(resource, *priority);
    }
    for (name, priority) in &node.produces {
        let resource = *resolve_name(resources, name, file, "resource")?;
        def = def.producing(resource, *priority);
    }
    for name in &node.jobs {
        def = def.with_job(*resolve_name(jobs, name, file, "job")?);
    }
    if let Some(conv) = &node.conversion {
        def = def.with_conversion(resolve_conversion(conv, &node.name, resources, file)?);
    }
    Ok(def)
}

fn resolve_conversion(
    conv: &ConversionData,
    node_name: &str,
    resources: &HashMap<String, ResourceTypeId>,
    file: &Path,
) -> Result<ConversionDef, DataLoadError> {
    let output = match &conv.output {
        Some(name) => Some(*resolve_name(resources, name, file, "resource")?),
        None => None,
    };
    Ok(ConversionDef {
        input: *resolve_name(resources, &conv.input, file, "resource")?,
        output,
        rate: to_fixed(conv.rate, format!("conversion rate of '{node_name}'"), file)?,
        threshold: to_fixed(
            conv.threshold,
            format!("conversion threshold of '{node_name}'"),
            file,
        )?,
    })
}

fn resolve_unit(
    unit: &UnitData,
    resources: &HashMap<String, ResourceTypeId>,
    file: &Path,
) -> Result<UnitConfig, DataLoadError> {
    let defaults = UnitConfig::default();
    let or_default = |value: Option<f64>, fallback: Fixed64, what: &str| match value {
        Some(v) => to_fixed(v, format!("unit {what}"), file),
        None => Ok(fallback),
    };
    let food = match &unit.food {
        Some(name) => Some(*resolve_name(resources, name, file, "resource")?),
        None => None,
    };
    Ok(UnitConfig {
        speed: or_default(unit.speed, defaults.speed, "speed")?,
        hunger_rate: or_default(unit.hunger_rate, defaults.hunger_rate, "hunger rate")?,
        feeding_threshold: or_default(
            unit.feeding_threshold,
            defaults.feeding_threshold,
            "feeding threshold",
        )?,
        death_threshold: or_default(
            unit.death_threshold,
            defaults.death_threshold,
            "death threshold",
        )?,
        food,
        job_threshold: or_default(unit.job_threshold, defaults.job_threshold, "job threshold")?,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
