//! Run a colony without a window.
//!
//! ```text
//! cargo run -p colony-data --example headless_runner -- [config] [ticks] [save]
//! ```
//!
//! Loads the configuration (default `data/colony.ron`), restores the save
//! file when it exists or lays out one node of every type around a hub,
//! runs the requested number of ticks and records the save. Set `RUST_LOG`
//! (for example `RUST_LOG=colony_core=debug`) to watch unit behavior.

use colony_core::graph::Position;
use colony_core::registry::Registry;
use colony_core::world::World;
use colony_data::{load_registry, load_world, record_world};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_TICKS: u64 = 2_000;
const UNITS: usize = 8;
const RING_RADIUS: f64 = 80.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);
    let config = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("data/colony.ron"));
    let ticks = match args.next() {
        Some(arg) => arg.parse()?,
        None => DEFAULT_TICKS,
    };
    let save = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("colony_save.json"));

    let registry = Arc::new(load_registry(&config)?);
    let mut world = if save.exists() {
        load_world(&save, Arc::clone(&registry))?
    } else {
        info!(file = %save.display(), "no save found, laying out a fresh colony");
        fresh_colony(registry)?
    };

    let mut deaths = 0;
    let mut completed = 0;
    let mut halted = 0;
    for _ in 0..ticks {
        let report = world.update();
        deaths += report.deaths.len();
        completed += report.jobs_completed.len();
        halted += report.jobs_halted.len();
    }

    info!(
        tick = world.tick(),
        units = world.unit_count(),
        deaths,
        completed,
        halted,
        hash = %format!("{:016x}", world.state_hash()),
        "run finished"
    );
    for node in world.snapshot_all_nodes() {
        let name = world
            .registry()
            .get_node(node.node_type)
            .map_or("?", |def| def.name.as_str());
        let stock: Vec<String> = node
            .inventory
            .iter()
            .map(|stack| {
                let resource = world
                    .registry()
                    .get_resource(stack.resource)
                    .map_or("?", |def| def.name.as_str());
                format!("{resource}={}", stack.count)
            })
            .collect();
        info!(node = node.id.0, kind = name, stock = %stock.join(" "), "node");
    }

    record_world(&world, &save)?;
    info!(file = %save.display(), "saved");
    Ok(())
}

/// The first node type sits at the origin; one node of every other type is
/// placed on a ring around it, linked to the hub and to its neighbours.
fn fresh_colony(registry: Arc<Registry>) -> Result<World, Box<dyn std::error::Error>> {
    let mut world = World::new(Arc::clone(&registry));
    let kinds: Vec<_> = (0..registry.node_count() as u32)
        .map(colony_core::id::NodeTypeId)
        .collect();
    let Some((&hub_kind, ring_kinds)) = kinds.split_first() else {
        return Err("configuration has no node types".into());
    };

    let hub = world.add_node(Position::new(0.0, 0.0), hub_kind)?;
    let mut ring = Vec::with_capacity(ring_kinds.len());
    for (i, &kind) in ring_kinds.iter().enumerate() {
        let angle = std::f64::consts::TAU * i as f64 / ring_kinds.len() as f64;
        let pos = Position::new(RING_RADIUS * angle.cos(), RING_RADIUS * angle.sin());
        let id = world.add_node(pos, kind)?;
        world.connect(hub, id)?;
        ring.push(id);
    }
    for pair in ring.windows(2) {
        world.connect(pair[0], pair[1])?;
    }
    for _ in 0..UNITS {
        world.add_unit(hub)?;
    }
    Ok(world)
}
