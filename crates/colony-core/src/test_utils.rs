//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::fixed::Fixed64;
use crate::graph::Position;
use crate::id::{NodeId, NodeTypeId, ResourceTypeId, UnitId};
use crate::registry::{
    ConversionDef, JobTypeDef, NodeTypeDef, Registry, RegistryBuilder, UnitConfig,
};
use crate::sim::TickReport;
use crate::world::World;
use std::sync::Arc;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Unit settings under which nobody gets hungry enough to matter.
pub fn well_fed_units() -> UnitConfig {
    UnitConfig {
        feeding_threshold: fixed(1_000_000.0),
        death_threshold: fixed(2_000_000.0),
        ..UnitConfig::default()
    }
}

// ===========================================================================
// Haul fixture: producer -> consumer, plus a neutral node
// ===========================================================================

/// Ids of the haul fixture.
#[derive(Debug)]
pub struct HaulFixture {
    pub world: World,
    pub resource: ResourceTypeId,
    pub producer: NodeId,
    pub consumer: NodeId,
    pub neutral: NodeId,
    pub unit: UnitId,
}

/// Resource `r`; node types `producer` (produces r at priority 0),
/// `consumer` (consumes r at priority 0) and `neutral`.
pub fn haul_registry() -> Arc<Registry> {
    let mut b = RegistryBuilder::new();
    let r = b.register_resource("r");
    b.register_node(
        NodeTypeDef::new("producer", 10.0)
            .with_capacity(r, 1)
            .producing(r, 0),
    );
    b.register_node(
        NodeTypeDef::new("consumer", 10.0)
            .with_capacity(r, 2)
            .consuming(r, 0),
    );
    b.register_node(NodeTypeDef::new("neutral", 10.0));
    b.set_unit(well_fed_units());
    Arc::new(b.build().expect("haul registry is valid"))
}

/// Three mutually connected nodes, one unit of `r` at the producer, and one
/// unit standing on the neutral node.
pub fn haul_world() -> HaulFixture {
    let registry = haul_registry();
    let resource = registry.resource_id("r").expect("r");
    let kind = |name: &str| registry.node_id(name).expect("node type");
    let (p, c, n) = (kind("producer"), kind("consumer"), kind("neutral"));

    let mut world = World::new(Arc::clone(&registry));
    let producer = world.add_node(Position::new(0.0, 0.0), p).expect("add");
    let consumer = world.add_node(Position::new(40.0, 0.0), c).expect("add");
    let neutral = world.add_node(Position::new(20.0, 30.0), n).expect("add");
    world.connect(producer, consumer).expect("connect");
    world.connect(consumer, neutral).expect("connect");
    world.connect(neutral, producer).expect("connect");
    world.add_resource(producer, resource).expect("stock");
    let unit = world.add_unit(neutral).expect("unit");

    HaulFixture {
        world,
        resource,
        producer,
        consumer,
        neutral,
        unit,
    }
}

// ===========================================================================
// Job fixture: one workshop with one job
// ===========================================================================

/// Resource `r`; node type `workshop` holding up to `capacity` r and
/// spawning one `make_r` job at `rate` per tick.
pub fn job_registry(rate: f64, capacity: u32) -> Arc<Registry> {
    let mut b = RegistryBuilder::new();
    let r = b.register_resource("r");
    let make = b.register_job(JobTypeDef {
        name: "make_r".into(),
        output: r,
        rate: fixed(rate),
        inputs: Vec::new(),
    });
    b.register_node(
        NodeTypeDef::new("workshop", 10.0)
            .with_capacity(r, capacity)
            .with_job(make),
    );
    b.set_unit(well_fed_units());
    Arc::new(b.build().expect("job registry is valid"))
}

// ===========================================================================
// Colony fixture: the moss / mushroom economy
// ===========================================================================

/// A small colony economy:
///
/// - `moss_farm` grows moss (job), offers it at priority 0
/// - `moss_fermentation_chamber` takes moss at priority 0 and slowly turns
///   it into brew
/// - `mushroom_farm` takes moss at priority 1 and grows mushrooms from two
///   moss each (job), offering them at priority 0
/// - `storage` takes and offers moss and mushrooms at priority 9
/// - units eat mushrooms
pub fn colony_registry() -> Arc<Registry> {
    let mut b = RegistryBuilder::new();
    let moss = b.register_resource("moss");
    let mushroom = b.register_resource("mushroom");
    let brew = b.register_resource("brew");

    let grow_moss = b.register_job(JobTypeDef {
        name: "grow_moss".into(),
        output: moss,
        rate: fixed(25.0),
        inputs: Vec::new(),
    });
    let grow_mushroom = b.register_job(JobTypeDef {
        name: "grow_mushroom".into(),
        output: mushroom,
        rate: fixed(10.0),
        inputs: vec![moss, moss],
    });

    b.register_node(NodeTypeDef::new("none", 8.0));
    b.register_node(
        NodeTypeDef::new("moss_farm", 14.0)
            .with_capacity(moss, 5)
            .producing(moss, 0)
            .with_job(grow_moss)
            .with_job(grow_moss),
    );
    b.register_node(
        NodeTypeDef::new("moss_fermentation_chamber", 14.0)
            .with_capacity(moss, 5)
            .with_capacity(brew, 5)
            .consuming(moss, 0)
            .with_conversion(ConversionDef {
                input: moss,
                output: Some(brew),
                rate: fixed(1.0),
                threshold: fixed(50.0),
            }),
    );
    b.register_node(
        NodeTypeDef::new("mushroom_farm", 14.0)
            .with_capacity(moss, 4)
            .with_capacity(mushroom, 5)
            .consuming(moss, 1)
            .producing(mushroom, 0)
            .with_job(grow_mushroom),
    );
    b.register_node(
        NodeTypeDef::new("storage", 20.0)
            .with_capacity(moss, 20)
            .with_capacity(mushroom, 20)
            .consuming(moss, 9)
            .consuming(mushroom, 9)
            .producing(moss, 9)
            .producing(mushroom, 9),
    );
    b.set_unit(UnitConfig {
        feeding_threshold: fixed(300.0),
        death_threshold: fixed(600.0),
        food: Some(mushroom),
        ..UnitConfig::default()
    });
    Arc::new(b.build().expect("colony registry is valid"))
}

/// One node of each colony type around a storage hub, every node linked to
/// the hub and to its ring neighbours, with `units` units at the hub.
pub fn colony_world(units: usize, seed: u64) -> World {
    let registry = colony_registry();
    let kind = |name: &str| registry.node_id(name).expect("node type");
    let mut world = World::with_seed(Arc::clone(&registry), seed);

    let hub = world
        .add_node(Position::new(0.0, 0.0), kind("storage"))
        .expect("add");
    let ring = [
        ("moss_farm", 60.0, 0.0),
        ("moss_farm", 0.0, 60.0),
        ("moss_fermentation_chamber", -60.0, 0.0),
        ("mushroom_farm", 0.0, -60.0),
        ("none", 45.0, -45.0),
    ];
    let mut ids = Vec::new();
    for (name, x, y) in ring {
        let id = world
            .add_node(Position::new(x, y), kind(name))
            .expect("add");
        world.connect(hub, id).expect("connect");
        ids.push(id);
    }
    for pair in ids.windows(2) {
        world.connect(pair[0], pair[1]).expect("connect");
    }
    for _ in 0..units {
        world.add_unit(hub).expect("unit");
    }
    world
}

// ===========================================================================
// Topologies
// ===========================================================================

/// A `width` x `height` lattice of `node_type` nodes, `spacing` apart, with
/// 4-neighbour connections. Ids are assigned row by row.
pub fn grid_world(
    registry: Arc<Registry>,
    node_type: NodeTypeId,
    width: usize,
    height: usize,
    spacing: f64,
) -> (World, Vec<NodeId>) {
    let mut world = World::new(registry);
    let mut ids = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let pos = Position::new(col as f64 * spacing, row as f64 * spacing);
            ids.push(world.add_node(pos, node_type).expect("add"));
        }
    }
    for row in 0..height {
        for col in 0..width {
            let here = ids[row * width + col];
            if col + 1 < width {
                world.connect(here, ids[row * width + col + 1]).expect("connect");
            }
            if row + 1 < height {
                world
                    .connect(here, ids[(row + 1) * width + col])
                    .expect("connect");
            }
        }
    }
    (world, ids)
}

// ===========================================================================
// Driving
// ===========================================================================

/// Run `ticks` updates and collect the reports.
pub fn run(world: &mut World, ticks: usize) -> Vec<TickReport> {
    (0..ticks).map(|_| world.update()).collect()
}

/// Update until `done` holds, at most `max_ticks` times. Returns the number
/// of updates run, or `None` if `done` never held.
pub fn run_until(
    world: &mut World,
    max_ticks: usize,
    mut done: impl FnMut(&World) -> bool,
) -> Option<usize> {
    for n in 0..=max_ticks {
        if done(world) {
            return Some(n);
        }
        if n < max_ticks {
            world.update();
        }
    }
    None
}
