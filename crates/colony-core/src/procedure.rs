//! The per-unit step machine.
//!
//! Each tick a unit runs exactly one step: the head of its procedure. Steps
//! either advance (pop the head), dispatch (replace the whole procedure),
//! replace the head in place, or reset to a single fallback step. Every
//! failure falls back somewhere sensible; nothing here returns an error.

use crate::fixed::Fixed64;
use crate::graph::{ColonyGraph, GraphError};
use crate::id::{JobId, NodeId, ResourceTypeId};
use crate::index::PriorityIndex;
use crate::job::{JobOutcome, JobRegistry, can_perform, perform_job};
use crate::node::NodeStore;
use crate::registry::Registry;
use crate::rng::SimRng;
use crate::sim::TickReport;
use crate::unit::{Step, Traversal, Unit};

/// Fraction of a node's radius a working unit may drift from the centre.
const LERP_RADIUS_FRACTION: f64 = 0.9;

/// Everything a unit may read or touch while running a step.
pub(crate) struct StepContext<'a> {
    pub registry: &'a Registry,
    pub graph: &'a mut ColonyGraph,
    pub nodes: &'a mut NodeStore,
    pub jobs: &'a mut JobRegistry,
    pub index: &'a PriorityIndex,
    pub rng: &'a mut SimRng,
    pub report: &'a mut TickReport,
}

/// Whether a unit survived its tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFate {
    Alive,
    /// Starved at its root step. The caller removes it.
    Died,
}

impl Unit {
    /// Accumulate hunger, then run the head step.
    pub(crate) fn tick(&mut self, ctx: &mut StepContext<'_>) -> UnitFate {
        self.hunger = self.hunger.saturating_add(ctx.registry.unit().hunger_rate);

        match self.procedure.head() {
            Step::FindTask => return self.find_task(ctx),
            Step::Wander => self.wander(ctx),
            Step::TraverseTo(target) => self.traverse_to(target, ctx),
            Step::Traverse => self.traverse(ctx),
            Step::StartCarry => self.start_carry(ctx),
            Step::PickUpResource(resource) => self.pick_up(resource, ctx),
            Step::FindConsumer => self.find_consumer(ctx),
            Step::DropResource => self.drop_resource(ctx),
            Step::FindJob => self.find_job(ctx),
            Step::StartLerp => self.start_lerp(ctx),
            Step::DoJob => self.do_job(ctx),
            Step::FindFood => self.find_food(ctx),
            Step::Eat => self.eat(ctx),
            Step::DoNothing => {}
        }
        UnitFate::Alive
    }

    // -----------------------------------------------------------------------
    // Root
    // -----------------------------------------------------------------------

    fn find_task(&mut self, ctx: &mut StepContext<'_>) -> UnitFate {
        let config = ctx.registry.unit();
        if self.hunger > config.death_threshold {
            if let Some(job) = self.job.take() {
                complete_job(job, ctx);
            }
            tracing::info!(node = ?self.node, hunger = %self.hunger, "unit starved");
            return UnitFate::Died;
        }

        if self.hunger > config.feeding_threshold {
            self.procedure.dispatch([Step::FindFood]);
        } else {
            self.procedure.dispatch([Step::FindJob]);
        }
        UnitFate::Alive
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    fn wander(&mut self, ctx: &mut StepContext<'_>) {
        let here = self.node;
        let candidates: Vec<NodeId> = ctx.graph.node_ids().filter(|&n| n != here).collect();
        let Some(pick) = ctx.rng.index(candidates.len()) else {
            self.procedure.advance();
            return;
        };

        match ctx.graph.shortest_path(here, candidates[pick]) {
            Ok(path) if !path.is_empty() => self.begin_traverse(path, ctx),
            Ok(_) => self.procedure.advance(),
            Err(err) => {
                tracing::debug!(node = ?here, %err, "wander target unreachable");
                self.procedure.advance();
            }
        }
    }

    fn traverse_to(&mut self, target: NodeId, ctx: &mut StepContext<'_>) {
        match ctx.graph.shortest_path(self.node, target) {
            Ok(path) if path.is_empty() => self.procedure.advance(),
            Ok(path) => self.begin_traverse(path, ctx),
            Err(err) => {
                tracing::debug!(node = ?self.node, ?target, %err, "no route, abandoning plan");
                self.drop_job_halted(ctx);
                self.procedure.reset(Step::Wander);
            }
        }
    }

    /// Set up a traversal along `path` and make `Traverse` the head step.
    fn begin_traverse(&mut self, path: Vec<NodeId>, ctx: &mut StepContext<'_>) {
        let Some(&first) = path.first() else {
            self.procedure.advance();
            return;
        };
        match ctx.graph.connection(self.node, first) {
            Ok(connection) => {
                self.traversal = Some(Traversal {
                    path,
                    cursor: 0,
                    connection,
                    progress: Fixed64::ZERO,
                });
                self.local_offset = None;
                self.procedure.replace_head(Step::Traverse);
            }
            Err(err) => self.abandon_traversal(err),
        }
    }

    fn traverse(&mut self, ctx: &mut StepContext<'_>) {
        let speed = ctx.registry.unit().speed;
        let Some(trav) = self.traversal.as_mut() else {
            tracing::warn!(node = ?self.node, "traverse step without a path");
            self.procedure.advance();
            return;
        };

        trav.progress = trav.progress.saturating_add(speed);
        if trav.progress < trav.connection.length {
            return;
        }

        let Some(arrived) = trav.next_node() else {
            self.traversal = None;
            self.procedure.advance();
            return;
        };
        self.node = arrived;
        trav.cursor += 1;
        trav.progress = Fixed64::ZERO;

        match trav.next_node() {
            None => {
                self.traversal = None;
                self.procedure.advance();
            }
            Some(following) => match ctx.graph.connection(arrived, following) {
                Ok(connection) => trav.connection = connection,
                Err(err) => self.abandon_traversal(err),
            },
        }
    }

    fn abandon_traversal(&mut self, err: GraphError) {
        tracing::warn!(node = ?self.node, %err, "route broken mid-traversal");
        self.traversal = None;
        self.procedure.reset(Step::Wander);
    }

    // -----------------------------------------------------------------------
    // Hauling
    // -----------------------------------------------------------------------

    fn start_carry(&mut self, ctx: &mut StepContext<'_>) {
        match ctx.index.best_producer(&*ctx.nodes) {
            Ok((producer, resource)) => self.procedure.dispatch([
                Step::TraverseTo(producer),
                Step::PickUpResource(resource),
                Step::FindConsumer,
                Step::DropResource,
            ]),
            Err(_) => self.procedure.reset(Step::Wander),
        }
    }

    fn pick_up(&mut self, resource: ResourceTypeId, ctx: &mut StepContext<'_>) {
        match ctx.nodes.take_resource(self.node, resource) {
            Ok(()) => {
                self.carried = Some(resource);
                self.procedure.advance();
            }
            Err(err) => {
                tracing::debug!(node = ?self.node, %err, "nothing to pick up");
                self.procedure.reset(Step::Wander);
            }
        }
    }

    fn find_consumer(&mut self, ctx: &mut StepContext<'_>) {
        let Some(resource) = self.carried else {
            self.procedure.reset(Step::Wander);
            return;
        };

        let consumer = match ctx.index.consumer_for(resource, &*ctx.nodes) {
            Ok(consumer) => consumer,
            Err(err) => {
                tracing::debug!(
                    node = ?self.node,
                    ?resource,
                    %err,
                    "no consumer, discarding carried resource"
                );
                self.discard_carried();
                return;
            }
        };

        match ctx.graph.shortest_path(self.node, consumer) {
            Ok(path) if path.is_empty() => self.procedure.advance(),
            Ok(path) => self.begin_traverse(path, ctx),
            Err(err) => {
                tracing::debug!(
                    node = ?self.node,
                    ?consumer,
                    %err,
                    "consumer unreachable, discarding carried resource"
                );
                self.discard_carried();
            }
        }
    }

    fn discard_carried(&mut self) {
        self.carried = None;
        self.procedure.reset(Step::Wander);
    }

    fn drop_resource(&mut self, ctx: &mut StepContext<'_>) {
        let Some(resource) = self.carried else {
            self.procedure.advance();
            return;
        };
        match ctx.nodes.add_resource(self.node, resource) {
            Ok(()) => {
                self.carried = None;
                self.procedure.advance();
            }
            Err(err) => {
                tracing::debug!(node = ?self.node, %err, "drop refused, finding another consumer");
                self.procedure.dispatch([Step::FindConsumer, Step::DropResource]);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Jobs
    // -----------------------------------------------------------------------

    fn find_job(&mut self, ctx: &mut StepContext<'_>) {
        let Ok(job) = ctx.jobs.get_job() else {
            self.procedure.replace_head(Step::StartCarry);
            return;
        };

        if !can_perform(ctx.registry, ctx.nodes, &job) {
            tracing::debug!(job = ?job.id, node = ?job.node, "job inputs missing, halting");
            if ctx.jobs.halt(job.id) {
                ctx.report.jobs_halted.push(job.id);
            }
            self.procedure.replace_head(Step::StartCarry);
            return;
        }

        self.job = Some(job.id);
        self.job_progress = Fixed64::ZERO;
        self.procedure.dispatch([Step::TraverseTo(job.node), Step::StartLerp, Step::DoJob]);
    }

    fn start_lerp(&mut self, ctx: &mut StepContext<'_>) {
        let radius = ctx
            .graph
            .node(self.node)
            .ok()
            .and_then(|data| ctx.registry.get_node(data.node_type))
            .map_or(0.0, |def| def.radius);
        let r = radius * LERP_RADIUS_FRACTION * ctx.rng.unit_f64();
        let angle = std::f64::consts::TAU * ctx.rng.unit_f64();
        self.local_offset = Some((r * angle.cos(), r * angle.sin()));
        self.procedure.advance();
    }

    fn do_job(&mut self, ctx: &mut StepContext<'_>) {
        let Some(job_id) = self.job else {
            tracing::warn!(node = ?self.node, "working without a job");
            self.procedure.reset(Step::Wander);
            return;
        };
        let rate = ctx
            .jobs
            .get(job_id)
            .and_then(|job| ctx.registry.get_job(job.job_type))
            .map(|def| def.rate);
        let Some(rate) = rate else {
            tracing::warn!(job = ?job_id, "bound job is not registered");
            self.job = None;
            self.procedure.reset(Step::Wander);
            return;
        };

        self.job_progress = self.job_progress.saturating_add(rate);
        if self.job_progress < ctx.registry.unit().job_threshold {
            return;
        }
        self.job_progress = Fixed64::ZERO;
        self.job = None;
        complete_job(job_id, ctx);
        self.procedure.reset(Step::Wander);
    }

    /// Unbind the current job and park it in the halted pool.
    fn drop_job_halted(&mut self, ctx: &mut StepContext<'_>) {
        if let Some(job) = self.job.take() {
            if ctx.jobs.halt(job) {
                ctx.report.jobs_halted.push(job);
            }
            self.job_progress = Fixed64::ZERO;
        }
    }

    // -----------------------------------------------------------------------
    // Eating
    // -----------------------------------------------------------------------

    fn find_food(&mut self, ctx: &mut StepContext<'_>) {
        let Some(food) = ctx.registry.unit().food else {
            self.procedure.reset(Step::Wander);
            return;
        };
        match ctx.index.producer_for(food, &*ctx.nodes) {
            Ok(node) => self.procedure.dispatch([Step::TraverseTo(node), Step::Eat]),
            Err(_) => {
                tracing::debug!(node = ?self.node, hunger = %self.hunger, "no food anywhere");
                self.procedure.reset(Step::Wander);
            }
        }
    }

    fn eat(&mut self, ctx: &mut StepContext<'_>) {
        let eaten = ctx
            .registry
            .unit()
            .food
            .is_some_and(|food| ctx.nodes.take_resource(self.node, food).is_ok());
        if eaten {
            self.hunger = Fixed64::ZERO;
            self.procedure.reset(Step::FindTask);
        } else {
            self.procedure.reset(Step::Wander);
        }
    }
}

/// Finish an occupied job and record where it went.
fn complete_job(job: JobId, ctx: &mut StepContext<'_>) {
    let registry = ctx.registry;
    let nodes = &mut *ctx.nodes;
    match ctx
        .jobs
        .complete(Some(job), |j| perform_job(registry, nodes, j))
    {
        Some(JobOutcome::Available) => ctx.report.jobs_completed.push(job),
        Some(JobOutcome::Halted) => ctx.report.jobs_halted.push(job),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeData, Position};
    use crate::id::{JobTypeId, NodeTypeId};
    use crate::inventory::Inventory;
    use crate::job::{Job, JobPool};
    use crate::node::NodeState;
    use crate::registry::{JobTypeDef, NodeTypeDef, RegistryBuilder, UnitConfig};

    /// A hand-assembled world: node 0 and node 1, 10 apart.
    struct Bench {
        registry: Registry,
        graph: ColonyGraph,
        nodes: NodeStore,
        jobs: JobRegistry,
        index: PriorityIndex,
        rng: SimRng,
        report: TickReport,
        moss: ResourceTypeId,
        grow: JobTypeId,
    }

    impl Bench {
        fn new(unit: UnitConfig) -> Self {
            let mut b = RegistryBuilder::new();
            let moss = b.register_resource("moss");
            let grow = b.register_job(JobTypeDef {
                name: "grow_moss".into(),
                output: moss,
                rate: Fixed64::from_num(50),
                inputs: Vec::new(),
            });
            let def = NodeTypeDef::new("storage", 10.0)
                .with_capacity(moss, 1)
                .consuming(moss, 0)
                .producing(moss, 0);
            b.register_node(def.clone());
            b.set_unit(unit);

            let mut bench = Self {
                registry: b.build().unwrap(),
                graph: ColonyGraph::new(),
                nodes: NodeStore::new(),
                jobs: JobRegistry::new(),
                index: PriorityIndex::new(),
                rng: SimRng::new(7),
                report: TickReport::new(1),
                moss,
                grow,
            };
            for (i, x) in [(0, 0.0), (1, 10.0)] {
                let id = NodeId(i);
                bench.graph.insert_node(
                    id,
                    NodeData {
                        position: Position::new(x, 0.0),
                        node_type: NodeTypeId(0),
                    },
                );
                bench.nodes.insert(
                    id,
                    NodeState {
                        inventory: Inventory::for_node_type(&def),
                        conversion_progress: Fixed64::ZERO,
                    },
                );
            }
            bench
        }

        /// Enter `node` into the priority index as a moss consumer and producer.
        fn register(&mut self, node: NodeId) {
            let def = self.registry.get_node(NodeTypeId(0)).unwrap();
            self.index.register(node, def);
        }

        fn moss_at(&self, node: NodeId) -> u32 {
            self.nodes.get(node).unwrap().inventory.count(self.moss)
        }

        fn tick(&mut self, unit: &mut Unit) -> UnitFate {
            let mut ctx = StepContext {
                registry: &self.registry,
                graph: &mut self.graph,
                nodes: &mut self.nodes,
                jobs: &mut self.jobs,
                index: &self.index,
                rng: &mut self.rng,
                report: &mut self.report,
            };
            unit.tick(&mut ctx)
        }
    }

    #[test]
    fn hunger_accumulates_every_tick() {
        let mut bench = Bench::new(UnitConfig::default());
        let mut unit = Unit::new(NodeId(0));
        unit.procedure.reset(Step::DoNothing);
        for _ in 0..5 {
            bench.tick(&mut unit);
        }
        assert_eq!(unit.hunger, Fixed64::from_num(5));
        assert_eq!(unit.procedure.head(), Step::DoNothing);
    }

    #[test]
    fn starving_unit_dies_at_root_only() {
        let mut bench = Bench::new(UnitConfig {
            death_threshold: Fixed64::from_num(3),
            ..UnitConfig::default()
        });
        let mut unit = Unit::new(NodeId(0));
        unit.hunger = Fixed64::from_num(10);
        unit.procedure.reset(Step::DoNothing);
        assert_eq!(bench.tick(&mut unit), UnitFate::Alive);

        unit.procedure.reset(Step::FindTask);
        assert_eq!(bench.tick(&mut unit), UnitFate::Died);
    }

    #[test]
    fn death_happens_on_first_root_tick_past_threshold() {
        let mut bench = Bench::new(UnitConfig {
            death_threshold: Fixed64::from_num(3),
            ..UnitConfig::default()
        });
        let mut unit = Unit::new(NodeId(0));
        for _ in 0..3 {
            unit.procedure.reset(Step::FindTask);
            assert_eq!(bench.tick(&mut unit), UnitFate::Alive);
        }
        assert_eq!(unit.hunger, Fixed64::from_num(3));

        unit.procedure.reset(Step::FindTask);
        assert_eq!(bench.tick(&mut unit), UnitFate::Died);
    }

    #[test]
    fn progress_saturates_instead_of_overflowing() {
        let mut bench = Bench::new(UnitConfig {
            speed: Fixed64::MAX,
            ..UnitConfig::default()
        });
        bench.graph.connect(NodeId(0), NodeId(1)).unwrap();
        let mut unit = Unit::new(NodeId(0));
        unit.hunger = Fixed64::MAX;
        unit.procedure.dispatch([Step::TraverseTo(NodeId(1)), Step::DoNothing]);

        bench.tick(&mut unit);
        unit.traversal.as_mut().unwrap().progress = Fixed64::from_num(1);
        bench.tick(&mut unit);
        assert_eq!(unit.hunger, Fixed64::MAX);
        assert_eq!(unit.node, NodeId(1));
        assert_eq!(unit.procedure.head(), Step::DoNothing);
    }

    #[test]
    fn hungry_unit_goes_for_food() {
        let mut bench = Bench::new(UnitConfig {
            feeding_threshold: Fixed64::from_num(3),
            ..UnitConfig::default()
        });
        let mut unit = Unit::new(NodeId(0));
        unit.hunger = Fixed64::from_num(3);
        bench.tick(&mut unit);
        assert_eq!(unit.procedure.head(), Step::FindFood);

        // No food configured: fall back to wandering.
        bench.tick(&mut unit);
        assert_eq!(unit.procedure.head(), Step::Wander);
    }

    #[test]
    fn find_job_without_jobs_starts_carry() {
        let mut bench = Bench::new(UnitConfig::default());
        let mut unit = Unit::new(NodeId(0));
        unit.procedure.reset(Step::FindJob);
        bench.tick(&mut unit);
        assert_eq!(unit.procedure.head(), Step::StartCarry);
    }

    #[test]
    fn unreachable_job_is_halted() {
        let mut bench = Bench::new(UnitConfig::default());
        bench.jobs.add([Job {
            id: JobId(0),
            node: NodeId(1),
            job_type: bench.grow,
        }]);
        let mut unit = Unit::new(NodeId(0));
        unit.procedure.reset(Step::FindJob);

        bench.tick(&mut unit);
        assert_eq!(unit.job, Some(JobId(0)));
        assert_eq!(unit.procedure.head(), Step::TraverseTo(NodeId(1)));

        // Nodes 0 and 1 are not connected.
        bench.tick(&mut unit);
        assert_eq!(unit.job, None);
        assert_eq!(unit.procedure.head(), Step::Wander);
        assert_eq!(bench.jobs.pool_of(JobId(0)), Some(JobPool::Halted));
        assert_eq!(bench.report.jobs_halted, vec![JobId(0)]);
    }

    #[test]
    fn traverse_moves_node_only_on_arrival() {
        let mut bench = Bench::new(UnitConfig {
            speed: Fixed64::from_num(4),
            ..UnitConfig::default()
        });
        bench.graph.connect(NodeId(0), NodeId(1)).unwrap();
        let mut unit = Unit::new(NodeId(0));
        unit.procedure.dispatch([Step::TraverseTo(NodeId(1)), Step::DoNothing]);

        bench.tick(&mut unit);
        assert_eq!(unit.procedure.head(), Step::Traverse);
        bench.tick(&mut unit);
        bench.tick(&mut unit);
        assert_eq!(unit.node, NodeId(0));
        let mid = unit.position(&bench.graph).unwrap();
        assert!((mid.x - 8.0).abs() < 1e-6);

        bench.tick(&mut unit);
        assert_eq!(unit.node, NodeId(1));
        assert!(unit.traversal.is_none());
        assert_eq!(unit.procedure.head(), Step::DoNothing);
    }

    #[test]
    fn drop_into_full_node_looks_for_another_consumer() {
        let mut bench = Bench::new(UnitConfig::default());
        bench.nodes.add_resource(NodeId(0), bench.moss).unwrap();
        let mut unit = Unit::new(NodeId(0));
        unit.carried = Some(bench.moss);
        unit.procedure.reset(Step::DropResource);

        bench.tick(&mut unit);
        assert_eq!(
            unit.procedure.steps().copied().collect::<Vec<_>>(),
            vec![Step::FindConsumer, Step::DropResource]
        );
        assert_eq!(unit.carried, Some(bench.moss));

        // The index is empty, so there is no consumer: the resource is lost.
        bench.tick(&mut unit);
        assert_eq!(unit.carried, None);
        assert_eq!(unit.procedure.head(), Step::Wander);
    }

    #[test]
    fn full_drop_delivers_to_the_next_consumer() {
        let mut bench = Bench::new(UnitConfig::default());
        bench.register(NodeId(0));
        bench.register(NodeId(1));
        bench.graph.connect(NodeId(0), NodeId(1)).unwrap();
        bench.nodes.add_resource(NodeId(0), bench.moss).unwrap();
        let mut unit = Unit::new(NodeId(0));
        unit.carried = Some(bench.moss);
        unit.procedure.reset(Step::DropResource);

        bench.tick(&mut unit);
        assert_eq!(unit.procedure.head(), Step::FindConsumer);
        bench.tick(&mut unit);
        assert_eq!(
            unit.procedure.steps().copied().collect::<Vec<_>>(),
            vec![Step::Traverse, Step::DropResource]
        );

        // Length 10 at speed 2.
        for _ in 0..5 {
            bench.tick(&mut unit);
        }
        assert_eq!(unit.node, NodeId(1));
        assert_eq!(unit.procedure.head(), Step::DropResource);

        bench.tick(&mut unit);
        assert_eq!(unit.carried, None);
        assert_eq!(bench.moss_at(NodeId(0)), 1);
        assert_eq!(bench.moss_at(NodeId(1)), 1);
        assert_eq!(unit.procedure.head(), Step::FindTask);
    }

    #[test]
    fn unreachable_consumer_discards_resource() {
        let mut bench = Bench::new(UnitConfig::default());
        bench.register(NodeId(1));
        let mut unit = Unit::new(NodeId(0));
        unit.carried = Some(bench.moss);
        unit.procedure.dispatch([Step::FindConsumer, Step::DropResource]);

        // Node 1 has room but no edge leads there.
        bench.tick(&mut unit);
        assert_eq!(unit.carried, None);
        assert_eq!(unit.procedure.head(), Step::Wander);
        assert_eq!(unit.procedure.len(), 1);
        assert_eq!(bench.moss_at(NodeId(1)), 0);
    }

    #[test]
    fn start_carry_without_stock_wanders() {
        let mut bench = Bench::new(UnitConfig::default());
        bench.register(NodeId(0));
        bench.register(NodeId(1));
        let mut unit = Unit::new(NodeId(0));
        unit.procedure.reset(Step::StartCarry);

        bench.tick(&mut unit);
        assert_eq!(unit.procedure.head(), Step::Wander);
        assert_eq!(unit.procedure.len(), 1);
    }

    #[test]
    fn eating_needs_food_at_the_node() {
        let mut bench = Bench::new(UnitConfig {
            food: Some(ResourceTypeId(0)),
            ..UnitConfig::default()
        });
        let mut unit = Unit::new(NodeId(0));
        unit.hunger = Fixed64::from_num(5);
        unit.procedure.dispatch([Step::Eat, Step::DoNothing]);

        // The food was taken before the unit got here.
        bench.tick(&mut unit);
        assert_eq!(unit.hunger, Fixed64::from_num(6));
        assert_eq!(unit.procedure.head(), Step::Wander);

        bench.nodes.add_resource(NodeId(0), bench.moss).unwrap();
        unit.procedure.dispatch([Step::Eat, Step::DoNothing]);
        bench.tick(&mut unit);
        assert_eq!(unit.hunger, Fixed64::ZERO);
        assert_eq!(unit.procedure.head(), Step::FindTask);
        assert_eq!(bench.moss_at(NodeId(0)), 0);
    }

    #[test]
    fn pick_up_from_empty_node_wanders() {
        let mut bench = Bench::new(UnitConfig::default());
        let mut unit = Unit::new(NodeId(0));
        unit.procedure.dispatch([Step::PickUpResource(bench.moss), Step::FindConsumer]);
        bench.tick(&mut unit);
        assert_eq!(unit.carried, None);
        assert_eq!(unit.procedure.head(), Step::Wander);
    }

    #[test]
    fn start_lerp_stays_inside_node() {
        let mut bench = Bench::new(UnitConfig::default());
        for _ in 0..20 {
            let mut unit = Unit::new(NodeId(1));
            unit.procedure.dispatch([Step::StartLerp, Step::DoJob]);
            bench.tick(&mut unit);
            let (dx, dy) = unit.local_offset.unwrap();
            assert!((dx * dx + dy * dy).sqrt() <= 9.0 + 1e-9);
            assert_eq!(unit.procedure.head(), Step::DoJob);
        }
    }
}
