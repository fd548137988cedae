//! Units and their procedures.
//!
//! A procedure is an ordered list of [`Step`]s of which only the head runs.
//! The list is never empty: advancing past the last step falls back to the
//! root step, [`Step::FindTask`].

use crate::fixed::{Fixed64, fixed64_to_f64, ratio_clamped};
use crate::graph::{ColonyGraph, Connection, Position};
use crate::id::{JobId, NodeId, ResourceTypeId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One step of a unit's procedure. Variants carry only what that step needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Root step: die, go eat, or look for work.
    FindTask,
    /// Walk to a random other node.
    Wander,
    /// Pathfind to a node, then traverse to it.
    TraverseTo(NodeId),
    /// Follow the current path one edge at a time.
    Traverse,
    /// Find the best stocked producer and plan a delivery from it.
    StartCarry,
    /// Pick up one unit of a resource at the current node.
    PickUpResource(ResourceTypeId),
    /// Find a consumer for the carried resource and head there.
    FindConsumer,
    /// Drop the carried resource at the current node.
    DropResource,
    /// Take a job from the registry.
    FindJob,
    /// Pick a spot inside the node to idle at while working.
    StartLerp,
    /// Work the bound job.
    DoJob,
    /// Find food and plan a meal.
    FindFood,
    /// Eat one unit of food at the current node.
    Eat,
    /// Stay put forever.
    DoNothing,
}

impl Step {
    /// Stable, human readable step name.
    pub fn name(&self) -> &'static str {
        match self {
            Step::FindTask => "find_task",
            Step::Wander => "wander",
            Step::TraverseTo(_) => "traverse_to",
            Step::Traverse => "traverse",
            Step::StartCarry => "start_carry",
            Step::PickUpResource(_) => "pick_up_resource",
            Step::FindConsumer => "find_consumer",
            Step::DropResource => "drop_resource",
            Step::FindJob => "find_job",
            Step::StartLerp => "start_lerp",
            Step::DoJob => "do_job",
            Step::FindFood => "find_food",
            Step::Eat => "eat",
            Step::DoNothing => "do_nothing",
        }
    }
}

/// The ordered list of pending steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    steps: VecDeque<Step>,
}

impl Default for Procedure {
    fn default() -> Self {
        Self::root()
    }
}

impl Procedure {
    /// A procedure holding only the root step.
    pub fn root() -> Self {
        Self::single(Step::FindTask)
    }

    pub fn single(step: Step) -> Self {
        Self {
            steps: VecDeque::from([step]),
        }
    }

    /// Build a procedure from a list of steps. An empty list yields the root.
    pub fn from_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        let steps: VecDeque<Step> = steps.into_iter().collect();
        if steps.is_empty() {
            Self::root()
        } else {
            Self { steps }
        }
    }

    /// The active step.
    pub fn head(&self) -> Step {
        self.steps.front().copied().unwrap_or(Step::FindTask)
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Replace the whole procedure with `steps`.
    pub fn dispatch(&mut self, steps: impl IntoIterator<Item = Step>) {
        *self = Self::from_steps(steps);
    }

    /// Replace only the head step, keeping the queued steps behind it.
    pub fn replace_head(&mut self, step: Step) {
        match self.steps.front_mut() {
            Some(head) => *head = step,
            None => self.steps.push_back(step),
        }
    }

    /// Clear the procedure down to a single step.
    pub fn reset(&mut self, step: Step) {
        *self = Self::single(step);
    }

    /// Finish the head step. When it was the last one, fall back to the root.
    pub fn advance(&mut self) {
        if self.steps.len() < 2 {
            *self = Self::root();
        } else {
            self.steps.pop_front();
        }
    }
}

/// Progress along a path. Present only while the head step is
/// [`Step::Traverse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traversal {
    /// Remaining route, excluding the start node.
    pub path: Vec<NodeId>,
    /// Index into `path` of the node currently being walked towards.
    pub cursor: usize,
    /// The edge being walked.
    pub connection: Connection,
    /// Distance covered along `connection`.
    pub progress: Fixed64,
}

impl Traversal {
    /// The node at the far end of the current edge.
    pub fn next_node(&self) -> Option<NodeId> {
        self.path.get(self.cursor).copied()
    }
}

/// A mobile agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Authoritative discrete location. Changes only when an edge is finished.
    pub node: NodeId,
    pub procedure: Procedure,
    pub traversal: Option<Traversal>,
    pub carried: Option<ResourceTypeId>,
    pub job: Option<JobId>,
    pub job_progress: Fixed64,
    pub hunger: Fixed64,
    /// Presentation-only offset from the node centre, set by `StartLerp`.
    pub local_offset: Option<(f64, f64)>,
}

impl Unit {
    /// A fresh unit at `node` starting at the root step.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            procedure: Procedure::root(),
            traversal: None,
            carried: None,
            job: None,
            job_progress: Fixed64::ZERO,
            hunger: Fixed64::ZERO,
            local_offset: None,
        }
    }

    /// Where to draw the unit: interpolated along the active edge while
    /// traversing, otherwise at its node (plus any local offset).
    pub fn position(&self, graph: &ColonyGraph) -> Option<Position> {
        let here = graph.position(self.node).ok()?;
        if let Some(trav) = &self.traversal {
            let there = trav
                .next_node()
                .and_then(|next| graph.position(next).ok())
                .unwrap_or(here);
            let t = ratio_clamped(trav.progress, trav.connection.length);
            return Some(here.lerp(there, fixed64_to_f64(t)));
        }
        Some(match self.local_offset {
            Some((dx, dy)) => Position::new(here.x + dx, here.y + dy),
            None => here,
        })
    }
}
