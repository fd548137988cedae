//! Recurring production jobs and the three pools they move between.
//!
//! A job is always in exactly one of `available`, `occupied`, or `halted`.
//! Draws take the lowest job id of a pool, so runs are reproducible.

use crate::id::{JobId, JobTypeId, NodeId, ResourceTypeId};
use crate::inventory::InventoryError;
use crate::node::NodeStore;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Errors raised by the job registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("no job available")]
    NoJobAvailable,
    #[error("job {0:?} is registered in more than one pool")]
    DuplicateJob(JobId),
}

/// Why a job's production effect could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobEffectError {
    #[error("unknown job type {0:?}")]
    UnknownJobType(JobTypeId),
    #[error("job node {0:?} not found")]
    NodeMissing(NodeId),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// A recurring production job bound to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub node: NodeId,
    pub job_type: JobTypeId,
}

/// Which pool a job currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPool {
    Available,
    Occupied,
    Halted,
}

/// Where a completed job went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Output emitted; the job is available again.
    Available,
    /// Output could not be emitted; the job is halted.
    Halted,
}

/// Tri-state pool of jobs.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    available: BTreeMap<JobId, Job>,
    occupied: BTreeMap<JobId, Job>,
    halted: BTreeMap<JobId, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert newly created jobs directly into the available pool.
    pub fn add(&mut self, jobs: impl IntoIterator<Item = Job>) {
        for job in jobs {
            self.available.insert(job.id, job);
        }
    }

    /// Take a job, preferring the available pool over the halted one. The job
    /// moves to occupied.
    pub fn get_job(&mut self) -> Result<Job, JobError> {
        let job = self
            .available
            .pop_first()
            .or_else(|| self.halted.pop_first())
            .map(|(_, job)| job)
            .ok_or(JobError::NoJobAvailable)?;
        self.occupied.insert(job.id, job);
        Ok(job)
    }

    /// Finish an occupied job. The job leaves occupied whatever happens;
    /// `produce` applies its production effect, and the job goes back to
    /// available if that succeeds or to halted if it fails.
    ///
    /// A `None` job or a job that is not occupied is logged and ignored.
    pub fn complete<F, E>(&mut self, job: Option<JobId>, produce: F) -> Option<JobOutcome>
    where
        F: FnOnce(&Job) -> Result<(), E>,
        E: Display,
    {
        let Some(id) = job else {
            tracing::warn!("attempt to complete nil job");
            return None;
        };
        let Some(job) = self.occupied.remove(&id) else {
            tracing::warn!(job = ?id, "attempt to complete job that is not occupied");
            return None;
        };

        match produce(&job) {
            Ok(()) => {
                self.available.insert(id, job);
                Some(JobOutcome::Available)
            }
            Err(err) => {
                tracing::debug!(job = ?id, node = ?job.node, %err, "job output failed, halting");
                self.halted.insert(id, job);
                Some(JobOutcome::Halted)
            }
        }
    }

    /// Move an occupied job to halted. Returns whether it moved.
    pub fn halt(&mut self, id: JobId) -> bool {
        match self.occupied.remove(&id) {
            Some(job) => {
                self.halted.insert(id, job);
                true
            }
            None => {
                tracing::warn!(job = ?id, "attempt to halt job that is not occupied");
                false
            }
        }
    }

    /// Return every occupied job to available.
    pub fn reset(&mut self) {
        let occupied = std::mem::take(&mut self.occupied);
        self.available.extend(occupied);
    }

    /// Look up a job in any pool.
    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.available
            .get(&id)
            .or_else(|| self.occupied.get(&id))
            .or_else(|| self.halted.get(&id))
    }

    /// The pool `id` is in, if registered.
    pub fn pool_of(&self, id: JobId) -> Option<JobPool> {
        if self.available.contains_key(&id) {
            Some(JobPool::Available)
        } else if self.occupied.contains_key(&id) {
            Some(JobPool::Occupied)
        } else if self.halted.contains_key(&id) {
            Some(JobPool::Halted)
        } else {
            None
        }
    }

    /// Jobs in one pool, ascending by id.
    pub fn pool(&self, pool: JobPool) -> impl Iterator<Item = &Job> {
        match pool {
            JobPool::Available => self.available.values(),
            JobPool::Occupied => self.occupied.values(),
            JobPool::Halted => self.halted.values(),
        }
    }

    pub fn len(&self) -> usize {
        self.available.len() + self.occupied.len() + self.halted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a persisted job into a specific pool. Rejects a job that is
    /// already registered anywhere.
    pub(crate) fn restore(&mut self, job: Job, pool: JobPool) -> Result<(), JobError> {
        if self.pool_of(job.id).is_some() {
            return Err(JobError::DuplicateJob(job.id));
        }
        let target = match pool {
            JobPool::Available => &mut self.available,
            JobPool::Occupied => &mut self.occupied,
            JobPool::Halted => &mut self.halted,
        };
        target.insert(job.id, job);
        Ok(())
    }
}

/// Whether every input of `job` is present at its node right now.
pub fn can_perform(registry: &Registry, nodes: &NodeStore, job: &Job) -> bool {
    let Some(def) = registry.get_job(job.job_type) else {
        return false;
    };
    let Some(state) = nodes.get(job.node) else {
        return false;
    };
    let mut required: BTreeMap<ResourceTypeId, u32> = BTreeMap::new();
    for &input in &def.inputs {
        *required.entry(input).or_insert(0) += 1;
    }
    required
        .iter()
        .all(|(&resource, &n)| state.inventory.count(resource) >= n)
}

/// Apply the production effect of `job`: consume its inputs and emit one unit
/// of its output at its node. Leaves the inventory untouched on failure.
pub fn perform_job(
    registry: &Registry,
    nodes: &mut NodeStore,
    job: &Job,
) -> Result<(), JobEffectError> {
    let def = registry
        .get_job(job.job_type)
        .ok_or(JobEffectError::UnknownJobType(job.job_type))?;
    let inventory = &mut nodes
        .get_mut(job.node)
        .ok_or(JobEffectError::NodeMissing(job.node))?
        .inventory;

    let mut taken = Vec::with_capacity(def.inputs.len());
    let result = def
        .inputs
        .iter()
        .try_for_each(|&input| {
            inventory.take(input)?;
            taken.push(input);
            Ok::<(), InventoryError>(())
        })
        .and_then(|()| inventory.add(def.output));

    if let Err(err) = result {
        // Put back what was taken; it fit a moment ago.
        for resource in taken {
            let _ = inventory.add(resource);
        }
        return Err(err.into());
    }
    Ok(())
}
