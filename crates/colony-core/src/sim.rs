//! Per-tick results and the deterministic state hash.

use crate::fixed::{Fixed64, Ticks};
use crate::id::{JobId, UnitId};

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// What happened during one `World::update()` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The tick number this report belongs to (1 for the first update).
    pub tick: Ticks,
    /// Units that died and were removed.
    pub deaths: Vec<UnitId>,
    /// Jobs completed whose output was emitted.
    pub jobs_completed: Vec<JobId>,
    /// Jobs halted, either on completion with a full output or by a unit
    /// that could not perform or reach them.
    pub jobs_halted: Vec<JobId>,
}

impl TickReport {
    pub fn new(tick: Ticks) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// True when nothing worth reporting happened.
    pub fn is_quiet(&self) -> bool {
        self.deaths.is_empty() && self.jobs_completed.is_empty() && self.jobs_halted.is_empty()
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for reproducibility checks.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
