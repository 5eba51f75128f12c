//! Sensor-weighted time-shared capacity scheduler.
//!
//! One [`TimeSharedScheduler`] lives inside every VM.  It splits the VM's
//! processing capacity among the work units currently executing and tracks
//! each unit through its lifecycle:
//!
//! ```text
//! Queued ──submit──► InExec ──(remaining == 0)──► Success
//!                     │  ▲
//!               pause │  │ resume
//!                     ▼  │
//!                    Paused
//! InExec | Paused ──cancel──► Canceled
//! ```
//!
//! # Sharing rule
//! On every tick the aggregate capacity (sum of the positive entries of the
//! share vector) is divided by
//!
//! ```text
//! divisor = max(active_pes, Σ unit.pes, Σ weight(unit.category))
//! ```
//!
//! and each executing unit progresses by
//! `rate × elapsed × unit.pes × weight(unit.category)`.  Units are *not*
//! split evenly: a `camera` unit with weight 3 receives three times the
//! progress of a weight-1 unit.
//!
//! A category absent from the weight map weighs `0` in the divisor **and** in
//! the progress multiplier; such units never progress.  A warning is logged
//! the first time each missing category is seen by a scheduler.
//!
//! # Example
//! ```rust,ignore
//! let mut sched = TimeSharedScheduler::new(weights, 0.1);
//! sched.tick(0.0, &[1000.0])?;
//! sched.submit(unit, 0.0, 0.0);
//! let next_wakeup = sched.tick(1.0, &[1000.0])?;
//! ```

pub mod error;
pub mod weights;

pub use error::SchedulerError;
pub use weights::CategoryWeights;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::work_unit::{ResWorkUnit, WorkUnit, WorkUnitStatus};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default minimum gap between two scheduler wakeups, in simulation time
/// units.
pub const DEFAULT_MIN_TIME_BETWEEN_EVENTS: f64 = 0.1;

// ── CapacityScheduler ─────────────────────────────────────────────────────────

/// Pluggable per-VM scheduling behaviour.
///
/// Every operation is synchronous and terminating; the driver guarantees that
/// calls on one instance are never concurrent and that `tick` timestamps are
/// non-decreasing.
pub trait CapacityScheduler {
    /// Advance all executing units to `current_time` using the capacity in
    /// `mips_share` (one rate per processing unit).
    ///
    /// Returns the earliest estimated completion time among units still
    /// executing, or `0.0` when no further wakeup is needed.
    fn tick(&mut self, current_time: f64, mips_share: &[f64]) -> Result<f64, SchedulerError>;

    /// Start executing `unit`.  Returns its initial completion estimate
    /// (relative, `length / capacity`), or `f64::INFINITY` when no capacity
    /// is known yet.
    fn submit(&mut self, unit: WorkUnit, file_transfer_time: f64, now: f64) -> f64;

    /// Suspend an executing unit.  Returns `false` if `id` is not executing.
    fn pause(&mut self, id: u32, now: f64) -> bool;

    /// Resume a paused unit.  Returns the absolute estimated finish time,
    /// `f64::INFINITY` when no capacity is known yet, or `0.0` if `id` is not
    /// paused.
    fn resume(&mut self, id: u32, now: f64) -> f64;

    /// Cancel a unit wherever it is.  Returns `None` if unknown.
    fn cancel(&mut self, id: u32, now: f64) -> Option<ResWorkUnit>;

    /// Remove the head of the exec list for relocation to another VM.
    fn migrate(&mut self, now: f64) -> Result<ResWorkUnit, SchedulerError>;

    /// Status of an executing or paused unit.  Finished units report `None`.
    fn status(&self, id: u32) -> Option<WorkUnitStatus>;

    /// Numeric form of [`status`](Self::status); `-1` when not found.
    fn status_code(&self, id: u32) -> i32 {
        self.status(id).map_or(-1, WorkUnitStatus::code)
    }

    fn has_finished(&self) -> bool;

    /// Pop the oldest finished unit.
    fn next_finished(&mut self) -> Option<ResWorkUnit>;

    fn running_count(&self) -> usize;
}

// ── TimeSharedScheduler ───────────────────────────────────────────────────────

/// Time-shared scheduler whose per-unit share is weighted by PE count and
/// sensor category.
#[derive(Debug)]
pub struct TimeSharedScheduler {
    exec: Vec<ResWorkUnit>,
    paused: Vec<ResWorkUnit>,
    finished: Vec<ResWorkUnit>,

    weights: Arc<CategoryWeights>,
    /// Categories already reported as missing from `weights`.
    warned: BTreeSet<String>,

    previous_time: f64,
    mips_share: Vec<f64>,
    min_time_between_events: f64,
}

impl TimeSharedScheduler {
    pub fn new(weights: Arc<CategoryWeights>, min_time_between_events: f64) -> Self {
        Self {
            exec: Vec::new(),
            paused: Vec::new(),
            finished: Vec::new(),
            weights,
            warned: BTreeSet::new(),
            previous_time: 0.0,
            mips_share: Vec::new(),
            min_time_between_events,
        }
    }

    pub fn previous_time(&self) -> f64 {
        self.previous_time
    }

    /// Share vector seen on the last tick.
    pub fn mips_share(&self) -> &[f64] {
        &self.mips_share
    }

    pub fn exec_list(&self) -> &[ResWorkUnit] {
        &self.exec
    }

    pub fn paused_list(&self) -> &[ResWorkUnit] {
        &self.paused
    }

    pub fn finished_list(&self) -> &[ResWorkUnit] {
        &self.finished
    }

    pub fn paused_count(&self) -> usize {
        self.paused.len()
    }

    /// Per-weight-unit rate for the current exec list and last share vector.
    pub fn current_capacity(&self) -> f64 {
        self.capacity(&self.mips_share)
    }

    // ── Capacity model ────────────────────────────────────────────────────────

    /// Aggregate capacity of `mips_share` divided by the demand divisor.
    ///
    /// Returns `0.0` when there is nothing to divide by (no active PEs and no
    /// executing units).
    fn capacity(&self, mips_share: &[f64]) -> f64 {
        let (total, active_pes) = mips_share
            .iter()
            .filter(|&&mips| mips > 0.0)
            .fold((0.0, 0u64), |(sum, n), &mips| (sum + mips, n + 1));

        let pes_in_use: u64 = self.exec.iter().map(|r| u64::from(r.pes())).sum();
        let weight_sum: u64 = self.exec.iter().map(|r| u64::from(self.weight(r.category()))).sum();

        let divisor = active_pes.max(pes_in_use).max(weight_sum);
        if divisor == 0 {
            return 0.0;
        }
        total / divisor as f64
    }

    /// Move a de-facto complete unit to the finished list.
    fn finish(&mut self, mut rec: ResWorkUnit, now: f64) {
        rec.set_status(WorkUnitStatus::Success, now);
        rec.finalize(now);
        info!(
            unit = rec.id(),
            category = %rec.category(),
            finish_time = now,
            cpu_time = rec.cpu_time(),
            "work unit finished"
        );
        self.finished.push(rec);
    }

    /// Weight of `category`; a missing entry weighs `0`.
    fn weight(&self, category: &str) -> u32 {
        self.weights.get(category).unwrap_or(0)
    }

    /// Warn once per category on the exec list that has no configured weight.
    fn warn_missing_weights(&mut self) {
        for rec in &self.exec {
            let category = rec.category();
            if !self.weights.contains(category) && self.warned.insert(category.to_string()) {
                warn!(
                    category = %category,
                    "no weight configured for category; its work units will not progress"
                );
            }
        }
    }

    fn estimate_finish(&self, rec: &ResWorkUnit, now: f64, rate: f64) -> f64 {
        let estimate = now + rec.remaining() / (rate * f64::from(rec.pes()));
        estimate.max(now + self.min_time_between_events)
    }
}

impl CapacityScheduler for TimeSharedScheduler {
    fn tick(&mut self, current_time: f64, mips_share: &[f64]) -> Result<f64, SchedulerError> {
        if !current_time.is_finite() {
            return Err(SchedulerError::NonFiniteTime { time: current_time });
        }
        if current_time < self.previous_time {
            return Err(SchedulerError::TimeWentBackwards {
                previous: self.previous_time,
                current: current_time,
            });
        }

        self.mips_share = mips_share.to_vec();
        let elapsed = current_time - self.previous_time;

        // ── Advance executing units ───────────────────────────────────────────
        self.warn_missing_weights();
        let rate = self.capacity(mips_share);
        for rec in self.exec.iter_mut() {
            let weight = self.weights.get(rec.category()).unwrap_or(0);
            rec.advance(rate * elapsed * f64::from(rec.pes()) * f64::from(weight));
        }

        if self.exec.is_empty() {
            self.previous_time = current_time;
            return Ok(0.0);
        }

        // ── Completion sweep ──────────────────────────────────────────────────
        let (done, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.exec)
            .into_iter()
            .partition(ResWorkUnit::is_complete);
        self.exec = running;
        for rec in done {
            self.finish(rec, current_time);
        }

        // ── Next wakeup ───────────────────────────────────────────────────────
        // The divisor shrinks once finished units leave, so re-derive the rate.
        let rate = self.capacity(mips_share);
        let next = self
            .exec
            .iter()
            .map(|rec| self.estimate_finish(rec, current_time, rate))
            .fold(f64::INFINITY, f64::min);

        debug!(
            time = current_time,
            elapsed = elapsed,
            rate = rate,
            running = self.exec.len(),
            finished = self.finished.len(),
            next_event = next,
            "tick"
        );

        self.previous_time = current_time;
        if next.is_finite() {
            Ok(next)
        } else {
            if !self.exec.is_empty() {
                debug!(time = current_time, "no capacity for executing units, no wakeup scheduled");
            }
            Ok(0.0)
        }
    }

    fn submit(&mut self, unit: WorkUnit, file_transfer_time: f64, now: f64) -> f64 {
        let mut rec = ResWorkUnit::new(unit, now);
        rec.set_status(WorkUnitStatus::InExec, now);
        for pe in 0..rec.pes() {
            rec.bind_pe(pe);
        }
        self.exec.push(rec);
        self.warn_missing_weights();

        // Transfer cost is modelled as extra instructions at today's capacity.
        let capacity = self.current_capacity();
        let Some(rec) = self.exec.last_mut() else {
            return f64::INFINITY;
        };
        rec.unit_mut().length += capacity * file_transfer_time;

        debug!(
            unit = rec.id(),
            category = %rec.category(),
            length = rec.unit().length,
            capacity = capacity,
            "work unit submitted"
        );

        if capacity > 0.0 {
            rec.unit().length / capacity
        } else {
            f64::INFINITY
        }
    }

    fn pause(&mut self, id: u32, now: f64) -> bool {
        let Some(pos) = self.exec.iter().position(|r| r.id() == id) else {
            return false;
        };

        let mut rec = self.exec.remove(pos);
        if rec.is_complete() {
            self.finish(rec, now);
        } else {
            rec.set_status(WorkUnitStatus::Paused, now);
            debug!(unit = id, remaining = rec.remaining(), "work unit paused");
            self.paused.push(rec);
        }
        true
    }

    fn resume(&mut self, id: u32, now: f64) -> f64 {
        let Some(pos) = self.paused.iter().position(|r| r.id() == id) else {
            return 0.0;
        };

        let mut rec = self.paused.remove(pos);
        rec.set_status(WorkUnitStatus::InExec, now);
        let remaining = rec.remaining();
        let pes = f64::from(rec.pes());
        self.exec.push(rec);
        self.warn_missing_weights();

        let capacity = self.current_capacity();
        let estimate = if capacity > 0.0 {
            now + remaining / (capacity * pes)
        } else {
            f64::INFINITY
        };
        debug!(unit = id, estimate = estimate, "work unit resumed");
        estimate
    }

    fn cancel(&mut self, id: u32, now: f64) -> Option<ResWorkUnit> {
        if let Some(pos) = self.finished.iter().position(|r| r.id() == id) {
            return Some(self.finished.remove(pos));
        }

        if let Some(pos) = self.exec.iter().position(|r| r.id() == id) {
            let mut rec = self.exec.remove(pos);
            if rec.is_complete() {
                // Not swept yet: it finishes rather than being canceled, and
                // stays visible to the finished-list consumer.
                self.finish(rec, now);
                return self.finished.last().cloned();
            }
            rec.set_status(WorkUnitStatus::Canceled, now);
            info!(unit = id, remaining = rec.remaining(), "work unit canceled");
            return Some(rec);
        }

        if let Some(pos) = self.paused.iter().position(|r| r.id() == id) {
            let mut rec = self.paused.remove(pos);
            rec.set_status(WorkUnitStatus::Canceled, now);
            info!(unit = id, remaining = rec.remaining(), "paused work unit canceled");
            return Some(rec);
        }

        None
    }

    fn migrate(&mut self, now: f64) -> Result<ResWorkUnit, SchedulerError> {
        if self.exec.is_empty() {
            return Err(SchedulerError::EmptyExecList);
        }
        let mut rec = self.exec.remove(0);
        rec.finalize(now);
        info!(unit = rec.id(), remaining = rec.remaining(), "work unit migrated out");
        Ok(rec)
    }

    fn status(&self, id: u32) -> Option<WorkUnitStatus> {
        self.exec
            .iter()
            .chain(self.paused.iter())
            .find(|r| r.id() == id)
            .map(ResWorkUnit::status)
    }

    fn has_finished(&self) -> bool {
        !self.finished.is_empty()
    }

    fn next_finished(&mut self) -> Option<ResWorkUnit> {
        if self.finished.is_empty() {
            None
        } else {
            Some(self.finished.remove(0))
        }
    }

    fn running_count(&self) -> usize {
        self.exec.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
