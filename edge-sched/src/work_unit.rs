/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Work unit data structures for the time-shared capacity scheduler.
//!
//! Two types model the two sides of a submission:
//!
//! ```text
//! driver ──(WorkUnit)──► TimeSharedScheduler::submit ──► ResWorkUnit ──(finished list)──► driver
//!           ↑ declared task                                ↑ tracking record
//!           length, PEs, category                          progress, status, timings
//! ```
//!
//! # Ownership model
//! A [`WorkUnit`] is **moved** into the scheduler on submission and wrapped in
//! a [`ResWorkUnit`].  The record lives in exactly one of the scheduler's
//! exec / paused / finished lists at a time, and is handed back by value when
//! it is consumed (`next_finished`, `cancel`, `migrate`).

// ── Status ────────────────────────────────────────────────────────────────────

/// Lifecycle status of a work unit.
///
/// `Success` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkUnitStatus {
    /// Declared but not yet handed to a scheduler.
    #[default]
    Queued,
    /// Receiving a share of the VM's capacity.
    InExec,
    /// Suspended; keeps its completed work.
    Paused,
    Canceled,
    /// All work completed.
    Success,
}

impl WorkUnitStatus {
    /// Numeric status code, matching the integer constants used by
    /// CloudSim-style drivers (`QUEUED = 2`, `INEXEC = 3`, `SUCCESS = 4`,
    /// `CANCELED = 6`, `PAUSED = 7`).
    pub fn code(self) -> i32 {
        match self {
            WorkUnitStatus::Queued => 2,
            WorkUnitStatus::InExec => 3,
            WorkUnitStatus::Success => 4,
            WorkUnitStatus::Canceled => 6,
            WorkUnitStatus::Paused => 7,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkUnitStatus::Success | WorkUnitStatus::Canceled)
    }
}

// ── WorkUnit (declared task) ──────────────────────────────────────────────────

/// One unit of work emitted by a sensor and submitted to a VM.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkUnit {
    pub id: u32,
    pub user_id: u32,
    pub vm_id: u32,

    /// Total required work in millions of instructions.
    ///
    /// Inflated on submission by the file-transfer cost.
    pub length: f64,

    /// Number of processing units the unit occupies.
    pub pes: u32,

    /// Sensor type; looked up in the category weight map.
    pub category: String,

    /// Input payload fetched from storage before execution, in MB.
    pub input_size_mb: f64,
}

impl WorkUnit {
    pub fn new(id: u32, length: f64, pes: u32, category: impl Into<String>) -> Self {
        Self {
            id,
            length,
            pes,
            category: category.into(),
            ..Default::default()
        }
    }
}

// ── ResWorkUnit (tracking record) ─────────────────────────────────────────────

/// Scheduler-side record for a submitted [`WorkUnit`].
///
/// Progress is stored as completed work and clamped to the unit's length, so
/// remaining work reaches exactly `0.0` rather than going negative.
#[derive(Debug, Clone)]
pub struct ResWorkUnit {
    unit: WorkUnit,
    status: WorkUnitStatus,
    finished_so_far: f64,

    /// Processing units this record is bound to (`0..pes`).
    pe_ids: Vec<u32>,

    submission_time: f64,
    /// Start of the current execution slice, `None` while not executing.
    exec_started_at: Option<f64>,
    cpu_time: f64,
    finish_time: Option<f64>,
}

impl ResWorkUnit {
    pub fn new(unit: WorkUnit, submission_time: f64) -> Self {
        Self {
            unit,
            status: WorkUnitStatus::Queued,
            finished_so_far: 0.0,
            pe_ids: Vec::new(),
            submission_time,
            exec_started_at: None,
            cpu_time: 0.0,
            finish_time: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.unit.id
    }

    pub fn unit(&self) -> &WorkUnit {
        &self.unit
    }

    pub(crate) fn unit_mut(&mut self) -> &mut WorkUnit {
        &mut self.unit
    }

    pub fn into_unit(self) -> WorkUnit {
        self.unit
    }

    pub fn category(&self) -> &str {
        &self.unit.category
    }

    pub fn pes(&self) -> u32 {
        self.unit.pes
    }

    pub fn status(&self) -> WorkUnitStatus {
        self.status
    }

    pub fn pe_ids(&self) -> &[u32] {
        &self.pe_ids
    }

    pub(crate) fn bind_pe(&mut self, pe_id: u32) {
        self.pe_ids.push(pe_id);
    }

    pub fn finished_so_far(&self) -> f64 {
        self.finished_so_far
    }

    pub fn remaining(&self) -> f64 {
        (self.unit.length - self.finished_so_far).max(0.0)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() <= 0.0
    }

    /// Add `amount` of completed work, never past the unit's length.
    ///
    /// Negative amounts are ignored so remaining work is non-increasing.
    pub(crate) fn advance(&mut self, amount: f64) {
        if amount > 0.0 {
            self.finished_so_far = (self.finished_so_far + amount).min(self.unit.length);
        }
    }

    /// Change status at simulation time `now`, accounting CPU time for the
    /// execution slice that ends here (if any).
    pub(crate) fn set_status(&mut self, status: WorkUnitStatus, now: f64) {
        if let Some(start) = self.exec_started_at.take() {
            self.cpu_time += (now - start).max(0.0);
        }
        if status == WorkUnitStatus::InExec {
            self.exec_started_at = Some(now);
        }
        self.status = status;
    }

    /// Close the record at `now`: fold the running slice into the CPU time and
    /// stamp the finish time.  Status is left to the caller.
    pub(crate) fn finalize(&mut self, now: f64) {
        if let Some(start) = self.exec_started_at.take() {
            self.cpu_time += (now - start).max(0.0);
        }
        self.finish_time = Some(now);
    }

    pub fn submission_time(&self) -> f64 {
        self.submission_time
    }

    /// CPU time accumulated while `InExec`, excluding the running slice.
    pub fn cpu_time(&self) -> f64 {
        self.cpu_time
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Time from submission to finish.  `None` until finalized.
    pub fn wall_clock_time(&self) -> Option<f64> {
        self.finish_time.map(|f| f - self.submission_time)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
