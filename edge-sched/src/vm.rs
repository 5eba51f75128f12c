/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Virtual compute slots.
//!
//! A [`Vm`] pairs a resource demand ([`VmSpec`]) with the one capacity
//! scheduler that runs its work units.  Placement only ever sees the
//! [`VmSpec`]; the scheduler stays with the VM for its whole lifetime.

use std::fmt;

use crate::scheduler::{CapacityScheduler, SchedulerError, TimeSharedScheduler};

// ── VmUid ─────────────────────────────────────────────────────────────────────

/// Globally unique VM key: VM ids are only unique per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VmUid {
    pub user_id: u32,
    pub vm_id: u32,
}

impl VmUid {
    pub fn new(user_id: u32, vm_id: u32) -> Self {
        Self { user_id, vm_id }
    }
}

impl fmt::Display for VmUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.user_id, self.vm_id)
    }
}

// ── VmSpec ────────────────────────────────────────────────────────────────────

/// Resources a VM asks of its host node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VmSpec {
    pub uid: VmUid,
    /// Processing units the VM occupies on its node.
    pub pes: u32,
    /// Processing rate of each of the VM's PEs.
    pub mips: f64,
    pub memory_mb: u64,
}

impl VmSpec {
    pub fn new(uid: VmUid, pes: u32, mips: f64, memory_mb: u64) -> Self {
        Self {
            uid,
            pes,
            mips,
            memory_mb,
        }
    }

    /// Capacity share vector granted by a time-shared host: one `mips` entry
    /// per PE.
    pub fn mips_share(&self) -> Vec<f64> {
        vec![self.mips; self.pes as usize]
    }
}

// ── Vm ────────────────────────────────────────────────────────────────────────

/// A VM and the scheduler that owns its work units.
#[derive(Debug)]
pub struct Vm<S = TimeSharedScheduler> {
    spec: VmSpec,
    scheduler: S,
}

impl<S: CapacityScheduler> Vm<S> {
    pub fn new(spec: VmSpec, scheduler: S) -> Self {
        Self { spec, scheduler }
    }

    pub fn spec(&self) -> &VmSpec {
        &self.spec
    }

    pub fn uid(&self) -> VmUid {
        self.spec.uid
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Tick the scheduler at `now` with this VM's full share.
    pub fn update_processing(&mut self, now: f64) -> Result<f64, SchedulerError> {
        let share = self.spec.mips_share();
        self.scheduler.tick(now, &share)
    }
}
