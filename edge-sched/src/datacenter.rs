/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Edge datacenter: wires the placement policy, the VMs it hosts and their
//! schedulers together.
//!
//! This is the thin slice of driver logic needed to run a scenario end to
//! end: create VMs, submit work units, re-tick every VM at the earliest
//! wakeup any of them asked for, and collect finished units.  Event queues,
//! acknowledgements and connection handling belong to the surrounding
//! simulation and are not modelled here.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::placement::{PlacementError, PlacementPolicy, WeightedPlacementPolicy};
use crate::scheduler::{CapacityScheduler, CategoryWeights, SchedulerError, TimeSharedScheduler};
use crate::vm::{Vm, VmSpec, VmUid};
use crate::work_unit::{ResWorkUnit, WorkUnit};

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DatacenterError {
    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// A work unit named a VM that is not running here.
    #[error("VM {0} is not hosted in this datacenter")]
    UnknownVm(VmUid),

    /// `run_until_idle` hit its step limit with units still executing
    /// (typically units whose category has no weight).
    #[error("simulation still busy after {steps} steps (t = {time})")]
    Stalled { steps: usize, time: f64 },
}

// ── EdgeDatacenter ────────────────────────────────────────────────────────────

pub struct EdgeDatacenter<P = WeightedPlacementPolicy> {
    policy: P,
    vms: BTreeMap<VmUid, Vm>,
    weights: Arc<CategoryWeights>,
    min_time_between_events: f64,
    storage_rate_mb_per_s: f64,
}

impl<P: PlacementPolicy> EdgeDatacenter<P> {
    pub fn new(
        policy: P,
        weights: Arc<CategoryWeights>,
        min_time_between_events: f64,
        storage_rate_mb_per_s: f64,
    ) -> Self {
        Self {
            policy,
            vms: BTreeMap::new(),
            weights,
            min_time_between_events,
            storage_rate_mb_per_s,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn vm(&self, uid: VmUid) -> Option<&Vm> {
        self.vms.get(&uid)
    }

    pub fn vm_mut(&mut self, uid: VmUid) -> Option<&mut Vm> {
        self.vms.get_mut(&uid)
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    /// Start `spec`'s scheduler at `now` and place it.  Returns the node
    /// index it landed on.  Nothing is reserved when either step fails.
    pub fn create_vm(&mut self, spec: VmSpec, now: f64) -> Result<usize, DatacenterError> {
        let scheduler = TimeSharedScheduler::new(Arc::clone(&self.weights), self.min_time_between_events);
        let mut vm = Vm::new(spec, scheduler);
        vm.update_processing(now)?;

        let node = self.policy.allocate(&spec)?;
        self.vms.insert(spec.uid, vm);

        info!(vm = %spec.uid, node = node, time = now, "VM created");
        Ok(node)
    }

    /// Release `uid` from its node and hand back the VM with whatever its
    /// scheduler still holds.
    pub fn destroy_vm(&mut self, uid: VmUid) -> Option<Vm> {
        self.policy.deallocate(uid);
        let vm = self.vms.remove(&uid);
        if vm.is_some() {
            info!(vm = %uid, "VM destroyed");
        }
        vm
    }

    /// Time to stage `unit`'s input from storage.
    pub fn file_transfer_time(&self, unit: &WorkUnit) -> f64 {
        if self.storage_rate_mb_per_s > 0.0 {
            unit.input_size_mb / self.storage_rate_mb_per_s
        } else {
            0.0
        }
    }

    /// Bring every VM up to `now`, then submit `unit` to its VM.
    ///
    /// Returns the absolute time at which the unit's VM should be re-ticked,
    /// or `None` when no finite estimate exists yet.
    pub fn submit(&mut self, unit: WorkUnit, now: f64) -> Result<Option<f64>, DatacenterError> {
        self.update_processing(now)?;

        let uid = VmUid::new(unit.user_id, unit.vm_id);
        let transfer = self.file_transfer_time(&unit);
        let vm = self.vms.get_mut(&uid).ok_or(DatacenterError::UnknownVm(uid))?;

        let unit_id = unit.id;
        let estimate = vm.scheduler_mut().submit(unit, transfer, now);

        if estimate > 0.0 && estimate.is_finite() {
            let wakeup = now + estimate + transfer;
            debug!(unit = unit_id, vm = %uid, transfer = transfer, wakeup = wakeup, "work unit scheduled");
            Ok(Some(wakeup))
        } else {
            debug!(unit = unit_id, vm = %uid, estimate = estimate, "work unit submitted without wakeup");
            Ok(None)
        }
    }

    /// Tick every VM at `now`.  Returns the earliest wakeup any VM asked for,
    /// or `0.0` when none did.
    pub fn update_processing(&mut self, now: f64) -> Result<f64, DatacenterError> {
        let mut next = f64::INFINITY;
        for vm in self.vms.values_mut() {
            let t = vm.update_processing(now)?;
            if t > 0.0 && t < next {
                next = t;
            }
        }
        Ok(if next.is_finite() { next } else { 0.0 })
    }

    /// Drain every VM's finished list, in VM uid order.
    pub fn collect_finished(&mut self) -> Vec<ResWorkUnit> {
        let mut out = Vec::new();
        for vm in self.vms.values_mut() {
            while let Some(rec) = vm.scheduler_mut().next_finished() {
                out.push(rec);
            }
        }
        out
    }

    /// Re-tick from `start` at each requested wakeup until no VM asks for
    /// another one.  Returns finished units in completion order.
    ///
    /// # Errors
    /// [`DatacenterError::Stalled`] after `max_steps` ticks without going
    /// idle.
    pub fn run_until_idle(&mut self, start: f64, max_steps: usize) -> Result<Vec<ResWorkUnit>, DatacenterError> {
        let mut now = start;
        let mut finished = Vec::new();

        for step in 0..max_steps {
            let next = self.update_processing(now)?;
            finished.extend(self.collect_finished());

            if next <= 0.0 {
                info!(time = now, steps = step + 1, finished = finished.len(), "datacenter idle");
                return Ok(finished);
            }
            now = next.max(now);
        }

        warn!(time = now, steps = max_steps, "datacenter did not go idle");
        Err(DatacenterError::Stalled {
            steps: max_steps,
            time: now,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mobility::Location;
    use crate::node::EdgeNode;
    use crate::work_unit::WorkUnitStatus;

    /// One node: 4 PEs at 1000 MIPS, 4 GB.  Storage at 10 MB/s.
    fn datacenter(weights: &[(&str, u32)]) -> EdgeDatacenter {
        let nodes = vec![EdgeNode::new("edge01", Location::default(), 4, 1000.0, 4096)];
        let policy = WeightedPlacementPolicy::new(nodes, 1.0, 0.0, Location::default());
        let weights: Arc<CategoryWeights> = Arc::new(weights.iter().map(|&(k, v)| (k, v)).collect());
        EdgeDatacenter::new(policy, weights, 0.1, 10.0)
    }

    fn vm_spec(vm_id: u32, pes: u32) -> VmSpec {
        VmSpec::new(VmUid::new(1, vm_id), pes, 500.0, 512)
    }

    fn unit(id: u32, vm_id: u32, length: f64, category: &str) -> WorkUnit {
        WorkUnit {
            id,
            user_id: 1,
            vm_id,
            length,
            pes: 1,
            category: category.to_string(),
            input_size_mb: 0.0,
        }
    }

    #[test]
    fn single_unit_runs_to_completion() {
        let mut dc = datacenter(&[("cam", 1)]);
        assert_eq!(dc.create_vm(vm_spec(0, 2), 0.0).unwrap(), 0);

        // 1000 aggregate / max(2, 1, 1) = 500 → 1000 MI takes 2.0
        let wakeup = dc.submit(unit(1, 0, 1_000.0, "cam"), 0.0).unwrap();
        assert_eq!(wakeup, Some(2.0));

        let done = dc.run_until_idle(0.0, 100).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].status(), WorkUnitStatus::Success);
        assert!((done[0].finish_time().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn input_transfer_delays_wakeup_and_inflates_work() {
        let mut dc = datacenter(&[("cam", 1)]);
        dc.create_vm(vm_spec(0, 2), 0.0).unwrap();

        let mut u = unit(1, 0, 1_000.0, "cam");
        u.input_size_mb = 5.0; // 0.5 at 10 MB/s → +250 MI at rate 500
        assert!((dc.file_transfer_time(&u) - 0.5).abs() < 1e-12);

        let wakeup = dc.submit(u, 0.0).unwrap().unwrap();
        assert!((wakeup - 3.0).abs() < 1e-9, "2.5 compute + 0.5 transfer, got {wakeup}");

        let done = dc.run_until_idle(0.0, 100).unwrap();
        assert!((done[0].unit().length - 1_250.0).abs() < 1e-9);
        assert!((done[0].finish_time().unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn heavier_category_finishes_first() {
        let mut dc = datacenter(&[("cam", 3), ("temp", 1)]);
        dc.create_vm(vm_spec(0, 1), 0.0).unwrap();
        dc.submit(unit(1, 0, 3_000.0, "temp"), 0.0).unwrap();
        dc.submit(unit(2, 0, 1_000.0, "cam"), 0.0).unwrap();

        // rate 500 / max(1, 2, 4) = 125: wakeups at 1000/125 = 8 for cam,
        // then temp has 2000 left at the full 500
        let done = dc.run_until_idle(0.0, 1_000).unwrap();
        let order: Vec<u32> = done.iter().map(ResWorkUnit::id).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(done[0].finish_time(), Some(8.0));
        assert!((done[1].finish_time().unwrap() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn submit_to_unknown_vm_is_an_error() {
        let mut dc = datacenter(&[("cam", 1)]);
        let err = dc.submit(unit(1, 9, 100.0, "cam"), 0.0).unwrap_err();
        assert!(matches!(err, DatacenterError::UnknownVm(uid) if uid == VmUid::new(1, 9)));
    }

    #[test]
    fn placement_exhaustion_is_surfaced() {
        let mut dc = datacenter(&[]);
        dc.create_vm(vm_spec(0, 4), 0.0).unwrap();
        let err = dc.create_vm(vm_spec(1, 1), 0.0).unwrap_err();
        assert!(matches!(err, DatacenterError::Placement(PlacementError::Exhausted { .. })));
        assert_eq!(dc.vm_count(), 1);
    }

    #[test]
    fn destroy_vm_frees_node_capacity() {
        let mut dc = datacenter(&[]);
        dc.create_vm(vm_spec(0, 4), 0.0).unwrap();
        assert!(dc.destroy_vm(VmUid::new(1, 0)).is_some());
        assert_eq!(dc.policy().free_pes(), &[4]);
        assert!(dc.create_vm(vm_spec(1, 4), 0.0).is_ok());
        assert!(dc.destroy_vm(VmUid::new(7, 7)).is_none());
    }

    #[test]
    fn failed_first_tick_leaves_no_reservation() {
        let mut dc = datacenter(&[]);
        let spec = vm_spec(0, 2);

        let err = dc.create_vm(spec, -1.0).unwrap_err();
        assert!(matches!(
            err,
            DatacenterError::Scheduler(SchedulerError::TimeWentBackwards { .. })
        ));
        assert_eq!(dc.vm_count(), 0);
        assert_eq!(dc.policy().lookup(spec.uid), None);
        assert_eq!(dc.policy().free_pes(), &[4]);

        // same id can be created once the clock is valid
        assert_eq!(dc.create_vm(spec, 0.0).unwrap(), 0);
        assert_eq!(dc.policy().free_pes(), &[2]);
    }

    #[test]
    fn unweighted_category_stalls_the_run() {
        let mut dc = datacenter(&[("cam", 1)]);
        dc.create_vm(vm_spec(0, 1), 0.0).unwrap();
        dc.submit(unit(1, 0, 100.0, "unknown"), 0.0).unwrap();
        let err = dc.run_until_idle(0.0, 20).unwrap_err();
        assert!(matches!(err, DatacenterError::Stalled { steps: 20, .. }));
    }

    #[test]
    fn idle_datacenter_returns_immediately() {
        let mut dc = datacenter(&[]);
        assert!(dc.run_until_idle(0.0, 1).unwrap().is_empty());
    }
}
