/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Edge compute nodes.
//!
//! The placement policy talks to nodes only through [`NodeCapability`].  A
//! node is free to refuse a VM for reasons the policy cannot see (memory,
//! per-PE speed, ...); the policy then retries elsewhere.

use std::collections::BTreeMap;

use tracing::debug;

use crate::mobility::Location;
use crate::vm::{VmSpec, VmUid};

// ── NodeCapability ────────────────────────────────────────────────────────────

/// What the placement policy needs from a compute node.
pub trait NodeCapability {
    /// Try to reserve resources for `vm`.  Returns `false` to refuse.
    fn try_instantiate(&mut self, vm: &VmSpec) -> bool;

    /// Release whatever was reserved for `uid`.  Unknown VMs are ignored.
    fn destroy(&mut self, uid: VmUid);

    fn total_pes(&self) -> u32;

    fn position(&self) -> Location;

    /// VMs currently hosted, in ascending uid order.
    fn vm_ids(&self) -> Vec<VmUid>;
}

// ── EdgeNode ──────────────────────────────────────────────────────────────────

/// A geographically placed edge device hosting VMs.
#[derive(Debug, Clone)]
pub struct EdgeNode {
    pub name: String,
    pub location: Location,
    pub pes: u32,
    pub mips_per_pe: f64,
    /// `u64::MAX` means unconstrained.
    pub memory_mb: u64,

    free_pes: u32,
    free_memory_mb: u64,
    hosted: BTreeMap<VmUid, VmSpec>,
}

impl EdgeNode {
    pub fn new(
        name: impl Into<String>,
        location: Location,
        pes: u32,
        mips_per_pe: f64,
        memory_mb: u64,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            pes,
            mips_per_pe,
            memory_mb,
            free_pes: pes,
            free_memory_mb: memory_mb,
            hosted: BTreeMap::new(),
        }
    }

    pub fn free_pes(&self) -> u32 {
        self.free_pes
    }

    pub fn free_memory_mb(&self) -> u64 {
        self.free_memory_mb
    }

    /// Sum of the processing rate not yet handed to VMs.
    pub fn available_mips(&self) -> f64 {
        f64::from(self.free_pes) * self.mips_per_pe
    }
}

impl NodeCapability for EdgeNode {
    fn try_instantiate(&mut self, vm: &VmSpec) -> bool {
        let refusal = if self.hosted.contains_key(&vm.uid) {
            Some("already hosted")
        } else if vm.pes > self.free_pes {
            Some("not enough free PEs")
        } else if vm.memory_mb > self.free_memory_mb {
            Some("not enough free memory")
        } else if vm.mips > self.mips_per_pe {
            Some("PE too slow for requested MIPS")
        } else {
            None
        };

        if let Some(reason) = refusal {
            debug!(node = %self.name, vm = %vm.uid, reason, "VM refused");
            return false;
        }

        self.free_pes -= vm.pes;
        self.free_memory_mb -= vm.memory_mb;
        self.hosted.insert(vm.uid, *vm);
        debug!(
            node = %self.name,
            vm = %vm.uid,
            free_pes = self.free_pes,
            free_memory_mb = self.free_memory_mb,
            "VM instantiated"
        );
        true
    }

    fn destroy(&mut self, uid: VmUid) {
        if let Some(vm) = self.hosted.remove(&uid) {
            self.free_pes = (self.free_pes + vm.pes).min(self.pes);
            self.free_memory_mb = self.free_memory_mb.saturating_add(vm.memory_mb).min(self.memory_mb);
            debug!(node = %self.name, vm = %uid, "VM destroyed");
        }
    }

    fn total_pes(&self) -> u32 {
        self.pes
    }

    fn position(&self) -> Location {
        self.location
    }

    fn vm_ids(&self) -> Vec<VmUid> {
        self.hosted.keys().copied().collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
