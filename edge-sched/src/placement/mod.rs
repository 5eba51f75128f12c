/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! VM placement across a pool of edge nodes.
//!
//! [`WeightedPlacementPolicy`] places each VM on the node that maximises
//! `pe_weight × free_pes + dist_weight × inverse_distance` (see [`score`]).
//! If the chosen node refuses, that node is struck out for the current
//! request and the next-best node is tried, up to once per node.
//!
//! # State
//! | Table | Indexed by | Mutated by |
//! |---|---|---|
//! | `free_pes` | node index | `allocate` / `allocate_on` / `deallocate` |
//! | `inverse_distance` | node index | never (snapshot at construction) |
//! | `vm_table` | VM uid → node index | `allocate` / `allocate_on` / `deallocate` |
//! | `used_pes` | VM uid → PEs consumed | `allocate` / `allocate_on` / `deallocate` |
//!
//! The inverse-distance table is computed once against the reference point
//! given at construction and is **not** refreshed when devices move.
//!
//! # Cost
//! At most `nodes` attempts, each a linear scan: O(nodes²) per allocation.

pub mod error;
pub mod score;

pub use error::PlacementError;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::mobility::Location;
use crate::node::{EdgeNode, NodeCapability};
use crate::vm::{VmSpec, VmUid};

use score::{best_candidate, inverse_distances};

// ── PlacementPolicy ───────────────────────────────────────────────────────────

/// Pluggable VM-to-node assignment.
pub trait PlacementPolicy {
    /// Choose a node for `vm` and instantiate it there.  Returns the node
    /// index on success.
    fn allocate(&mut self, vm: &VmSpec) -> Result<usize, PlacementError>;

    /// Release `uid` from its node.  Unknown VMs are a no-op.
    fn deallocate(&mut self, uid: VmUid);

    /// Node index hosting `uid`, if any.
    fn lookup(&self, uid: VmUid) -> Option<usize>;
}

// ── WeightedPlacementPolicy ───────────────────────────────────────────────────

/// Weighted free-PE / proximity placement with retry on refusal.
#[derive(Debug)]
pub struct WeightedPlacementPolicy<N = EdgeNode> {
    nodes: Vec<N>,
    free_pes: Vec<u32>,
    inverse_distance: Vec<f64>,

    vm_table: BTreeMap<VmUid, usize>,
    used_pes: BTreeMap<VmUid, u32>,

    pe_weight: f64,
    dist_weight: f64,
}

impl<N: NodeCapability> WeightedPlacementPolicy<N> {
    /// Build a policy over `nodes`, scoring proximity against `reference`.
    pub fn new(nodes: Vec<N>, pe_weight: f64, dist_weight: f64, reference: Location) -> Self {
        let positions: Vec<Location> = nodes.iter().map(NodeCapability::position).collect();
        let inverse_distance = inverse_distances(&positions, &reference);

        for (i, inv) in inverse_distance.iter().enumerate() {
            debug!(node = i, inverse_distance = inv, "proximity score");
        }

        Self::with_inverse_distances(nodes, inverse_distance, pe_weight, dist_weight)
    }

    /// Build a policy from a precomputed inverse-distance table (one entry
    /// per node; missing entries count as `0.0`).
    pub fn with_inverse_distances(
        nodes: Vec<N>,
        mut inverse_distance: Vec<f64>,
        pe_weight: f64,
        dist_weight: f64,
    ) -> Self {
        inverse_distance.resize(nodes.len(), 0.0);
        let free_pes = nodes.iter().map(NodeCapability::total_pes).collect();

        info!(
            node_count = nodes.len(),
            pe_weight = pe_weight,
            dist_weight = dist_weight,
            "placement policy initialised"
        );

        Self {
            nodes,
            free_pes,
            inverse_distance,
            vm_table: BTreeMap::new(),
            used_pes: BTreeMap::new(),
            pe_weight,
            dist_weight,
        }
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&N> {
        self.nodes.get(index)
    }

    pub fn free_pes(&self) -> &[u32] {
        &self.free_pes
    }

    pub fn inverse_distances(&self) -> &[f64] {
        &self.inverse_distance
    }

    /// PEs consumed by `uid`, if it is placed.
    pub fn used_pes(&self, uid: VmUid) -> Option<u32> {
        self.used_pes.get(&uid).copied()
    }

    /// Place `vm` on the node at `index`, bypassing scoring.
    pub fn allocate_on(&mut self, vm: &VmSpec, index: usize) -> Result<(), PlacementError> {
        if let Some(&node) = self.vm_table.get(&vm.uid) {
            return Err(PlacementError::AlreadyAllocated { vm: vm.uid, node });
        }
        let node_count = self.nodes.len();
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(PlacementError::NodeOutOfRange { index, node_count })?;

        if !node.try_instantiate(vm) {
            return Err(PlacementError::Refused { vm: vm.uid, node: index });
        }
        self.commit(vm, index);
        Ok(())
    }

    /// Record a successful instantiation of `vm` on node `index`.
    fn commit(&mut self, vm: &VmSpec, index: usize) {
        self.vm_table.insert(vm.uid, index);
        self.used_pes.insert(vm.uid, vm.pes);
        self.free_pes[index] = self.free_pes[index].saturating_sub(vm.pes);

        info!(
            vm = %vm.uid,
            node = index,
            pes = vm.pes,
            free_pes = self.free_pes[index],
            "VM allocated"
        );
    }
}

impl<N: NodeCapability> PlacementPolicy for WeightedPlacementPolicy<N> {
    fn allocate(&mut self, vm: &VmSpec) -> Result<usize, PlacementError> {
        if let Some(&node) = self.vm_table.get(&vm.uid) {
            return Err(PlacementError::AlreadyAllocated { vm: vm.uid, node });
        }

        // Working copy: nodes that cannot fit the VM, or that refused it, are
        // marked -∞ and never picked again for this request.
        let mut working: Vec<f64> = self
            .free_pes
            .iter()
            .map(|&free| {
                if free >= vm.pes {
                    f64::from(free)
                } else {
                    f64::NEG_INFINITY
                }
            })
            .collect();

        let mut tried = 0usize;
        while tried < self.nodes.len() {
            let Some(idx) =
                best_candidate(&working, &self.inverse_distance, self.pe_weight, self.dist_weight)
            else {
                break;
            };
            tried += 1;

            if self.nodes[idx].try_instantiate(vm) {
                self.commit(vm, idx);
                return Ok(idx);
            }

            debug!(vm = %vm.uid, node = idx, attempt = tried, "node refused VM, trying next best");
            working[idx] = f64::NEG_INFINITY;
        }

        warn!(vm = %vm.uid, pes = vm.pes, tried = tried, "no node can host VM");
        Err(PlacementError::Exhausted { vm: vm.uid, tried })
    }

    fn deallocate(&mut self, uid: VmUid) {
        let Some(idx) = self.vm_table.remove(&uid) else {
            debug!(vm = %uid, "deallocate for unplaced VM ignored");
            return;
        };
        let pes = self.used_pes.remove(&uid).unwrap_or(0);

        self.nodes[idx].destroy(uid);
        let total = self.nodes[idx].total_pes();
        self.free_pes[idx] = (self.free_pes[idx] + pes).min(total);

        info!(vm = %uid, node = idx, released_pes = pes, free_pes = self.free_pes[idx], "VM deallocated");
    }

    fn lookup(&self, uid: VmUid) -> Option<usize> {
        self.vm_table.get(&uid).copied()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Test helpers ──────────────────────────────────────────────────────────

    /// Node stub whose acceptance is scripted by the test.
    #[derive(Debug)]
    struct StubNode {
        pes: u32,
        accept: bool,
        hosted: Vec<VmUid>,
        attempts: usize,
    }

    impl StubNode {
        fn new(pes: u32, accept: bool) -> Self {
            Self {
                pes,
                accept,
                hosted: Vec::new(),
                attempts: 0,
            }
        }
    }

    impl NodeCapability for StubNode {
        fn try_instantiate(&mut self, vm: &VmSpec) -> bool {
            self.attempts += 1;
            if self.accept {
                self.hosted.push(vm.uid);
            }
            self.accept
        }

        fn destroy(&mut self, uid: VmUid) {
            self.hosted.retain(|&h| h != uid);
        }

        fn total_pes(&self) -> u32 {
            self.pes
        }

        fn position(&self) -> Location {
            Location::default()
        }

        fn vm_ids(&self) -> Vec<VmUid> {
            self.hosted.clone()
        }
    }

    /// Free PEs [4, 2, 6], inverse distances [0.5, 0.9, 0.2].
    fn three_nodes(accept: [bool; 3], pe_weight: f64, dist_weight: f64) -> WeightedPlacementPolicy<StubNode> {
        let nodes = vec![
            StubNode::new(4, accept[0]),
            StubNode::new(2, accept[1]),
            StubNode::new(6, accept[2]),
        ];
        WeightedPlacementPolicy::with_inverse_distances(nodes, vec![0.5, 0.9, 0.2], pe_weight, dist_weight)
    }

    fn vm(vm_id: u32, pes: u32) -> VmSpec {
        VmSpec::new(VmUid::new(1, vm_id), pes, 100.0, 128)
    }

    // ── allocate: selection ───────────────────────────────────────────────────

    #[test]
    fn pe_weight_only_picks_node_with_most_free_pes() {
        let mut p = three_nodes([true; 3], 1.0, 0.0);
        assert_eq!(p.allocate(&vm(0, 1)).unwrap(), 2);
        assert_eq!(p.free_pes(), &[4, 2, 5]);
    }

    #[test]
    fn dist_weight_only_picks_closest_node() {
        let mut p = three_nodes([true; 3], 0.0, 1.0);
        assert_eq!(p.allocate(&vm(0, 1)).unwrap(), 1);
        assert_eq!(p.lookup(VmUid::new(1, 0)), Some(1));
    }

    #[test]
    fn free_pes_shift_later_choices() {
        // pure load balancing: 6 → node 2 (left 2), then 4 → node 0
        let mut p = three_nodes([true; 3], 1.0, 0.0);
        assert_eq!(p.allocate(&vm(0, 4)).unwrap(), 2);
        assert_eq!(p.allocate(&vm(1, 1)).unwrap(), 0);
    }

    #[test]
    fn tie_goes_to_lower_index() {
        let nodes = vec![StubNode::new(3, true), StubNode::new(3, true)];
        let mut p = WeightedPlacementPolicy::with_inverse_distances(nodes, vec![0.5, 0.5], 1.0, 1.0);
        assert_eq!(p.allocate(&vm(0, 1)).unwrap(), 0);
    }

    // ── allocate: retry / exhaustion ──────────────────────────────────────────

    #[test]
    fn refusal_falls_back_to_next_best_node() {
        let mut p = three_nodes([true, true, false], 1.0, 0.0);
        assert_eq!(p.allocate(&vm(0, 1)).unwrap(), 0);
        assert_eq!(p.nodes()[2].attempts, 1);
        assert_eq!(p.free_pes(), &[3, 2, 6], "refusing node keeps its PEs");
    }

    #[test]
    fn all_refusing_nodes_exhaust_the_pool() {
        let mut p = three_nodes([false; 3], 1.0, 1.0);
        let err = p.allocate(&vm(0, 1)).unwrap_err();
        assert_eq!(
            err,
            PlacementError::Exhausted {
                vm: VmUid::new(1, 0),
                tried: 3
            }
        );
        assert_eq!(p.free_pes(), &[4, 2, 6]);
        assert!(p.lookup(VmUid::new(1, 0)).is_none());
        for n in p.nodes() {
            assert_eq!(n.attempts, 1, "each node tried exactly once");
        }
    }

    #[test]
    fn nodes_with_too_few_free_pes_are_never_tried() {
        let mut p = three_nodes([true; 3], 0.0, 1.0);
        // closest node 1 has only 2 PEs; node 0 (4 PEs) is next by distance
        assert_eq!(p.allocate(&vm(0, 3)).unwrap(), 0);
        assert_eq!(p.nodes()[1].attempts, 0);
    }

    #[test]
    fn vm_larger_than_every_node_is_exhausted_without_attempts() {
        let mut p = three_nodes([true; 3], 1.0, 0.0);
        let err = p.allocate(&vm(0, 7)).unwrap_err();
        assert!(matches!(err, PlacementError::Exhausted { tried: 0, .. }));
    }

    #[test]
    fn empty_pool_is_exhausted() {
        let mut p: WeightedPlacementPolicy<StubNode> =
            WeightedPlacementPolicy::with_inverse_distances(vec![], vec![], 1.0, 1.0);
        assert!(matches!(p.allocate(&vm(0, 1)), Err(PlacementError::Exhausted { tried: 0, .. })));
    }

    #[test]
    fn allocating_twice_is_rejected() {
        let mut p = three_nodes([true; 3], 1.0, 0.0);
        p.allocate(&vm(0, 1)).unwrap();
        let err = p.allocate(&vm(0, 1)).unwrap_err();
        assert_eq!(
            err,
            PlacementError::AlreadyAllocated {
                vm: VmUid::new(1, 0),
                node: 2
            }
        );
        assert_eq!(p.free_pes(), &[4, 2, 5]);
    }

    // ── deallocate ────────────────────────────────────────────────────────────

    #[test]
    fn deallocate_restores_free_pes_and_destroys_vm() {
        let mut p = three_nodes([true; 3], 1.0, 0.0);
        let before = p.free_pes().to_vec();

        let idx = p.allocate(&vm(0, 3)).unwrap();
        assert_eq!(p.used_pes(VmUid::new(1, 0)), Some(3));
        assert_eq!(p.nodes()[idx].vm_ids(), vec![VmUid::new(1, 0)]);

        p.deallocate(VmUid::new(1, 0));
        assert_eq!(p.free_pes(), before.as_slice());
        assert!(p.nodes()[idx].vm_ids().is_empty());
        assert!(p.lookup(VmUid::new(1, 0)).is_none());
        assert!(p.used_pes(VmUid::new(1, 0)).is_none());
    }

    #[test]
    fn deallocate_unknown_vm_is_a_no_op() {
        let mut p = three_nodes([true; 3], 1.0, 0.0);
        p.deallocate(VmUid::new(5, 5));
        assert_eq!(p.free_pes(), &[4, 2, 6]);
    }

    #[test]
    fn round_trip_over_many_vms_restores_pool() {
        let mut p = three_nodes([true; 3], 1.0, 0.5);
        let before = p.free_pes().to_vec();
        let mut placed = Vec::new();
        for id in 0..6 {
            if p.allocate(&vm(id, 2)).is_ok() {
                placed.push(VmUid::new(1, id));
            }
        }
        // 12 PEs total, 2 per VM → all six fit
        assert_eq!(placed.len(), 6);
        assert_eq!(p.free_pes(), &[0, 0, 0]);
        for uid in placed.into_iter().rev() {
            p.deallocate(uid);
        }
        assert_eq!(p.free_pes(), before.as_slice());
    }

    // ── allocate_on ───────────────────────────────────────────────────────────

    #[test]
    fn allocate_on_uses_the_given_node() {
        let mut p = three_nodes([true; 3], 1.0, 0.0);
        p.allocate_on(&vm(0, 2), 1).unwrap();
        assert_eq!(p.lookup(VmUid::new(1, 0)), Some(1));
        assert_eq!(p.free_pes(), &[4, 0, 6]);
    }

    #[test]
    fn allocate_on_reports_refusal_and_bad_index() {
        let mut p = three_nodes([true, false, true], 1.0, 0.0);
        assert_eq!(
            p.allocate_on(&vm(0, 1), 1).unwrap_err(),
            PlacementError::Refused {
                vm: VmUid::new(1, 0),
                node: 1
            }
        );
        assert_eq!(
            p.allocate_on(&vm(0, 1), 9).unwrap_err(),
            PlacementError::NodeOutOfRange {
                index: 9,
                node_count: 3
            }
        );
    }

    // ── With real edge nodes ──────────────────────────────────────────────────

    #[test]
    fn edge_node_memory_refusal_triggers_retry() {
        let nodes = vec![
            EdgeNode::new("near", Location::new(1.0, 0.0, 0.0), 4, 1000.0, 256),
            EdgeNode::new("far", Location::new(10.0, 0.0, 0.0), 4, 1000.0, 4096),
        ];
        let mut p = WeightedPlacementPolicy::new(nodes, 0.0, 1.0, Location::default());
        assert!((p.inverse_distances()[0] - 1.0).abs() < 1e-12);
        assert!((p.inverse_distances()[1] - 0.1).abs() < 1e-12);

        let spec = VmSpec::new(VmUid::new(0, 0), 2, 500.0, 1024);
        assert_eq!(p.allocate(&spec).unwrap(), 1, "near node lacks memory");
        assert_eq!(p.node(1).unwrap().free_pes(), 2);
        assert_eq!(p.free_pes(), &[4, 2]);
    }
}
