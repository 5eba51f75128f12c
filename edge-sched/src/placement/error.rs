/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for VM placement.
//!
//! | Variant | Meaning for the caller |
//! |---|---|
//! | `AlreadyAllocated` | precondition violation, VM is placed already |
//! | `Exhausted` | resource exhaustion, retry later (or never) |
//! | `NodeOutOfRange` | explicit placement named a node that does not exist |
//! | `Refused` | explicit placement rejected by the node |
//!
//! Releasing an unknown VM is not an error; see
//! [`PlacementPolicy::deallocate`](super::PlacementPolicy::deallocate).

use thiserror::Error;

use crate::vm::VmUid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// `allocate()` was called for a VM that is still assigned.
    #[error("VM {vm} is already placed on node {node}")]
    AlreadyAllocated { vm: VmUid, node: usize },

    /// Every node refused the VM (or had too few free PEs).
    #[error("no node could host VM {vm} after {tried} attempt(s)")]
    Exhausted { vm: VmUid, tried: usize },

    /// `allocate_on()` was given an index past the end of the node pool.
    #[error("node index {index} out of range (pool has {node_count} node(s))")]
    NodeOutOfRange { index: usize, node_count: usize },

    /// The node chosen by `allocate_on()` refused the VM.
    #[error("node {node} refused VM {vm}")]
    Refused { vm: VmUid, node: usize },
}
