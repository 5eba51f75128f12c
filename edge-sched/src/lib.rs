/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Edge-sched: sensor-weighted VM placement and time-shared work unit
//! scheduling for edge/IoT simulation.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/       – YAML scenario loading and validation
//! ├── datacenter    – wires placement, VMs and schedulers; run loop
//! ├── mobility      – device positions and moving policies
//! ├── node          – edge node capacity model
//! ├── placement/    – weighted multi-criteria VM placement
//! ├── scheduler/    – category-weighted time-shared capacity scheduler
//! ├── vm            – VM identity, resource demand, owned scheduler
//! └── work_unit     – work units and their execution records
//! ```

pub mod config;
pub mod datacenter;
pub mod mobility;
pub mod node;
pub mod placement;
pub mod scheduler;
pub mod vm;
pub mod work_unit;
