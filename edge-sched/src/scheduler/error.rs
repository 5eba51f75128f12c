/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the time-shared capacity scheduler.
//!
//! Only caller contract violations are errors.  Looking up an unknown work
//! unit is an expected steady-state condition and is reported through the
//! operation's return value (`false`, `None`, `0.0` or `-1`) instead.

use thiserror::Error;

/// Precondition violations reported by
/// [`CapacityScheduler`](super::CapacityScheduler) operations.
///
/// The scheduler's lists and clock are left untouched when one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// `tick()` was called with a timestamp earlier than the previous one.
    #[error("simulation time went backwards: previous tick at {previous}, current {current}")]
    TimeWentBackwards { previous: f64, current: f64 },

    /// `tick()` was called with a NaN or infinite timestamp.
    #[error("simulation time must be finite, got {time}")]
    NonFiniteTime { time: f64 },

    /// `migrate()` was called while no work unit is executing.
    #[error("cannot migrate a work unit: exec list is empty")]
    EmptyExecList,
}
