/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Spatial model for edge nodes and mobile IoT devices.
//!
//! Movement itself is deliberately simple (straight-line bounce inside a box).
//! Its only consumer in the core is the placement policy, which snapshots the
//! average device position once as its distance reference point.

use serde::Deserialize;

// ── Location ──────────────────────────────────────────────────────────────────

/// A point in 3-D simulation space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance between `self` and `other`.
    pub fn distance_to(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Average of `locations`, or `None` for an empty slice.
pub fn centroid(locations: &[Location]) -> Option<Location> {
    if locations.is_empty() {
        return None;
    }
    let n = locations.len() as f64;
    let (sx, sy, sz) = locations
        .iter()
        .fold((0.0, 0.0, 0.0), |(sx, sy, sz), l| (sx + l.x, sy + l.y, sz + l.z));
    Some(Location::new(sx / n, sy / n, sz / n))
}

// ── Moving range ──────────────────────────────────────────────────────────────

/// Axis-aligned box a mobile device bounces around in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct MovingRange {
    #[serde(default)]
    pub begin_x: i32,
    #[serde(default)]
    pub end_x: i32,
    #[serde(default)]
    pub begin_y: i32,
    #[serde(default)]
    pub end_y: i32,
    #[serde(default)]
    pub begin_z: i32,
    #[serde(default)]
    pub end_z: i32,
}

impl MovingRange {
    pub fn new(begin_x: i32, end_x: i32, begin_y: i32, end_y: i32, begin_z: i32, end_z: i32) -> Self {
        Self {
            begin_x,
            end_x,
            begin_y,
            end_y,
            begin_z,
            end_z,
        }
    }
}

// ── Mobility ──────────────────────────────────────────────────────────────────

/// Position and motion state of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct Mobility {
    pub location: Location,
    /// Signed per-step displacement applied to every axis.
    pub velocity: f64,
    pub range: MovingRange,
    pub movable: bool,
    pub total_moving_distance: f64,
}

impl Mobility {
    /// A stationary device at `location`.
    pub fn fixed(location: Location) -> Self {
        Self {
            location,
            velocity: 0.0,
            range: MovingRange::default(),
            movable: false,
            total_moving_distance: 0.0,
        }
    }

    pub fn moving(location: Location, velocity: f64, range: MovingRange) -> Self {
        Self {
            location,
            velocity,
            range,
            movable: true,
            total_moving_distance: 0.0,
        }
    }
}

// ── Moving policies ───────────────────────────────────────────────────────────

/// Advances a device's position by one step.
pub trait MovingPolicy {
    fn update_location(&self, mobility: &mut Mobility);
}

/// Straight-line motion on the diagonal; the direction reverses whenever an
/// axis touches or leaves its range, and the axis is clamped back inside.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleMovingPolicy;

impl MovingPolicy for SimpleMovingPolicy {
    fn update_location(&self, mobility: &mut Mobility) {
        if !mobility.movable {
            return;
        }

        let v = mobility.velocity;
        mobility.location.x += v;
        mobility.location.y += v;
        mobility.location.z += v;
        mobility.total_moving_distance += v.abs();

        let r = mobility.range;
        bounce(&mut mobility.location.x, &mut mobility.velocity, r.begin_x, r.end_x);
        bounce(&mut mobility.location.y, &mut mobility.velocity, r.begin_y, r.end_y);
        bounce(&mut mobility.location.z, &mut mobility.velocity, r.begin_z, r.end_z);
    }
}

/// Each axis flips the shared velocity independently, so two axes hitting a
/// wall on the same step cancel out.
fn bounce(coord: &mut f64, velocity: &mut f64, begin: i32, end: i32) {
    let (begin, end) = (f64::from(begin), f64::from(end));
    if *coord >= end || *coord <= begin {
        *velocity = -*velocity;
        if *coord > end {
            *coord = end;
        }
        if *coord < begin {
            *coord = begin;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
