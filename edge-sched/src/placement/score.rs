/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Multi-criteria node scoring.
//!
//! Free functions so the scoring rule can be tested against fixed score
//! tables independently of any node pool.
//!
//! ```text
//! score(i) = pe_weight × free_pes(i) + dist_weight × 1 / distance(i, reference)
//! ```
//!
//! `dist_weight = 0` gives pure load balancing; `pe_weight = 0` gives pure
//! locality.

use crate::mobility::Location;

/// Distances are floored to this value before inversion, so a node sitting
/// exactly on the reference point scores high but finite.
pub const MIN_DISTANCE: f64 = 1e-6;

/// Inverse Euclidean distance from every position to `reference`.
pub fn inverse_distances(positions: &[Location], reference: &Location) -> Vec<f64> {
    positions
        .iter()
        .map(|p| 1.0 / p.distance_to(reference).max(MIN_DISTANCE))
        .collect()
}

/// Weighted score of one node.
pub fn score(pe_weight: f64, dist_weight: f64, free_pes: f64, inverse_distance: f64) -> f64 {
    pe_weight * free_pes + dist_weight * inverse_distance
}

/// Index of the eligible node with the strictly greatest score.
///
/// A node is ineligible when its `free_pes` entry is `-∞`.  Ties keep the
/// first (lowest-index) node.  Returns `None` when nothing is eligible.
pub fn best_candidate(
    free_pes: &[f64],
    inverse_distance: &[f64],
    pe_weight: f64,
    dist_weight: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (i, (&free, &inv)) in free_pes.iter().zip(inverse_distance).enumerate() {
        if free == f64::NEG_INFINITY {
            continue;
        }
        let s = score(pe_weight, dist_weight, free, inv);
        match best {
            Some((_, best_score)) if s <= best_score => {}
            _ => best = Some((i, s)),
        }
    }

    best.map(|(i, _)| i)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FREE: [f64; 3] = [4.0, 2.0, 6.0];
    const INV: [f64; 3] = [0.5, 0.9, 0.2];

    #[test]
    fn pe_weight_only_prefers_most_free_pes() {
        assert_eq!(best_candidate(&FREE, &INV, 1.0, 0.0), Some(2));
    }

    #[test]
    fn dist_weight_only_prefers_closest_node() {
        assert_eq!(best_candidate(&FREE, &INV, 0.0, 1.0), Some(1));
    }

    #[test]
    fn mixed_weights_trade_off_linearly() {
        // scores: 4 + 5 = 9, 2 + 9 = 11, 6 + 2 = 8
        assert_eq!(best_candidate(&FREE, &INV, 1.0, 10.0), Some(1));
        assert!((score(1.0, 10.0, 4.0, 0.5) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn ties_go_to_the_lowest_index() {
        let free = [3.0, 3.0, 3.0];
        let inv = [0.5, 0.5, 0.5];
        assert_eq!(best_candidate(&free, &inv, 1.0, 1.0), Some(0));
        assert_eq!(best_candidate(&free, &inv, 0.0, 0.0), Some(0));
    }

    #[test]
    fn ineligible_nodes_are_skipped() {
        let free = [4.0, 2.0, f64::NEG_INFINITY];
        assert_eq!(best_candidate(&free, &INV, 1.0, 0.0), Some(0));
    }

    #[test]
    fn nothing_eligible_yields_none() {
        let free = [f64::NEG_INFINITY; 3];
        assert_eq!(best_candidate(&free, &INV, 1.0, 1.0), None);
        assert_eq!(best_candidate(&[], &[], 1.0, 1.0), None);
    }

    #[test]
    fn zero_score_nodes_are_still_candidates() {
        let free = [0.0, 0.0];
        let inv = [0.0, 0.0];
        assert_eq!(best_candidate(&free, &inv, 1.0, 1.0), Some(0));
    }

    #[test]
    fn inverse_distance_is_reciprocal_of_euclidean_distance() {
        let reference = Location::new(0.0, 0.0, 0.0);
        let inv = inverse_distances(
            &[Location::new(2.0, 0.0, 0.0), Location::new(0.0, 3.0, 4.0)],
            &reference,
        );
        assert!((inv[0] - 0.5).abs() < 1e-12);
        assert!((inv[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn colocated_node_gets_finite_inverse_distance() {
        let here = Location::new(1.0, 1.0, 1.0);
        let inv = inverse_distances(&[here], &here);
        assert!(inv[0].is_finite());
        assert_eq!(inv[0], 1.0 / MIN_DISTANCE);
        // pure load balancing must not be poisoned by the large locality term
        assert_eq!(score(1.0, 0.0, 3.0, inv[0]), 3.0);
    }
}
