/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-category demand weights ("sensor weights").
//!
//! Populated once from configuration, then shared read-only (`Arc`) by every
//! VM's scheduler.  A category with no entry weighs `0` everywhere it is used.

use std::collections::BTreeMap;

/// Immutable map from category tag to a positive integer weight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryWeights {
    weights: BTreeMap<String, u32>,
}

impl CategoryWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight for `category`, or `None` when it was never configured.
    pub fn get(&self, category: &str) -> Option<u32> {
        self.weights.get(category).copied()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.weights.contains_key(category)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for CategoryWeights {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
