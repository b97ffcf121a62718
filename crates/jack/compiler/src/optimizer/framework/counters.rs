// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Named rewrite counters shared across compilation units

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters keyed by rewrite kind
#[derive(Debug, Default)]
pub struct Counters {
    values: DashMap<&'static str, AtomicU64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to `name`
    pub fn increment(&self, name: &'static str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &'static str, amount: u64) {
        if let Some(counter) = self.values.get(name) {
            counter.fetch_add(amount, Ordering::Relaxed);
            return;
        }
        self.values.entry(name).or_default().fetch_add(amount, Ordering::Relaxed);
    }

    /// Current value of `name`; zero when never incremented
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    /// Sorted copy of every counter
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.values.iter().map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed))).collect()
    }

    pub fn reset(&self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_concurrent_increments() {
        let counters = Counters::new();
        (0..1000).into_par_iter().for_each(|_| counters.increment("folded"));
        assert_eq!(counters.get("folded"), 1000);
        assert_eq!(counters.get("missing"), 0);
    }

    #[test]
    fn test_snapshot_and_reset() {
        let counters = Counters::new();
        counters.add("b", 2);
        counters.increment("a");
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.into_iter().collect::<Vec<_>>(), vec![("a", 1), ("b", 2)]);
        counters.reset();
        assert_eq!(counters.get("b"), 0);
    }
}
