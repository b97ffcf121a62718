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

//! Scheduling of compilation units

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Execution strategies for unit scheduling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Run units one after another
    #[default]
    Sequential,
    /// Run units on rayon worker threads; methods of one unit stay on one thread
    Parallel,
}

impl ExecutionStrategy {
    /// Apply `work` to every item, collecting the results in input order
    pub fn run<T, R, F>(self, items: &mut [T], work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(&mut T) -> R + Sync + Send,
    {
        match self {
            ExecutionStrategy::Sequential => items.iter_mut().map(work).collect(),
            ExecutionStrategy::Parallel => items.par_iter_mut().map(work).collect(),
        }
    }
}
