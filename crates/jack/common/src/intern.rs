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

//! Append-only interning of canonical names
//!
//! One [`Registry`] is created per compilation and shared (behind an `Arc`) by
//! every compilation unit. Lookups never block each other; inserts only lock
//! the shard of the name being added and the append-only name table.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Handle to an interned name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Raw index of the symbol in its registry
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Registry of canonical names shared across worker threads
#[derive(Debug, Default)]
pub struct Registry {
    ids: DashMap<Arc<str>, Symbol>,
    names: RwLock<Vec<Arc<str>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a name up without inserting it
    pub fn find(&self, name: &str) -> Option<Symbol> {
        self.ids.get(name).map(|entry| *entry.value())
    }

    /// Return the symbol for `name`, inserting it if it is not known yet
    pub fn intern(&self, name: &str) -> Symbol {
        if let Some(symbol) = self.find(name) {
            return symbol;
        }

        let key: Arc<str> = Arc::from(name);
        // The entry keeps the shard locked, so two racing inserts of the same
        // name agree on a single symbol.
        let entry = self.ids.entry(key.clone()).or_insert_with(|| {
            let mut names = self.names.write();
            let symbol = Symbol(names.len() as u32);
            names.push(key);
            symbol
        });
        *entry.value()
    }

    /// Name behind a symbol
    pub fn resolve(&self, symbol: Symbol) -> Option<Arc<str>> {
        self.names.read().get(symbol.0 as usize).cloned()
    }

    /// Name behind a symbol, or a placeholder for symbols of another registry
    pub fn display(&self, symbol: Symbol) -> String {
        self.resolve(symbol).map(|name| name.to_string()).unwrap_or_else(|| symbol.to_string())
    }

    /// Number of interned names
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    /// Check if nothing has been interned yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
