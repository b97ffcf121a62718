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

//! Source location tags carried by every IR node

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Represents a position in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
}

impl Position {
    /// Create a new position
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Create an invalid/unknown position
    pub fn unknown() -> Self {
        Self::new(0, 0)
    }

    /// Check if this is a valid position
    pub fn is_valid(&self) -> bool {
        self.line > 0 && self.column > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Location of a node in the original source: file plus a start/end range.
///
/// Nodes synthesized by the optimizer copy the tag of the node they replace, so
/// diagnostics keep pointing at user code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SourceInfo {
    /// Source file, shared between all nodes of a compilation unit
    pub file: Option<Arc<str>>,
    /// First character covered by the node
    pub start: Position,
    /// Last character covered by the node
    pub end: Position,
}

impl SourceInfo {
    /// Create a source tag for a range in `file`
    pub fn new(file: Arc<str>, start: Position, end: Position) -> Self {
        Self { file: Some(file), start, end }
    }

    /// Create a tag for a single line of `file`
    pub fn line(file: Arc<str>, line: u32) -> Self {
        Self::new(file, Position::new(line, 1), Position::new(line, 1))
    }

    /// Tag used for nodes without a known origin
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Check if this tag points at a real location
    pub fn is_known(&self) -> bool {
        self.file.is_some() && self.start.is_valid()
    }

    /// Smallest tag covering both `self` and `other`; falls back to whichever is known.
    pub fn merge(&self, other: &SourceInfo) -> SourceInfo {
        match (self.is_known(), other.is_known()) {
            (true, true) if self.file == other.file => SourceInfo {
                file: self.file.clone(),
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            },
            (false, true) => other.clone(),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) if self.start.is_valid() => write!(f, "{}:{}", file, self.start),
            Some(file) => write!(f, "{}", file),
            None => write!(f, "<unknown>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_validity() {
        assert!(Position::new(3, 7).is_valid());
        assert!(!Position::unknown().is_valid());
        assert_eq!(Position::new(3, 7).to_string(), "3:7");
    }

    #[test]
    fn test_source_info_display() {
        let file: Arc<str> = Arc::from("Demo.java");
        assert_eq!(SourceInfo::line(file.clone(), 12).to_string(), "Demo.java:12:1");
        assert_eq!(SourceInfo::unknown().to_string(), "<unknown>");
        assert!(!SourceInfo::unknown().is_known());
    }

    #[test]
    fn test_merge_covers_both_ranges() {
        let file: Arc<str> = Arc::from("Demo.java");
        let a = SourceInfo::new(file.clone(), Position::new(2, 4), Position::new(2, 9));
        let b = SourceInfo::new(file.clone(), Position::new(1, 1), Position::new(2, 5));
        let merged = a.merge(&b);
        assert_eq!(merged.start, Position::new(1, 1));
        assert_eq!(merged.end, Position::new(2, 9));
        assert_eq!(SourceInfo::unknown().merge(&a), a);
    }
}
