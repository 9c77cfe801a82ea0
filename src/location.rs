//! Source location utilities.

use saphyr_parser::Span as ParserSpan;
use serde::{Deserialize, Serialize};

/// Row/column location within the source YAML document (1-indexed, character-based).
///
/// Nodes composed from text carry the location of their first character. Nodes
/// built programmatically carry [`Location::UNKNOWN`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Location {
    /// 1-indexed line number in the input stream.
    pub(crate) line: u32,
    /// 1-indexed column number in the input stream.
    pub(crate) column: u32,
}

impl Location {
    /// Sentinel value meaning "location unknown".
    pub const UNKNOWN: Self = Self { line: 0, column: 0 };

    /// Create a new location record from 1-indexed coordinates.
    pub const fn new(line: usize, column: usize) -> Self {
        // 4 G lines is larger than any YAML document we can imagine, and this is
        // used for error reporting only.
        Self {
            line: line as u32,
            column: column as u32,
        }
    }

    /// 1-indexed line number (0 if unknown).
    pub fn line(&self) -> u64 {
        self.line as u64
    }

    /// 1-indexed column number (0 if unknown).
    pub fn column(&self) -> u64 {
        self.column as u64
    }

    /// True unless this is [`Location::UNKNOWN`].
    pub fn is_known(&self) -> bool {
        self != &Self::UNKNOWN
    }
}

/// Convert a `saphyr_parser::Span` to a 1-indexed [`Location`].
///
/// Called by:
/// - The composer for each raw parser event.
pub(crate) fn location_from_span(span: &ParserSpan) -> Location {
    let start = &span.start;
    Location::new(start.line(), start.col() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_is_not_known() {
        assert!(!Location::UNKNOWN.is_known());
        assert!(Location::new(1, 1).is_known());
        assert_eq!(Location::default(), Location::UNKNOWN);
    }

    #[test]
    fn accessors_widen() {
        let loc = Location::new(12, 7);
        assert_eq!(loc.line(), 12);
        assert_eq!(loc.column(), 7);
    }
}
