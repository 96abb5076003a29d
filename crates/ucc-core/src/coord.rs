//! Source coordinates attached to every AST node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Line/column position of a token in the uC source file.
///
/// Formats as `@ line:column`, the form used by semantic diagnostics and
/// assertion-failure messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub line: u32,
    pub column: u32,
}

impl Coord {
    pub fn new(line: u32, column: u32) -> Self {
        Coord { line, column }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@ {}:{}", self.line, self.column)
    }
}
