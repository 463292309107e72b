// Диагностика: одна запись на каждое нетривиальное решение прохода
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast_core::{NodeId, Tree};
use crate::fixes::Edit;

/// Stable rule codes carried by diagnostics.
pub mod codes {
    pub const CONDENSE_WHEN: &str = "Layout/CondenseWhen";
    pub const ALIGN_ASSIGNMENTS: &str = "Layout/AlignAssignments";
    pub const ALIGN_ENDLESS_DEFS: &str = "Layout/AlignEndlessDefs";
    pub const ENDLESS_METHOD: &str = "Style/EndlessMethod";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
    Hint,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
            DiagnosticLevel::Info => write!(f, "info"),
            DiagnosticLevel::Hint => write!(f, "hint"),
        }
    }
}

/// Node location: 1-based line/column for humans, byte offset/length for tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl Location {
    pub fn of_node(tree: &Tree, node: NodeId) -> Self {
        let span = tree.span(node);
        let line = tree.first_line(node);
        Self {
            line: line + 1,
            column: tree.start_column(node) + 1,
            offset: span.start as usize,
            length: span.len as usize,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: String,
    pub message: String,
    pub location: Location,
    /// Edit realizing the decision; `None` when it was dropped from the set.
    pub edit: Option<Edit>,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, code: &str, message: String, location: Location) -> Self {
        Self { level, code: code.to_string(), message, location, edit: None }
    }

    pub fn with_edit(mut self, edit: Edit) -> Self {
        self.edit = Some(edit);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {} [{}]", self.location, self.level, self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_location_is_one_based() {
        let tree = parse("x = 1\n  yy = 2\n").unwrap();
        let body = tree.children(tree.root()).next().unwrap();
        let second = tree.children(body).nth(1).unwrap();
        let location = Location::of_node(&tree, second);
        assert_eq!((location.line, location.column), (2, 3));
        assert_eq!(location.offset, 8);
        assert_eq!(location.length, 6);
    }

    #[test]
    fn test_display() {
        let location = Location { line: 3, column: 1, offset: 10, length: 4 };
        let diagnostic =
            Diagnostic::new(DiagnosticLevel::Info, codes::ALIGN_ASSIGNMENTS, "Align `=`".to_string(), location);
        assert_eq!(diagnostic.to_string(), "3:1: info: Align `=` [Layout/AlignAssignments]");
        assert!(diagnostic.edit.is_none());
    }
}
