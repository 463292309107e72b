/*!
# Candidates

A candidate is a node that passed its policy's structural checks, together
with everything the later stages need: line extent, indentation, scope,
category, width profile and the ingredients of its rewrite.

The predicates below are shared by the policies. They never fail; missing
optional structure simply makes a node ineligible.
*/

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

use super::geometry::{Layout, Spelling};
use super::Policy;
use crate::ast_core::{NodeId, SyntaxKind, Tree};
use crate::core::position::display_width;

/// Coarse shape class; only equal categories share a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    WhenBranch,
    VariableAssignment,
    ConstantAssignment,
    EndlessDef,
    Routine,
}

/// What a decision rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendering {
    /// Replace `range` with `head`, padding, `tail`.
    Condensed { range: Range<usize>, head: String, tail: String },
    /// Re-space the whitespace `gap` in front of the anchor operator.
    ///
    /// `lead` is the width of the text before the gap, `op_extra` the number of
    /// operator characters before the aligned `=`.
    Padded { gap: Range<usize>, lead: usize, op_extra: usize },
    /// Replace `range` with one of the admissible single-line spellings.
    Linearized { range: Range<usize>, options: Vec<SpellingOption> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellingOption {
    pub spelling: Spelling,
    pub text: String,
    /// Resulting line width.
    pub width: usize,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: NodeId,
    pub policy: Policy,
    /// Enclosing statement list or `case`; groups never cross scopes.
    pub scope: Option<NodeId>,
    pub first_line: usize,
    pub last_line: usize,
    pub indent: usize,
    pub category: Category,
    pub layout: Layout,
    /// Already in final shape; only contributes to the alignment column.
    pub fixed: bool,
    pub rendering: Rendering,
}

impl Candidate {
    /// Common fields derived from the node's position.
    pub fn at(tree: &Tree, node: NodeId, policy: Policy, category: Category, rendering: Rendering) -> Self {
        let first_line = tree.first_line(node);
        Self {
            node,
            policy,
            scope: tree.parent(node),
            first_line,
            last_line: tree.last_line(node),
            indent: tree.line_index().indentation(tree.source(), first_line),
            category,
            layout: Layout { prefix: 0, head: 0, tail: 0, suffix: 0 },
            fixed: false,
            rendering,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }
}

/// Position in a scanned sequence: an eligible candidate or something that
/// breaks a run.
#[derive(Debug, Clone)]
pub enum Slot {
    Candidate(Candidate),
    Barrier,
}

impl From<Option<Candidate>> for Slot {
    fn from(candidate: Option<Candidate>) -> Self {
        candidate.map_or(Slot::Barrier, Slot::Candidate)
    }
}

// ----- joiner -------------------------------------------------------------

/// A line break with the whitespace (and `\` continuation) around it.
static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*\\?[ \t]*(?:\r?\n[ \t]*)+").expect("valid line-break pattern"));

/// Join a multi-line fragment into one line: every line break with its
/// surrounding indentation becomes one space, except right after `(`/`[` and
/// right before `)`/`]` or a leading `.`/`&.` method call.
pub fn join_lines(text: &str) -> String {
    let joined = LINE_BREAK.replace_all(text, |caps: &Captures| {
        let Some(found) = caps.get(0) else { return String::new() };
        let before = text[..found.start()].chars().last();
        let after = &text[found.end()..];
        let tight = matches!(before, None | Some('(') | Some('['))
            || after.is_empty()
            || after.starts_with(')')
            || after.starts_with(']')
            || after.starts_with("&.")
            || (after.starts_with('.') && !after.starts_with(".."));
        if tight { String::new() } else { " ".to_string() }
    });
    joined.trim().to_string()
}

// ----- shared eligibility predicates -------------------------------------

/// Heredoc anywhere in the subtree.
pub fn has_heredoc(tree: &Tree, node: NodeId) -> bool {
    tree.any_descendant(node, |id| tree.kind(id) == SyntaxKind::Heredoc)
}

/// String or symbol literal spanning lines.
pub fn has_multiline_string(tree: &Tree, node: NodeId) -> bool {
    tree.any_descendant(node, |id| {
        matches!(tree.kind(id), SyntaxKind::Str | SyntaxKind::Symbol) && !tree.is_single_line(id)
    })
}

/// Any comment inside `range`.
pub fn has_comment_in(tree: &Tree, range: &Range<usize>) -> bool {
    tree.has_comment_within(range.start, range.end)
}

/// A keyword construct (`if`, `case`, `def`, ...) strictly inside `node` that
/// spans lines; joining its lines would change or break the code.
pub fn has_nested_multiline_compound(tree: &Tree, node: NodeId) -> bool {
    tree.descendants(node)
        .skip(1)
        .any(|id| tree.kind(id).is_keyword_compound() && !tree.is_single_line(id))
}

/// A statement list other than `own_body` holding more than one statement, or
/// a block with `rescue`/`ensure` clauses.
pub fn has_nested_multi_statement_body(tree: &Tree, node: NodeId, own_body: Option<NodeId>) -> bool {
    tree.descendants(node).any(|id| match tree.kind(id) {
        SyntaxKind::Body => Some(id) != own_body && tree.children(id).count() > 1,
        SyntaxKind::Block => tree
            .children(id)
            .any(|c| matches!(tree.kind(c), SyntaxKind::Rescue | SyntaxKind::Ensure | SyntaxKind::Else)),
        _ => false,
    })
}

/// The node starts its line and shares its lines with no other statement of
/// the same list.
pub fn is_sole_statement(tree: &Tree, node: NodeId) -> bool {
    if !tree.starts_line(node) {
        return false;
    }
    let Some(parent) = tree.parent(node) else { return true };
    let (first, last) = (tree.first_line(node), tree.last_line(node));
    tree.children(parent)
        .filter(|sibling| *sibling != node)
        .all(|sibling| tree.last_line(sibling) < first || tree.first_line(sibling) > last)
}

/// Inside a block or lambda body.
pub fn in_block_scope(tree: &Tree, node: NodeId) -> bool {
    tree.ancestors(node)
        .any(|id| matches!(tree.kind(id), SyntaxKind::Block | SyntaxKind::Lambda))
}

/// Width of the untouched text after byte `offset` on its line.
pub fn suffix_width(tree: &Tree, offset: usize) -> usize {
    tree.rest_of_line_width(offset)
}

/// Character column of byte `offset`.
pub fn column_of(tree: &Tree, offset: usize) -> usize {
    tree.line_index().char_column(tree.source(), offset)
}

/// Width of `text` in characters.
pub fn width(text: &str) -> usize {
    display_width(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::Field;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_join_lines() {
        assert_eq!(join_lines("foo(\n  a,\n  b\n)"), "foo(a, b)");
        assert_eq!(join_lines("items\n  .map(&:to_s)\n  &.first"), "items.map(&:to_s)&.first");
        assert_eq!(join_lines("{\n  a: 1\n}"), "{ a: 1 }");
        assert_eq!(join_lines("a +\n    b"), "a + b");
        assert_eq!(join_lines("x \\\n  y"), "x y");
        assert_eq!(join_lines("1..\n  2"), "1.. 2");
    }

    #[test]
    fn test_heredoc_and_strings() {
        let tree = parse("x = <<~A\n  hi\nA\ny = \"a\nb\"\nz = 'c'\n").unwrap();
        let body = tree.child_by_field(tree.root(), Field::Body).unwrap();
        let stmts: Vec<_> = tree.children(body).collect();
        assert!(has_heredoc(&tree, stmts[0]));
        assert!(!has_heredoc(&tree, stmts[1]));
        assert!(has_multiline_string(&tree, stmts[1]));
        assert!(!has_multiline_string(&tree, stmts[2]));
    }

    #[test]
    fn test_sole_statement() {
        let tree = parse("a = 1; b = 2\nc = 3\n").unwrap();
        let body = tree.child_by_field(tree.root(), Field::Body).unwrap();
        let stmts: Vec<_> = tree.children(body).collect();
        assert!(!is_sole_statement(&tree, stmts[0]));
        assert!(!is_sole_statement(&tree, stmts[1]));
        assert!(is_sole_statement(&tree, stmts[2]));
    }

    #[test]
    fn test_nested_constructs() {
        let tree = parse("foo do\n  if x\n    y\n  end\nend\nbar { a; b }\n").unwrap();
        let body = tree.child_by_field(tree.root(), Field::Body).unwrap();
        let stmts: Vec<_> = tree.children(body).collect();
        assert!(has_nested_multiline_compound(&tree, stmts[0]));
        assert!(!has_nested_multiline_compound(&tree, stmts[1]));
        assert!(has_nested_multi_statement_body(&tree, stmts[1], None));
    }

    #[test]
    fn test_block_scope() {
        let tree = parse("foo do\n  a = 1\nend\n").unwrap();
        let assign = tree.descendants(tree.root()).find(|id| tree.kind(*id) == SyntaxKind::Assign).unwrap();
        assert!(in_block_scope(&tree, assign));
    }
}
