//! `Style/EndlessMethod`: write a one-statement method on a single line.
//!
//! Two spellings exist. `def name(args) = body` is preferred; the statement
//! form `def name(args); body; end` is the only one allowed when the body is
//! a modifier conditional that calls another method, and for bodies that are
//! not expressions (`a and b`, `x while y`, multiple assignment).

use crate::ast_core::{Field, NodeId, SyntaxKind, Tree};
use crate::rules::candidates::{
    column_of, has_comment_in, has_heredoc, has_multiline_string, has_nested_multi_statement_body,
    has_nested_multiline_compound, join_lines, suffix_width, width, Candidate, Category, Rendering, Slot,
    SpellingOption,
};
use crate::rules::geometry::Spelling;
use crate::rules::Policy;

use super::align_endless_defs::header_end;

/// All definitions in document order, as one sequence.
pub fn extract(tree: &Tree) -> Vec<Vec<Slot>> {
    let slots = tree
        .descendants(tree.root())
        .filter(|id| tree.kind(*id) == SyntaxKind::Def)
        .map(|def| Slot::from(candidate(tree, def)))
        .collect();
    vec![slots]
}

/// `name=` style writers cannot take the `=` spelling.
pub fn is_setter_name(name: &str) -> bool {
    name.ends_with('=') && !matches!(name, "==" | "===" | "!=" | "<=" | ">=")
}

/// Modifier conditional whose condition or action calls something.
fn has_call_hazard(tree: &Tree, stmt: NodeId) -> bool {
    matches!(tree.kind(stmt), SyntaxKind::ModifierIf | SyntaxKind::ModifierUnless)
        && tree.descendants(stmt).skip(1).any(|id| is_call_like(tree, id))
}

/// A call node, or a bare `name?`/`name!` which can only be a method call.
fn is_call_like(tree: &Tree, id: NodeId) -> bool {
    match tree.kind(id) {
        SyntaxKind::Call => true,
        SyntaxKind::Identifier => tree.text(id).ends_with(['?', '!']),
        _ => false,
    }
}

/// Bodies that only parse as statements, not as the expression after `=`.
fn is_statement_only(tree: &Tree, stmt: NodeId) -> bool {
    match tree.kind(stmt) {
        SyntaxKind::ModifierWhile
        | SyntaxKind::ModifierUntil
        | SyntaxKind::ModifierRescue
        | SyntaxKind::MultiAssign => true,
        SyntaxKind::Binary | SyntaxKind::Unary => tree
            .node(stmt)
            .token
            .is_some_and(|op| matches!(tree.slice(op), "and" | "or" | "not")),
        _ => false,
    }
}

fn candidate(tree: &Tree, def: NodeId) -> Option<Candidate> {
    if tree.node(def).token.is_some() || tree.is_single_line(def) {
        return None;
    }
    let name = tree.child_by_field(def, Field::Name)?;
    if is_setter_name(tree.text(name)) {
        return None;
    }
    let has_clauses = tree
        .children(def)
        .any(|c| matches!(tree.kind(c), SyntaxKind::Rescue | SyntaxKind::Else | SyntaxKind::Ensure));
    if has_clauses {
        return None;
    }
    let params = tree.child_by_field(def, Field::Params);
    if params.is_some_and(|p| tree.node(p).token.is_none()) {
        return None;
    }

    let body = tree.child_by_field(def, Field::Body)?;
    let mut statements = tree.children(body);
    let stmt = statements.next()?;
    if statements.next().is_some() || tree.kind(stmt) == SyntaxKind::Return {
        return None;
    }

    let range = tree.span(def).range();
    let header = &tree.source()[range.start..header_end(tree, def)?];
    if header.contains('\n')
        || has_heredoc(tree, def)
        || has_multiline_string(tree, def)
        || has_comment_in(tree, &range)
        || has_nested_multiline_compound(tree, def)
        || has_nested_multi_statement_body(tree, def, Some(body))
    {
        return None;
    }

    let body_text = join_lines(tree.text(stmt));
    let outside = column_of(tree, range.start) + suffix_width(tree, range.end);
    let mut options = Vec::with_capacity(2);
    if !has_call_hazard(tree, stmt) && !is_statement_only(tree, stmt) {
        let text = format!("{header} = {body_text}");
        options.push(SpellingOption { spelling: Spelling::Equals, width: outside + width(&text), text });
    }
    let marker = if params.is_some() { "" } else { "()" };
    let text = format!("{header}{marker}; {body_text}; end");
    options.push(SpellingOption { spelling: Spelling::TrailingClause, width: outside + width(&text), text });

    let rendering = Rendering::Linearized { range, options };
    Some(Candidate::at(tree, def, Policy::EndlessMethod, Category::Routine, rendering))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn options(source: &str) -> Option<Vec<(Spelling, String)>> {
        let tree = parse(source).unwrap();
        let slot = extract(&tree).into_iter().flatten().next()?;
        match slot {
            Slot::Candidate(Candidate { rendering: Rendering::Linearized { options, .. }, .. }) => {
                Some(options.into_iter().map(|o| (o.spelling, o.text)).collect())
            }
            _ => None,
        }
    }

    #[test]
    fn test_literal_condition_allows_equals() {
        let found = options("def some_method\n  number if true\nend\n").unwrap();
        assert_eq!(found[0], (Spelling::Equals, "def some_method = number if true".to_string()));
        assert_eq!(found[1], (Spelling::TrailingClause, "def some_method(); number if true; end".to_string()));
    }

    #[test]
    fn test_call_in_condition_forces_trailing_clause() {
        let found = options("def some_method\n  maybe_call if call_guard()\nend\n").unwrap();
        assert_eq!(
            found,
            vec![(Spelling::TrailingClause, "def some_method(); maybe_call if call_guard(); end".to_string())]
        );
    }

    #[test]
    fn test_predicate_name_counts_as_call() {
        let found = options("def ccc\n  go if ready?\nend\n").unwrap();
        assert_eq!(found, vec![(Spelling::TrailingClause, "def ccc(); go if ready?; end".to_string())]);

        let found = options("def ccc\n  go! unless done\nend\n").unwrap();
        assert_eq!(found[0].0, Spelling::TrailingClause);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_params_are_kept() {
        let found = options("def add(a, b)\n  a +\n    b\nend\n").unwrap();
        assert_eq!(found[0].1, "def add(a, b) = a + b");
        assert_eq!(found[1].1, "def add(a, b); a + b; end");
    }

    #[test]
    fn test_ineligible_definitions() {
        assert!(options("def a\n  1\n  2\nend\n").is_none());
        assert!(options("def a\n  1\nrescue\n  2\nend\n").is_none());
        assert!(options("def a=(v)\n  @a = v\nend\n").is_none());
        assert!(options("def a\n  return 1\nend\n").is_none());
        assert!(options("def a b\n  b\nend\n").is_none());
        assert!(options("def a\n  # note\n  1\nend\n").is_none());
        assert!(options("def a\nend\n").is_none());
        assert!(options("def a\n  \"x\ny\"\nend\n").is_none());
    }

    #[test]
    fn test_setter_names() {
        assert!(is_setter_name("value="));
        assert!(is_setter_name("[]="));
        assert!(!is_setter_name("=="));
        assert!(!is_setter_name("<="));
        assert!(!is_setter_name("call"));
    }
}
