//! `Layout/CondenseWhen`: put each `when` branch on one line and align `then`.
//!
//! ```ruby
//! case x
//! when 1 then one      # before:  when 1
//! when 22 then two     #            one
//! end
//! ```

use crate::ast_core::{Field, NodeId, SyntaxKind, Tree};
use crate::rules::candidates::{
    column_of, has_comment_in, has_heredoc, has_multiline_string, has_nested_multi_statement_body,
    has_nested_multiline_compound, join_lines, suffix_width, width, Candidate, Category, Rendering, Slot,
};
use crate::rules::geometry::Layout;
use crate::rules::Policy;

/// One slot sequence per `case`, in branch order.
pub fn extract(tree: &Tree) -> Vec<Vec<Slot>> {
    tree.descendants(tree.root())
        .filter(|id| tree.kind(*id) == SyntaxKind::Case)
        .map(|case| {
            tree.children_by_field(case, Field::Branch)
                .into_iter()
                .map(|branch| Slot::from(candidate(tree, branch)))
                .collect()
        })
        .collect()
}

fn candidate(tree: &Tree, branch: NodeId) -> Option<Candidate> {
    let values = tree.children_by_field(branch, Field::Value);
    let first = *values.first()?;
    let last = *values.last()?;
    let body = tree.child_by_field(branch, Field::Body)?;
    if tree.children(body).count() != 1 || !tree.starts_line(branch) {
        return None;
    }

    let values_span = tree.span(first).cover(tree.span(last));
    if tree.line_index().line_of(values_span.start) != tree.first_line(branch) {
        return None;
    }
    let values_text = tree.slice(values_span);
    if values_text.contains('\n') {
        return None;
    }

    let head = format!("when {} ", values_text);
    let range = tree.span(branch).range();
    let prefix = column_of(tree, range.start);

    if tree.is_single_line(branch) {
        // anchor where `then` (or the body) already sits
        let anchor = tree.node(branch).token.map_or(tree.span(body).start, |then| then.start);
        let head_column = column_of(tree, anchor as usize).saturating_sub(prefix);
        let layout = Layout { prefix, head: head_column, tail: 0, suffix: 0 };
        let rendering = Rendering::Condensed { range, head, tail: String::new() };
        return Some(
            Candidate::at(tree, branch, Policy::CondenseWhen, Category::WhenBranch, rendering)
                .with_layout(layout)
                .fixed(true),
        );
    }

    if has_heredoc(tree, branch)
        || has_multiline_string(tree, body)
        || has_comment_in(tree, &range)
        || has_nested_multiline_compound(tree, body)
        || has_nested_multi_statement_body(tree, body, Some(body))
    {
        return None;
    }

    let tail = format!("then {}", join_lines(tree.text(body)));
    let layout = Layout { prefix, head: width(&head), tail: width(&tail), suffix: suffix_width(tree, range.end) };
    let rendering = Rendering::Condensed { range, head, tail };
    Some(Candidate::at(tree, branch, Policy::CondenseWhen, Category::WhenBranch, rendering).with_layout(layout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn candidates(source: &str) -> Vec<Option<Candidate>> {
        let tree = parse(source).unwrap();
        extract(&tree)
            .into_iter()
            .flatten()
            .map(|slot| match slot {
                Slot::Candidate(c) => Some(c),
                Slot::Barrier => None,
            })
            .collect()
    }

    #[test]
    fn test_rendering() {
        let found = candidates("case x\nwhen 1, 2\n  foo(\n    a\n  )\nwhen 3 then bar\nend\n");
        let first = found[0].as_ref().unwrap();
        match &first.rendering {
            Rendering::Condensed { head, tail, .. } => {
                assert_eq!(head, "when 1, 2 ");
                assert_eq!(tail, "then foo(a)");
            }
            other => panic!("unexpected rendering {other:?}"),
        }
        assert!(!first.fixed);
        let second = found[1].as_ref().unwrap();
        assert!(second.fixed);
        assert_eq!(second.layout.head, 7);
    }

    #[test]
    fn test_ineligible_branches() {
        let found = candidates(concat!(
            "case x\n",
            "when 1\n  a\n  b\n",            // two statements
            "when 2 # why\n  c\n",           // comment
            "when 3\n  <<~T\n    t\n  T\n",  // heredoc
            "when 4\n  if y\n    d\n  end\n", // nested conditional
            "end\n",
        ));
        assert_eq!(found.len(), 4);
        assert!(found.iter().all(Option::is_none));

        let found = candidates(concat!(
            "case x\n",
            "when 5,\n  6\n  e\n",          // values over two lines
            "when 7\n  \"f\ng\"\n",          // multi-line string
            "end\n",
        ));
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(Option::is_none));
    }

    #[test]
    fn test_single_line_branch_keeps_its_then_column() {
        let found = candidates("case x\nwhen 1   then a\nwhen 22\n  b\nend\n");
        let single = found[0].as_ref().unwrap();
        assert!(single.fixed);
        assert_eq!(single.layout.head, 9);
        assert_eq!(found[1].as_ref().unwrap().layout.head, 8);
    }
}
