//! `Layout/AlignEndlessDefs`: line up the `=` of consecutive one-line
//! endless definitions.

use crate::ast_core::{Field, NodeId, SyntaxKind, Tree};
use crate::rules::candidates::{column_of, is_sole_statement, width, Candidate, Category, Rendering, Slot};
use crate::rules::geometry::Layout;
use crate::rules::Policy;

pub fn extract(tree: &Tree) -> Vec<Vec<Slot>> {
    tree.descendants(tree.root())
        .filter(|id| tree.kind(*id) == SyntaxKind::Body)
        .map(|body| tree.children(body).map(|stmt| Slot::from(candidate(tree, stmt))).collect())
        .collect()
}

/// End of the `def ... name(params)` header.
pub(crate) fn header_end(tree: &Tree, def: NodeId) -> Option<usize> {
    let end = match tree.child_by_field(def, Field::Params) {
        Some(params) => tree.span(params).end(),
        None => tree.span(tree.child_by_field(def, Field::Name)?).end(),
    };
    Some(end as usize)
}

fn candidate(tree: &Tree, node: NodeId) -> Option<Candidate> {
    if tree.kind(node) != SyntaxKind::Def || !tree.is_single_line(node) || !is_sole_statement(tree, node) {
        return None;
    }
    let eq = tree.node(node).token?;
    let start = tree.span(node).start as usize;
    let gap = header_end(tree, node)?..eq.start as usize;
    if gap.start > gap.end || !tree.source()[gap.clone()].chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }

    let lead = width(&tree.source()[start..gap.start]);
    let layout = Layout {
        prefix: column_of(tree, start),
        head: lead + 1,
        tail: tree.rest_of_line_width(eq.start as usize),
        suffix: 0,
    };
    let rendering = Rendering::Padded { gap, lead, op_extra: 0 };
    Some(Candidate::at(tree, node, Policy::AlignEndlessDefs, Category::EndlessDef, rendering).with_layout(layout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_only_single_line_endless_defs() {
        let tree = parse("def a = 1\ndef bcd(x) = x\ndef e\n  1\nend\ndef f =\n  2\n").unwrap();
        let program_body = extract(&tree).into_iter().next().unwrap();
        let heads: Vec<_> = program_body
            .into_iter()
            .map(|slot| match slot {
                Slot::Candidate(c) => Some(c.layout.head),
                Slot::Barrier => None,
            })
            .collect();
        // "def a" -> 6, "def bcd(x)" -> 11
        assert_eq!(heads, vec![Some(6), Some(11), None, None]);
    }
}
