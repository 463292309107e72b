//! `Layout/AlignAssignments`: line up the operators of consecutive assignments.
//!
//! The aligned token is the final `=` of the operator, so `=` and `||=` share
//! a column. Constant and variable assignments never align with each other.

use crate::ast_core::{Field, NodeId, SyntaxKind, Tree};
use crate::rules::candidates::{
    column_of, in_block_scope, is_sole_statement, width, Candidate, Category, Rendering, Slot,
};
use crate::rules::geometry::Layout;
use crate::rules::Policy;

/// One slot sequence per statement list.
pub fn extract(tree: &Tree) -> Vec<Vec<Slot>> {
    tree.descendants(tree.root())
        .filter(|id| tree.kind(*id) == SyntaxKind::Body)
        .map(|body| tree.children(body).map(|stmt| Slot::from(candidate(tree, stmt))).collect())
        .collect()
}

fn candidate(tree: &Tree, node: NodeId) -> Option<Candidate> {
    if !matches!(tree.kind(node), SyntaxKind::Assign | SyntaxKind::OpAssign) {
        return None;
    }
    let target = tree.child_by_field(node, Field::Target)?;
    tree.child_by_field(node, Field::Value)?;
    let category = match tree.kind(target) {
        SyntaxKind::Constant | SyntaxKind::ScopedConstant => Category::ConstantAssignment,
        // attribute writer `obj.attr = v`
        SyntaxKind::Call => Category::VariableAssignment,
        kind if kind.is_variable() => Category::VariableAssignment,
        _ => return None,
    };
    if in_block_scope(tree, node) || !is_sole_statement(tree, node) {
        return None;
    }

    let op = tree.node(node).token?;
    let line = tree.first_line(node);
    if !tree.is_single_line(target) || tree.line_index().line_of(op.start) != line {
        return None;
    }
    let gap = tree.span(target).end() as usize..op.start as usize;
    if !tree.source()[gap.clone()].chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }

    let lead = width(tree.text(target));
    let op_extra = width(tree.slice(op)).saturating_sub(1);
    let anchor = op.end() as usize - 1;
    let layout = Layout {
        prefix: column_of(tree, tree.span(node).start as usize),
        head: lead + 1 + op_extra,
        tail: tree.rest_of_line_width(anchor),
        suffix: 0,
    };
    let rendering = Rendering::Padded { gap, lead, op_extra };
    Some(Candidate::at(tree, node, Policy::AlignAssignments, category, rendering).with_layout(layout))
}
