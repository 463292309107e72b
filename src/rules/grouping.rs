//! Contiguity grouping.
//!
//! A linear scan with two states. Consecutive candidates stay in one run while
//! each starts on the line right after the previous one ends, with the same
//! indentation, scope and category. A barrier, a blank line or a comment line
//! closes the run. Runs shorter than two are dropped.

use super::candidates::{Candidate, Slot};

enum State {
    Between,
    Inside(Vec<Candidate>),
}

fn continues(prev: &Candidate, next: &Candidate) -> bool {
    next.first_line == prev.last_line + 1
        && next.indent == prev.indent
        && next.scope == prev.scope
        && next.category == prev.category
}

fn close(run: Vec<Candidate>, groups: &mut Vec<Vec<Candidate>>) {
    if run.len() >= 2 {
        groups.push(run);
    }
}

/// Partition an ordered slot sequence into maximal alignable runs.
pub fn group(slots: impl IntoIterator<Item = Slot>) -> Vec<Vec<Candidate>> {
    let mut groups = Vec::new();
    let mut state = State::Between;

    for slot in slots {
        state = match (state, slot) {
            (State::Between, Slot::Barrier) => State::Between,
            (State::Inside(run), Slot::Barrier) => {
                close(run, &mut groups);
                State::Between
            }
            (State::Between, Slot::Candidate(candidate)) => State::Inside(vec![candidate]),
            (State::Inside(mut run), Slot::Candidate(candidate)) => {
                let joins = run.last().is_some_and(|last| continues(last, &candidate));
                if joins {
                    run.push(candidate);
                    State::Inside(run)
                } else {
                    close(run, &mut groups);
                    State::Inside(vec![candidate])
                }
            }
        };
    }
    if let State::Inside(run) = state {
        close(run, &mut groups);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::NodeId;
    use crate::rules::candidates::{Category, Rendering};
    use crate::rules::geometry::Layout;
    use crate::rules::Policy;

    fn candidate(first_line: usize, last_line: usize, indent: usize) -> Slot {
        Slot::Candidate(Candidate {
            node: NodeId(first_line as u32),
            policy: Policy::AlignAssignments,
            scope: Some(NodeId(0)),
            first_line,
            last_line,
            indent,
            category: Category::VariableAssignment,
            layout: Layout { prefix: indent, head: 2, tail: 3, suffix: 0 },
            fixed: false,
            rendering: Rendering::Padded { gap: 0..0, lead: 1, op_extra: 0 },
        })
    }

    fn lines(groups: &[Vec<Candidate>]) -> Vec<Vec<usize>> {
        groups.iter().map(|g| g.iter().map(|c| c.first_line).collect()).collect()
    }

    #[test]
    fn test_adjacent_lines_group() {
        let groups = group(vec![candidate(0, 0, 0), candidate(1, 2, 0), candidate(3, 3, 0)]);
        assert_eq!(lines(&groups), vec![vec![0, 1, 3]]);
    }

    #[test]
    fn test_blank_line_splits() {
        let groups = group(vec![candidate(0, 0, 0), candidate(1, 1, 0), candidate(3, 3, 0)]);
        assert_eq!(lines(&groups), vec![vec![0, 1]]);
    }

    #[test]
    fn test_barrier_and_indent_split() {
        let groups = group(vec![
            candidate(0, 0, 0),
            candidate(1, 1, 0),
            Slot::Barrier,
            candidate(3, 3, 0),
            candidate(4, 4, 2),
            candidate(5, 5, 2),
        ]);
        assert_eq!(lines(&groups), vec![vec![0, 1], vec![4, 5]]);
    }

    #[test]
    fn test_category_splits() {
        let mut constant = candidate(1, 1, 0);
        if let Slot::Candidate(c) = &mut constant {
            c.category = Category::ConstantAssignment;
        }
        let groups = group(vec![candidate(0, 0, 0), constant, candidate(2, 2, 0)]);
        assert!(groups.is_empty());
    }
}
