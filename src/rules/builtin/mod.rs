/*!
# Builtin Policies

Each policy supplies candidate extraction; the shared geometry decides and
the edit builder rewrites. This module dispatches on the closed [`Policy`] set.
*/

pub mod align_assignments;
pub mod align_endless_defs;
pub mod condense_when;
pub mod endless_method;

use crate::ast_core::Tree;
use crate::rules::candidates::{Candidate, Rendering, Slot};
use crate::rules::geometry::{self, Decision, Member, Spelling};
use crate::rules::Policy;

impl Policy {
    /// Scan `tree`; one slot sequence per scope the policy groups within.
    pub fn extract(self, tree: &Tree) -> Vec<Vec<Slot>> {
        match self {
            Policy::CondenseWhen => condense_when::extract(tree),
            Policy::AlignAssignments => align_assignments::extract(tree),
            Policy::AlignEndlessDefs => align_endless_defs::extract(tree),
            Policy::EndlessMethod => endless_method::extract(tree),
        }
    }

    /// Decisions for one group, member by member.
    pub fn decide(self, group: &[Candidate], max_width: usize) -> Vec<Decision> {
        match self {
            Policy::CondenseWhen => {
                let members: Vec<Member> =
                    group.iter().map(|c| Member { layout: c.layout, fixed: c.fixed }).collect();
                geometry::decide_per_member(&members, max_width)
            }
            Policy::AlignAssignments | Policy::AlignEndlessDefs => {
                let layouts: Vec<_> = group.iter().map(|c| c.layout).collect();
                geometry::decide_whole_group(&layouts, max_width)
            }
            Policy::EndlessMethod => group.iter().map(|c| decide_spelling(c, max_width)).collect(),
        }
    }

    /// Human-readable description of a decision for diagnostics.
    pub fn message(self, decision: Decision) -> String {
        match (self, decision) {
            (Policy::CondenseWhen, Decision::Aligned { column }) => {
                format!("Condense `when` branch onto one line with `then` at column {}", column + 1)
            }
            (Policy::CondenseWhen, _) => "Condense `when` branch onto one line".to_string(),
            (Policy::AlignAssignments, Decision::Aligned { column }) => {
                format!("Align assignment operator with its neighbours at column {}", column + 1)
            }
            (Policy::AlignEndlessDefs, Decision::Aligned { column }) => {
                format!("Align `=` of endless method definition at column {}", column + 1)
            }
            (Policy::EndlessMethod, Decision::Linearized(Spelling::Equals)) => {
                "Use an endless method definition".to_string()
            }
            (Policy::EndlessMethod, Decision::Linearized(Spelling::TrailingClause)) => {
                "Define this one-statement method on a single line".to_string()
            }
            (policy, _) => policy.description().to_string(),
        }
    }
}

fn decide_spelling(candidate: &Candidate, max_width: usize) -> Decision {
    match &candidate.rendering {
        Rendering::Linearized { options, .. } => {
            let widths: Vec<_> = options.iter().map(|o| (o.spelling, o.width)).collect();
            geometry::choose_spelling(&widths, max_width)
        }
        _ => Decision::Unchanged,
    }
}
