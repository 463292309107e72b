//! Decisions to edits.
//!
//! Every edit stays inside the span of the node it was decided for. Padding
//! changes only the whitespace in front of the anchor; condensing and
//! linearizing replace the node's range.

use std::cmp::Ordering;

use super::candidates::{width, Candidate, Rendering};
use super::geometry::Decision;
use crate::fixes::Edit;

/// The edit realizing `decision`, or `None` when the source already matches.
pub fn build(candidate: &Candidate, decision: Decision, source: &str) -> Option<Edit> {
    if candidate.fixed || decision == Decision::Unchanged {
        return None;
    }
    let edit = match (&candidate.rendering, decision) {
        (Rendering::Condensed { range, head, tail }, Decision::Unaligned) => {
            Edit::replace(range.clone(), format!("{head}{tail}"))
        }
        (Rendering::Condensed { range, head, tail }, Decision::Aligned { column }) => {
            let pad = column.saturating_sub(width(head));
            Edit::replace(range.clone(), format!("{head}{}{tail}", " ".repeat(pad)))
        }
        (Rendering::Padded { gap, lead, op_extra }, Decision::Aligned { column }) => {
            let wanted = column.saturating_sub(lead + op_extra).max(1);
            let current = gap.len();
            match wanted.cmp(&current) {
                Ordering::Greater => Edit::insert(gap.end, " ".repeat(wanted - current)),
                Ordering::Less => Edit::delete(gap.end - (current - wanted)..gap.end),
                Ordering::Equal => return None,
            }
        }
        (Rendering::Linearized { range, options }, Decision::Linearized(spelling)) => {
            let option = options.iter().find(|o| o.spelling == spelling)?;
            Edit::replace(range.clone(), option.text.clone())
        }
        _ => return None,
    };
    if source.get(edit.range.clone()) == Some(edit.replacement.as_str()) {
        return None;
    }
    Some(edit)
}
