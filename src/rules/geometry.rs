//! Alignment geometry under the line-length budget.
//!
//! Columns are character counts relative to the start of the rendered text
//! (the indentation of the member's line for every policy that aligns).

use serde::{Deserialize, Serialize};

/// Width profile of one member's anchor line after rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Characters before the rendered text on the anchor line.
    pub prefix: usize,
    /// Anchor column inside the rendering.
    pub head: usize,
    /// Characters from the anchor to the end of the rendering on that line.
    pub tail: usize,
    /// Untouched characters after the rewritten range on that line.
    pub suffix: usize,
}

impl Layout {
    /// Line width with the anchor padded out to `column`.
    pub fn width_at(&self, column: usize) -> usize {
        self.prefix + column.max(self.head) + self.tail + self.suffix
    }

    /// Line width without padding.
    pub fn natural_width(&self) -> usize {
        self.width_at(self.head)
    }
}

/// How a linearized definition is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spelling {
    /// `def name(args) = body`
    Equals,
    /// `def name(args); body; end`
    TrailingClause,
}

/// Rendering chosen for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Unchanged,
    /// Single line, no padding.
    Unaligned,
    /// Single line (or re-spaced) with the anchor at `column`.
    Aligned { column: usize },
    Linearized(Spelling),
}

/// One group member as seen by the calculator.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub layout: Layout,
    /// Already in final shape: contributes to the column, never rewritten.
    pub fixed: bool,
}

/// Shared column of a group: the widest anchor.
pub fn target_column<'a>(layouts: impl IntoIterator<Item = &'a Layout>) -> usize {
    layouts.into_iter().map(|layout| layout.head).max().unwrap_or(0)
}

/// Per-member degradation.
///
/// Members whose unpadded form overflows stay as they are. The rest are padded
/// to the shared column when every one of them still fits, otherwise none is.
pub fn decide_per_member(members: &[Member], max_width: usize) -> Vec<Decision> {
    let fits: Vec<bool> = members
        .iter()
        .map(|member| member.fixed || member.layout.natural_width() <= max_width)
        .collect();
    let column = target_column(members.iter().zip(&fits).filter(|(_, fit)| **fit).map(|(m, _)| &m.layout));
    let aligned_fits = members
        .iter()
        .zip(&fits)
        .filter(|(member, fit)| **fit && !member.fixed)
        .all(|(member, _)| member.layout.width_at(column) <= max_width);

    members
        .iter()
        .zip(&fits)
        .map(|(member, fit)| match (member.fixed, *fit) {
            (true, _) | (false, false) => Decision::Unchanged,
            (false, true) if aligned_fits => Decision::Aligned { column },
            (false, true) => Decision::Unaligned,
        })
        .collect()
}

/// Whole-group degradation: everyone aligns or nobody moves.
pub fn decide_whole_group(layouts: &[Layout], max_width: usize) -> Vec<Decision> {
    let column = target_column(layouts);
    let decision = if layouts.iter().all(|layout| layout.width_at(column) <= max_width) {
        Decision::Aligned { column }
    } else {
        Decision::Unchanged
    };
    vec![decision; layouts.len()]
}

/// Pick the shortest admissible spelling; nothing if even that overflows.
///
/// `options` holds (spelling, resulting line width); ties keep the first.
pub fn choose_spelling(options: &[(Spelling, usize)], max_width: usize) -> Decision {
    let best = options.iter().fold(None::<(Spelling, usize)>, |best, &(spelling, width)| match best {
        Some((_, best_width)) if best_width <= width => best,
        _ => Some((spelling, width)),
    });
    match best {
        Some((spelling, width)) if width <= max_width => Decision::Linearized(spelling),
        _ => Decision::Unchanged,
    }
}
