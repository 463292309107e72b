/*!
# Error System for Ruby Aligner

Eligibility never fails: a node that does not qualify is skipped. The only
conditions surfaced as errors are structurally invalid configuration (rejected
before any pass runs), unparsable input handed to the convenience entry points,
and edit sets that would violate the one-rewrite invariant.
*/

use std::ops::Range;
use thiserror::Error;

use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("max_line_length must be positive, got {0}")]
    InvalidMaxLineLength(usize),

    #[error("max_passes must be positive, got {0}")]
    InvalidPassLimit(usize),

    #[error("overlapping edits: {first:?} overlaps {second:?}")]
    OverlappingEdits {
        first: Range<usize>,
        second: Range<usize>,
    },

    #[error("edit {range:?} lies outside of a {len}-byte source")]
    EditOutOfBounds { range: Range<usize>, len: usize },

    #[error("edit {0:?} does not fall on a character boundary")]
    EditNotOnCharBoundary(Range<usize>),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type AlignResult<T> = std::result::Result<T, AlignError>;
