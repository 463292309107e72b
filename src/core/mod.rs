/*!
# Core Module

Core functionality shared across the aligner: error types, source positions
and file helpers.
*/

pub mod errors;
pub mod fs_utils;
pub mod position;

pub use errors::{AlignError, AlignResult};
pub use fs_utils::read_source_file;
pub use position::{display_width, LineIndex, PackedSpan, Position};
