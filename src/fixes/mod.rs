/*!
# Edit model

A pass produces one immutable [`EditSet`]: byte ranges into the *original*
source plus replacement text. Edits are sorted once, checked for overlap and
applied in a single rewrite, so offsets computed before the rewrite stay valid.

```rust
use ruby_aligner::fixes::{Edit, EditSet};

let edits = EditSet::new(vec![Edit::insert(1, "  ")]).unwrap();
assert_eq!(edits.apply("a = 1"), "a   = 1");
```
*/

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::core::errors::{AlignError, AlignResult};

/// One rewrite instruction. An insertion has an empty range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Edit {
    pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self { range, replacement: replacement.into() }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(offset..offset, text)
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range, String::new())
    }

    pub fn is_insertion(&self) -> bool {
        self.range.is_empty()
    }

    /// Signed change of the source length.
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - self.range.len() as isize
    }
}

/// Sorted, non-overlapping edits of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSet {
    edits: Vec<Edit>,
}

impl EditSet {
    /// Sort `edits` by position and reject any pair that overlaps.
    ///
    /// Two insertions at the same offset overlap as well: their relative order
    /// would be ambiguous.
    pub fn new(mut edits: Vec<Edit>) -> AlignResult<Self> {
        edits.sort_by(|a, b| (a.range.start, a.range.end).cmp(&(b.range.start, b.range.end)));
        for pair in edits.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            let touching_inserts = first.range.start == second.range.start
                && (first.is_insertion() || second.is_insertion());
            if second.range.start < first.range.end || touching_inserts {
                return Err(AlignError::OverlappingEdits {
                    first: first.range.clone(),
                    second: second.range.clone(),
                });
            }
        }
        Ok(Self { edits })
    }

    /// Like [`EditSet::new`], additionally checking every range against `source`.
    pub fn for_source(edits: Vec<Edit>, source: &str) -> AlignResult<Self> {
        let set = Self::new(edits)?;
        set.validate_against(source)?;
        Ok(set)
    }

    pub fn validate_against(&self, source: &str) -> AlignResult<()> {
        for edit in &self.edits {
            if edit.range.start > edit.range.end || edit.range.end > source.len() {
                return Err(AlignError::EditOutOfBounds { range: edit.range.clone(), len: source.len() });
            }
            if !source.is_char_boundary(edit.range.start) || !source.is_char_boundary(edit.range.end) {
                return Err(AlignError::EditNotOnCharBoundary(edit.range.clone()));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter()
    }

    /// Rewrite `source` in one go. Ranges must have been validated against the
    /// same source.
    pub fn apply(&self, source: &str) -> String {
        let growth: isize = self.edits.iter().map(Edit::delta).sum();
        let mut out = String::with_capacity((source.len() as isize + growth).max(0) as usize);
        let mut cursor = 0usize;
        for edit in &self.edits {
            out.push_str(&source[cursor..edit.range.start]);
            out.push_str(&edit.replacement);
            cursor = edit.range.end;
        }
        out.push_str(&source[cursor..]);
        out
    }
}

impl IntoIterator for EditSet {
    type Item = Edit;
    type IntoIter = std::vec::IntoIter<Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apply_uses_original_offsets() {
        let source = "a = 1\nbbb = 2\n";
        let edits = EditSet::new(vec![
            Edit::replace(6..9, "cc"),
            Edit::insert(1, "  "),
        ])
        .unwrap();
        assert_eq!(edits.apply(source), "a   = 1\ncc = 2\n");
    }

    #[test]
    fn test_overlap_rejected() {
        let err = EditSet::new(vec![Edit::replace(0..4, "x"), Edit::replace(2..6, "y")]).unwrap_err();
        assert!(matches!(err, AlignError::OverlappingEdits { .. }));
    }

    #[test]
    fn test_adjacent_edits_allowed() {
        let edits = EditSet::new(vec![Edit::replace(0..2, "x"), Edit::replace(2..4, "y")]).unwrap();
        assert_eq!(edits.apply("abcd"), "xy");
    }

    #[test]
    fn test_same_offset_insertions_rejected() {
        assert!(EditSet::new(vec![Edit::insert(3, " "), Edit::insert(3, " ")]).is_err());
    }

    #[test]
    fn test_out_of_bounds() {
        let err = EditSet::for_source(vec![Edit::delete(2..10)], "abc").unwrap_err();
        assert!(matches!(err, AlignError::EditOutOfBounds { len: 3, .. }));
    }

    #[test]
    fn test_char_boundary() {
        let err = EditSet::for_source(vec![Edit::insert(1, " ")], "é").unwrap_err();
        assert!(matches!(err, AlignError::EditNotOnCharBoundary(_)));
    }
}
