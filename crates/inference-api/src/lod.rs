//! Level-of-detail (LoD) offsets
//!
//! A LoD is a stack of offset lists describing ragged sequences over the
//! rows of a flat tensor. Level `i` partitions the sequences of level
//! `i + 1`; the last level partitions the tensor rows.
//!
//! ```text
//! lod = [[0, 2, 3], [0, 1, 4, 6]]
//!        2 paragraphs -> 3 sentences -> 6 rows
//! ```

use crate::PredictorError;

/// Nested offset lists, outermost level first
pub type Lod = Vec<Vec<usize>>;

/// Check `lod` against the convention for a tensor with `rows` rows
pub fn validate(lod: &[Vec<usize>], rows: usize) -> Result<(), PredictorError> {
    for (depth, level) in lod.iter().enumerate() {
        match level.first() {
            None => {
                return Err(PredictorError::InvalidLod(format!("level {} is empty", depth)));
            }
            Some(&first) if first != 0 => {
                return Err(PredictorError::InvalidLod(format!(
                    "level {} starts at {}, expected 0",
                    depth, first
                )));
            }
            Some(_) => {}
        }
        if let Some(pos) = level.windows(2).position(|w| w[1] < w[0]) {
            return Err(PredictorError::InvalidLod(format!(
                "level {} decreases at offset {}",
                depth,
                pos + 1
            )));
        }
    }

    for (depth, pair) in lod.windows(2).enumerate() {
        let last = pair[0].last().copied().unwrap_or(0);
        let below = pair[1].len() - 1;
        if last != below {
            return Err(PredictorError::InvalidLod(format!(
                "level {} ends at {} but level {} holds {} sequences",
                depth,
                last,
                depth + 1,
                below
            )));
        }
    }

    if let Some(covered) = row_count(lod) {
        if covered != rows {
            return Err(PredictorError::InvalidLod(format!(
                "last level covers {} rows, tensor has {}",
                covered, rows
            )));
        }
    }

    Ok(())
}

/// Rows covered by the innermost level
pub fn row_count(lod: &[Vec<usize>]) -> Option<usize> {
    lod.last().and_then(|level| level.last().copied())
}

/// Number of top-level sequences
pub fn sequence_count(lod: &[Vec<usize>]) -> Option<usize> {
    lod.first().map(|level| level.len().saturating_sub(1))
}

/// Per-sequence lengths of one level
pub fn sequence_lengths(level: &[usize]) -> Vec<usize> {
    level.windows(2).map(|w| w[1].saturating_sub(w[0])).collect()
}

/// Build an offset level from sequence lengths
pub fn offsets_from_lengths(lengths: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(lengths.len() + 1);
    offsets.push(0);
    let mut acc = 0;
    for len in lengths {
        acc += len;
        offsets.push(acc);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_level_lod() {
        let lod = vec![vec![0, 2, 3], vec![0, 1, 4, 6]];
        assert!(validate(&lod, 6).is_ok());
        assert_eq!(sequence_count(&lod), Some(2));
        assert_eq!(row_count(&lod), Some(6));
        assert_eq!(sequence_lengths(&lod[1]), vec![1, 3, 2]);
    }

    #[test]
    fn test_rejects_bad_levels() {
        assert!(validate(&[vec![]], 0).is_err());
        assert!(validate(&[vec![1, 3]], 3).is_err());
        assert!(validate(&[vec![0, 3, 2]], 2).is_err());
        assert!(validate(&[vec![0, 2, 4]], 5).is_err());
        // outer level claims 3 sequences, inner has 2
        assert!(validate(&[vec![0, 3], vec![0, 1, 2]], 2).is_err());
    }

    #[test]
    fn test_empty_lod_is_valid() {
        assert!(validate(&[], 10).is_ok());
        assert_eq!(row_count(&[]), None);
    }

    proptest! {
        #[test]
        fn offsets_from_lengths_validate(lengths in proptest::collection::vec(0usize..16, 0..32)) {
            let level = offsets_from_lengths(&lengths);
            let rows: usize = lengths.iter().sum();
            prop_assert!(validate(&[level.clone()], rows).is_ok());
            prop_assert_eq!(sequence_lengths(&level), lengths);
        }
    }
}
