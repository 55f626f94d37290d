//! Folding per-chunk partial aggregates into one result

use std::collections::HashMap;

use log::error;
use thiserror::Error;

use crate::column::ColumnType;
use crate::error::{Error as CrateError, Result};
use crate::groupby::{GroupKey, GroupPartial};

/// Two partials for the same group and column disagree on the column type
///
/// Only reachable through a bug in chunk slicing or the kernel; callers see
/// it as a task failure of the chunk that produced the partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("partial aggregate type mismatch: expected {expected}, found {found}")]
pub struct MergeInvariantViolation {
    pub expected: ColumnType,
    pub found: ColumnType,
}

/// Running map from group key to merged partials
///
/// Groups are kept in order of first appearance. Folding chunk results in
/// chunk order therefore yields the same group order as a sequential scan.
#[derive(Debug, Default)]
pub struct ResultMerger {
    index: HashMap<GroupKey, usize>,
    groups: Vec<GroupPartial>,
}

impl ResultMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct groups seen so far
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Folds the result of one chunk
    pub fn merge_chunk(&mut self, chunk_index: usize, partials: Vec<GroupPartial>) -> Result<()> {
        for partial in partials {
            match self.index.get(&partial.key) {
                Some(&slot) => {
                    let existing = &mut self.groups[slot];
                    if existing.aggregates.len() != partial.aggregates.len() {
                        return Err(CrateError::TaskFailure {
                            chunk_index,
                            cause: format!(
                                "group {} carries {} aggregates, expected {}",
                                partial.key,
                                partial.aggregates.len(),
                                existing.aggregates.len()
                            ),
                        });
                    }
                    for (into, from) in existing.aggregates.iter_mut().zip(&partial.aggregates) {
                        if let Err(violation) = into.merge(from) {
                            error!(
                                "merge invariant violated for group {} from chunk {}: {}",
                                partial.key, chunk_index, violation
                            );
                            debug_assert!(false, "{}", violation);
                            return Err(CrateError::TaskFailure {
                                chunk_index,
                                cause: violation.to_string(),
                            });
                        }
                    }
                }
                None => {
                    self.index.insert(partial.key.clone(), self.groups.len());
                    self.groups.push(partial);
                }
            }
        }
        Ok(())
    }

    /// Merged groups in first-appearance order
    pub fn finish(self) -> Vec<GroupPartial> {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, Float64Column, StringColumn, Value};
    use crate::groupby::{AggOp, SequentialAggregator};

    fn run_chunk(keys: &[&str], values: &[f64], offset: usize) -> Vec<GroupPartial> {
        let key_col = Column::String(StringColumn::new(keys.iter().map(|s| s.to_string()).collect()));
        let val_col = Column::Float64(Float64Column::new(values.to_vec()));
        SequentialAggregator::new(keys.len(), vec![&key_col], vec![&val_col])
            .run(offset, None)
            .unwrap()
    }

    #[test]
    fn chunks_merge_like_one_scan() {
        let keys = ["a", "b", "a", "c", "b", "a"];
        let values = [1.0, 2.0, 3.0, 4.0, f64::NAN, 6.0];
        let whole = run_chunk(&keys, &values, 0);

        let mut merger = ResultMerger::new();
        merger.merge_chunk(0, run_chunk(&keys[..2], &values[..2], 0)).unwrap();
        merger.merge_chunk(1, run_chunk(&keys[2..5], &values[2..5], 2)).unwrap();
        merger.merge_chunk(2, run_chunk(&keys[5..], &values[5..], 5)).unwrap();
        let merged = merger.finish();

        assert_eq!(merged.len(), whole.len());
        for (m, w) in merged.iter().zip(&whole) {
            assert_eq!(m.key, w.key);
            for op in [AggOp::Sum, AggOp::Mean, AggOp::Count, AggOp::First, AggOp::Last] {
                assert_eq!(m.aggregates[0].finalize(op), w.aggregates[0].finalize(op));
            }
        }
        assert_eq!(merged[0].aggregates[0].finalize(AggOp::Last), Value::Number(6.0));
    }

    #[test]
    fn out_of_order_chunks_keep_first_and_last() {
        let mut merger = ResultMerger::new();
        merger.merge_chunk(1, run_chunk(&["a"], &[9.0], 10)).unwrap();
        merger.merge_chunk(0, run_chunk(&["a"], &[1.0], 0)).unwrap();
        let merged = merger.finish();
        assert_eq!(merged[0].aggregates[0].finalize(AggOp::First), Value::Number(1.0));
        assert_eq!(merged[0].aggregates[0].finalize(AggOp::Last), Value::Number(9.0));
    }
}
