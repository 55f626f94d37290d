//! Single-threaded group-by kernel
//!
//! The same kernel serves the sequential path (whole table) and every worker
//! of the parallel path (one chunk), which is what keeps the two paths
//! equivalent.

use std::collections::HashMap;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::groupby::{GroupKey, PartialAggregate};
use crate::parallel::CancellationToken;

/// Rows processed between two cancellation checks
pub const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Group key plus one partial aggregate per aggregated column
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPartial {
    pub key: GroupKey,
    pub aggregates: Vec<PartialAggregate>,
}

/// Groups rows by key and accumulates partials for each aggregated column
pub struct SequentialAggregator<'a> {
    row_count: usize,
    group_columns: Vec<&'a Column>,
    agg_columns: Vec<&'a Column>,
}

impl<'a> SequentialAggregator<'a> {
    pub fn new(
        row_count: usize,
        group_columns: Vec<&'a Column>,
        agg_columns: Vec<&'a Column>,
    ) -> Self {
        Self {
            row_count,
            group_columns,
            agg_columns,
        }
    }

    /// Aggregates all rows of the columns
    ///
    /// `row_offset` is the global index of row 0, so first/last stay ordered
    /// when partials from different chunks are merged. Groups are returned in
    /// order of first appearance.
    pub fn run(
        &self,
        row_offset: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<GroupPartial>> {
        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<GroupPartial> = Vec::new();

        for row in 0..self.row_count {
            if row % CANCEL_CHECK_INTERVAL == 0 {
                if let Some(token) = cancel {
                    if token.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                }
            }

            let key = GroupKey::from_row(&self.group_columns, row);
            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    let aggregates = self
                        .agg_columns
                        .iter()
                        .map(|c| PartialAggregate::new(c.column_type()))
                        .collect();
                    groups.push(GroupPartial {
                        key: key.clone(),
                        aggregates,
                    });
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };

            let group = &mut groups[slot];
            for (partial, column) in group.aggregates.iter_mut().zip(&self.agg_columns) {
                partial.update(column, row, row_offset + row);
            }
        }

        Ok(groups)
    }
}
