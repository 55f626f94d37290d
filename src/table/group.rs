//! Group-by entry points on the table facade

use std::collections::HashMap;

use crate::column::{Column, Float64Column};
use crate::config::ParallelConfig;
use crate::error::Result;
use crate::groupby::{AggSpec, GroupByPlan, GroupKey, GroupPartial};
use crate::parallel::{CancellationToken, WorkerPool};
use crate::table::Table;

/// Grouping of a table by one or more columns
///
/// Groups are reported in order of first appearance. With no group columns
/// the whole table forms a single group.
#[derive(Debug, Clone)]
pub struct GroupBy<'a> {
    table: &'a Table,
    columns: Vec<String>,
}

impl<'a> GroupBy<'a> {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Aggregates every group on the calling thread
    pub fn agg(&self, spec: &AggSpec) -> Result<Table> {
        let plan = GroupByPlan::new(self.table, &self.columns, spec)?;
        let groups = plan.aggregate_table(self.table)?;
        plan.finalize(&groups)
    }

    /// Group columns plus a `size` column with the row count of each group
    pub fn size(&self) -> Result<Table> {
        let groups = self.group_indices()?;
        let sizes: Vec<f64> = groups.iter().map(|(_, rows)| rows.len() as f64).collect();
        let keys = self.key_table(groups.into_iter().map(|(key, _)| key))?;
        keys.with_column("size", Column::Float64(Float64Column::new(sizes)))
    }

    /// Each group's key with its rows as a table
    pub fn groups(&self) -> Result<Vec<(GroupKey, Table)>> {
        Ok(self
            .group_indices()?
            .into_iter()
            .map(|(key, rows)| {
                let table = self.table.take_rows(&rows);
                (key, table)
            })
            .collect())
    }

    /// Number of distinct groups
    pub fn ngroups(&self) -> Result<usize> {
        Ok(self.group_indices()?.len())
    }

    fn group_indices(&self) -> Result<Vec<(GroupKey, Vec<usize>)>> {
        let columns = self
            .columns
            .iter()
            .map(|name| self.table.column(name))
            .collect::<Result<Vec<_>>>()?;

        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<(GroupKey, Vec<usize>)> = Vec::new();
        for row in 0..self.table.row_count() {
            let key = GroupKey::from_row(&columns, row);
            match index.get(&key) {
                Some(&slot) => groups[slot].1.push(row),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, vec![row]));
                }
            }
        }
        Ok(groups)
    }

    fn key_table<I>(&self, keys: I) -> Result<Table>
    where
        I: IntoIterator<Item = GroupKey>,
    {
        let plan = GroupByPlan::new(self.table, &self.columns, &AggSpec::new())?;
        let partials: Vec<GroupPartial> = keys
            .into_iter()
            .map(|key| GroupPartial {
                key,
                aggregates: Vec::new(),
            })
            .collect();
        plan.finalize(&partials)
    }
}

impl Table {
    /// Groups rows by the given columns
    pub fn group_by<S: AsRef<str>>(&self, columns: &[S]) -> Result<GroupBy<'_>> {
        let columns = columns
            .iter()
            .map(|name| self.column(name.as_ref()).map(|_| name.as_ref().to_string()))
            .collect::<Result<Vec<_>>>()?;
        Ok(GroupBy {
            table: self,
            columns,
        })
    }

    /// Parallel group-by with the default configuration
    ///
    /// Produces the same table as `group_by(columns)?.agg(spec)`.
    pub fn concurrent_group_by<S: AsRef<str>>(&self, columns: &[S], spec: &AggSpec) -> Result<Table> {
        self.concurrent_group_by_with(
            columns,
            spec,
            &ParallelConfig::default(),
            &CancellationToken::new(),
        )
    }

    /// Parallel group-by on a fresh worker pool
    ///
    /// The pool lives for this call only and is torn down before returning,
    /// whether the call succeeds, times out, fails or is cancelled.
    pub fn concurrent_group_by_with<S: AsRef<str>>(
        &self,
        columns: &[S],
        spec: &AggSpec,
        config: &ParallelConfig,
        cancel: &CancellationToken,
    ) -> Result<Table> {
        let plan = GroupByPlan::new(self, columns, spec)?;
        let mut pool = WorkerPool::new(config.clone())?;
        let groups = pool.execute(self, &plan, cancel)?;
        plan.finalize(&groups)
    }

    /// Distinct values of `column` with their row counts, most frequent first
    ///
    /// Missing values are counted as one value.
    pub fn value_counts(&self, column: &str) -> Result<Table> {
        let grouped = self.group_by(&[column])?;
        let groups = grouped.group_indices()?;
        let counts: Vec<f64> = groups.iter().map(|(_, rows)| rows.len() as f64).collect();
        let keys = grouped.key_table(groups.into_iter().map(|(key, _)| key))?;

        let table = Table::from_named_columns(vec![
            ("value".to_string(), keys.column(column)?.clone()),
            ("count".to_string(), Column::Float64(Float64Column::new(counts))),
        ])?;
        table.sort_values("count", false)
    }
}
