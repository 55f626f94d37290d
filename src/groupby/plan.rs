//! Validated group-by request shared by the sequential and parallel paths

use crate::column::{Column, ColumnType, Float64Column, StringColumn, Value};
use crate::error::{Error, Result};
use crate::groupby::{AggSpec, GroupPartial, KeyPart, SequentialAggregator};
use crate::parallel::{CancellationToken, Chunk};
use crate::table::Table;

/// A group-by request checked against a table schema
#[derive(Debug, Clone)]
pub struct GroupByPlan {
    group_columns: Vec<String>,
    group_types: Vec<ColumnType>,
    agg_columns: Vec<String>,
    agg_types: Vec<ColumnType>,
    spec: AggSpec,
}

impl GroupByPlan {
    /// Resolves columns and checks every operation against its column type
    pub fn new<S: AsRef<str>>(table: &Table, group_columns: &[S], spec: &AggSpec) -> Result<Self> {
        let mut names = Vec::with_capacity(group_columns.len());
        let mut group_types = Vec::with_capacity(group_columns.len());
        for name in group_columns {
            let name = name.as_ref();
            group_types.push(table.column(name)?.column_type());
            names.push(name.to_string());
        }

        let mut agg_columns = Vec::new();
        let mut agg_types = Vec::new();
        for (name, ops) in spec.entries() {
            let column_type = table.column(name)?.column_type();
            if let Some(op) = ops.iter().find(|op| !op.supports(column_type)) {
                return Err(Error::UnsupportedOperation(format!(
                    "'{}' is not defined on {} column '{}'",
                    op, column_type, name
                )));
            }
            agg_columns.push(name.clone());
            agg_types.push(column_type);
        }

        Ok(Self {
            group_columns: names,
            group_types,
            agg_columns,
            agg_types,
            spec: spec.clone(),
        })
    }

    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    pub fn spec(&self) -> &AggSpec {
        &self.spec
    }

    /// Group columns followed by aggregated columns, without duplicates
    pub fn required_columns(&self) -> Vec<String> {
        let mut required: Vec<String> = Vec::new();
        for name in self.group_columns.iter().chain(self.agg_columns.iter()) {
            if !required.contains(name) {
                required.push(name.clone());
            }
        }
        required
    }

    /// Aggregates the whole table
    pub fn aggregate_table(&self, table: &Table) -> Result<Vec<GroupPartial>> {
        let group_cols = self
            .group_columns
            .iter()
            .map(|n| table.column(n))
            .collect::<Result<Vec<_>>>()?;
        let agg_cols = self
            .agg_columns
            .iter()
            .map(|n| table.column(n))
            .collect::<Result<Vec<_>>>()?;
        SequentialAggregator::new(table.row_count(), group_cols, agg_cols).run(0, None)
    }

    /// Aggregates one chunk; the worker-side kernel
    pub fn aggregate_chunk(
        &self,
        chunk: &Chunk,
        cancel: &CancellationToken,
    ) -> Result<Vec<GroupPartial>> {
        let group_cols = self
            .group_columns
            .iter()
            .map(|n| chunk.column(n))
            .collect::<Result<Vec<_>>>()?;
        let agg_cols = self
            .agg_columns
            .iter()
            .map(|n| chunk.column(n))
            .collect::<Result<Vec<_>>>()?;
        SequentialAggregator::new(chunk.len(), group_cols, agg_cols).run(chunk.start, Some(cancel))
    }

    /// Materializes merged groups into the result table
    ///
    /// Columns are the group columns followed by `<column>_<op>` for every
    /// spec entry and operation, in spec order. A generated name that is
    /// already taken gets a numeric suffix (`v_sum_1`, `v_sum_2`, ...).
    pub fn finalize(&self, groups: &[GroupPartial]) -> Result<Table> {
        let mut columns: Vec<(String, Column)> = Vec::new();

        for (i, (name, column_type)) in self.group_columns.iter().zip(&self.group_types).enumerate() {
            let column = match column_type {
                ColumnType::Float64 => Column::Float64(Float64Column::new(
                    groups
                        .iter()
                        .map(|g| match &g.key.parts()[i] {
                            KeyPart::Number(v) => *v,
                            KeyPart::Text(_) => f64::NAN,
                        })
                        .collect(),
                )),
                ColumnType::String => Column::String(StringColumn::new(
                    groups
                        .iter()
                        .map(|g| match &g.key.parts()[i] {
                            KeyPart::Text(s) => s.clone(),
                            KeyPart::Number(_) => String::new(),
                        })
                        .collect(),
                )),
            };
            columns.push((name.clone(), column));
        }

        for (agg_idx, (name, ops)) in self.spec.entries().iter().enumerate() {
            let source_type = self.agg_types[agg_idx];
            for op in ops {
                let values = groups.iter().map(|g| g.aggregates[agg_idx].finalize(*op));
                let column = match op.output_type(source_type) {
                    ColumnType::Float64 => Column::Float64(Float64Column::from_options(
                        values.map(|v| v.as_f64()).collect(),
                    )),
                    ColumnType::String => {
                        Column::String(StringColumn::new(values.map(|v| Value::to_text(&v)).collect()))
                    }
                };
                let out_name = unique_name(&columns, format!("{}_{}", name, op.name()));
                columns.push((out_name, column));
            }
        }

        Table::from_named_columns(columns)
    }
}

fn unique_name(columns: &[(String, Column)], base: String) -> String {
    let taken = |candidate: &str| columns.iter().any(|(n, _)| n == candidate);
    if !taken(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}
