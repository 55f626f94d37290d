use std::fmt;
use std::str::FromStr;

use crate::column::ColumnType;
use crate::error::{Error, Result};

/// Aggregation operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggOp {
    Sum,
    Mean,
    Min,
    Max,
    Count,
    First,
    Last,
}

impl AggOp {
    /// Suffix used in result column names
    pub fn name(&self) -> &'static str {
        match self {
            AggOp::Sum => "sum",
            AggOp::Mean => "mean",
            AggOp::Min => "min",
            AggOp::Max => "max",
            AggOp::Count => "count",
            AggOp::First => "first",
            AggOp::Last => "last",
        }
    }

    /// Whether the operation is defined on a column of `column_type`
    pub fn supports(&self, column_type: ColumnType) -> bool {
        match self {
            AggOp::Sum | AggOp::Mean | AggOp::Min | AggOp::Max => {
                column_type == ColumnType::Float64
            }
            AggOp::Count | AggOp::First | AggOp::Last => true,
        }
    }

    /// Type of the derived column
    pub fn output_type(&self, source: ColumnType) -> ColumnType {
        match self {
            AggOp::First | AggOp::Last => source,
            _ => ColumnType::Float64,
        }
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AggOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggOp::Sum),
            "mean" | "avg" => Ok(AggOp::Mean),
            "min" => Ok(AggOp::Min),
            "max" => Ok(AggOp::Max),
            "count" => Ok(AggOp::Count),
            "first" => Ok(AggOp::First),
            "last" => Ok(AggOp::Last),
            other => Err(Error::InvalidInput(format!(
                "unknown aggregation operation: {}",
                other
            ))),
        }
    }
}

/// Ordered mapping from column name to the operations applied to it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggSpec {
    entries: Vec<(String, Vec<AggOp>)>,
}

impl AggSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds operations for a column; repeated columns and operations are merged
    pub fn agg<I>(mut self, column: impl Into<String>, ops: I) -> Self
    where
        I: IntoIterator<Item = AggOp>,
    {
        let column = column.into();
        let idx = match self.entries.iter().position(|(c, _)| *c == column) {
            Some(idx) => idx,
            None => {
                self.entries.push((column, Vec::new()));
                self.entries.len() - 1
            }
        };
        let existing = &mut self.entries[idx].1;
        for op in ops {
            if !existing.contains(&op) {
                existing.push(op);
            }
        }
        self
    }

    /// Builds a spec from operation names, e.g. `[("sales", &["sum", "mean"])]`
    pub fn parse<C, S>(entries: &[(C, &[S])]) -> Result<Self>
    where
        C: AsRef<str>,
        S: AsRef<str>,
    {
        let mut spec = AggSpec::new();
        for (column, names) in entries {
            let ops = names
                .iter()
                .map(|name| name.as_ref().parse::<AggOp>())
                .collect::<Result<Vec<_>>>()?;
            spec = spec.agg(column.as_ref(), ops);
        }
        Ok(spec)
    }

    pub fn entries(&self) -> &[(String, Vec<AggOp>)] {
        &self.entries
    }

    /// Aggregated column names in spec order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_columns_merge_in_order() {
        let spec = AggSpec::new()
            .agg("a", [AggOp::Sum])
            .agg("b", [AggOp::First])
            .agg("a", [AggOp::Mean, AggOp::Sum]);
        assert_eq!(spec.entries().len(), 2);
        assert_eq!(spec.entries()[0].1, vec![AggOp::Sum, AggOp::Mean]);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let ok = AggSpec::parse(&[("x", &["sum", "MEAN"][..])]).unwrap();
        assert_eq!(ok.entries()[0].1, vec![AggOp::Sum, AggOp::Mean]);
        assert!(AggSpec::parse(&[("x", &["median"][..])]).is_err());
    }

    #[test]
    fn numeric_ops_reject_strings() {
        assert!(!AggOp::Mean.supports(ColumnType::String));
        assert!(AggOp::Last.supports(ColumnType::String));
        assert_eq!(AggOp::First.output_type(ColumnType::String), ColumnType::String);
        assert_eq!(AggOp::Count.output_type(ColumnType::String), ColumnType::Float64);
    }
}
