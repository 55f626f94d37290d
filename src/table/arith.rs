//! Element-wise arithmetic over numeric columns

use crate::column::{Column, Float64Column};
use crate::error::{Error, Result};
use crate::table::{ArithOp, Table};

/// Right-hand side of a table arithmetic operation
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Scalar(f64),
    Table(&'a Table),
}

impl From<f64> for Operand<'_> {
    fn from(value: f64) -> Self {
        Operand::Scalar(value)
    }
}

impl<'a> From<&'a Table> for Operand<'a> {
    fn from(table: &'a Table) -> Self {
        Operand::Table(table)
    }
}

impl Table {
    pub fn add<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Table> {
        self.arith(ArithOp::Add, other.into())
    }

    pub fn sub<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Table> {
        self.arith(ArithOp::Subtract, other.into())
    }

    pub fn mul<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Table> {
        self.arith(ArithOp::Multiply, other.into())
    }

    pub fn div<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Table> {
        self.arith(ArithOp::Divide, other.into())
    }

    /// Applies `op` to every numeric column and returns a new table
    ///
    /// String columns pass through unchanged. With a table operand, values
    /// pair up by column name and row position: the row counts must match,
    /// a column absent from `other` gives an all-missing result, and a
    /// missing value on either side stays missing. Division follows IEEE
    /// rules, so `x / 0` is infinite and `0 / 0` is missing.
    pub fn arith(&self, op: ArithOp, other: Operand<'_>) -> Result<Table> {
        if let Operand::Table(rhs) = other {
            if rhs.row_count != self.row_count {
                return Err(Error::ShapeMismatch {
                    expected: self.row_count,
                    found: rhs.row_count,
                });
            }
        }

        let mut result = Table::new();
        for (name, column) in self.columns() {
            let out = match column {
                Column::Float64(lhs) => {
                    let values = match other {
                        Operand::Scalar(s) => (0..lhs.len())
                            .map(|i| lhs.valid_value(i).map(|v| op.apply(v, s)))
                            .collect(),
                        Operand::Table(rhs) => {
                            let rhs = match rhs.column(name).ok() {
                                None => None,
                                Some(Column::Float64(c)) => Some(c),
                                Some(Column::String(_)) => {
                                    return Err(Error::UnsupportedOperation(format!(
                                        "cannot apply {:?} to numeric column '{}' and a string column",
                                        op, name
                                    )))
                                }
                            };
                            (0..lhs.len())
                                .map(|i| match (lhs.valid_value(i), rhs.and_then(|c| c.valid_value(i))) {
                                    (Some(a), Some(b)) => Some(op.apply(a, b)),
                                    _ => None,
                                })
                                .collect()
                        }
                    };
                    Column::Float64(Float64Column::from_options(values))
                }
                Column::String(_) => column.clone(),
            };
            result.add_column(name.to_string(), out)?;
        }
        result.row_count = self.row_count;

        log::debug!("{:?} over {} columns, {} rows", op, result.column_count(), result.row_count);
        Ok(result)
    }
}
