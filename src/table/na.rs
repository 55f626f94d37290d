//! Missing-value handling
//!
//! A cell is missing when it is null or NaN (numeric columns) or the empty
//! string (string columns). Both operations return a new table.

use crate::column::{Column, Float64Column, StringColumn, Value};
use crate::error::Result;
use crate::table::Table;

/// What `dropna` removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    #[default]
    Rows,
    Columns,
}

/// When a row or column counts as droppable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropHow {
    /// Any checked cell is missing
    #[default]
    Any,
    /// Every checked cell is missing
    All,
}

/// Options for [`Table::dropna`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropNa {
    pub axis: Axis,
    pub how: DropHow,
    /// Columns to inspect; all columns when `None`
    pub subset: Option<Vec<String>>,
    /// Keep entries with at least this many present values; overrides `how`
    pub thresh: Option<usize>,
}

impl DropNa {
    pub fn rows() -> Self {
        Self::default()
    }

    pub fn columns() -> Self {
        Self {
            axis: Axis::Columns,
            ..Self::default()
        }
    }

    pub fn how(mut self, how: DropHow) -> Self {
        self.how = how;
        self
    }

    pub fn subset<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.subset = Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn thresh(mut self, present: usize) -> Self {
        self.thresh = Some(present);
        self
    }

    fn keeps(&self, missing: usize, checked: usize) -> bool {
        match (self.thresh, self.how) {
            (Some(thresh), _) => checked - missing >= thresh,
            (None, DropHow::Any) => missing == 0,
            (None, DropHow::All) => checked == 0 || missing < checked,
        }
    }
}

impl Table {
    /// Drops rows or columns with missing values
    pub fn dropna(&self, options: &DropNa) -> Result<Table> {
        let checked: Vec<&str> = match &options.subset {
            Some(subset) => {
                for name in subset {
                    self.column(name)?;
                }
                subset.iter().map(String::as_str).collect()
            }
            None => self.column_names.iter().map(String::as_str).collect(),
        };

        match options.axis {
            Axis::Rows => {
                let columns = checked
                    .iter()
                    .map(|name| self.column(name))
                    .collect::<Result<Vec<_>>>()?;
                let keep: Vec<usize> = (0..self.row_count)
                    .filter(|&row| {
                        let missing = columns.iter().filter(|c| c.is_missing(row)).count();
                        options.keeps(missing, columns.len())
                    })
                    .collect();
                log::debug!("dropna removed {} row(s)", self.row_count - keep.len());
                Ok(self.take_rows(&keep))
            }
            Axis::Columns => {
                let mut result = Table::new();
                for (name, column) in self.columns() {
                    let keep = !checked.contains(&name) || {
                        let missing = (0..self.row_count).filter(|&r| column.is_missing(r)).count();
                        options.keeps(missing, self.row_count)
                    };
                    if keep {
                        result.add_column(name.to_string(), column.clone())?;
                    }
                }
                result.row_count = self.row_count;
                Ok(result)
            }
        }
    }

    /// Replaces missing values with `value`
    ///
    /// Numeric columns are filled only when `value` is a number or numeric
    /// text; string columns receive its text form.
    pub fn fillna(&self, value: &Value) -> Result<Table> {
        let number = match value {
            Value::Number(v) if !v.is_nan() => Some(*v),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let text = value.to_text();

        let mut result = Table::new();
        for (name, column) in self.columns() {
            let filled = match column {
                Column::Float64(col) => match number {
                    Some(fill) if (0..col.len()).any(|i| col.is_missing(i)) => {
                        Column::Float64(Float64Column::new(
                            (0..col.len())
                                .map(|i| col.valid_value(i).unwrap_or(fill))
                                .collect(),
                        ))
                    }
                    _ => column.clone(),
                },
                Column::String(col) if !text.is_empty() => Column::String(StringColumn::new(
                    col.iter()
                        .map(|s| if s.is_empty() { text.clone() } else { s.to_string() })
                        .collect(),
                )),
                Column::String(_) => column.clone(),
            };
            result.add_column(name.to_string(), filled)?;
        }
        result.row_count = self.row_count;
        Ok(result)
    }
}
