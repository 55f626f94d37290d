//! Table structure, construction and basic accessors

use std::collections::HashMap;
use std::fmt::{self, Display};

use crate::column::{Column, ColumnType, Record, Value};
use crate::error::{Error, Result};

/// In-memory columnar table
///
/// Every column has exactly `row_count` rows. Transforms return new tables;
/// column buffers are reference counted, so untouched columns are shared
/// rather than copied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub(crate) columns: Vec<Column>,
    pub(crate) column_indices: HashMap<String, usize>,
    pub(crate) column_names: Vec<String>,
    pub(crate) row_count: usize,
}

impl Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_ROWS: usize = 10;

        if self.columns.is_empty() {
            return write!(f, "Table (0 rows x 0 columns)");
        }

        writeln!(f, "Table ({} rows x {} columns):", self.row_count, self.columns.len())?;

        write!(f, "{:<5} |", "idx")?;
        for name in &self.column_names {
            write!(f, " {:<15} |", name)?;
        }
        writeln!(f)?;

        write!(f, "{:-<5}-+", "")?;
        for _ in &self.column_names {
            write!(f, "-{:-<15}-+", "")?;
        }
        writeln!(f)?;

        for i in 0..self.row_count.min(MAX_ROWS) {
            write!(f, "{:<5} |", i)?;
            for col in &self.columns {
                let value = match col.value(i) {
                    Value::Null => "null".to_string(),
                    Value::Number(v) if v.is_nan() => "NaN".to_string(),
                    Value::Number(v) => format!("{:.3}", v),
                    Value::Text(s) => format!("\"{}\"", s),
                };
                write!(f, " {:<15} |", value)?;
            }
            writeln!(f)?;
        }

        if self.row_count > MAX_ROWS {
            writeln!(f, "... ({} more rows)", self.row_count - MAX_ROWS)?;
        }

        Ok(())
    }
}

impl Table {
    /// Empty table with no columns
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from typed columns
    ///
    /// Fails with `DuplicateColumn` on a repeated name and `ShapeMismatch`
    /// when the columns differ in length.
    pub fn from_named_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let mut table = Self::new();
        for (name, column) in columns {
            table.add_column(name, column)?;
        }
        Ok(table)
    }

    /// Builds a table from column-oriented input, inferring each column's type
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<Value>)>) -> Result<Self> {
        let columns = columns
            .into_iter()
            .map(|(name, values)| (name.into(), Column::from_values(&values)))
            .collect();
        Self::from_named_columns(columns)
    }

    /// Builds a table from row-oriented input
    ///
    /// Field names come from the first record. Every record must carry the
    /// same fields; the values are then handled exactly like column-oriented
    /// input. No records yield an empty table.
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let Some(first) = records.first() else {
            return Ok(Self::new());
        };

        let names: Vec<String> = first.names().map(str::to_string).collect();
        let mut values: Vec<Vec<Value>> = vec![Vec::with_capacity(records.len()); names.len()];

        for record in &records {
            if record.len() != names.len() {
                return Err(Error::ShapeMismatch {
                    expected: names.len(),
                    found: record.len(),
                });
            }
            for (slot, name) in values.iter_mut().zip(&names) {
                let value = record
                    .get(name)
                    .ok_or_else(|| Error::UnknownColumn(name.clone()))?;
                slot.push(value.clone());
            }
        }

        Self::from_columns(names.into_iter().zip(values).collect())
    }

    /// Builds a table from a JSON array of objects or an object of arrays
    pub fn from_json(input: &str) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_str(input)?;
        match parsed {
            serde_json::Value::Array(rows) => {
                let records = rows
                    .iter()
                    .map(|row| match row {
                        serde_json::Value::Object(map) => Ok(map
                            .iter()
                            .map(|(k, v)| (k.clone(), Value::from(v)))
                            .collect::<Record>()),
                        other => Err(Error::InvalidInput(format!(
                            "expected a JSON object per row, found {}",
                            other
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::from_records(records)
            }
            serde_json::Value::Object(map) => {
                let columns = map
                    .iter()
                    .map(|(name, values)| match values {
                        serde_json::Value::Array(items) => {
                            Ok((name.clone(), items.iter().map(Value::from).collect()))
                        }
                        _ => Err(Error::InvalidInput(format!(
                            "column '{}' is not a JSON array",
                            name
                        ))),
                    })
                    .collect::<Result<Vec<(String, Vec<Value>)>>>()?;
                Self::from_columns(columns)
            }
            _ => Err(Error::InvalidInput(
                "expected a JSON array of objects or an object of arrays".to_string(),
            )),
        }
    }

    /// Appends a column, checking its name and length
    pub(crate) fn add_column(&mut self, name: String, column: Column) -> Result<()> {
        if self.column_indices.contains_key(&name) {
            return Err(Error::DuplicateColumn(name));
        }
        if !self.columns.is_empty() && column.len() != self.row_count {
            return Err(Error::ShapeMismatch {
                expected: self.row_count,
                found: column.len(),
            });
        }
        if self.columns.is_empty() {
            self.row_count = column.len();
        }
        self.column_indices.insert(name.clone(), self.columns.len());
        self.column_names.push(name);
        self.columns.push(column);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column_indices.contains_key(name)
    }

    /// Column by name
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.column_indices
            .get(name)
            .map(|&idx| &self.columns[idx])
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub fn column_type(&self, name: &str) -> Result<ColumnType> {
        self.column(name).map(Column::column_type)
    }

    /// Iterates `(name, column)` pairs in column order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter())
    }

    /// Row `index` as a record
    pub fn row(&self, index: usize) -> Result<Record> {
        if index >= self.row_count {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.row_count,
            });
        }
        Ok(self.record_at(index))
    }

    pub(crate) fn record_at(&self, index: usize) -> Record {
        self.columns()
            .map(|(name, col)| (name.to_string(), col.value(index)))
            .collect()
    }

    /// Iterates rows as records
    pub fn rows(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.row_count).map(move |i| self.record_at(i))
    }

    /// Snapshot of all rows
    pub fn to_records(&self) -> Vec<Record> {
        self.rows().collect()
    }

    /// Serializes the rows as a JSON array of objects
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_records())?)
    }

    /// Table with the same column names and types and no rows
    pub(crate) fn empty_like(&self) -> Self {
        self.take_rows(&[])
    }

    /// Gathers rows by index into a new table
    pub(crate) fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            column_indices: self.column_indices.clone(),
            column_names: self.column_names.clone(),
            row_count: indices.len(),
        }
    }
}
