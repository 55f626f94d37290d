use std::fmt;
use std::sync::Arc;

use crate::column::value::Value;
use crate::column::{Float64Column, StringColumn};
use crate::error::{Error, Result};

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Fixed-width f64 buffer, NaN marks a missing value
    Float64,
    /// String buffer, the empty string marks a missing value
    String,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Float64 => write!(f, "numeric"),
            ColumnType::String => write!(f, "string"),
        }
    }
}

/// A typed column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float64(Float64Column),
    String(StringColumn),
}

/// Null bitmask; a set bit means the slot holds no value
#[derive(Debug, Clone, PartialEq)]
pub struct BitMask {
    pub(crate) data: Arc<Vec<u8>>,
    pub(crate) len: usize,
}

impl BitMask {
    /// Creates a mask of `length` cleared bits
    pub fn new(length: usize) -> Self {
        let bytes_needed = (length + 7) / 8;
        Self {
            data: Arc::new(vec![0u8; bytes_needed]),
            len: length,
        }
    }

    /// Creates a mask from booleans
    pub fn from_bools(bools: &[bool]) -> Self {
        let mut mask = Self::new(bools.len());
        let data = Arc::make_mut(&mut mask.data);
        for (i, &is_set) in bools.iter().enumerate() {
            if is_set {
                data[i / 8] |= 1 << (i % 8);
            }
        }
        mask
    }

    /// Returns whether bit `index` is set
    pub fn get(&self, index: usize) -> Result<bool> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.len,
            });
        }
        Ok(self.is_set(index))
    }

    #[inline]
    pub(crate) fn is_set(&self, index: usize) -> bool {
        (self.data[index / 8] & (1 << (index % 8))) != 0
    }

    /// Appends one bit
    pub fn push(&mut self, is_set: bool) {
        let index = self.len;
        let data = Arc::make_mut(&mut self.data);
        if index / 8 >= data.len() {
            data.push(0);
        }
        if is_set {
            data[index / 8] |= 1 << (index % 8);
        }
        self.len += 1;
    }

    /// Number of set bits
    pub fn count_set(&self) -> usize {
        (0..self.len).filter(|&i| self.is_set(i)).count()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Column {
    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            Column::Float64(col) => col.len(),
            Column::String(col) => col.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Semantic type of the column
    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Float64(_) => ColumnType::Float64,
            Column::String(_) => ColumnType::String,
        }
    }

    pub fn as_float64(&self) -> Option<&Float64Column> {
        match self {
            Column::Float64(col) => Some(col),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringColumn> {
        match self {
            Column::String(col) => Some(col),
            _ => None,
        }
    }

    /// Value at `index` in exported form
    pub fn value(&self, index: usize) -> Value {
        match self {
            Column::Float64(col) => match col.value_at(index) {
                Some(v) => Value::Number(v),
                None => Value::Null,
            },
            Column::String(col) => match col.value_at(index) {
                "" => Value::Null,
                s => Value::Text(s.to_string()),
            },
        }
    }

    /// True when the slot is null, NaN or an empty string
    pub fn is_missing(&self, index: usize) -> bool {
        match self {
            Column::Float64(col) => col.is_missing(index),
            Column::String(col) => col.is_missing(index),
        }
    }

    /// Copies the rows `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> Self {
        match self {
            Column::Float64(col) => Column::Float64(col.slice(start, end)),
            Column::String(col) => Column::String(col.slice(start, end)),
        }
    }

    /// Gathers rows by index
    pub fn take(&self, indices: &[usize]) -> Self {
        match self {
            Column::Float64(col) => Column::Float64(col.take(indices)),
            Column::String(col) => Column::String(col.take(indices)),
        }
    }

    /// Gathers rows by index, filling `None` slots with the missing marker
    pub fn take_optional(&self, indices: &[Option<usize>]) -> Self {
        match self {
            Column::Float64(col) => Column::Float64(col.take_optional(indices)),
            Column::String(col) => Column::String(col.take_optional(indices)),
        }
    }

    /// Appends a value, coercing it to the column type
    pub fn push_value(&mut self, value: &Value) {
        match self {
            Column::Float64(col) => match value {
                Value::Number(v) => col.push(Some(*v)),
                Value::Text(s) => col.push(Some(s.trim().parse::<f64>().unwrap_or(f64::NAN))),
                Value::Null => col.push(Some(f64::NAN)),
            },
            Column::String(col) => col.push(value.to_text()),
        }
    }

    /// Rewrites the buffer as `target`
    pub fn cast(&self, target: ColumnType) -> Self {
        match (self, target) {
            (Column::Float64(_), ColumnType::Float64) | (Column::String(_), ColumnType::String) => {
                self.clone()
            }
            (Column::Float64(col), ColumnType::String) => {
                let data = (0..col.len())
                    .map(|i| match col.value_at(i) {
                        Some(v) if !v.is_nan() => Value::Number(v).to_text(),
                        _ => String::new(),
                    })
                    .collect();
                Column::String(StringColumn::new(data))
            }
            (Column::String(col), ColumnType::Float64) => {
                let data = col
                    .iter()
                    .map(|s| s.trim().parse::<f64>().unwrap_or(f64::NAN))
                    .collect();
                Column::Float64(Float64Column::new(data))
            }
        }
    }

    /// Builds a column from loosely typed values
    ///
    /// The column is numeric when the first non-null value is a number and every
    /// other non-null value is a number too; any disagreement degrades the whole
    /// column to strings. Columns with no non-null values are strings.
    pub fn from_values(values: &[Value]) -> Self {
        let first = values.iter().find(|v| !v.is_null());
        let numeric = matches!(first, Some(Value::Number(_)))
            && values
                .iter()
                .all(|v| matches!(v, Value::Null | Value::Number(_)));

        if numeric {
            let data = values
                .iter()
                .map(|v| match v {
                    Value::Number(n) => *n,
                    _ => f64::NAN,
                })
                .collect();
            Column::Float64(Float64Column::new(data))
        } else {
            Column::String(StringColumn::new(values.iter().map(Value::to_text).collect()))
        }
    }
}

impl From<Float64Column> for Column {
    fn from(col: Float64Column) -> Self {
        Column::Float64(col)
    }
}

impl From<StringColumn> for Column {
    fn from(col: StringColumn) -> Self {
        Column::String(col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_prefers_numbers_when_homogeneous() {
        let col = Column::from_values(&[Value::Null, Value::Number(1.0), Value::Number(f64::NAN)]);
        assert_eq!(col.column_type(), ColumnType::Float64);
        assert!(col.is_missing(0));
        assert!(col.is_missing(2));
        assert!(!col.is_missing(1));
    }

    #[test]
    fn mixed_values_degrade_to_string() {
        let col = Column::from_values(&[Value::Number(1.5), Value::from("x")]);
        assert_eq!(col.column_type(), ColumnType::String);
        assert_eq!(col.value(0), Value::from("1.5"));
    }

    #[test]
    fn all_null_column_is_string() {
        let col = Column::from_values(&[Value::Null, Value::Null]);
        assert_eq!(col.column_type(), ColumnType::String);
        assert!(col.is_missing(1));
    }

    #[test]
    fn bitmask_push_grows_across_bytes() {
        let mut mask = BitMask::new(0);
        for i in 0..20 {
            mask.push(i % 3 == 0);
        }
        assert_eq!(mask.len(), 20);
        assert_eq!(mask.count_set(), 7);
        assert!(mask.get(18).unwrap());
        assert!(mask.get(20).is_err());
    }
}
