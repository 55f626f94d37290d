//! Column selection and row filtering

use std::collections::HashMap;

use crate::column::Value;
use crate::error::{Error, Result};
use crate::table::Table;

/// Read-only view of one row, handed to [`Table::loc`] predicates
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    table: &'a Table,
    row: usize,
}

impl<'a> RowView<'a> {
    pub fn index(&self) -> usize {
        self.row
    }

    /// Numeric value; `None` when missing, non-numeric or unknown
    pub fn number(&self, column: &str) -> Option<f64> {
        self.table
            .column(column)
            .ok()
            .and_then(|c| c.as_float64())
            .and_then(|c| c.valid_value(self.row))
    }

    /// String value; `None` when missing, non-string or unknown
    pub fn text(&self, column: &str) -> Option<&'a str> {
        self.table
            .column(column)
            .ok()
            .and_then(|c| c.as_string())
            .and_then(|c| c.get(self.row).ok().flatten())
    }

    pub fn value(&self, column: &str) -> Option<Value> {
        self.table.column(column).ok().map(|c| c.value(self.row))
    }

    pub fn is_missing(&self, column: &str) -> bool {
        self.table
            .column(column)
            .map(|c| c.is_missing(self.row))
            .unwrap_or(true)
    }
}

impl Table {
    /// Keeps the named columns, in the given order
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table> {
        let mut table = Table::new();
        for name in columns {
            let name = name.as_ref();
            table.add_column(name.to_string(), self.column(name)?.clone())?;
        }
        table.row_count = self.row_count;
        Ok(table)
    }

    /// Removes the named columns
    pub fn drop<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table> {
        for name in columns {
            self.column(name.as_ref())?;
        }
        let keep: Vec<&str> = self
            .column_names
            .iter()
            .map(String::as_str)
            .filter(|name| !columns.iter().any(|c| c.as_ref() == *name))
            .collect();
        self.select(&keep)
    }

    /// Renames columns; every key must name an existing column
    pub fn rename(&self, mapping: &HashMap<String, String>) -> Result<Table> {
        for old in mapping.keys() {
            self.column(old)?;
        }
        let mut table = Table::new();
        for (name, column) in self.columns() {
            let new_name = mapping.get(name).cloned().unwrap_or_else(|| name.to_string());
            table.add_column(new_name, column.clone())?;
        }
        table.row_count = self.row_count;
        Ok(table)
    }

    /// Rows for which `predicate` holds
    pub fn loc<F>(&self, predicate: F) -> Table
    where
        F: Fn(&RowView<'_>) -> bool,
    {
        let indices: Vec<usize> = (0..self.row_count)
            .filter(|&row| predicate(&RowView { table: self, row }))
            .collect();
        self.take_rows(&indices)
    }

    /// Rows where `mask` is true
    pub fn filter_mask(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.row_count {
            return Err(Error::ShapeMismatch {
                expected: self.row_count,
                found: mask.len(),
            });
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        Ok(self.take_rows(&indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Record;

    fn table() -> Table {
        Table::from_records(vec![
            Record::new().with("name", "a").with("x", 1.0).with("y", "p"),
            Record::new().with("name", "b").with("x", f64::NAN).with("y", "q"),
            Record::new().with("name", "c").with("x", 3.0).with("y", ""),
        ])
        .unwrap()
    }

    #[test]
    fn select_and_drop_fail_on_unknown_columns() {
        let t = table();
        assert_eq!(t.select(&["y", "name"]).unwrap().column_names(), &["y", "name"]);
        assert!(matches!(t.select(&["nope"]), Err(Error::UnknownColumn(_))));
        assert_eq!(t.drop(&["x"]).unwrap().column_count(), 2);
        assert!(t.drop(&["nope"]).is_err());
    }

    #[test]
    fn rename_keeps_order() {
        let mut mapping = HashMap::new();
        mapping.insert("x".to_string(), "score".to_string());
        let t = table().rename(&mapping).unwrap();
        assert_eq!(t.column_names(), &["name", "score", "y"]);
    }

    #[test]
    fn loc_sees_missing_values_as_none() {
        let t = table().loc(|row| row.number("x").map_or(false, |x| x > 0.0));
        assert_eq!(t.row_count(), 2);
        let t = table().loc(|row| row.text("y").is_none());
        assert_eq!(t.row(0).unwrap().get("name"), Some(&Value::from("c")));
    }
}
