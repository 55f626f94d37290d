//! Row growth and column-level transforms

use crate::column::{Column, ColumnType, Record, Value};
use crate::error::{Error, Result};
use crate::table::Table;

impl Table {
    /// Appends one row in place
    ///
    /// The record must name every column exactly once. Values are coerced to
    /// the existing column types. On a table without columns the record
    /// defines the schema.
    pub fn append(&mut self, record: Record) -> Result<()> {
        self.extend(std::iter::once(record))
    }

    /// Appends rows in place; nothing is appended if any row is rejected
    pub fn extend<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Record>,
    {
        let records: Vec<Record> = records.into_iter().collect();
        if records.is_empty() {
            return Ok(());
        }

        if self.columns.is_empty() {
            let mut seeded = Table::from_records(records)?;
            std::mem::swap(self, &mut seeded);
            return Ok(());
        }

        for record in &records {
            self.check_record(record)?;
        }

        for record in &records {
            for (name, value) in record.iter() {
                if let Some(&idx) = self.column_indices.get(name) {
                    self.columns[idx].push_value(value);
                }
            }
            self.row_count += 1;
        }
        Ok(())
    }

    fn check_record(&self, record: &Record) -> Result<()> {
        if record.len() != self.columns.len() {
            return Err(Error::ShapeMismatch {
                expected: self.columns.len(),
                found: record.len(),
            });
        }
        for name in record.names() {
            if !self.contains_column(name) {
                return Err(Error::UnknownColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Table {
        self.slice_rows(0, n.min(self.row_count))
    }

    /// Last `n` rows
    pub fn tail(&self, n: usize) -> Table {
        let n = n.min(self.row_count);
        self.slice_rows(self.row_count - n, self.row_count)
    }

    fn slice_rows(&self, start: usize, end: usize) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.slice(start, end)).collect(),
            column_indices: self.column_indices.clone(),
            column_names: self.column_names.clone(),
            row_count: end - start,
        }
    }

    /// Adds a column, or replaces one of the same name in place
    pub fn assign(&self, name: &str, values: Vec<Value>) -> Result<Table> {
        if !self.columns.is_empty() && values.len() != self.row_count {
            return Err(Error::ShapeMismatch {
                expected: self.row_count,
                found: values.len(),
            });
        }
        self.with_column(name, Column::from_values(&values))
    }

    /// Returns a copy with `column` cast to `column_type`
    pub fn set_type(&self, column: &str, column_type: ColumnType) -> Result<Table> {
        let cast = self.column(column)?.cast(column_type);
        self.with_column(column, cast)
    }

    /// Maps every value of `column` through `f`; the result type is re-inferred
    pub fn apply<F>(&self, column: &str, f: F) -> Result<Table>
    where
        F: Fn(&Value) -> Value,
    {
        let source = self.column(column)?;
        let values: Vec<Value> = (0..self.row_count).map(|i| f(&source.value(i))).collect();
        self.with_column(column, Column::from_values(&values))
    }

    pub(crate) fn with_column(&self, name: &str, column: Column) -> Result<Table> {
        let mut table = self.clone();
        match table.column_indices.get(name) {
            Some(&idx) => {
                if column.len() != table.row_count {
                    return Err(Error::ShapeMismatch {
                        expected: table.row_count,
                        found: column.len(),
                    });
                }
                table.columns[idx] = column;
            }
            None => table.add_column(name.to_string(), column)?,
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Table {
        Table::from_records(vec![
            Record::new().with("region", "east").with("sales", 10.0),
            Record::new().with("region", "west").with("sales", 20.0),
        ])
        .unwrap()
    }

    #[test]
    fn append_rejects_wrong_field_count() {
        let mut table = sales();
        let err = table.append(Record::new().with("region", "north")).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 2, found: 1 }));
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn append_coerces_and_leaves_clones_untouched() {
        let mut table = sales();
        let snapshot = table.clone();
        table
            .append(Record::new().with("sales", "31.5").with("region", 7.0))
            .unwrap();

        assert_eq!(table.row_count(), 3);
        assert_eq!(snapshot.row_count(), 2);
        assert_eq!(table.column("sales").unwrap().len(), 3);
        assert_eq!(snapshot.column("sales").unwrap().len(), 2);
        let row = table.row(2).unwrap();
        assert_eq!(row.get("sales"), Some(&Value::Number(31.5)));
        assert_eq!(row.get("region"), Some(&Value::from("7")));
    }

    #[test]
    fn extend_is_all_or_nothing() {
        let mut table = sales();
        let rows = vec![
            Record::new().with("region", "north").with("sales", 1.0),
            Record::new().with("region", "south").with("profit", 1.0),
        ];
        assert!(matches!(table.extend(rows), Err(Error::UnknownColumn(_))));
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn head_tail_and_assign() {
        let table = sales();
        assert_eq!(table.head(5).row_count(), 2);
        assert_eq!(table.tail(1).row(0).unwrap().get("region"), Some(&Value::from("west")));

        let with_units = table.assign("units", vec![Value::from(3), Value::from(4)]).unwrap();
        assert_eq!(with_units.column_count(), 3);
        assert!(table.assign("units", vec![Value::from(3)]).is_err());
    }

    #[test]
    fn set_type_rewrites_the_buffer() {
        let table = sales().set_type("sales", ColumnType::String).unwrap();
        assert_eq!(table.column_type("sales").unwrap(), ColumnType::String);
        assert_eq!(table.row(0).unwrap().get("sales"), Some(&Value::from("10")));
    }
}
