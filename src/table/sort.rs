use std::cmp::Ordering;

use crate::column::Column;
use crate::error::Result;
use crate::table::Table;

impl Table {
    /// Stable sort by one column
    ///
    /// Numbers sort by value and strings lexicographically. Missing values
    /// go last in both directions.
    pub fn sort_values(&self, column: &str, ascending: bool) -> Result<Table> {
        let col = self.column(column)?;
        let mut indices: Vec<usize> = (0..self.row_count).collect();

        let directed = |ord: Ordering| if ascending { ord } else { ord.reverse() };
        match col {
            Column::Float64(c) => indices.sort_by(|&a, &b| {
                match (c.valid_value(a), c.valid_value(b)) {
                    (Some(x), Some(y)) => directed(x.total_cmp(&y)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }),
            Column::String(c) => indices.sort_by(|&a, &b| {
                match (c.is_missing(a), c.is_missing(b)) {
                    (false, false) => directed(c.value_at(a).cmp(c.value_at(b))),
                    (false, true) => Ordering::Less,
                    (true, false) => Ordering::Greater,
                    (true, true) => Ordering::Equal,
                }
            }),
        }

        Ok(self.take_rows(&indices))
    }
}

#[cfg(test)]
mod tests {
    use crate::column::Value;
    use crate::table::Table;

    #[test]
    fn missing_values_sort_last_both_ways() {
        let t = Table::from_columns(vec![
            ("n", vec![Value::from(2.0), Value::Null, Value::from(1.0), Value::from(3.0)]),
            ("s", vec![Value::from("b"), Value::from("a"), Value::Null, Value::from("c")]),
        ])
        .unwrap();

        let asc = t.sort_values("n", true).unwrap();
        let order: Vec<Value> = asc.rows().map(|r| r.get("s").cloned().unwrap_or(Value::Null)).collect();
        assert_eq!(order, vec![Value::Null, Value::from("b"), Value::from("c"), Value::from("a")]);

        let desc = t.sort_values("s", false).unwrap();
        let order: Vec<Value> = desc.rows().map(|r| r.get("s").cloned().unwrap_or(Value::Null)).collect();
        assert_eq!(order, vec![Value::from("c"), Value::from("b"), Value::from("a"), Value::Null]);
    }

    #[test]
    fn equal_keys_keep_their_order() {
        let t = Table::from_columns(vec![
            ("k", vec![Value::from(1.0), Value::from(0.0), Value::from(1.0)]),
            ("id", vec![Value::from("first"), Value::from("mid"), Value::from("second")]),
        ])
        .unwrap();
        let sorted = t.sort_values("k", false).unwrap();
        assert_eq!(sorted.row(0).unwrap().get("id"), Some(&Value::from("first")));
        assert_eq!(sorted.row(1).unwrap().get("id"), Some(&Value::from("second")));
    }
}
