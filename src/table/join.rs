//! Hash join of two tables

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::groupby::GroupKey;
use crate::table::Table;

/// Join type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    /// Only rows whose key appears on both sides
    #[default]
    Inner,
    /// Every left row; unmatched rows get missing right values
    Left,
}

/// Join keys and type for [`Table::merge`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    pub left_on: Vec<String>,
    pub right_on: Vec<String>,
    pub how: JoinType,
}

impl MergeOptions {
    /// Same key columns on both sides
    pub fn on<S: AsRef<str>>(columns: &[S]) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        Self {
            left_on: columns.clone(),
            right_on: columns,
            how: JoinType::Inner,
        }
    }

    /// Differently named key columns, matched pairwise
    pub fn left_right<L: AsRef<str>, R: AsRef<str>>(left_on: &[L], right_on: &[R]) -> Self {
        Self {
            left_on: left_on.iter().map(|c| c.as_ref().to_string()).collect(),
            right_on: right_on.iter().map(|c| c.as_ref().to_string()).collect(),
            how: JoinType::Inner,
        }
    }

    pub fn how(mut self, how: JoinType) -> Self {
        self.how = how;
        self
    }
}

impl Table {
    /// Joins `other` onto this table
    ///
    /// Rows come out in left row order, each followed by its right matches in
    /// right row order; duplicate keys produce the full cross product. The
    /// result holds every left column, then the right columns except key
    /// columns named like their left counterpart. Other name clashes get a
    /// `_right` suffix, repeated until the name is free. Missing key values
    /// match each other.
    pub fn merge(&self, other: &Table, options: &MergeOptions) -> Result<Table> {
        if options.left_on.is_empty() || options.left_on.len() != options.right_on.len() {
            return Err(Error::InvalidInput(format!(
                "merge needs matching key lists, got {} left and {} right",
                options.left_on.len(),
                options.right_on.len()
            )));
        }

        let left_keys = options
            .left_on
            .iter()
            .map(|n| self.column(n))
            .collect::<Result<Vec<_>>>()?;
        let right_keys = options
            .right_on
            .iter()
            .map(|n| other.column(n))
            .collect::<Result<Vec<_>>>()?;

        for ((l, r), (lname, rname)) in left_keys
            .iter()
            .zip(&right_keys)
            .zip(options.left_on.iter().zip(&options.right_on))
        {
            if l.column_type() != r.column_type() {
                return Err(Error::UnsupportedOperation(format!(
                    "cannot join {} column '{}' with {} column '{}'",
                    l.column_type(),
                    lname,
                    r.column_type(),
                    rname
                )));
            }
        }

        let mut right_index: HashMap<GroupKey, Vec<usize>> = HashMap::new();
        for row in 0..other.row_count {
            right_index
                .entry(GroupKey::from_row(&right_keys, row))
                .or_default()
                .push(row);
        }

        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        for row in 0..self.row_count {
            match right_index.get(&GroupKey::from_row(&left_keys, row)) {
                Some(matches) => {
                    for &m in matches {
                        left_rows.push(row);
                        right_rows.push(Some(m));
                    }
                }
                None if options.how == JoinType::Left => {
                    left_rows.push(row);
                    right_rows.push(None);
                }
                None => {}
            }
        }

        let mut result = Table::new();
        for (name, column) in self.columns() {
            result.add_column(name.to_string(), column.take(&left_rows))?;
        }
        for (name, column) in other.columns() {
            let shared_key = options
                .left_on
                .iter()
                .zip(&options.right_on)
                .any(|(l, r)| r == name && l == name);
            if shared_key {
                continue;
            }
            let mut out_name = name.to_string();
            while result.contains_column(&out_name) {
                out_name.push_str("_right");
            }
            result.add_column(out_name, column.take_optional(&right_rows))?;
        }
        result.row_count = left_rows.len();

        log::debug!(
            "{:?} join produced {} rows from {} x {}",
            options.how,
            result.row_count,
            self.row_count,
            other.row_count
        );
        Ok(result)
    }
}
