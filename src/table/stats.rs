//! Summary statistics and correlation
//!
//! Per-column work in `describe` and the pairwise work in `corr_matrix` are
//! spread over the rayon thread pool.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::column::{Column, Float64Column, StringColumn};
use crate::error::{Error, Result};
use crate::table::Table;

/// Linear-interpolated percentile of sorted values, `p` in `[0, 1]`
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        n => {
            let position = (n - 1) as f64 * p;
            let base = position.floor() as usize;
            let rest = position - base as f64;
            if base + 1 < n {
                Some(sorted[base] + rest * (sorted[base + 1] - sorted[base]))
            } else {
                Some(sorted[base])
            }
        }
    }
}

/// Pearson correlation over rows where both values are finite
pub(crate) fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

#[derive(Debug, Default)]
struct Summary {
    count: f64,
    mean: Option<f64>,
    std: Option<f64>,
    min: Option<f64>,
    p25: Option<f64>,
    p50: Option<f64>,
    p75: Option<f64>,
    max: Option<f64>,
    unique: f64,
    top: String,
    freq: Option<f64>,
}

fn summarize_numeric(col: &Float64Column) -> Summary {
    let mut values = col.valid_values();
    values.sort_by(|a, b| a.total_cmp(b));
    if values.is_empty() {
        return Summary::default();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let mut distinct = values.clone();
    distinct.dedup_by(|a, b| a == b);

    Summary {
        count: n,
        mean: Some(mean),
        std: Some(variance.sqrt()),
        min: values.first().copied(),
        p25: percentile_sorted(&values, 0.25),
        p50: percentile_sorted(&values, 0.5),
        p75: percentile_sorted(&values, 0.75),
        max: values.last().copied(),
        unique: distinct.len() as f64,
        top: String::new(),
        freq: None,
    }
}

fn summarize_string(col: &StringColumn) -> Summary {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut count = 0usize;
    for (row, value) in col.iter().enumerate() {
        if value.is_empty() {
            continue;
        }
        count += 1;
        counts.entry(value).or_insert((0, row)).0 += 1;
    }

    // most frequent, earliest first appearance on ties
    let top = counts
        .iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(value, (freq, _))| (value.to_string(), *freq as f64));

    Summary {
        count: count as f64,
        unique: counts.len() as f64,
        top: top.as_ref().map(|t| t.0.clone()).unwrap_or_default(),
        freq: top.map(|t| t.1),
        ..Summary::default()
    }
}

impl Table {
    /// Per-column summary, numeric columns first
    ///
    /// Columns: `column, count, mean, std, min, 25%, 50%, 75%, max, unique,
    /// top, freq`. The standard deviation is the population one. Numeric
    /// statistics are null for string columns; `top` is empty and `freq`
    /// null for numeric columns.
    pub fn describe(&self) -> Result<Table> {
        let mut ordered: Vec<(&str, &Column)> = self
            .columns()
            .filter(|(_, c)| matches!(c, Column::Float64(_)))
            .collect();
        ordered.extend(self.columns().filter(|(_, c)| matches!(c, Column::String(_))));

        let summaries: Vec<Summary> = ordered
            .par_iter()
            .map(|(_, column)| match column {
                Column::Float64(c) => summarize_numeric(c),
                Column::String(c) => summarize_string(c),
            })
            .collect();

        let numeric = |f: fn(&Summary) -> Option<f64>| {
            Column::Float64(Float64Column::from_options(summaries.iter().map(f).collect()))
        };

        Table::from_named_columns(vec![
            (
                "column".to_string(),
                Column::String(StringColumn::new(
                    ordered.iter().map(|(name, _)| name.to_string()).collect(),
                )),
            ),
            ("count".to_string(), numeric(|s| Some(s.count))),
            ("mean".to_string(), numeric(|s| s.mean)),
            ("std".to_string(), numeric(|s| s.std)),
            ("min".to_string(), numeric(|s| s.min)),
            ("25%".to_string(), numeric(|s| s.p25)),
            ("50%".to_string(), numeric(|s| s.p50)),
            ("75%".to_string(), numeric(|s| s.p75)),
            ("max".to_string(), numeric(|s| s.max)),
            ("unique".to_string(), numeric(|s| Some(s.unique))),
            (
                "top".to_string(),
                Column::String(StringColumn::new(summaries.iter().map(|s| s.top.clone()).collect())),
            ),
            ("freq".to_string(), numeric(|s| s.freq)),
        ])
    }

    fn numeric_column(&self, name: &str) -> Result<&Float64Column> {
        self.column(name)?.as_float64().ok_or_else(|| {
            Error::UnsupportedOperation(format!("column '{}' is not numeric", name))
        })
    }

    /// Sum of the valid values of a numeric column
    pub fn sum(&self, column: &str) -> Result<f64> {
        Ok(self.numeric_column(column)?.sum())
    }

    /// Mean of the valid values of a numeric column, `None` if there are none
    pub fn mean(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.numeric_column(column)?.mean())
    }

    /// Percentile `p` (in `[0, 1]`) with linear interpolation
    pub fn percentile(&self, column: &str, p: f64) -> Result<Option<f64>> {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::InvalidInput(format!(
                "percentile must be within [0, 1], got {}",
                p
            )));
        }
        let mut values = self.numeric_column(column)?.valid_values();
        values.sort_by(|a, b| a.total_cmp(b));
        Ok(percentile_sorted(&values, p))
    }

    /// Pearson correlation of two numeric columns
    ///
    /// Rows with a non-finite value in either column are ignored; fewer than
    /// two remaining rows or a constant column give NaN.
    pub fn corr(&self, a: &str, b: &str) -> Result<f64> {
        let x = self.numeric_column(a)?;
        let y = self.numeric_column(b)?;
        Ok(pearson(x.values(), y.values()))
    }

    /// Correlation matrix over all numeric columns
    ///
    /// One column per numeric column; row `i` holds the correlations with the
    /// `i`-th numeric column. The diagonal is 1.
    pub fn corr_matrix(&self) -> Result<Table> {
        let numeric: Vec<(&str, &Float64Column)> = self
            .columns()
            .filter_map(|(name, c)| c.as_float64().map(|c| (name, c)))
            .collect();
        if numeric.is_empty() {
            return Err(Error::UnsupportedOperation(
                "no numeric columns for a correlation matrix".to_string(),
            ));
        }

        let n = numeric.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        let values: Vec<f64> = pairs
            .par_iter()
            .map(|&(i, j)| pearson(numeric[i].1.values(), numeric[j].1.values()))
            .collect();

        let mut matrix = vec![vec![1.0; n]; n];
        for (&(i, j), &r) in pairs.iter().zip(&values) {
            matrix[i][j] = r;
            matrix[j][i] = r;
        }

        Table::from_named_columns(
            numeric
                .iter()
                .zip(matrix)
                .map(|((name, _), column)| {
                    (name.to_string(), Column::Float64(Float64Column::new(column)))
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Value;

    fn table() -> Table {
        Table::from_columns(vec![
            ("x", vec![Value::from(1.0), Value::from(2.0), Value::from(3.0), Value::from(4.0)]),
            ("y", vec![Value::from(2.0), Value::from(4.0), Value::from(6.0), Value::Null]),
            ("tag", vec![Value::from("a"), Value::from("b"), Value::from("a"), Value::Null]),
        ])
        .unwrap()
    }

    #[test]
    fn percentile_interpolates() {
        assert_eq!(percentile_sorted(&[1.0, 2.0, 3.0, 4.0], 0.5), Some(2.5));
        assert_eq!(percentile_sorted(&[], 0.5), None);
        assert_eq!(table().percentile("x", 0.25).unwrap(), Some(1.75));
        assert!(table().percentile("tag", 0.5).is_err());
    }

    #[test]
    fn corr_skips_missing_pairs() {
        let t = table();
        assert!((t.corr("x", "y").unwrap() - 1.0).abs() < 1e-12);
        assert!(t.corr("x", "tag").is_err());
        let constant = Table::from_columns(vec![
            ("a", vec![Value::from(1.0), Value::from(1.0)]),
            ("b", vec![Value::from(1.0), Value::from(2.0)]),
        ])
        .unwrap();
        assert!(constant.corr("a", "b").unwrap().is_nan());
    }

    #[test]
    fn corr_matrix_is_symmetric() {
        let m = table().corr_matrix().unwrap();
        assert_eq!(m.column_names(), &["x", "y"]);
        assert_eq!(m.row(0).unwrap().get("x"), Some(&Value::Number(1.0)));
        assert_eq!(m.row(0).unwrap().get("y"), m.row(1).unwrap().get("x"));
    }

    #[test]
    fn describe_orders_numeric_first() {
        let d = table().describe().unwrap();
        assert_eq!(d.row_count(), 3);
        let y = d.row(1).unwrap();
        assert_eq!(y.get("count"), Some(&Value::Number(3.0)));
        assert_eq!(y.get("mean"), Some(&Value::Number(4.0)));
        assert_eq!(y.get("top"), Some(&Value::Null));
        let tag = d.row(2).unwrap();
        assert_eq!(tag.get("column"), Some(&Value::from("tag")));
        assert_eq!(tag.get("top"), Some(&Value::from("a")));
        assert_eq!(tag.get("freq"), Some(&Value::Number(2.0)));
        assert_eq!(tag.get("mean"), Some(&Value::Null));
        assert_eq!(tag.get("unique"), Some(&Value::Number(2.0)));
    }
}
