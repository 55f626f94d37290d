//! Per-group, per-column sufficient statistics
//!
//! A [`PartialAggregate`] holds `{sum, count, min, max}` plus the first and
//! last observed values tagged with their global row index. Every derived
//! aggregate is computed from these after all partials for a group are merged,
//! so merging is associative and commutative: sums and counts add, min/max
//! fold with infinite neutral elements, and first/last keep the lowest/highest
//! row index.

use crate::column::{Column, ColumnType, Value};
use crate::groupby::AggOp;
use crate::parallel::merge::MergeInvariantViolation;

/// Neumaier-compensated running sum
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    #[inline]
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if !t.is_finite() {
            // infinities and overflow carry no recoverable error term
            self.sum = t;
            return;
        }
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn merge(&mut self, other: &CompensatedSum) {
        self.add(other.sum);
        self.add(other.compensation);
    }

    pub fn value(&self) -> f64 {
        if !self.sum.is_finite() {
            return self.sum;
        }
        self.sum + self.compensation
    }
}

/// Mergeable accumulator for one aggregated column within one group
#[derive(Debug, Clone, PartialEq)]
pub struct PartialAggregate {
    column_type: ColumnType,
    sum: CompensatedSum,
    count: u64,
    min: f64,
    max: f64,
    first: Option<(usize, Value)>,
    last: Option<(usize, Value)>,
}

impl PartialAggregate {
    /// Empty accumulator; min/max start at their neutral elements
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            sum: CompensatedSum::default(),
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            first: None,
            last: None,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum.value()
    }

    /// Folds row `row` of `column` into the accumulator
    ///
    /// `global_row` is the row's index in the whole table, used to order
    /// first/last across chunks. Missing values are excluded from the
    /// statistics but still count as first/last observations.
    #[inline]
    pub fn update(&mut self, column: &Column, row: usize, global_row: usize) {
        match column {
            Column::Float64(col) => {
                if let Some(v) = col.valid_value(row) {
                    self.sum.add(v);
                    self.count += 1;
                    if v < self.min {
                        self.min = v;
                    }
                    if v > self.max {
                        self.max = v;
                    }
                }
            }
            Column::String(col) => {
                if !col.is_missing(row) {
                    self.count += 1;
                }
            }
        }

        if self.first.is_none() {
            self.first = Some((global_row, column.value(row)));
        }
        self.last = Some((global_row, column.value(row)));
    }

    /// Merges another partial for the same group and column into this one
    pub(crate) fn merge(&mut self, other: &PartialAggregate) -> Result<(), MergeInvariantViolation> {
        if self.column_type != other.column_type {
            return Err(MergeInvariantViolation {
                expected: self.column_type,
                found: other.column_type,
            });
        }

        self.sum.merge(&other.sum);
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);

        if let Some((row, value)) = &other.first {
            let replace = match &self.first {
                Some((mine, _)) => row < mine,
                None => true,
            };
            if replace {
                self.first = Some((*row, value.clone()));
            }
        }
        if let Some((row, value)) = &other.last {
            let replace = match &self.last {
                Some((mine, _)) => row > mine,
                None => true,
            };
            if replace {
                self.last = Some((*row, value.clone()));
            }
        }
        Ok(())
    }

    /// Final value of `op`
    ///
    /// `mean`, `min` and `max` of a group with no valid values are null,
    /// never NaN; `sum` of no values is 0.
    pub fn finalize(&self, op: AggOp) -> Value {
        match op {
            AggOp::Sum => Value::Number(self.sum.value()),
            AggOp::Count => Value::Number(self.count as f64),
            AggOp::Mean if self.count > 0 => Value::Number(self.sum.value() / self.count as f64),
            AggOp::Min if self.count > 0 => Value::Number(self.min),
            AggOp::Max if self.count > 0 => Value::Number(self.max),
            AggOp::Mean | AggOp::Min | AggOp::Max => Value::Null,
            AggOp::First => self.first.as_ref().map(|(_, v)| v.clone()).unwrap_or(Value::Null),
            AggOp::Last => self.last.as_ref().map(|(_, v)| v.clone()).unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Float64Column;

    fn partial_over(values: &[f64], offset: usize) -> PartialAggregate {
        let col = Column::Float64(Float64Column::new(values.to_vec()));
        let mut p = PartialAggregate::new(ColumnType::Float64);
        for i in 0..values.len() {
            p.update(&col, i, offset + i);
        }
        p
    }

    #[test]
    fn mean_is_recomputed_not_averaged() {
        // uneven chunk sizes: averaging the two chunk means would give 5.5
        let mut a = partial_over(&[1.0], 0);
        let b = partial_over(&[10.0, 10.0, 10.0], 1);
        a.merge(&b).unwrap();
        assert_eq!(a.finalize(AggOp::Mean), Value::Number(31.0 / 4.0));
    }

    #[test]
    fn merge_order_does_not_matter() {
        let parts = [
            partial_over(&[4.0, f64::NAN], 0),
            partial_over(&[-2.0], 2),
            partial_over(&[7.5, 1.0], 3),
        ];
        let mut forward = parts[0].clone();
        forward.merge(&parts[1]).unwrap();
        forward.merge(&parts[2]).unwrap();

        let mut backward = parts[2].clone();
        backward.merge(&parts[1]).unwrap();
        backward.merge(&parts[0]).unwrap();

        for op in [AggOp::Sum, AggOp::Mean, AggOp::Min, AggOp::Max, AggOp::Count, AggOp::First, AggOp::Last] {
            assert_eq!(forward.finalize(op), backward.finalize(op), "{}", op);
        }
        assert_eq!(forward.finalize(AggOp::First), Value::Number(4.0));
        assert_eq!(forward.finalize(AggOp::Last), Value::Number(1.0));
        assert_eq!(forward.finalize(AggOp::Count), Value::Number(4.0));
    }

    #[test]
    fn empty_group_finalizes_to_null_not_nan() {
        let p = partial_over(&[f64::NAN], 0);
        assert_eq!(p.finalize(AggOp::Mean), Value::Null);
        assert_eq!(p.finalize(AggOp::Min), Value::Null);
        assert_eq!(p.finalize(AggOp::Sum), Value::Number(0.0));
        assert_eq!(p.finalize(AggOp::Count), Value::Number(0.0));
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let mut a = PartialAggregate::new(ColumnType::Float64);
        let b = PartialAggregate::new(ColumnType::String);
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn compensated_sum_keeps_small_terms() {
        let mut s = CompensatedSum::default();
        s.add(1e16);
        s.add(1.0);
        s.add(-1e16);
        assert_eq!(s.value(), 1.0);
    }

    #[test]
    fn infinite_and_overflowing_sums_stay_infinite() {
        let mut s = CompensatedSum::default();
        s.add(f64::INFINITY);
        s.add(1.0);
        assert_eq!(s.value(), f64::INFINITY);

        let mut overflow = CompensatedSum::default();
        overflow.add(1e308);
        overflow.add(1e308);
        assert_eq!(overflow.value(), f64::INFINITY);

        let mut merged = partial_over(&[f64::NEG_INFINITY], 0);
        merged.merge(&partial_over(&[2.0, 3.0], 1)).unwrap();
        assert_eq!(merged.finalize(AggOp::Sum), Value::Number(f64::NEG_INFINITY));
        assert_eq!(merged.finalize(AggOp::Mean), Value::Number(f64::NEG_INFINITY));

        let mut opposite = CompensatedSum::default();
        opposite.add(f64::INFINITY);
        opposite.add(f64::NEG_INFINITY);
        assert!(opposite.value().is_nan());
    }
}
