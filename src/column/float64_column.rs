use std::sync::Arc;

use crate::column::common::BitMask;
use crate::error::{Error, Result};

/// Numeric column backed by an f64 buffer
///
/// NaN is the missing-value sentinel for input data. Computed cells that have
/// no value at all (the mean of an empty group, the right side of an unmatched
/// left join) are marked in the optional null mask instead, so they stay
/// distinguishable from NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Float64Column {
    pub(crate) data: Arc<Vec<f64>>,
    pub(crate) null_mask: Option<BitMask>,
}

impl Float64Column {
    /// Creates a column without nulls
    pub fn new(data: Vec<f64>) -> Self {
        Self {
            data: Arc::new(data),
            null_mask: None,
        }
    }

    /// Creates a column with a null mask
    pub fn with_nulls(data: Vec<f64>, nulls: Vec<bool>) -> Self {
        let null_mask = if nulls.iter().any(|&is_null| is_null) {
            Some(BitMask::from_bools(&nulls))
        } else {
            None
        };

        Self {
            data: Arc::new(data),
            null_mask,
        }
    }

    /// Creates a column where `None` becomes null
    pub fn from_options(values: Vec<Option<f64>>) -> Self {
        let nulls: Vec<bool> = values.iter().map(Option::is_none).collect();
        let data = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        Self::with_nulls(data, nulls)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw buffer; null slots hold NaN
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Checked access: `None` for a null slot, NaN is returned as a value
    pub fn get(&self, index: usize) -> Result<Option<f64>> {
        if index >= self.data.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.data.len(),
            });
        }
        Ok(self.value_at(index))
    }

    #[inline]
    pub(crate) fn value_at(&self, index: usize) -> Option<f64> {
        if self.is_null(index) {
            None
        } else {
            Some(self.data[index])
        }
    }

    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        match &self.null_mask {
            Some(mask) => mask.is_set(index),
            None => false,
        }
    }

    /// Null or NaN
    #[inline]
    pub fn is_missing(&self, index: usize) -> bool {
        self.is_null(index) || self.data[index].is_nan()
    }

    /// Value at `index` unless it is missing
    #[inline]
    pub fn valid_value(&self, index: usize) -> Option<f64> {
        if self.is_missing(index) {
            None
        } else {
            Some(self.data[index])
        }
    }

    /// All non-missing values in row order
    pub fn valid_values(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|i| self.valid_value(i)).collect()
    }

    /// Appends a value (`None` appends a null)
    ///
    /// The buffer is shared copy-on-write; tables that still reference the
    /// old buffer keep seeing the old contents.
    pub fn push(&mut self, value: Option<f64>) {
        let row = self.data.len();
        Arc::make_mut(&mut self.data).push(value.unwrap_or(f64::NAN));
        match (&mut self.null_mask, value) {
            (Some(mask), v) => mask.push(v.is_none()),
            (None, None) => {
                let mut mask = BitMask::new(row);
                mask.push(true);
                self.null_mask = Some(mask);
            }
            (None, Some(_)) => {}
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> Self {
        let data = self.data[start..end].to_vec();
        match &self.null_mask {
            None => Self::new(data),
            Some(mask) => {
                let nulls = (start..end).map(|i| mask.is_set(i)).collect();
                Self::with_nulls(data, nulls)
            }
        }
    }

    pub fn take(&self, indices: &[usize]) -> Self {
        let data = indices.iter().map(|&i| self.data[i]).collect();
        match &self.null_mask {
            None => Self::new(data),
            Some(mask) => {
                let nulls = indices.iter().map(|&i| mask.is_set(i)).collect();
                Self::with_nulls(data, nulls)
            }
        }
    }

    pub fn take_optional(&self, indices: &[Option<usize>]) -> Self {
        Self::from_options(
            indices
                .iter()
                .map(|idx| idx.and_then(|i| self.value_at(i)))
                .collect(),
        )
    }

    /// Number of non-missing values
    pub fn count(&self) -> usize {
        (0..self.len()).filter(|&i| !self.is_missing(i)).count()
    }

    /// Sum of non-missing values (0 when there are none)
    pub fn sum(&self) -> f64 {
        (0..self.len()).filter_map(|i| self.valid_value(i)).sum()
    }

    /// Mean of non-missing values
    pub fn mean(&self) -> Option<f64> {
        let count = self.count();
        if count == 0 {
            None
        } else {
            Some(self.sum() / count as f64)
        }
    }

    /// Minimum of non-missing values
    pub fn min(&self) -> Option<f64> {
        (0..self.len())
            .filter_map(|i| self.valid_value(i))
            .fold(None, |min, x| Some(min.map_or(x, |m: f64| m.min(x))))
    }

    /// Maximum of non-missing values
    pub fn max(&self) -> Option<f64> {
        (0..self.len())
            .filter_map(|i| self.valid_value(i))
            .fold(None, |max, x| Some(max.map_or(x, |m: f64| m.max(x))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_and_null_are_both_missing_but_distinct() {
        let col = Float64Column::from_options(vec![Some(1.0), None, Some(f64::NAN)]);
        assert_eq!(col.get(1).unwrap(), None);
        assert!(col.get(2).unwrap().unwrap().is_nan());
        assert!(col.is_missing(1));
        assert!(col.is_missing(2));
        assert_eq!(col.count(), 1);
        assert_eq!(col.mean(), Some(1.0));
    }

    #[test]
    fn push_does_not_touch_shared_buffer() {
        let original = Float64Column::new(vec![1.0, 2.0]);
        let mut grown = original.clone();
        grown.push(Some(3.0));
        grown.push(None);
        assert_eq!(original.len(), 2);
        assert_eq!(grown.len(), 4);
        assert!(grown.is_null(3));
        assert!(!grown.is_null(2));
    }

    #[test]
    fn aggregates_skip_missing() {
        let col = Float64Column::new(vec![3.0, f64::NAN, -1.0]);
        assert_eq!(col.sum(), 2.0);
        assert_eq!(col.min(), Some(-1.0));
        assert_eq!(col.max(), Some(3.0));
        assert_eq!(Float64Column::new(vec![f64::NAN]).mean(), None);
    }
}
