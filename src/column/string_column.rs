use std::sync::Arc;

use crate::error::{Error, Result};

/// String column; the empty string is the missing-value sentinel
#[derive(Debug, Clone, PartialEq)]
pub struct StringColumn {
    pub(crate) data: Arc<Vec<String>>,
}

impl StringColumn {
    pub fn new(data: Vec<String>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checked access: `None` for a missing value
    pub fn get(&self, index: usize) -> Result<Option<&str>> {
        if index >= self.data.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.data.len(),
            });
        }
        match self.data[index].as_str() {
            "" => Ok(None),
            s => Ok(Some(s)),
        }
    }

    #[inline]
    pub(crate) fn value_at(&self, index: usize) -> &str {
        &self.data[index]
    }

    #[inline]
    pub fn is_missing(&self, index: usize) -> bool {
        self.data[index].is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(String::as_str)
    }

    /// Appends a value, sharing the buffer copy-on-write
    pub fn push(&mut self, value: String) {
        Arc::make_mut(&mut self.data).push(value);
    }

    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self::new(self.data[start..end].to_vec())
    }

    pub fn take(&self, indices: &[usize]) -> Self {
        Self::new(indices.iter().map(|&i| self.data[i].clone()).collect())
    }

    pub fn take_optional(&self, indices: &[Option<usize>]) -> Self {
        Self::new(
            indices
                .iter()
                .map(|idx| idx.map(|i| self.data[i].clone()).unwrap_or_default())
                .collect(),
        )
    }

    /// Number of non-missing values
    pub fn count(&self) -> usize {
        self.data.iter().filter(|s| !s.is_empty()).count()
    }
}
