//! Structural composite group keys
//!
//! A key is a tuple of typed parts, one per group-by column. Equality and
//! hashing work on the parts themselves, so two distinct tuples can never
//! collide the way delimiter-joined strings do (`("a|b", "c")` vs `("a", "b|c")`).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::column::{Column, Value};

/// One component of a group key
#[derive(Debug, Clone)]
pub enum KeyPart {
    /// Numeric value; every missing numeric (NaN or null) is the same part
    Number(f64),
    /// String value; the empty string is the missing part
    Text(String),
}

impl KeyPart {
    /// Canonical bit pattern: folds -0.0 into 0.0 and every NaN into one NaN
    fn canonical_bits(v: f64) -> u64 {
        if v.is_nan() {
            f64::NAN.to_bits()
        } else if v == 0.0 {
            0.0f64.to_bits()
        } else {
            v.to_bits()
        }
    }

    /// Reads the key part for `row` from `column`
    pub fn from_column(column: &Column, row: usize) -> Self {
        match column {
            Column::Float64(col) => KeyPart::Number(col.value_at(row).unwrap_or(f64::NAN)),
            Column::String(col) => KeyPart::Text(col.value_at(row).to_string()),
        }
    }

    /// Exported value of the part
    pub fn to_value(&self) -> Value {
        match self {
            KeyPart::Number(v) => Value::Number(*v),
            KeyPart::Text(s) if s.is_empty() => Value::Null,
            KeyPart::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl PartialEq for KeyPart {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyPart::Number(a), KeyPart::Number(b)) => {
                Self::canonical_bits(*a) == Self::canonical_bits(*b)
            }
            (KeyPart::Text(a), KeyPart::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for KeyPart {}

impl Hash for KeyPart {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            KeyPart::Number(v) => {
                0u8.hash(state);
                Self::canonical_bits(*v).hash(state);
            }
            KeyPart::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Number(a), KeyPart::Number(b)) => {
                let a = f64::from_bits(Self::canonical_bits(*a));
                let b = f64::from_bits(Self::canonical_bits(*b));
                a.total_cmp(&b)
            }
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            (KeyPart::Number(_), KeyPart::Text(_)) => Ordering::Less,
            (KeyPart::Text(_), KeyPart::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Number(v) => write!(f, "{}", v),
            KeyPart::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Composite group key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GroupKey(pub Vec<KeyPart>);

impl GroupKey {
    /// Builds the key of `row` over `columns`
    pub fn from_row(columns: &[&Column], row: usize) -> Self {
        GroupKey(
            columns
                .iter()
                .map(|col| KeyPart::from_column(col, row))
                .collect(),
        )
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", part)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn text(s: &str) -> KeyPart {
        KeyPart::Text(s.to_string())
    }

    #[test]
    fn delimiter_inside_values_does_not_collide() {
        let a = GroupKey(vec![text("a|b"), text("c")]);
        let b = GroupKey(vec![text("a"), text("b|c")]);
        let c = GroupKey(vec![text("a_b"), text("c")]);
        let d = GroupKey(vec![text("a"), text("b_c")]);
        let set: HashSet<_> = [a, b, c, d].into_iter().collect();
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn number_and_text_parts_differ() {
        assert_ne!(KeyPart::Number(1.0), text("1"));
    }

    #[test]
    fn missing_numbers_share_one_group() {
        let nan_a = KeyPart::Number(f64::NAN);
        let nan_b = KeyPart::Number(-f64::NAN);
        assert_eq!(nan_a, nan_b);
        assert_eq!(KeyPart::Number(0.0), KeyPart::Number(-0.0));
    }

    #[test]
    fn ordering_is_total() {
        let mut parts = vec![KeyPart::Number(f64::NAN), KeyPart::Number(2.0), text("x"), KeyPart::Number(-1.0)];
        parts.sort();
        assert_eq!(parts[0], KeyPart::Number(-1.0));
        assert_eq!(parts[1], KeyPart::Number(2.0));
        assert_eq!(parts[3], text("x"));
    }
}
