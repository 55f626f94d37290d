mod common;
mod float64_column;
mod string_column;
mod value;

pub use common::{BitMask, Column, ColumnType};
pub use float64_column::Float64Column;
pub use string_column::StringColumn;
pub use value::{Record, Value};
