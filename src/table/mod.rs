//! Table facade
//!
//! [`Table`] is split across files by concern, each adding an `impl Table`
//! block: construction and accessors, row growth, selection, grouping, joins,
//! sorting, statistics, missing values, arithmetic and queries.

mod arith;
mod core;
mod group;
mod join;
mod na;
mod query;
mod row_ops;
mod select;
mod sort;
mod stats;

pub use self::core::Table;
pub use arith::Operand;
pub use group::GroupBy;
pub use join::{JoinType, MergeOptions};
pub use na::{Axis, DropHow, DropNa};
pub use query::{ArithOp, CompareOp, Expr, Lexer, Parser, Predicate, Token};
pub use select::RowView;
