//! Group-by aggregation
//!
//! [`GroupByPlan`] validates a request against a table, the
//! [`SequentialAggregator`] kernel turns rows into [`GroupPartial`]s, and the
//! plan materializes merged partials into a result [`Table`](crate::Table).
//! [`GroupBy`](crate::table::GroupBy) on the table facade is the usual entry
//! point.

mod key;
mod ops;
mod partial;
mod plan;
mod sequential;

pub use key::{GroupKey, KeyPart};
pub use ops::{AggOp, AggSpec};
pub use partial::{CompensatedSum, PartialAggregate};
pub use plan::GroupByPlan;
pub use sequential::{GroupPartial, SequentialAggregator, CANCEL_CHECK_INTERVAL};
