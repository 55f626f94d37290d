//! In-memory columnar tables with grouped aggregation
//!
//! A [`Table`] holds typed columns (numeric or string) with explicit
//! missing-value sentinels. Grouped aggregation runs either on the calling
//! thread through [`Table::group_by`] or on a bounded worker pool through
//! [`Table::concurrent_group_by`]; both produce the same result table.
//!
//! ```no_run
//! use colagg::{AggOp, AggSpec, Record, Table};
//!
//! # fn main() -> colagg::Result<()> {
//! let table = Table::from_records(vec![
//!     Record::new().with("region", "east").with("sales", 10.0),
//!     Record::new().with("region", "east").with("sales", 20.0),
//! ])?;
//! let spec = AggSpec::new().agg("sales", [AggOp::Sum, AggOp::Mean]);
//! let by_region = table.group_by(&["region"])?.agg(&spec)?;
//! let parallel = table.concurrent_group_by(&["region"], &spec)?;
//! assert_eq!(by_region.to_json()?, parallel.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod column;
pub mod config;
pub mod datagen;
pub mod error;
pub mod groupby;
pub mod parallel;
pub mod table;

pub use column::{Column, ColumnType, Record, Value};
pub use config::ParallelConfig;
pub use error::{Error, Result};
pub use groupby::{AggOp, AggSpec, GroupKey};
pub use parallel::{CancellationToken, WorkerPool};
pub use table::{JoinType, MergeOptions, Predicate, Table};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
