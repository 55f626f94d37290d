//! Parallel group-by execution
//!
//! The [`ChunkPlanner`] tiles a table into row-range chunks, the
//! [`WorkerPool`] runs the group-by kernel over them on a fixed set of threads
//! in bounded batches, and the [`ResultMerger`] folds the per-chunk partials.
//! A pool serves exactly one call and is torn down when the call resolves.

pub(crate) mod merge;
mod planner;
mod pool;

pub use merge::ResultMerger;
pub use planner::{Chunk, ChunkPlanner, ChunkRange};
pub use pool::{CancellationToken, ChunkKernel, PoolState, WorkerPool};
