//! Fixed-size worker pool with batched dispatch and per-task timeouts
//!
//! Workers are plain threads fed through a crossbeam channel. A task carries
//! its chunk by value and the result comes back by value on a shared result
//! channel, so no mutable state is shared between the driver and the workers
//! apart from the abort flag and the live-worker counter.
//!
//! The driver dispatches at most `min(batch_cap, workers)` chunks at a time
//! and waits for the whole batch before sending the next one. The first
//! timeout, failure or cancellation aborts the call; the pool is torn down
//! whatever the outcome.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use crate::config::ParallelConfig;
use crate::error::{Error, Result};
use crate::groupby::{GroupByPlan, GroupPartial};
use crate::parallel::{Chunk, ChunkPlanner, ResultMerger};
use crate::table::Table;

/// How often a waiting driver re-checks the caller's cancellation token
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Function run by a worker for one chunk
///
/// The kernel must poll the token it is given. Timeouts, cancellation and
/// teardown only raise that flag; a worker thread cannot be interrupted, so a
/// kernel that never checks it keeps `execute` waiting until it returns.
pub type ChunkKernel =
    Arc<dyn Fn(&Chunk, &CancellationToken) -> Result<Vec<GroupPartial>> + Send + Sync>;

/// Cooperative cancellation flag shared between a caller and running work
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a pool; `Completed` and `Failed` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Idle,
    Planning,
    Dispatching,
    Completed,
    Failed,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Idle => "idle",
            PoolState::Planning => "planning",
            PoolState::Dispatching => "dispatching",
            PoolState::Completed => "completed",
            PoolState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

struct Task {
    chunk: Chunk,
    kernel: ChunkKernel,
}

enum TaskResult {
    Done {
        chunk_index: usize,
        groups: Vec<GroupPartial>,
    },
    Failed {
        chunk_index: usize,
        error: Error,
    },
}

/// Decrements the live-worker count when a worker thread exits, panicking or not
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Single-use pool of worker threads for one parallel group-by call
pub struct WorkerPool {
    config: ParallelConfig,
    state: PoolState,
    kernel: Option<ChunkKernel>,
    abort: CancellationToken,
    task_tx: Option<Sender<Task>>,
    result_rx: Receiver<TaskResult>,
    handles: Vec<JoinHandle<()>>,
    live: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawns `config.workers` worker threads
    pub fn new(config: ParallelConfig) -> Result<Self> {
        config.validate()?;

        let (task_tx, task_rx) = unbounded::<Task>();
        let (result_tx, result_rx) = unbounded::<TaskResult>();
        let abort = CancellationToken::new();
        let live = Arc::new(AtomicUsize::new(0));

        let mut pool = WorkerPool {
            config,
            state: PoolState::Idle,
            kernel: None,
            abort,
            task_tx: Some(task_tx),
            result_rx,
            handles: Vec::new(),
            live,
        };

        for id in 0..pool.config.workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let abort = pool.abort.clone();
            pool.live.fetch_add(1, Ordering::SeqCst);
            let guard = LiveGuard(Arc::clone(&pool.live));

            let spawned = thread::Builder::new()
                .name(format!("colagg-worker-{}", id))
                .spawn(move || {
                    let _guard = guard;
                    worker_loop(id, task_rx, result_tx, abort);
                });

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(err) => {
                    pool.shutdown();
                    return Err(Error::Io(err));
                }
            }
        }

        Ok(pool)
    }

    /// Pool whose workers run `kernel` instead of the group-by kernel
    ///
    /// See [`ChunkKernel`]: a timeout is reported promptly only if `kernel`
    /// checks its token while it runs.
    pub fn with_kernel(config: ParallelConfig, kernel: ChunkKernel) -> Result<Self> {
        let mut pool = Self::new(config)?;
        pool.kernel = Some(kernel);
        Ok(pool)
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Worker threads that have not exited yet
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Runs `plan` over `table` and returns the merged partials
    ///
    /// Fails fast: the first timeout, task failure or cancellation aborts the
    /// call and no partial result is returned. The pool is torn down before
    /// this returns, so it can run only one call.
    pub fn execute(
        &mut self,
        table: &Table,
        plan: &GroupByPlan,
        cancel: &CancellationToken,
    ) -> Result<Vec<GroupPartial>> {
        if self.state != PoolState::Idle {
            return Err(Error::InvalidInput(format!(
                "worker pool already used (state: {})",
                self.state
            )));
        }

        let started = Instant::now();
        let outcome = self.run(table, plan, cancel);
        self.state = match outcome {
            Ok(_) => PoolState::Completed,
            Err(_) => PoolState::Failed,
        };
        self.shutdown();

        match &outcome {
            Ok(groups) => info!(
                "parallel group-by finished: {} group(s) in {:?}",
                groups.len(),
                started.elapsed()
            ),
            Err(Error::Cancelled) => warn!("parallel group-by cancelled"),
            Err(err) => error!("parallel group-by failed: {}", err),
        }
        outcome
    }

    fn run(
        &mut self,
        table: &Table,
        plan: &GroupByPlan,
        cancel: &CancellationToken,
    ) -> Result<Vec<GroupPartial>> {
        self.state = PoolState::Planning;
        let chunks = ChunkPlanner::new(&self.config).split(table, &plan.required_columns())?;
        let kernel = match &self.kernel {
            Some(kernel) => Arc::clone(kernel),
            None => {
                let plan = plan.clone();
                Arc::new(move |chunk: &Chunk, token: &CancellationToken| {
                    plan.aggregate_chunk(chunk, token)
                }) as ChunkKernel
            }
        };

        self.state = PoolState::Dispatching;
        let batch_size = self.config.batch_size();
        let batch_count = (chunks.len() + batch_size - 1) / batch_size;
        let mut merger = ResultMerger::new();
        let mut chunks = chunks.into_iter().peekable();
        let mut batch_no = 0;

        while chunks.peek().is_some() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let batch: Vec<Chunk> = chunks.by_ref().take(batch_size).collect();
            debug!(
                "dispatching batch {}/{} with {} chunk(s)",
                batch_no + 1,
                batch_count,
                batch.len()
            );
            let results = self.run_batch(batch, &kernel, cancel)?;
            for (chunk_index, groups) in results {
                merger.merge_chunk(chunk_index, groups)?;
            }
            debug!("batch {} merged, {} group(s) so far", batch_no + 1, merger.len());
            batch_no += 1;

            if chunks.peek().is_some() {
                thread::yield_now();
                let pause = self.config.batch_pause();
                if !pause.is_zero() {
                    thread::sleep(pause);
                }
            }
        }

        Ok(merger.finish())
    }

    /// Dispatches one batch and waits for all of it; results are in chunk order
    fn run_batch(
        &self,
        batch: Vec<Chunk>,
        kernel: &ChunkKernel,
        cancel: &CancellationToken,
    ) -> Result<Vec<(usize, Vec<GroupPartial>)>> {
        let sender = self
            .task_tx
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("worker pool is shut down".to_string()))?;

        let timeout = self.config.task_timeout();
        let mut pending: HashMap<usize, Instant> = HashMap::with_capacity(batch.len());
        for chunk in batch {
            let chunk_index = chunk.index;
            let task = Task {
                chunk,
                kernel: Arc::clone(kernel),
            };
            if sender.send(task).is_err() {
                return Err(Error::TaskFailure {
                    chunk_index,
                    cause: "worker channel disconnected".to_string(),
                });
            }
            pending.insert(chunk_index, Instant::now() + timeout);
        }

        let mut done = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let Some((chunk_index, deadline)) = pending
                .iter()
                .map(|(&i, &d)| (i, d))
                .min_by_key(|&(i, d)| (d, i))
            else {
                break;
            };
            let now = Instant::now();
            if now >= deadline {
                warn!("chunk {} exceeded the task timeout of {:?}", chunk_index, timeout);
                return Err(Error::WorkerTimeout {
                    chunk_index,
                    timeout,
                });
            }

            match self.result_rx.recv_timeout((deadline - now).min(POLL_INTERVAL)) {
                Ok(TaskResult::Done {
                    chunk_index,
                    groups,
                }) => {
                    pending.remove(&chunk_index);
                    done.push((chunk_index, groups));
                }
                Ok(TaskResult::Failed { chunk_index, error }) => {
                    return Err(Error::TaskFailure {
                        chunk_index,
                        cause: error.to_string(),
                    });
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::TaskFailure {
                        chunk_index,
                        cause: "all workers exited".to_string(),
                    });
                }
            }
        }

        done.sort_by_key(|(chunk_index, _)| *chunk_index);
        Ok(done)
    }

    /// Stops every worker and waits for the threads to exit
    ///
    /// In-flight kernels observe the abort flag at their next cancellation
    /// check. Calling this more than once is a no-op.
    pub fn shutdown(&mut self) {
        self.abort.cancel();
        self.task_tx.take();

        if self.handles.is_empty() {
            return;
        }
        let live = self.live_workers();
        if self.state != PoolState::Completed && live > 0 {
            warn!("tearing down worker pool with {} live worker(s)", live);
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked during teardown");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    id: usize,
    tasks: Receiver<Task>,
    results: Sender<TaskResult>,
    abort: CancellationToken,
) {
    debug!("worker {} started", id);
    while let Ok(Task { chunk, kernel }) = tasks.recv() {
        if abort.is_cancelled() {
            break;
        }
        let chunk_index = chunk.index;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| kernel(&chunk, &abort)));
        let message = match outcome {
            Ok(Ok(groups)) => TaskResult::Done {
                chunk_index,
                groups,
            },
            Ok(Err(error)) => TaskResult::Failed { chunk_index, error },
            Err(payload) => TaskResult::Failed {
                chunk_index,
                error: Error::InvalidInput(panic_message(payload.as_ref())),
            },
        };
        if results.send(message).is_err() {
            break;
        }
    }
    debug!("worker {} exiting", id);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", s)
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Value;
    use crate::groupby::{AggOp, AggSpec};

    fn small_config(workers: usize) -> ParallelConfig {
        ParallelConfig::builder()
            .workers(workers)
            .min_chunk_rows(2)
            .task_timeout(Duration::from_secs(1))
            .build()
            .unwrap()
    }

    fn table() -> Table {
        Table::from_columns(vec![
            (
                "k".to_string(),
                ["a", "b", "a", "b", "c", "a", "c", "b"].iter().map(|s| Value::from(*s)).collect(),
            ),
            ("v".to_string(), (1..=8).map(|i| Value::from(i as f64)).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn pool_spawns_and_tears_down_workers() {
        let mut pool = WorkerPool::new(small_config(3)).unwrap();
        assert_eq!(pool.live_workers(), 3);
        assert_eq!(pool.state(), PoolState::Idle);
        pool.shutdown();
        assert_eq!(pool.live_workers(), 0);
        pool.shutdown();
    }

    #[test]
    fn execute_merges_all_chunks() {
        let table = table();
        let spec = AggSpec::new().agg("v", [AggOp::Sum]);
        let plan = GroupByPlan::new(&table, &["k"], &spec).unwrap();
        let mut pool = WorkerPool::new(small_config(2)).unwrap();
        let groups = pool.execute(&table, &plan, &CancellationToken::new()).unwrap();

        assert_eq!(pool.state(), PoolState::Completed);
        assert_eq!(pool.live_workers(), 0);
        let sums: Vec<Value> = groups.iter().map(|g| g.aggregates[0].finalize(AggOp::Sum)).collect();
        assert_eq!(sums, vec![Value::Number(10.0), Value::Number(14.0), Value::Number(12.0)]);
    }

    #[test]
    fn kernel_error_becomes_task_failure() {
        let table = table();
        let spec = AggSpec::new().agg("v", [AggOp::Sum]);
        let plan = GroupByPlan::new(&table, &["k"], &spec).unwrap();
        let kernel: ChunkKernel = Arc::new(|chunk: &Chunk, _: &CancellationToken| -> Result<Vec<GroupPartial>> {
            if chunk.index == 2 {
                Err(Error::InvalidInput("boom".to_string()))
            } else {
                Ok(Vec::new())
            }
        });
        let mut pool = WorkerPool::with_kernel(small_config(2), kernel).unwrap();
        let err = pool.execute(&table, &plan, &CancellationToken::new()).unwrap_err();

        assert!(matches!(err, Error::TaskFailure { chunk_index: 2, .. }));
        assert_eq!(pool.state(), PoolState::Failed);
        assert_eq!(pool.live_workers(), 0);
    }

    #[test]
    fn panicking_kernel_becomes_task_failure() {
        let table = table();
        let spec = AggSpec::new().agg("v", [AggOp::Sum]);
        let plan = GroupByPlan::new(&table, &["k"], &spec).unwrap();
        let kernel: ChunkKernel = Arc::new(|_: &Chunk, _: &CancellationToken| -> Result<Vec<GroupPartial>> {
            panic!("kernel bug")
        });
        let mut pool = WorkerPool::with_kernel(small_config(1), kernel).unwrap();
        let err = pool.execute(&table, &plan, &CancellationToken::new()).unwrap_err();

        match err {
            Error::TaskFailure { chunk_index, cause } => {
                assert_eq!(chunk_index, 0);
                assert!(cause.contains("kernel bug"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(pool.live_workers(), 0);
    }

    #[test]
    fn cancelled_call_returns_cancelled() {
        let table = table();
        let spec = AggSpec::new().agg("v", [AggOp::Sum]);
        let plan = GroupByPlan::new(&table, &["k"], &spec).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let mut pool = WorkerPool::new(small_config(2)).unwrap();

        assert!(matches!(pool.execute(&table, &plan, &token), Err(Error::Cancelled)));
        assert_eq!(pool.live_workers(), 0);
    }

    #[test]
    fn pool_is_single_use() {
        let table = table();
        let spec = AggSpec::new().agg("v", [AggOp::Count]);
        let plan = GroupByPlan::new(&table, &["k"], &spec).unwrap();
        let mut pool = WorkerPool::new(small_config(2)).unwrap();
        pool.execute(&table, &plan, &CancellationToken::new()).unwrap();
        assert!(pool.execute(&table, &plan, &CancellationToken::new()).is_err());
    }
}
