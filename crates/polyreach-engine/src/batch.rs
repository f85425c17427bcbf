//! Worker pool and task batches
//!
//! The engine is a single logical thread that fans pure subcomputations out
//! to a shared pool. Work is grouped in batches: tasks are submitted to a
//! batch and [`TaskBatch::join`] blocks until every task of the batch has
//! completed — no task outlives the join. Submission order does not imply
//! execution order.

use rayon::ThreadPool;

use crate::error::EngineError;

/// A fixed-size worker pool owned by the engine
///
/// No ambient global pool exists; every analyzer owns its pool (or shares
/// one explicitly).
#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Create a pool with the given number of worker threads
    ///
    /// `0` lets the pool pick one thread per available core.
    pub fn new(num_threads: usize) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| EngineError::PoolCreation(e.to_string()))?;
        Ok(WorkerPool { pool })
    }

    /// Open a new batch of tasks on this pool
    pub fn create_batch<'pool, 'env>(&'pool self) -> TaskBatch<'pool, 'env> {
        TaskBatch {
            pool: &self.pool,
            tasks: Vec::new(),
        }
    }

    /// Number of worker threads
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// A batch of tasks to be executed on a [`WorkerPool`]
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use polyreach_engine::WorkerPool;
///
/// let pool = WorkerPool::new(2).unwrap();
/// let counter = AtomicUsize::new(0);
///
/// let mut batch = pool.create_batch();
/// for _ in 0..16 {
///     batch.submit(|| {
///         counter.fetch_add(1, Ordering::Relaxed);
///     });
/// }
/// batch.join();
/// assert_eq!(counter.load(Ordering::Relaxed), 16);
/// ```
pub struct TaskBatch<'pool, 'env> {
    pool: &'pool ThreadPool,
    tasks: Vec<Box<dyn FnOnce() + Send + 'env>>,
}

impl<'pool, 'env> TaskBatch<'pool, 'env> {
    /// Enqueue a task into the batch
    pub fn submit(&mut self, task: impl FnOnce() + Send + 'env) {
        self.tasks.push(Box::new(task));
    }

    /// Number of tasks currently enqueued
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the batch holds no task
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task and block until all of them have completed
    ///
    /// Consuming the batch closes it; the pool guarantees that no task of
    /// the batch executes after this returns.
    pub fn join(self) {
        let tasks = self.tasks;
        self.pool.scope(move |scope| {
            for task in tasks {
                scope.spawn(move |_| task());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_join_runs_all_tasks() {
        let pool = WorkerPool::new(4).unwrap();
        let results = Mutex::new(Vec::new());

        let mut batch = pool.create_batch();
        for i in 0..32 {
            let results = &results;
            batch.submit(move || {
                results.lock().unwrap().push(i);
            });
        }
        batch.join();

        let mut collected = results.into_inner().unwrap();
        collected.sort_unstable();
        assert_eq!(collected, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_batch_joins() {
        let pool = WorkerPool::new(1).unwrap();
        let batch = pool.create_batch();
        assert!(batch.is_empty());
        batch.join();
    }
}
