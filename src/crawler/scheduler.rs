//! Dispatcher for bounded concurrent fetches
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Periodic drains: every `drain_interval` dispatches, all in-flight work
//!   completes before the next item is submitted
//! - Collecting reports from finished tasks
//!
//! Submission order follows catalog order; completion order is unspecified.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Outcome of one spawned task
pub type Finished<T> = Result<T, JoinError>;

/// Submits work items as tasks, never exceeding a fixed number in flight
pub struct Dispatcher<T> {
    /// Global semaphore for limiting concurrent fetches
    semaphore: Arc<Semaphore>,

    tasks: JoinSet<T>,

    /// Joined outcomes not yet taken by the caller
    finished: Vec<Finished<T>>,

    max_in_flight: usize,
    drain_interval: u64,
    dispatched: u64,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Creates a new dispatcher
    ///
    /// # Arguments
    ///
    /// * `max_in_flight` - Upper bound on concurrently running tasks
    /// * `drain_interval` - Dispatches between full drains
    ///
    /// Both values are clamped to at least 1.
    pub fn new(max_in_flight: usize, drain_interval: u64) -> Self {
        let max_in_flight = max_in_flight.max(1);

        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            tasks: JoinSet::new(),
            finished: Vec::new(),
            max_in_flight,
            drain_interval: drain_interval.max(1),
            dispatched: 0,
        }
    }

    /// Submits a task, waiting for capacity first
    ///
    /// Before the task is spawned, a full drain runs if a multiple of
    /// `drain_interval` tasks has been dispatched, then a permit is acquired.
    /// The permit is held until the task finishes.
    ///
    /// Outcomes of tasks that finish meanwhile are kept until
    /// [`take_finished`](Self::take_finished) collects them, so dropping this
    /// future part way through loses nothing already joined.
    pub async fn dispatch<F>(&mut self, job: F) -> Result<(), tokio::sync::AcquireError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        if self.dispatched > 0 && self.dispatched % self.drain_interval == 0 {
            tracing::debug!(
                "Draining {} in-flight tasks after {} dispatches",
                self.tasks.len(),
                self.dispatched
            );
            self.join_all().await;
        }

        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        self.tasks.spawn(async move {
            let _permit = permit;
            job.await
        });
        self.dispatched += 1;

        while let Some(outcome) = self.tasks.try_join_next() {
            self.finished.push(outcome);
        }

        Ok(())
    }

    /// Takes the outcomes collected so far
    pub fn take_finished(&mut self) -> Vec<Finished<T>> {
        std::mem::take(&mut self.finished)
    }

    /// Waits for every in-flight task and returns all uncollected outcomes
    pub async fn drain(&mut self) -> Vec<Finished<T>> {
        self.join_all().await;
        self.take_finished()
    }

    async fn join_all(&mut self) {
        while let Some(outcome) = self.tasks.join_next().await {
            self.finished.push(outcome);
        }
    }

    /// Tasks spawned and not yet joined
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Permits currently free
    pub fn available_capacity(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}
