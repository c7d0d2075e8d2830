//! Priority work queue shared by the scheduler and the worker pool.
//!
//! The queue is closable: once [`WorkQueue::close`] has been called and every
//! pending task has been handed out, each call to [`WorkQueue::pop`] returns
//! [`Dequeued::Stop`] instead of waiting.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::Notify;

use crate::task::{Priority, Task};

/// Errors returned by queue operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue no longer accepts tasks.
    #[error("work queue is closed, rejected task: {target}")]
    Closed { target: String },
}

/// Result of a [`WorkQueue::pop`].
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued {
    /// The next task to process.
    Task(Task),
    /// The queue is closed and drained; the worker should exit.
    Stop,
}

/// Heap entry. Orders by priority class, then by insertion sequence.
#[derive(Debug)]
struct QueuedTask {
    priority: Priority,
    seq: u64,
    task: Task,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse both keys so High and older entries win.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: BinaryHeap<QueuedTask>,
    closed: bool,
    next_seq: u64,
}

/// Concurrent, priority-ordered, closable task queue.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // The lock is never held across an await, so a poisoned guard still holds
    // consistent state.
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a task. Fails once the queue has been closed.
    pub fn push(&self, task: Task) -> Result<(), QueueError> {
        {
            let mut state = self.state();
            if state.closed {
                return Err(QueueError::Closed {
                    target: task.target().to_string(),
                });
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.pending.push(QueuedTask {
                priority: task.priority(),
                seq,
                task,
            });
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Removes the highest-priority task, waiting while the queue is empty and
    /// still open.
    pub async fn pop(&self) -> Dequeued {
        loop {
            // Register interest before inspecting state so a push or close that
            // lands between the check and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if let Some(entry) = state.pending.pop() {
                    return Dequeued::Task(entry.task);
                }
                if state.closed {
                    return Dequeued::Stop;
                }
            }

            notified.await;
        }
    }

    /// Stops accepting tasks. Already queued tasks stay retrievable.
    pub fn close(&self) {
        self.state().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Number of tasks waiting to be picked up.
    pub fn len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().pending.is_empty()
    }

    /// Number of tasks accepted since creation.
    pub fn total_pushed(&self) -> u64 {
        self.state().next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    fn seed(target: &str) -> Task {
        Task::seed(target).unwrap()
    }

    fn updated(target: &str) -> Task {
        Task::updated_page(target, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_high_priority_served_first() {
        let queue = WorkQueue::new();
        queue.push(seed("low-1")).unwrap();
        queue.push(updated("high-1")).unwrap();
        queue.push(seed("low-2")).unwrap();
        queue.push(updated("high-2")).unwrap();
        queue.close();

        let mut order = Vec::new();
        while let Dequeued::Task(task) = queue.pop().await {
            order.push(task.target().to_string());
        }
        assert_eq!(order, vec!["high-1", "high-2", "low-1", "low-2"]);
    }

    #[tokio::test]
    async fn test_closed_empty_queue_returns_stop_repeatedly() {
        let queue = WorkQueue::new();
        queue.close();
        assert_eq!(queue.pop().await, Dequeued::Stop);
        assert_eq!(queue.pop().await, Dequeued::Stop);
    }

    #[tokio::test]
    async fn test_push_after_close_is_rejected() {
        let queue = WorkQueue::new();
        queue.close();
        let err = queue.push(seed("late.html")).unwrap_err();
        assert_eq!(
            err,
            QueueError::Closed {
                target: "late.html".to_string()
            }
        );
        assert_eq!(queue.total_pushed(), 0);
    }

    #[tokio::test]
    async fn test_tasks_pushed_before_close_remain_available() {
        let queue = WorkQueue::new();
        queue.push(seed("a.html")).unwrap();
        queue.close();
        assert!(queue.is_closed());
        assert_eq!(queue.len(), 1);
        assert!(matches!(queue.pop().await, Dequeued::Task(t) if t.target() == "a.html"));
        assert_eq!(queue.pop().await, Dequeued::Stop);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(WorkQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.push(seed("a.html")).unwrap();
        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake up")
            .unwrap();
        assert!(matches!(popped, Dequeued::Task(t) if t.target() == "a.html"));
    }

    #[tokio::test]
    async fn test_close_wakes_all_waiters() {
        let queue = Arc::new(WorkQueue::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.pop().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        for waiter in waiters {
            let result = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should observe close")
                .unwrap();
            assert_eq!(result, Dequeued::Stop);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumers_see_each_task_once() {
        let queue = Arc::new(WorkQueue::new());
        let consumers: Vec<_> = (0..6)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Dequeued::Task(task) = queue.pop().await {
                        seen.push(task.target().to_string());
                        tokio::task::yield_now().await;
                    }
                    seen
                })
            })
            .collect();

        for i in 0..500 {
            let task = if i % 3 == 0 {
                updated(&format!("page-{i}"))
            } else {
                seed(&format!("page-{i}"))
            };
            queue.push(task).unwrap();
        }
        queue.close();

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 500);
        assert_eq!(unique.len(), 500);
        assert_eq!(queue.total_pushed(), 500);
    }
}
