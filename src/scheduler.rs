//! Deferred task scheduling driven by an explicit clock.

use std::time::Duration;

use log::{debug, info};

/// Holds named tasks that become due after a delay on the scheduler clock.
///
/// The clock only moves through [`advance`](Scheduler::advance), so a caller
/// owning the tick loop decides how time passes. Due tasks are returned in
/// due-time order; tasks with the same due time keep their scheduling order.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use wheel_ffb::scheduler::Scheduler;
///
/// let mut scheduler = Scheduler::new();
/// scheduler.schedule("settle", Duration::from_millis(500), 1);
/// scheduler.schedule("spring", Duration::from_secs(1), 2);
///
/// assert!(scheduler.advance(Duration::from_millis(400)).is_empty());
/// assert_eq!(scheduler.advance(Duration::from_millis(100)), vec![1]);
/// assert_eq!(scheduler.advance(Duration::from_millis(500)), vec![2]);
/// ```
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_seq: u64,
    tasks: Vec<TaskInfo<T>>,
}

#[derive(Debug)]
struct TaskInfo<T> {
    name: String,
    due: Duration,
    seq: u64,
    task: T,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            tasks: Vec::new(),
        }
    }

    /// Registers `task` to become due `delay` after the current clock.
    pub fn schedule(&mut self, name: impl Into<String>, delay: Duration, task: T) {
        let name = name.into();
        let due = self.now + delay;
        debug!("Task '{}' scheduled in {:?}", name, delay);
        self.tasks.push(TaskInfo {
            name,
            due,
            seq: self.next_seq,
            task,
        });
        self.next_seq += 1;
    }

    /// Moves the clock forward and removes every task that became due.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now += dt;
        let now = self.now;

        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.tasks.drain(..).partition(|info| info.due <= now);
        self.tasks = pending;

        due.sort_by_key(|info| (info.due, info.seq));
        due.into_iter()
            .map(|info| {
                debug!("Task '{}' due", info.name);
                info.task
            })
            .collect()
    }

    /// Drops every pending task with the given name. Returns how many were dropped.
    pub fn cancel(&mut self, name: &str) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|info| info.name != name);
        before - self.tasks.len()
    }

    /// Drops all pending tasks. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        if count > 0 {
            info!("Cancelling {} pending deferred tasks", count);
        }
        self.tasks.clear();
        count
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.tasks.iter().any(|info| info.name == name)
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
