use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Deferred work of a page session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    /// Debounced pipeline re-run after DOM mutations.
    Redetect,
    /// Fixed-delay pipeline re-run after page load.
    RetryDetection,
    /// Debounced near-bottom check after scrolling.
    ScrollCheck,
    /// Debounced load-more candidate rescan after DOM mutations.
    RescanLoadMore,
    CooldownExpired,
    /// Load-more click has had time to append content.
    LoadMoreSettled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    deadline: Duration,
    seq: u64,
}

/// Timer queue on a virtual clock measured from page load.
///
/// Nothing runs by itself: the owner pops due tasks and runs each to
/// completion before the next, which is all the ordering the page needs.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    seq: u64,
    queue: BTreeMap<TaskId, Task>,
    debounced: HashMap<Task, TaskId>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: Task) -> TaskId {
        let id = TaskId {
            deadline: self.now + delay,
            seq: self.seq,
        };
        self.seq += 1;
        self.queue.insert(id, task);
        id
    }

    /// Schedules `task`, superseding a pending debounced instance of it.
    pub fn debounce(&mut self, delay: Duration, task: Task) -> TaskId {
        if let Some(previous) = self.debounced.remove(&task) {
            self.queue.remove(&previous);
        }
        let id = self.schedule(delay, task);
        self.debounced.insert(task, id);
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let removed = self.queue.remove(&id);
        if let Some(task) = removed {
            if self.debounced.get(&task) == Some(&id) {
                self.debounced.remove(&task);
            }
        }
        removed.is_some()
    }

    /// Drops every pending instance of `task`.
    pub fn cancel_all(&mut self, task: Task) {
        self.queue.retain(|_, pending| *pending != task);
        self.debounced.remove(&task);
    }

    pub fn is_pending(&self, task: Task) -> bool {
        self.queue.values().any(|pending| *pending == task)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|id| id.deadline)
    }

    /// Removes the earliest task due at or before `until` and moves the
    /// clock to its deadline. Tasks with equal deadlines run in scheduling
    /// order.
    pub fn pop_due(&mut self, until: Duration) -> Option<Task> {
        let id = *self.queue.keys().next()?;
        if id.deadline > until {
            return None;
        }
        let task = self.queue.remove(&id)?;
        if self.debounced.get(&task) == Some(&id) {
            self.debounced.remove(&task);
        }
        self.now = self.now.max(id.deadline);
        Some(task)
    }

    /// Moves the clock forward without running anything.
    pub fn advance_to(&mut self, time: Duration) {
        self.now = self.now.max(time);
    }
}
