//! Virtual-time timer queue.
//!
//! Deadlines are offsets from the engine's start. Nothing fires on its own;
//! the owner advances the clock and drains due tasks with [`Scheduler::pop_due`].

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Handle for a scheduled task, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    next_id: u64,
    queue: BTreeMap<(Duration, TimerId), T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            queue: BTreeMap::new(),
        }
    }

    /// Queue `task` to run at `at`. Tasks sharing a deadline run in scheduling order.
    pub fn schedule(&mut self, at: Duration, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((at, id), task);
        id
    }

    /// Drop a pending task; returns it if it had not fired yet
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let key = self.queue.keys().find(|(_, timer)| *timer == id).copied()?;
        self.queue.remove(&key)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.queue.keys().any(|(_, timer)| *timer == id)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return the earliest task due at or before `now`
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, Duration, T)> {
        let (&(at, id), _) = self.queue.iter().next()?;
        if at > now {
            return None;
        }
        self.queue.remove(&(at, id)).map(|task| (id, at, task))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
