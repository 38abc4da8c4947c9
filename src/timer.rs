use std::time::Duration;

use log::debug;

/// Handle of a scheduled auto-advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

/// A pending automatic transition `origin -> target`, due at `due`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoAdvance {
    pub id: TaskId,
    pub origin: String,
    pub target: String,
    pub due: Duration,
}

/// Virtual-time scheduler for auto-advance tasks.
///
/// Time only moves when the owner calls [`Scheduler::pop_due`], so the
/// engine can be driven by a real event loop or stepped from tests.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    pending: Vec<AutoAdvance>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, origin: &str, target: &str, delay: Duration) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let due = self.now + delay;
        debug!(
            "Scheduled auto-advance {origin} -> {target} in {}ms (task {})",
            delay.as_millis(),
            id.0
        );
        self.pending.push(AutoAdvance {
            id,
            origin: origin.to_string(),
            target: target.to_string(),
            due,
        });
        id
    }

    /// Drop every pending task. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        if cancelled > 0 {
            debug!("Cancelled {cancelled} pending auto-advance(s)");
        }
        self.pending.clear();
        cancelled
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Time left until the earliest pending task, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending
            .iter()
            .map(|task| task.due.saturating_sub(self.now))
            .min()
    }

    /// Remove and return the earliest task due at or before `until`,
    /// moving the clock to its deadline. Ties fire in scheduling order.
    ///
    /// When nothing is due the clock moves to `until`.
    pub fn pop_due(&mut self, until: Duration) -> Option<AutoAdvance> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due <= until)
            .min_by_key(|(_, task)| (task.due, task.id))
            .map(|(i, _)| i);

        match index {
            Some(i) => {
                let task = self.pending.remove(i);
                self.now = self.now.max(task.due);
                Some(task)
            }
            None => {
                self.now = self.now.max(until);
                None
            }
        }
    }
}
