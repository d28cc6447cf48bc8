//! Virtual-clock timers
//!
//! The game never sleeps. It keeps a queue of deadlines measured from game
//! start, and whoever drives it (a tokio task, a test) advances the clock
//! and lets due timers fire one at a time. Firing order is by deadline,
//! ties by creation order. A cancelled timer can never fire, so a handle
//! that has been cancelled is dead for good.

use std::time::Duration;

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Periodic autonomous agent tick
    AgentTick,
    /// One-shot return to autonomous control after manual input
    Resume,
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    kind: TimerKind,
    deadline: Duration,
    /// Set for intervals, none for one-shot timeouts
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_id: u64,
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fire every `period`, first after one period. A zero period is
    /// raised to one nanosecond so the clock always moves forward.
    pub fn set_interval(&mut self, kind: TimerKind, period: Duration) -> TimerId {
        let period = period.max(Duration::from_nanos(1));
        self.push(kind, self.now + period, Some(period))
    }

    /// Fire once after `delay`
    pub fn set_timeout(&mut self, kind: TimerKind, delay: Duration) -> TimerId {
        self.push(kind, self.now + delay, None)
    }

    fn push(&mut self, kind: TimerKind, deadline: Duration, period: Option<Duration>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            kind,
            deadline,
            period,
        });
        id
    }

    /// Cancel a timer, returns false if it was not pending
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|timer| timer.id == id)
    }

    /// Number of pending timers of a kind
    pub fn pending(&self, kind: TimerKind) -> usize {
        self.timers.iter().filter(|timer| timer.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|timer| timer.deadline).min()
    }

    /// Pop the earliest timer due at or before `until`
    ///
    /// The clock moves to that timer's deadline. Intervals are rescheduled
    /// one period later, timeouts are removed.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, TimerKind)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.deadline <= until)
            .min_by_key(|(_, timer)| (timer.deadline, timer.id))
            .map(|(index, _)| index)?;

        let timer = &mut self.timers[index];
        let fired = (timer.id, timer.kind);
        self.now = self.now.max(timer.deadline);

        match timer.period {
            Some(period) => timer.deadline += period,
            None => {
                self.timers.swap_remove(index);
            }
        }
        Some(fired)
    }

    /// Move the clock forward to `to` without firing anything
    pub fn advance_clock(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_interval_fires_every_period() {
        let mut timers = TimerQueue::new();
        let id = timers.set_interval(TimerKind::AgentTick, 100 * MS);

        assert_eq!(timers.pop_due(99 * MS), None);
        assert_eq!(timers.pop_due(350 * MS), Some((id, TimerKind::AgentTick)));
        assert_eq!(timers.now(), 100 * MS);
        assert_eq!(timers.pop_due(350 * MS), Some((id, TimerKind::AgentTick)));
        assert_eq!(timers.pop_due(350 * MS), Some((id, TimerKind::AgentTick)));
        assert_eq!(timers.pop_due(350 * MS), None);
        assert_eq!(timers.now(), 300 * MS);
        assert_eq!(timers.next_deadline(), Some(400 * MS));
    }

    #[test]
    fn test_timeout_fires_once() {
        let mut timers = TimerQueue::new();
        let id = timers.set_timeout(TimerKind::Resume, 2000 * MS);
        assert_eq!(timers.pop_due(5000 * MS), Some((id, TimerKind::Resume)));
        assert_eq!(timers.pop_due(5000 * MS), None);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut timers = TimerQueue::new();
        let id = timers.set_interval(TimerKind::AgentTick, 10 * MS);
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(!timers.is_pending(id));
        assert_eq!(timers.pop_due(Duration::from_secs(10)), None);
    }

    #[test]
    fn test_fires_in_deadline_then_creation_order() {
        let mut timers = TimerQueue::new();
        let late = timers.set_timeout(TimerKind::Resume, 30 * MS);
        let first = timers.set_timeout(TimerKind::AgentTick, 10 * MS);
        let second = timers.set_timeout(TimerKind::Resume, 10 * MS);

        assert_eq!(timers.pop_due(100 * MS).map(|(id, _)| id), Some(first));
        assert_eq!(timers.pop_due(100 * MS).map(|(id, _)| id), Some(second));
        assert_eq!(timers.pop_due(100 * MS).map(|(id, _)| id), Some(late));
    }

    #[test]
    fn test_new_timers_start_from_current_time() {
        let mut timers = TimerQueue::new();
        timers.advance_clock(500 * MS);
        timers.set_timeout(TimerKind::Resume, 50 * MS);
        assert_eq!(timers.next_deadline(), Some(550 * MS));
        assert_eq!(timers.pending(TimerKind::Resume), 1);
        assert_eq!(timers.pending(TimerKind::AgentTick), 0);
    }
}
