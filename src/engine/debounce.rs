// src/engine/debounce.rs

//! Cancellable "last event wins" timer.
//!
//! The window itself never sleeps: callers pass the current instant in and
//! ask for the deadline, so tests drive it with hand-made instants and the
//! async shell drives it with `tokio::time::sleep_until`.

use std::time::Duration;

use tokio::time::Instant;

/// An armed, not-yet-fired action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending<A> {
    pub action: A,
    pub reason: String,
    pub deadline: Instant,
}

/// At most one pending action; every `schedule` replaces it and re-arms.
#[derive(Debug, Clone)]
pub struct DebounceWindow<A> {
    quiet_period: Duration,
    pending: Option<Pending<A>>,
    superseded: u64,
}

impl<A> DebounceWindow<A> {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
            superseded: 0,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Cancel whatever is pending and arm `action` to fire one quiet period
    /// after `now`. Returns true if a pending action was replaced.
    pub fn schedule(&mut self, action: A, reason: impl Into<String>, now: Instant) -> bool {
        let quiet = self.quiet_period;
        self.schedule_with(action, reason, quiet, now)
    }

    /// Like [`schedule`](Self::schedule) with an explicit quiet period.
    pub fn schedule_with(
        &mut self,
        action: A,
        reason: impl Into<String>,
        quiet_period: Duration,
        now: Instant,
    ) -> bool {
        let replaced = self.pending.is_some();
        if replaced {
            self.superseded += 1;
        }
        self.pending = Some(Pending {
            action,
            reason: reason.into(),
            deadline: now + quiet_period,
        });
        replaced
    }

    /// Drop the pending action without firing it.
    pub fn cancel(&mut self) -> Option<Pending<A>> {
        self.pending.take()
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn pending_action(&self) -> Option<&A> {
        self.pending.as_ref().map(|p| &p.action)
    }

    /// Number of actions replaced before they could fire.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    /// Take the pending action if its deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> Option<Pending<A>> {
        match &self.pending {
            Some(p) if p.deadline <= now => self.pending.take(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(500);

    #[test]
    fn burst_fires_once_with_last_action() {
        let start = Instant::now();
        let mut window = DebounceWindow::new(QUIET);

        let mut fired = Vec::new();
        for i in 0..10u32 {
            let now = start + Duration::from_millis(100 * u64::from(i));
            window.schedule(i, format!("event {i}"), now);
            if let Some(p) = window.fire_if_due(now) {
                fired.push(p.action);
            }
        }

        let last_event = start + Duration::from_millis(900);
        assert!(window.fire_if_due(last_event + QUIET - Duration::from_millis(1)).is_none());
        let p = window.fire_if_due(last_event + QUIET).expect("should fire");
        fired.push(p.action);

        assert_eq!(fired, vec![9]);
        assert_eq!(p.reason, "event 9");
        assert_eq!(window.superseded(), 9);
        assert!(!window.is_armed());
    }

    #[test]
    fn fires_exactly_once() {
        let now = Instant::now();
        let mut window = DebounceWindow::new(QUIET);
        window.schedule("restart", "added", now);
        assert!(window.fire_if_due(now + QUIET).is_some());
        assert!(window.fire_if_due(now + QUIET * 2).is_none());
    }

    #[test]
    fn cancel_prevents_firing() {
        let now = Instant::now();
        let mut window = DebounceWindow::new(QUIET);
        window.schedule((), "added", now);
        assert!(window.cancel().is_some());
        assert!(window.fire_if_due(now + QUIET).is_none());
        assert_eq!(window.deadline(), None);
    }

    #[test]
    fn explicit_quiet_period_overrides_default() {
        let now = Instant::now();
        let mut window = DebounceWindow::new(QUIET);
        window.schedule_with((), "settle", Duration::from_millis(200), now);
        assert_eq!(window.deadline(), Some(now + Duration::from_millis(200)));
    }

    #[test]
    fn separated_events_fire_separately() {
        let start = Instant::now();
        let mut window = DebounceWindow::new(QUIET);

        window.schedule(1, "first", start);
        let first = window.fire_if_due(start + QUIET).map(|p| p.action);

        let later = start + QUIET * 3;
        window.schedule(2, "second", later);
        let second = window.fire_if_due(later + QUIET).map(|p| p.action);

        assert_eq!((first, second), (Some(1), Some(2)));
        assert_eq!(window.superseded(), 0);
    }
}
