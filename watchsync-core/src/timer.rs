//! One-shot cancelable timers.
//!
//! A [`Timer`] holds at most one pending deadline. Scheduling again replaces
//! whatever was pending, so "most recent schedule wins" holds by construction.
//! Timers never look at a clock: the owner asks [`Timer::take_due`] with the
//! current instant, which keeps every delayed transition testable with
//! explicit instants.

use std::time::{Duration, Instant};

#[derive(Debug)]
struct Pending<T> {
    deadline: Instant,
    payload: T,
}

#[derive(Debug)]
pub struct Timer<T> {
    pending: Option<Pending<T>>,
}

impl<T> Timer<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Schedule `payload` to fire at `deadline`, returning any payload it superseded
    pub fn schedule(&mut self, deadline: Instant, payload: T) -> Option<T> {
        self.pending
            .replace(Pending { deadline, payload })
            .map(|superseded| superseded.payload)
    }

    pub fn schedule_in(&mut self, now: Instant, delay: Duration, payload: T) -> Option<T> {
        self.schedule(now + delay, payload)
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.payload)
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the payload if its deadline is at or before `now`
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => self.cancel(),
            _ => None,
        }
    }
}

impl<T> Default for Timer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Earliest of two optional deadlines
#[must_use]
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_at_deadline_not_before() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.schedule_in(start, Duration::from_millis(250), "pause");

        assert_eq!(timer.take_due(start + Duration::from_millis(249)), None);
        assert!(timer.is_pending());
        assert_eq!(timer.take_due(start + Duration::from_millis(250)), Some("pause"));
        assert!(!timer.is_pending());
        assert_eq!(timer.take_due(start + Duration::from_secs(10)), None);
    }

    #[test]
    fn test_new_schedule_supersedes() {
        let start = Instant::now();
        let mut timer = Timer::new();

        assert_eq!(timer.schedule_in(start, Duration::from_millis(250), 1), None);
        let later = start + Duration::from_millis(100);
        assert_eq!(timer.schedule_in(later, Duration::from_millis(250), 2), Some(1));

        // The first deadline no longer fires
        assert_eq!(timer.take_due(start + Duration::from_millis(300)), None);
        assert_eq!(timer.take_due(start + Duration::from_millis(350)), Some(2));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.schedule_in(start, Duration::from_millis(10), ());

        assert_eq!(timer.cancel(), Some(()));
        assert_eq!(timer.deadline(), None);
        assert_eq!(timer.take_due(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_earliest() {
        let start = Instant::now();
        let later = start + Duration::from_secs(1);

        assert_eq!(earliest(Some(later), Some(start)), Some(start));
        assert_eq!(earliest(None, Some(later)), Some(later));
        assert_eq!(earliest(Some(start), None), Some(start));
        assert_eq!(earliest(None, None), None);
    }
}
