use std::time::{Duration, Instant};

/// A reconciliation pass waiting for its debounce deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPass {
    pub token: u64,
    pub deadline: Instant,
}

/// Single-slot debounce timer. Arming always replaces the pending pass, so
/// at most one is ever scheduled.
#[derive(Debug)]
pub struct Scheduler {
    delay: Duration,
    pending: Option<PendingPass>,
    next_token: u64,
}

impl Scheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            next_token: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending pass and schedule a new one `delay` after `now`.
    pub fn arm(&mut self, now: Instant) -> PendingPass {
        self.next_token += 1;
        let pass = PendingPass {
            token: self.next_token,
            deadline: now + self.delay,
        };
        self.pending = Some(pass);
        pass
    }

    pub fn cancel(&mut self) -> Option<PendingPass> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<PendingPass> {
        self.pending
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Remove and return the pending pass if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<PendingPass> {
        match self.pending {
            Some(pass) if pass.deadline <= now => self.pending.take(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_replaces_pending() {
        let mut scheduler = Scheduler::new(Duration::from_millis(100));
        let start = Instant::now();
        let first = scheduler.arm(start);
        let second = scheduler.arm(start + Duration::from_millis(50));

        assert_ne!(first.token, second.token);
        assert_eq!(scheduler.pending(), Some(second));
        assert!(scheduler.take_due(start + Duration::from_millis(120)).is_none());
        assert_eq!(
            scheduler.take_due(start + Duration::from_millis(150)),
            Some(second)
        );
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new(Duration::ZERO);
        let now = Instant::now();
        scheduler.arm(now);
        assert!(scheduler.cancel().is_some());
        assert!(scheduler.take_due(now).is_none());
    }

    #[test]
    fn test_zero_delay_is_due_immediately() {
        let mut scheduler = Scheduler::new(Duration::ZERO);
        let now = Instant::now();
        scheduler.arm(now);
        assert!(scheduler.take_due(now).is_some());
    }
}
