/// Single-shot long-press timer driven by the caller's clock.
///
/// Expiry is observed by polling from the same serialized context that feeds
/// touch events, so a cancelled timer can never fire afterwards.
pub trait LongPressTimer {
    /// Schedules expiry `duration_ms` after `now_ms`, replacing any armed deadline.
    fn arm(&mut self, now_ms: u64, duration_ms: u64);

    /// Disarms the timer. Safe when nothing is armed.
    fn cancel(&mut self);

    fn is_armed(&self) -> bool;

    /// Returns `true` exactly once when the armed deadline has passed, disarming it.
    fn poll_expired(&mut self, now_ms: u64) -> bool;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeadlineTimer {
    deadline_ms: Option<u64>,
}

impl DeadlineTimer {
    pub const fn new() -> Self {
        Self { deadline_ms: None }
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }
}

impl LongPressTimer for DeadlineTimer {
    fn arm(&mut self, now_ms: u64, duration_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(duration_ms));
    }

    fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    fn poll_expired(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

/// Timer request recorded by a transition, applied once dispatch returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimerCommand {
    #[default]
    Keep,
    Arm {
        now_ms: u64,
        duration_ms: u64,
    },
    Cancel,
}

impl TimerCommand {
    pub fn apply<T: LongPressTimer + ?Sized>(self, timer: &mut T) {
        match self {
            Self::Keep => {}
            Self::Arm {
                now_ms,
                duration_ms,
            } => timer.arm(now_ms, duration_ms),
            Self::Cancel => timer.cancel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_deadline() {
        let mut timer = DeadlineTimer::new();
        timer.arm(100, 50);

        assert!(!timer.poll_expired(149));
        assert!(timer.poll_expired(150));
        assert!(!timer.poll_expired(151));
        assert!(!timer.is_armed());
    }

    #[test]
    fn cancel_prevents_firing_and_is_idempotent() {
        let mut timer = DeadlineTimer::new();
        timer.cancel();
        timer.arm(0, 10);
        timer.cancel();
        timer.cancel();

        assert!(!timer.poll_expired(1_000));
    }

    #[test]
    fn rearm_replaces_deadline() {
        let mut timer = DeadlineTimer::new();
        timer.arm(0, 10);
        timer.arm(5, 100);

        assert_eq!(timer.deadline_ms(), Some(105));
        assert!(!timer.poll_expired(50));
        assert!(timer.poll_expired(105));
    }

    #[test]
    fn commands_apply_in_place() {
        let mut timer = DeadlineTimer::new();
        TimerCommand::Arm {
            now_ms: 10,
            duration_ms: 20,
        }
        .apply(&mut timer);
        assert_eq!(timer.deadline_ms(), Some(30));

        TimerCommand::Keep.apply(&mut timer);
        assert!(timer.is_armed());

        TimerCommand::Cancel.apply(&mut timer);
        assert!(!timer.is_armed());
    }
}
