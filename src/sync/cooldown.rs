//! Send cooldown: `Idle` → `Cooldown { until }` → `Idle`, nothing else.

use std::time::Duration;

use tokio::time::Instant;

/// Current phase of the cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    /// Sends are accepted.
    Idle,
    /// Sends are dropped until `until`.
    Cooldown { until: Instant },
}

#[derive(Debug, Clone)]
pub struct Cooldown {
    window: Duration,
    state: CooldownState,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: CooldownState::Idle,
        }
    }

    pub fn state(&self) -> CooldownState {
        self.state
    }

    /// Enter cooldown if idle at `now`; otherwise report the time left.
    pub fn try_begin(&mut self, now: Instant) -> Result<(), Duration> {
        self.tick(now);
        match self.state {
            CooldownState::Idle => {
                self.state = CooldownState::Cooldown {
                    until: now + self.window,
                };
                Ok(())
            }
            CooldownState::Cooldown { until } => Err(until - now),
        }
    }

    /// Return to `Idle` once `now` reaches the deadline. Returns whether the state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.state {
            CooldownState::Cooldown { until } if now >= until => {
                self.state = CooldownState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.state {
            CooldownState::Idle => Duration::ZERO,
            CooldownState::Cooldown { until } => until.saturating_duration_since(now),
        }
    }

    /// Whole seconds left, rounded up, as a countdown shows them.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let remaining = self.remaining(now);
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    /// Instant the cooldown ends, if one is running.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            CooldownState::Idle => None,
            CooldownState::Cooldown { until } => Some(until),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    #[test]
    fn second_send_inside_the_window_is_refused() {
        let start = Instant::now();
        let mut cooldown = Cooldown::new(WINDOW);

        assert!(cooldown.try_begin(start).is_ok());
        let remaining = cooldown
            .try_begin(start + Duration::from_secs(4))
            .unwrap_err();

        assert_eq!(remaining, Duration::from_secs(6));
        assert_eq!(
            cooldown.state(),
            CooldownState::Cooldown {
                until: start + WINDOW
            }
        );
    }

    #[test]
    fn window_end_returns_to_idle() {
        let start = Instant::now();
        let mut cooldown = Cooldown::new(WINDOW);
        cooldown.try_begin(start).unwrap();

        assert!(!cooldown.tick(start + Duration::from_millis(9_999)));
        assert!(cooldown.tick(start + WINDOW));
        assert_eq!(cooldown.state(), CooldownState::Idle);
        assert!(cooldown.try_begin(start + WINDOW).is_ok());
    }

    #[test]
    fn remaining_seconds_round_up() {
        let start = Instant::now();
        let mut cooldown = Cooldown::new(WINDOW);
        assert_eq!(cooldown.remaining_secs(start), 0);

        cooldown.try_begin(start).unwrap();

        assert_eq!(cooldown.remaining_secs(start), 10);
        assert_eq!(cooldown.remaining_secs(start + Duration::from_millis(500)), 10);
        assert_eq!(cooldown.remaining_secs(start + Duration::from_millis(9_001)), 1);
        assert_eq!(cooldown.remaining_secs(start + WINDOW), 0);
    }
}
