use std::time::{Duration, Instant};

/// Warns (never stops) when the hazard count reaches the threshold, at most
/// once per cooldown window.
#[derive(Debug, Clone)]
pub struct HazardChecker {
    cooldown: Duration,
    last_alarm: Option<Instant>,
}

impl HazardChecker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alarm: None,
        }
    }

    /// True when an alarm should sound now.
    pub fn check(&mut self, count: u32, threshold: u32, now: Instant) -> bool {
        if count < threshold {
            return false;
        }
        let cooled = self
            .last_alarm
            .is_none_or(|at| now.saturating_duration_since(at) >= self.cooldown);
        if cooled {
            self.last_alarm = Some(now);
        }
        cooled
    }
}
