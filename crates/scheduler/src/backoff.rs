//! Retry delay policies for the scheduler loops.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long to wait after the n-th consecutive failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Same delay every time; repeated failures never escalate.
    Fixed { delay_ms: u64 },
    /// `initial * multiplier^(n-1)`, clamped to `max`.
    Exponential {
        initial_ms: u64,
        max_ms: u64,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
    },
}

fn default_multiplier() -> f64 { 2.0 }

impl BackoffPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed { delay_ms: delay.as_millis() as u64 }
    }

    /// Delay before retry number `attempt` (1 = first failure).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { initial_ms, max_ms, multiplier } => {
                let exp = attempt.saturating_sub(1).min(63) as i32;
                let ms = initial_ms as f64 * multiplier.max(1.0).powi(exp);
                Duration::from_millis(ms.min(max_ms as f64) as u64)
            }
        }
    }
}

/// Consecutive-failure counter over a [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    failures: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, failures: 0 }
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn fail(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.policy.delay(self.failures)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_never_escalates() {
        let mut b = Backoff::new(BackoffPolicy::fixed(Duration::from_secs(5)));
        for _ in 0..10 {
            assert_eq!(b.fail(), Duration::from_secs(5));
        }
        assert_eq!(b.failures(), 10);
    }

    #[test]
    fn test_exponential_grows_and_caps() {
        let policy = BackoffPolicy::Exponential { initial_ms: 100, max_ms: 1000, multiplier: 2.0 };
        let delays: Vec<u64> = (1..=6).map(|n| policy.delay(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
        assert_eq!(policy.delay(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut b = Backoff::new(BackoffPolicy::Exponential { initial_ms: 10, max_ms: 100, multiplier: 3.0 });
        b.fail();
        b.fail();
        b.reset();
        assert_eq!(b.fail(), Duration::from_millis(10));
    }

    #[test]
    fn test_policy_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            retry: BackoffPolicy,
        }
        let w: Wrapper = toml::from_str("[retry]\nkind = \"exponential\"\ninitial_ms = 50\nmax_ms = 400\n").unwrap();
        assert_eq!(w.retry, BackoffPolicy::Exponential { initial_ms: 50, max_ms: 400, multiplier: 2.0 });
    }
}
