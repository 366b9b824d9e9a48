use std::time::Duration;

use phytominer_core::ResolverConfig;
use tokio::time::sleep;

/// Delay applied before every call to the lookup services.
///
/// One instance is shared by all lookups of a [`ResolutionService`]: a run of
/// transient failures compounds the delay, a single success restores the
/// baseline.
///
/// [`ResolutionService`]: crate::resolver::ResolutionService
#[derive(Debug, Clone)]
pub struct Backoff {
    delay: Duration,
    baseline: Duration,
}

const GROWTH_FACTOR: u32 = 2;

/// Smallest delay after a failure, so a zero delay still grows.
const MIN_ESCALATION: Duration = Duration::from_millis(1);

impl Backoff {
    pub fn new(initial: Duration, baseline: Duration) -> Self {
        Self {
            delay: initial,
            baseline,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.baseline_delay_ms),
        )
    }

    pub fn current(&self) -> Duration {
        self.delay
    }

    pub fn baseline(&self) -> Duration {
        self.baseline
    }

    /// Sleep for the current delay.
    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }

    /// Record a transient failure: double the delay, without an upper bound.
    pub fn escalate(&mut self) {
        self.delay = self
            .delay
            .saturating_mul(GROWTH_FACTOR)
            .max(MIN_ESCALATION);
    }

    /// Record a successful round trip.
    pub fn reset(&mut self) {
        self.delay = self.baseline;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config() {
        let backoff = Backoff::default();
        assert_eq!(backoff.current(), Duration::from_millis(300));
        assert_eq!(backoff.baseline(), Duration::from_millis(340));
    }

    #[test]
    fn failures_compound_and_success_heals() {
        let mut backoff = Backoff::new(Duration::from_millis(300), Duration::from_millis(340));

        let before = backoff.current();
        backoff.escalate();
        assert!(backoff.current() > before);
        assert_eq!(backoff.current(), Duration::from_millis(600));

        backoff.escalate();
        assert_eq!(backoff.current(), Duration::from_millis(1200));

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(340));
    }

    #[test]
    fn zero_delay_still_escalates() {
        let config = ResolverConfig {
            initial_delay_ms: 0,
            baseline_delay_ms: 0,
            ..ResolverConfig::default()
        };
        let mut backoff = Backoff::from_config(&config);

        let before = backoff.current();
        backoff.escalate();
        assert!(backoff.current() > before);
        assert_eq!(backoff.current(), Duration::from_millis(1));

        let before = backoff.current();
        backoff.escalate();
        assert!(backoff.current() > before);

        backoff.reset();
        assert_eq!(backoff.current(), Duration::ZERO);
    }

    #[test]
    fn escalation_saturates_instead_of_overflowing() {
        let mut backoff = Backoff::new(Duration::MAX, Duration::ZERO);
        backoff.escalate();
        assert_eq!(backoff.current(), Duration::MAX);
    }

    #[tokio::test]
    async fn zero_delay_does_not_sleep() {
        let backoff = Backoff::new(Duration::ZERO, Duration::ZERO);
        let start = std::time::Instant::now();
        backoff.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
