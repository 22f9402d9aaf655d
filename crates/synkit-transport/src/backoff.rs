use std::time::Duration;

/// Exponential, capped backoff for peer connect retries.
///
/// Grounded on the same bounded-finite-retries shape as the default
/// `Middleware.ConnectAttempts = 5`: after the configured number of
/// attempts is exhausted the caller gives up rather than retrying forever.
#[derive(Debug, Clone, Copy)]
pub struct ConnectBackoff {
	base: Duration,
	cap: Duration,
	max_attempts: u32,
}

impl ConnectBackoff {
	pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
		Self { base, cap, max_attempts }
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Delay before the `attempt`-th retry (1-indexed).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
		self.base.saturating_mul(factor).min(self.cap)
	}
}

impl Default for ConnectBackoff {
	fn default() -> Self {
		Self::new(Duration::from_millis(100), Duration::from_secs(5), 5)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn delay_grows_then_caps() {
		let backoff = ConnectBackoff::new(Duration::from_millis(100), Duration::from_secs(1), 5);
		assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
		assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
		assert_eq!(backoff.delay_for(3), Duration::from_millis(400));
		assert_eq!(backoff.delay_for(10), Duration::from_secs(1));
	}

	#[test]
	fn default_has_five_attempts() {
		assert_eq!(ConnectBackoff::default().max_attempts(), 5);
	}
}
