use std::{fmt::Display, future::Future, time::Duration};

const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
}
impl RetryPolicy {
	pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
		Self { max_attempts: max_attempts.max(1), base_delay }
	}

	/// Delay slept after the given failed attempt (1-based): `base * 2^(attempt - 1)`.
	pub fn delay_after(&self, attempt: u32) -> Duration {
		let exp = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);

		self.base_delay.saturating_mul(1 << exp)
	}
}

/// Runs `op` until it succeeds or the policy's attempts are spent, returning the last error.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, operation: &str, mut op: F) -> Result<T, E>
where
	E: Display,
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	let max_attempts = policy.max_attempts.max(1);
	let mut attempt = 1;

	loop {
		match op(attempt).await {
			Ok(value) => return Ok(value),
			Err(err) if attempt < max_attempts => {
				let delay = policy.delay_after(attempt);

				tracing::warn!(
					operation,
					attempt,
					max_attempts,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"Provider call failed. Retrying."
				);

				tokio::time::sleep(delay).await;

				attempt += 1;
			},
			Err(err) => {
				tracing::error!(operation, attempt, error = %err, "Provider call exhausted retries.");

				return Err(err);
			},
		}
	}
}
