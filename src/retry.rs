//! Retrying executor with exponential backoff for transient failures.
//!
//! The policy re-invokes a fallible asynchronous operation while
//! [`Error::is_transient`](crate::error::Error::is_transient) holds; anything fatal propagates
//! after a single attempt. Delays grow as `backoff_factor * 2^attempt` seconds and are applied
//! only between attempts, never after the final one.

// self
use crate::_prelude::*;

/// Retry budget and backoff curve applied to every outbound call of a client instance.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
	max_retries: u32,
	backoff_factor: f64,
}
impl RetryPolicy {
	/// Creates a policy; `max_retries` is clamped to at least one attempt.
	pub fn new(max_retries: u32, backoff_factor: f64) -> Self {
		Self { max_retries: max_retries.max(1), backoff_factor }
	}

	/// Maximum number of attempts before the wrapped operation is abandoned.
	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	/// Delay applied before re-running attempt `attempt + 1` (attempts are 0-indexed).
	pub fn backoff_delay(&self, attempt: u32) -> StdDuration {
		StdDuration::from_secs_f64(self.backoff_factor * f64::from(2_u32.pow(attempt.min(31))))
	}

	/// Runs `attempt_fn` until it succeeds, fails fatally, or the retry budget is exhausted.
	///
	/// Exhaustion surfaces as [`Error::RetriesExhausted`] chaining the last transient error and
	/// naming `operation`. Each transient failure is logged at warning level with the computed
	/// delay; fatal errors are logged at error level before propagating.
	pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut attempt = 0;

		loop {
			match attempt_fn().await {
				Ok(value) => return Ok(value),
				Err(err) if err.is_transient() => {
					let delay = self.backoff_delay(attempt);

					tracing::warn!(
						operation,
						attempt,
						delay_secs = delay.as_secs_f64(),
						error = %err,
						"transient error; backing off",
					);

					attempt += 1;

					if attempt >= self.max_retries {
						return Err(Error::RetriesExhausted {
							operation,
							attempts: self.max_retries,
							source: Box::new(err),
						});
					}

					tokio::time::sleep(delay).await;
				},
				Err(err) => {
					tracing::error!(operation, error = %err, "fatal error; not retrying");

					return Err(err);
				},
			}
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(5, 1.)
	}
}
