//! Token-bucket rate limiter with adaptive backoff, plus the per-request
//! retry delay schedule (§5 "Rate limiting"). No crate in the retrieval
//! pack implements adaptive-backoff token buckets, so this is hand-rolled
//! behind a `tokio::sync::Mutex`, the same primitive the teacher's
//! concurrency code reaches for around shared mutable state.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy)]
struct BucketState {
    tokens: f64,
    capacity: f64,
    delay: Duration,
    base_delay: Duration,
    boosted_remaining: u32,
    last_refill: Instant,
}

/// Governs outbound HTTP for one ingestion run. One instance is shared by
/// every worker in the pool.
pub struct RateLimiter {
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(delay: Duration, burst: u32) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: burst as f64,
                capacity: burst as f64,
                delay,
                base_delay: delay,
                boosted_remaining: 0,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Blocks the caller until one token is available, consuming it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                refill(&mut state, now);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    bump_boost_counter(&mut state);
                    None
                } else {
                    Some(Duration::from_secs_f64(
                        (1.0 - state.tokens) * state.delay.as_secs_f64(),
                    ))
                }
            };
            match wait {
                None => return,
                Some(duration) => tokio::time::sleep(duration).await,
            }
        }
    }

    /// Records an observed `HTTP 429` (§5 adaptive backoff).
    pub async fn record_rate_limited(&self) {
        let mut state = self.state.lock().await;
        let (new_delay, boosted_remaining) = compute_429_backoff(state.delay);
        state.delay = new_delay;
        state.boosted_remaining = boosted_remaining;
    }
}

fn refill(state: &mut BucketState, now: Instant) {
    let elapsed = now.duration_since(state.last_refill).as_secs_f64();
    let refill_rate = 1.0 / state.delay.as_secs_f64();
    state.tokens = (state.tokens + elapsed * refill_rate).min(state.capacity);
    state.last_refill = now;
}

fn bump_boost_counter(state: &mut BucketState) {
    if state.boosted_remaining > 0 {
        state.boosted_remaining -= 1;
        if state.boosted_remaining == 0 {
            state.delay = state.base_delay;
        }
    }
}

/// §5: "multiply the inter-request delay by 2 for the next
/// `ceil(30s / current delay)` issued tokens".
fn compute_429_backoff(current_delay: Duration) -> (Duration, u32) {
    let new_delay = current_delay * 2;
    let count = (30.0 / new_delay.as_secs_f64()).ceil().max(1.0) as u32;
    (new_delay, count)
}

/// §5 per-request retry schedule: exponential backoff starting at 2s,
/// capped at 30s, with up to `±25%` jitter so a cohort of workers doesn't
/// retry in lockstep.
pub fn backoff_for_attempt(attempt: u32) -> Duration {
    use rand::Rng;
    let base_secs = 2.0_f64 * 2f64.powi(attempt.saturating_sub(1) as i32);
    let capped = base_secs.min(30.0);
    let jitter = rand::thread_rng().gen_range(0.75..=1.25);
    Duration::from_secs_f64(capped * jitter)
}

pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// §5: only transient failures are retried.
pub fn should_retry(error: &FetchError, attempt: u32) -> bool {
    attempt < MAX_RETRY_ATTEMPTS && error.is_retriable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_the_current_delay() {
        let (delay, count) = compute_429_backoff(Duration::from_secs_f64(1.0));
        assert_eq!(delay, Duration::from_secs_f64(2.0));
        assert_eq!(count, 15); // ceil(30/2)
    }

    #[test]
    fn backoff_schedule_is_capped_at_30s() {
        let delay = backoff_for_attempt(10);
        assert!(delay <= Duration::from_secs_f64(37.5)); // 30s + 25% jitter
        assert!(delay >= Duration::from_secs_f64(22.5));
    }

    #[test]
    fn first_attempt_backoff_starts_near_2s() {
        let delay = backoff_for_attempt(1);
        assert!(delay >= Duration::from_secs_f64(1.5));
        assert!(delay <= Duration::from_secs_f64(2.5));
    }

    #[test]
    fn non_retriable_errors_never_retry() {
        assert!(!should_retry(
            &FetchError::ParseMissingField("price".into()),
            0
        ));
    }

    #[test]
    fn retriable_errors_stop_after_max_attempts() {
        let err = FetchError::Timeout;
        assert!(should_retry(&err, 0));
        assert!(should_retry(&err, 2));
        assert!(!should_retry(&err, 3));
    }

    #[tokio::test]
    async fn acquire_drains_burst_without_waiting() {
        let limiter = RateLimiter::new(Duration::from_secs_f64(1.0), 4);
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(200));
    }
}
