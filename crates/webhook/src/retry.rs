//! Retry Engine: jittered exponential backoff and the
//! retryable-failure taxonomy.

use rand::Rng;
use std::time::Duration;

/// Transport-level failure classes the retry engine recognizes as
/// potentially transient. Anything else (DNS-pinning rejection,
/// template error, TLS failure) is not retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    ConnectionReset,
    TimedOut,
    ConnectionAborted,
    NameNotResolved,
    TemporaryDnsFailure,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub attempt_timeout_ms: u64,
}

impl From<&ax_domain::config::WebhookConfig> for RetryPolicy {
    fn from(c: &ax_domain::config::WebhookConfig) -> Self {
        Self {
            max_retries: c.max_retries,
            initial_delay_ms: c.initial_delay_ms,
            max_delay_ms: c.max_delay_ms,
            multiplier: c.multiplier,
            attempt_timeout_ms: c.attempt_timeout_ms,
        }
    }
}

/// Delay before retry attempt `k` (0-indexed retry count, i.e. the delay
/// before the *first* retry uses `k = 0`):
/// `min(initial * multiplier^k, max) * (1 + U(-0.25, +0.25))`.
pub fn backoff_delay(policy: &RetryPolicy, k: u32) -> Duration {
    let base = (policy.initial_delay_ms as f64 * policy.multiplier.powi(k as i32))
        .min(policy.max_delay_ms as f64);
    let jitter = rand::thread_rng().gen_range(-0.25..=0.25);
    let jittered = (base * (1.0 + jitter)).max(0.0);
    Duration::from_millis(jittered as u64)
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

pub fn is_retryable_transport(failure: TransportFailure) -> bool {
    matches!(
        failure,
        TransportFailure::ConnectionReset
            | TransportFailure::TimedOut
            | TransportFailure::ConnectionAborted
            | TransportFailure::NameNotResolved
            | TransportFailure::TemporaryDnsFailure
    )
}

/// Classify a `reqwest::Error` into a transport failure, if it's one of
/// the recognized transient kinds.
pub fn classify_transport_error(err: &reqwest::Error) -> Option<TransportFailure> {
    if err.is_timeout() {
        return Some(TransportFailure::TimedOut);
    }
    if err.is_connect() {
        let msg = err.to_string().to_lowercase();
        if msg.contains("resolve") || msg.contains("dns") {
            return Some(TransportFailure::NameNotResolved);
        }
        if msg.contains("reset") {
            return Some(TransportFailure::ConnectionReset);
        }
        if msg.contains("abort") {
            return Some(TransportFailure::ConnectionAborted);
        }
        return Some(TransportFailure::ConnectionReset);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            multiplier: 2.0,
            attempt_timeout_ms: 30_000,
        }
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        for k in 0..6 {
            let delay = backoff_delay(&policy(), k).as_millis() as f64;
            let base = (1000.0 * 2f64.powi(k as i32)).min(10_000.0);
            assert!(delay >= base * 0.75 - 1.0, "k={k} delay={delay} base={base}");
            assert!(delay <= base * 1.25 + 1.0, "k={k} delay={delay} base={base}");
        }
    }

    #[test]
    fn retryable_statuses_are_the_documented_set() {
        for s in [408, 429, 500, 502, 503, 504] {
            assert!(is_retryable_status(s));
        }
        for s in [400, 401, 403, 404, 422] {
            assert!(!is_retryable_status(s));
        }
    }
}
