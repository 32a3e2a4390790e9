use std::time::Duration;

/// Hooks invoked by the request executor at failure and retry points.
///
/// Implementations must be cheap; they run inline on the calling task.
pub trait RetryObserver: Send + Sync {
    /// A request got no HTTP response at all.
    fn on_transport_error(&self, attempt: usize, url: &str, error: &reqwest::Error) {
        let _ = (attempt, url, error);
    }

    /// The executor is about to wait `delay` before attempt number `next_attempt`.
    fn on_retry(&self, next_attempt: usize, url: &str, delay: Duration) {
        let _ = (next_attempt, url, delay);
    }
}

/// Default observer, emitting `tracing` events when the `tracing` feature is on.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RetryObserver for TracingObserver {
    fn on_transport_error(&self, attempt: usize, url: &str, error: &reqwest::Error) {
        #[cfg(feature = "tracing")]
        tracing::warn!(attempt, url, %error, "request failed without a response");

        #[cfg(not(feature = "tracing"))]
        let _ = (attempt, url, error);
    }

    fn on_retry(&self, next_attempt: usize, url: &str, delay: Duration) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            next_attempt,
            url,
            delay_ms = delay.as_millis() as u64,
            "retrying request"
        );

        #[cfg(not(feature = "tracing"))]
        let _ = (next_attempt, url, delay);
    }
}
