/// Production API base URL.
pub const API_ENDPOINT: &str = "https://api.tradier.com";
/// Paper-trading API base URL.
pub const SANDBOX_ENDPOINT: &str = "https://sandbox.tradier.com";

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Schedule used for transport failures and quota rejections.
    pub backoff: BackoffOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            backoff: BackoffOptions::default(),
        }
    }
}

/// Parameters of the exponential backoff schedule.
///
/// A fresh schedule is started for every logical call, so these values are
/// the only backoff state a client holds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackoffOptions {
    /// First delay in milliseconds.
    pub initial_interval_ms: u64,
    /// Growth factor in thousandths (`1500` = 1.5x).
    pub multiplier_milli: u32,
    /// Jitter as a fraction of the delay, in thousandths (`500` = ±50%).
    pub randomization_milli: u32,
    /// Upper bound for any single delay in milliseconds.
    pub max_interval_ms: u64,
    /// Total time budget after which the schedule stops. `0` never stops.
    pub max_elapsed_ms: u64,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            multiplier_milli: 1_500,
            randomization_milli: 500,
            max_interval_ms: 60_000,
            max_elapsed_ms: 15 * 60 * 1_000,
        }
    }
}

impl BackoffOptions {
    /// Deterministic schedule without jitter, doubling from `initial_interval_ms`.
    pub fn fixed_doubling(initial_interval_ms: u64, max_interval_ms: u64) -> Self {
        Self {
            initial_interval_ms,
            multiplier_milli: 2_000,
            randomization_milli: 0,
            max_interval_ms,
            max_elapsed_ms: 0,
        }
    }
}
