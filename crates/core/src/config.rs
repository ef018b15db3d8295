//! Tunables for the fan-out, outbox and integrity components.
//!
//! Every struct has a `Default` matching production behaviour and a
//! `from_env()` constructor that overrides individual fields from
//! environment variables. Unparseable values are logged and ignored.

use std::str::FromStr;
use std::time::Duration;

/// Default number of users requested per directory page.
pub const DEFAULT_PAGE_SIZE: i64 = 100;
/// Default number of concurrent notification writes per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Default pause between notification batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);
/// Default pause between fan-out completion and verification.
pub const DEFAULT_SETTLING_DELAY: Duration = Duration::from_secs(2);

/// Read `key` from the environment and parse it, falling back to `default`
/// when the variable is unset or invalid.
pub fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Invalid config value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Paging, batching and pacing for notification fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Users requested per directory page (`DIRECTORY_PAGE_SIZE`).
    pub page_size: i64,
    /// Concurrent creates per batch (`NOTIFY_BATCH_SIZE`).
    pub batch_size: usize,
    /// Sleep between batches (`NOTIFY_BATCH_DELAY_MS`).
    pub batch_delay: Duration,
    /// Delay before a scheduled verification runs (`VERIFY_SETTLING_DELAY_MS`).
    pub settling_delay: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            settling_delay: DEFAULT_SETTLING_DELAY,
        }
    }
}

impl NotifyConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            page_size: env_or("DIRECTORY_PAGE_SIZE", defaults.page_size).max(1),
            batch_size: env_or("NOTIFY_BATCH_SIZE", defaults.batch_size).max(1),
            batch_delay: Duration::from_millis(env_or(
                "NOTIFY_BATCH_DELAY_MS",
                defaults.batch_delay.as_millis() as u64,
            )),
            settling_delay: Duration::from_millis(env_or(
                "VERIFY_SETTLING_DELAY_MS",
                defaults.settling_delay.as_millis() as u64,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Polling and retry policy for the outbox worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxConfig {
    /// How often the worker looks for due tasks (`OUTBOX_POLL_INTERVAL_SECS`).
    pub poll_interval: Duration,
    /// Attempts before a task is parked as failed (`OUTBOX_MAX_ATTEMPTS`).
    pub max_attempts: u32,
    /// Tasks claimed per poll.
    pub claim_limit: i64,
    /// Base delay for retry backoff; doubled per attempt.
    pub retry_base: Duration,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_attempts: 5,
            claim_limit: 20,
            retry_base: Duration::from_secs(5),
        }
    }
}

impl OutboxConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: Duration::from_secs(env_or(
                "OUTBOX_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )),
            max_attempts: env_or("OUTBOX_MAX_ATTEMPTS", defaults.max_attempts).max(1),
            ..defaults
        }
    }

    /// Backoff before retry number `attempt` (1-based): base, 2x, 4x, ...
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        self.retry_base * 2u32.pow(exponent)
    }
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// Sample bounds for the creator-reference diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityConfig {
    /// Content records inspected per diagnosis (`DIAGNOSE_RECORD_CAP`).
    pub record_cap: i64,
    /// Users preloaded for in-memory resolution (`DIAGNOSE_USER_CAP`).
    pub user_cap: i64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            record_cap: 50,
            user_cap: 100,
        }
    }
}

impl IntegrityConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            record_cap: env_or("DIAGNOSE_RECORD_CAP", defaults.record_cap).max(1),
            user_cap: env_or("DIAGNOSE_USER_CAP", defaults.user_cap).max(1),
        }
    }
}
