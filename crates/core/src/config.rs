//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into core services as an
//! `Arc<CoreConfig>`. Nothing in the core reads environment variables while handling a request;
//! binaries call the `*_from_env_value` helpers below and hand the results to
//! [`CoreConfig::new`].

use crate::constants::{
    DEFAULT_MAX_TRANSACTION_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_TRANSACTION_TIMEOUT_MS,
    PATIENTS_DIR_NAME, WARDS_DIR_NAME,
};
use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: Option<PathBuf>,
    max_transaction_attempts: u32,
    transaction_timeout: Duration,
    retry_backoff: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `data_dir` of `None` keeps every document in memory only.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `max_transaction_attempts` is zero or
    /// `transaction_timeout` is zero.
    pub fn new(
        data_dir: Option<PathBuf>,
        max_transaction_attempts: u32,
        transaction_timeout: Duration,
    ) -> CoreResult<Self> {
        if max_transaction_attempts == 0 {
            return Err(CoreError::Validation(
                "max_transaction_attempts must be at least 1".into(),
            ));
        }
        if transaction_timeout.is_zero() {
            return Err(CoreError::Validation(
                "transaction_timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_dir,
            max_transaction_attempts,
            transaction_timeout,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        })
    }

    /// Build a configuration from raw environment values, applying defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if a numeric value does not parse or is zero.
    pub fn from_env_values(
        data_dir: Option<String>,
        max_transaction_attempts: Option<String>,
        transaction_timeout_ms: Option<String>,
    ) -> CoreResult<Self> {
        Self::new(
            data_dir_from_env_value(data_dir),
            max_attempts_from_env_value(max_transaction_attempts)?,
            timeout_from_env_value(transaction_timeout_ms)?,
        )
    }

    /// An in-memory configuration with default transaction limits.
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            max_transaction_attempts: DEFAULT_MAX_TRANSACTION_ATTEMPTS,
            transaction_timeout: Duration::from_millis(DEFAULT_TRANSACTION_TIMEOUT_MS),
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    /// Override the base delay between transaction attempts.
    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn wards_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(WARDS_DIR_NAME))
    }

    pub fn patients_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(PATIENTS_DIR_NAME))
    }

    pub fn max_transaction_attempts(&self) -> u32 {
        self.max_transaction_attempts
    }

    pub fn transaction_timeout(&self) -> Duration {
        self.transaction_timeout
    }

    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the data directory from an optional string value.
///
/// `None` or empty/whitespace means "in memory only".
pub fn data_dir_from_env_value(value: Option<String>) -> Option<PathBuf> {
    non_blank(value).map(PathBuf::from)
}

/// Parse the transaction attempt budget from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default budget.
pub fn max_attempts_from_env_value(value: Option<String>) -> CoreResult<u32> {
    match non_blank(value) {
        None => Ok(DEFAULT_MAX_TRANSACTION_ATTEMPTS),
        Some(v) => v.parse::<u32>().map_err(|e| {
            CoreError::Validation(format!("invalid transaction attempt count '{}': {}", v, e))
        }),
    }
}

/// Parse the transaction timeout (milliseconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default timeout.
pub fn timeout_from_env_value(value: Option<String>) -> CoreResult<Duration> {
    match non_blank(value) {
        None => Ok(Duration::from_millis(DEFAULT_TRANSACTION_TIMEOUT_MS)),
        Some(v) => v.parse::<u64>().map(Duration::from_millis).map_err(|e| {
            CoreError::Validation(format!("invalid transaction timeout '{}': {}", v, e))
        }),
    }
}
