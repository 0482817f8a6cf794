//! Constants used throughout the ward core crate.

/// Directory (under the data directory) holding persisted ward documents.
pub const WARDS_DIR_NAME: &str = "wards";

/// Directory (under the data directory) holding persisted patient documents.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// File extension for persisted documents.
pub const DOCUMENT_EXTENSION: &str = "json";

/// Number of times a transaction is attempted before giving up with a conflict.
pub const DEFAULT_MAX_TRANSACTION_ATTEMPTS: u32 = 25;

/// Upper bound on the wall-clock time a single transaction may spend retrying.
pub const DEFAULT_TRANSACTION_TIMEOUT_MS: u64 = 5_000;

/// Base delay between transaction attempts; the actual delay is jittered.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 2;

/// Capacity of the change-notification channel feeding subscriptions.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Attempts made to allocate a record id that is not already taken.
pub const ID_ALLOCATION_ATTEMPTS: usize = 5;

/// Largest bed count accepted for a single ward.
pub const MAX_WARD_BEDS: u32 = 10_000;

/// Oldest plausible patient age, in years.
pub const MAX_PATIENT_AGE: u32 = 150;
