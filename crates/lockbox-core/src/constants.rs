//! Core constants for access-code issuance and lock orchestration.
//!
//! Defaults here feed the builder-style configuration structs in the storage
//! and service crates. Changing them changes behavior for every deployment
//! that does not override the corresponding setting.
//!
//! # Usage
//!
//! ```
//! use lockbox_core::constants::*;
//! use std::time::Duration;
//!
//! assert!((MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&DEFAULT_CODE_LENGTH));
//! let timeout = Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 5);
//! ```

// ============================================================================
// Access Codes
// ============================================================================

/// Default number of digits in a generated access code.
///
/// Six digits matches what the supported keypads accept out of the box and
/// gives one million values per lock.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Shortest code length any supported provider accepts.
pub const MIN_CODE_LENGTH: usize = 4;

/// Longest code length any supported provider accepts.
pub const MAX_CODE_LENGTH: usize = 12;

/// Generate-check-insert attempts before issuance fails with
/// `CodeSpaceExhausted`.
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: u32 = 10;

// ============================================================================
// Provider Calls
// ============================================================================

/// Deadline for a single provider call (milliseconds).
///
/// A provider call that does not finish in time is treated as
/// `ProviderUnavailable`.
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5000;

/// Lower bound accepted for a configured provider timeout (milliseconds).
pub const MIN_PROVIDER_TIMEOUT_MS: u64 = 10;

/// Upper bound accepted for a configured provider timeout (milliseconds).
pub const MAX_PROVIDER_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// Lock State
// ============================================================================

/// Highest battery percentage a lock can report.
pub const MAX_BATTERY_LEVEL: i32 = 100;

/// Battery percentage at or below which a sync logs a low-battery warning.
pub const LOW_BATTERY_THRESHOLD: i32 = 20;

// ============================================================================
// Activity Log
// ============================================================================

/// Page size used when a caller does not ask for one.
pub const DEFAULT_ACTIVITY_PAGE_SIZE: u32 = 50;

/// Largest page a caller may request.
pub const MAX_ACTIVITY_PAGE_SIZE: u32 = 500;

// ============================================================================
// Housekeeping
// ============================================================================

/// Interval between housekeeping sweeps (seconds).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Pending codes re-sent to providers per sweep.
pub const DEFAULT_RESYNC_BATCH_SIZE: u32 = 100;

/// Placeholder rendered instead of a hidden code value.
pub const MASKED_CODE: &str = "******";
