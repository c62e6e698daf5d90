//! Validity evaluation for access codes.
//!
//! A code is usable only when all of the following hold at the instant of the
//! check:
//!
//! - its status is `active`
//! - `valid_from <= now`
//! - `now <= valid_until` (or the code has no end)
//! - it has no use budget, or `uses_count < max_uses`
//!
//! Expiry is evaluated lazily here; a stored `active` status past its window
//! is reported as [`Validity::Expired`] without any write.
//!
//! Entities opt in through [`CodeValidity`], which supplies the evaluation
//! once on top of a few accessors:
//!
//! ```
//! use lockbox_core::{CodeStatus, ValidityWindow};
//! use lockbox_core::validity::CodeValidity;
//! use chrono::{Duration, Utc};
//!
//! struct Pin {
//!     status: CodeStatus,
//!     window: ValidityWindow,
//! }
//!
//! impl CodeValidity for Pin {
//!     fn status(&self) -> CodeStatus { self.status }
//!     fn window(&self) -> ValidityWindow { self.window }
//!     fn max_uses(&self) -> Option<i64> { None }
//!     fn uses_count(&self) -> i64 { 0 }
//! }
//!
//! let now = Utc::now();
//! let pin = Pin {
//!     status: CodeStatus::Active,
//!     window: ValidityWindow::new(now - Duration::hours(1), Some(now + Duration::hours(1))).unwrap(),
//! };
//! assert!(pin.is_valid_at(now));
//! assert!(!pin.is_valid_at(now + Duration::hours(2)));
//! ```

use crate::{CodeStatus, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `[valid_from, valid_until]` interval, open-ended when `valid_until` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    /// Build a window.
    ///
    /// # Errors
    /// Returns `Error::InvalidWindow` unless `valid_until` is strictly after
    /// `valid_from`.
    pub fn new(valid_from: DateTime<Utc>, valid_until: Option<DateTime<Utc>>) -> Result<Self> {
        if let Some(until) = valid_until
            && until <= valid_from
        {
            return Err(Error::InvalidWindow(format!(
                "valid_until ({until}) must be after valid_from ({valid_from})"
            )));
        }
        Ok(Self {
            valid_from,
            valid_until,
        })
    }

    /// Window starting at `valid_from` with no end.
    pub fn open_ended(valid_from: DateTime<Utc>) -> Self {
        Self {
            valid_from,
            valid_until: None,
        }
    }

    /// Whether `now` lies inside the window (both bounds inclusive).
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if now < self.valid_from {
            return false;
        }
        match self.valid_until {
            Some(until) => now <= until,
            None => true,
        }
    }

    /// Whether the window has closed for good at `now`.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| now > until)
    }
}

/// Result of evaluating a code at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    Valid,
    /// Status is not `active` (pending, revoked, claimed, or stored expired).
    NotActive(CodeStatus),
    NotYetValid,
    Expired,
    UsesExhausted,
}

impl Validity {
    pub fn is_valid(self) -> bool {
        matches!(self, Validity::Valid)
    }

    /// Short reason suitable for a 403-class response body.
    pub fn reason(self) -> &'static str {
        match self {
            Validity::Valid => "code is valid",
            Validity::NotActive(CodeStatus::Pending) => "code is not active yet",
            Validity::NotActive(CodeStatus::Revoked) => "code has been revoked",
            Validity::NotActive(CodeStatus::Claimed) => "code has been claimed",
            Validity::NotActive(_) => "code is no longer active",
            Validity::NotYetValid => "code validity has not started",
            Validity::Expired => "code has expired",
            Validity::UsesExhausted => "code has no remaining uses",
        }
    }

    /// Whether this outcome means the code should be stored as `expired`.
    pub fn is_lapsed(self) -> bool {
        matches!(self, Validity::Expired | Validity::UsesExhausted)
    }
}

/// Evaluate the validity rule at `now`.
pub fn evaluate_validity(
    status: CodeStatus,
    window: &ValidityWindow,
    max_uses: Option<i64>,
    uses_count: i64,
    now: DateTime<Utc>,
) -> Validity {
    if status != CodeStatus::Active {
        return Validity::NotActive(status);
    }
    if now < window.valid_from {
        return Validity::NotYetValid;
    }
    if window.has_ended(now) {
        return Validity::Expired;
    }
    if let Some(max) = max_uses
        && uses_count >= max
    {
        return Validity::UsesExhausted;
    }
    Validity::Valid
}

/// Entities carrying access-code validity data.
///
/// Implementors provide the accessors; evaluation comes from the default
/// methods.
pub trait CodeValidity {
    fn status(&self) -> CodeStatus;

    fn window(&self) -> ValidityWindow;

    fn max_uses(&self) -> Option<i64>;

    fn uses_count(&self) -> i64;

    /// Evaluate at an explicit instant.
    fn validity_at(&self, now: DateTime<Utc>) -> Validity {
        evaluate_validity(
            self.status(),
            &self.window(),
            self.max_uses(),
            self.uses_count(),
            now,
        )
    }

    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.validity_at(now).is_valid()
    }

    /// Evaluate against the current wall clock.
    fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}
