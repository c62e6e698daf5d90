//! Access code lifecycle rules.
//!
//! # States
//!
//! - `Pending`: persisted locally, not yet confirmed by the provider
//! - `Active`: usable at the lock (subject to its validity window)
//! - `Expired`: window passed or use budget exhausted
//! - `Revoked`: explicitly withdrawn
//! - `Claimed`: consumed by a one-time claim flow
//!
//! # Valid Transitions
//!
//! - Pending → Active | Revoked | Expired
//! - Active → Expired | Revoked | Claimed
//!
//! `Expired`, `Revoked` and `Claimed` are terminal. A revoke request against a
//! terminal code is a no-op rather than an error, see [`revoke_outcome`].
//!
//! # Examples
//!
//! ```
//! use lockbox_core::CodeStatus;
//! use lockbox_core::lifecycle::transition;
//!
//! assert_eq!(transition(CodeStatus::Pending, CodeStatus::Active), Ok(CodeStatus::Active));
//! assert!(transition(CodeStatus::Revoked, CodeStatus::Active).is_err());
//! ```

use crate::{CodeStatus, Error, Result};

impl CodeStatus {
    /// Check if a transition to `target` is allowed from this status.
    ///
    /// ```
    /// use lockbox_core::CodeStatus;
    ///
    /// assert!(CodeStatus::Pending.can_transition_to(CodeStatus::Active));
    /// assert!(!CodeStatus::Pending.can_transition_to(CodeStatus::Claimed));
    /// ```
    pub fn can_transition_to(self, target: CodeStatus) -> bool {
        matches!(
            (self, target),
            // From Pending
            (CodeStatus::Pending, CodeStatus::Active | CodeStatus::Revoked | CodeStatus::Expired)
            // From Active
            | (CodeStatus::Active, CodeStatus::Expired | CodeStatus::Revoked | CodeStatus::Claimed)
        )
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CodeStatus::Expired | CodeStatus::Revoked | CodeStatus::Claimed
        )
    }

    /// Whether a code in this status reserves its value on the lock.
    ///
    /// Only pending and active codes take part in the per-lock uniqueness
    /// constraint; terminal codes may be recycled.
    pub fn reserves_code(self) -> bool {
        matches!(self, CodeStatus::Pending | CodeStatus::Active)
    }
}

/// Validate a status change.
///
/// # Errors
/// Returns `Error::InvalidStateTransition` when the move is not allowed.
pub fn transition(from: CodeStatus, to: CodeStatus) -> Result<CodeStatus> {
    if !from.can_transition_to(to) {
        return Err(Error::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(to)
}

/// What a revoke request should do for a code in `current` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// Attempt provider revocation, then mark revoked locally.
    Revoke,
    /// Already terminal; nothing to do.
    AlreadyTerminal,
}

/// Decide how to handle a revoke request.
pub fn revoke_outcome(current: CodeStatus) -> RevokeOutcome {
    if current.is_terminal() {
        RevokeOutcome::AlreadyTerminal
    } else {
        RevokeOutcome::Revoke
    }
}
