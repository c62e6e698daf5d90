//! Orchestration layer of Lockbox.
//!
//! [`SmartLockService`] ties the provider adapters to local storage:
//! it issues and revokes access codes, drives remote lock commands and
//! status syncs, enforces code visibility, and keeps the activity log.
//! [`Housekeeper`] runs the expiry and resync sweep in the background.

pub mod config;
pub mod context;
pub mod error;
mod guards;
pub mod housekeeping;
pub mod service;
pub mod views;

pub use config::ServiceConfig;
pub use context::AccessContext;
pub use error::{Result, ServiceError};
pub use housekeeping::{Housekeeper, HousekeeperHandle};
pub use service::{ResyncReport, SmartLockService, SweepReport};
pub use views::{AccessCodeView, CommandOutcome, IssueCodeRequest, LockRegistration, LockUpdate};
