//! SQLite persistence for Lockbox.
//!
//! # Architecture
//!
//! - [`Database`]: connection pool with embedded migrations
//! - [`SmartLockRepository`](repositories::SmartLockRepository),
//!   [`AccessCodeRepository`](repositories::AccessCodeRepository) and
//!   [`LockActivityRepository`](repositories::LockActivityRepository): data
//!   access traits with SQLite implementations
//!
//! # Schema guarantees
//!
//! The schema enforces the invariants that must survive concurrent writers:
//!
//! - a partial unique index on `access_codes(smart_lock_id, code)` for
//!   `pending` and `active` rows, so a code value is held by at most one live
//!   code per lock
//! - `CHECK (valid_until IS NULL OR valid_until > valid_from)`
//! - triggers that make `lock_activities` append-only
//!
//! # Examples
//!
//! ```no_run
//! use lockbox_storage::{Database, DatabaseConfig};
//! use lockbox_storage::models::SmartLock;
//! use lockbox_storage::repositories::{SmartLockRepository, SqliteSmartLockRepository};
//! use lockbox_core::ProviderKind;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("lockbox.db")).await?;
//! let locks = SqliteSmartLockRepository::new(db.pool().clone());
//!
//! let id = locks
//!     .create(&SmartLock::new(12, ProviderKind::Mock, "demo-1", "Front door"))
//!     .await?;
//! let lock = locks.find_by_id(id).await?;
//! assert!(lock.is_some());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
