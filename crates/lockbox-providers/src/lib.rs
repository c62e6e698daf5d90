//! Lock provider adapters for Lockbox.
//!
//! This crate turns the service's requests into vendor calls. It defines the
//! [`LockProvider`] capability contract, a deterministic in-memory
//! [`MockProvider`](mock::MockProvider), and thin REST adapters for the
//! supported vendor clouds.
//!
//! # Selecting an adapter
//!
//! [`ProviderRegistry::resolve`] maps a [`ProviderKind`](lockbox_core::ProviderKind)
//! to an [`AnyLockProvider`]. The mapping is fixed; adapters carry no per-lock
//! state, and every per-lock detail (device id, credentials, settings) travels
//! in a [`LockTarget`].
//!
//! ```no_run
//! use lockbox_providers::{LockProvider, LockTarget, ProviderConfig, ProviderRegistry};
//! use lockbox_core::{Credentials, ProviderKind};
//!
//! #[tokio::main]
//! async fn main() -> lockbox_providers::Result<()> {
//!     let registry = ProviderRegistry::new(ProviderConfig::default())?;
//!     let lock = LockTarget::new(
//!         ProviderKind::Nuki,
//!         "17723712",
//!         Some(Credentials::new(r#"{"api_key": "..."}"#)),
//!     );
//!
//!     let snapshot = registry.resolve(lock.provider).sync_status(&lock).await?;
//!     println!("online: {}", snapshot.online);
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Every call returns [`Result<T>`] with a [`ProviderError`]. Callers decide
//! on retry by [`ProviderError::is_transient`].

pub mod adapters;
pub mod config;
pub mod error;
pub mod mock;
pub mod rest;
pub mod traits;
pub mod types;
pub mod vendors;

pub use adapters::{AnyLockProvider, ProviderRegistry};
pub use config::ProviderConfig;
pub use error::{ProviderError, Result};
pub use mock::{MockFailure, MockOperation, MockProvider, MockProviderHandle};
pub use traits::LockProvider;
pub use types::{CodeSpec, LockSnapshot, LockTarget, ProviderCodeId};
