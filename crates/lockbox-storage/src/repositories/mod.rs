pub mod access_code;
pub mod lock_activity;
pub mod smart_lock;

pub use access_code::{AccessCodeRepository, SqliteAccessCodeRepository};
pub use lock_activity::{LockActivityRepository, SqliteLockActivityRepository};
pub use smart_lock::{SmartLockRepository, SqliteSmartLockRepository};
