pub mod access_code;
pub mod lock_activity;
pub mod smart_lock;

pub use access_code::{AccessCode, CodeFilter};
pub use lock_activity::{ActivityFilter, LockActivity, Page, PageRequest};
pub use smart_lock::{LockSyncUpdate, SmartLock};
