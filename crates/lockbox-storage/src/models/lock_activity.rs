use chrono::{DateTime, Utc};
use lockbox_core::ActivityEvent;
use lockbox_core::constants::{DEFAULT_ACTIVITY_PAGE_SIZE, MAX_ACTIVITY_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Append-only audit record for a smart lock.
///
/// Rows are never updated or deleted; the schema rejects both.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LockActivity {
    pub id: i64,
    pub smart_lock_id: i64,

    /// Soft reference: the code may have been purged since.
    pub access_code_id: Option<i64>,

    /// Acting user, when the event was caused by one.
    pub user_id: Option<i64>,

    pub event_type: ActivityEvent,
    pub occurred_at: DateTime<Utc>,
    pub metadata: Json<serde_json::Value>,
}

impl LockActivity {
    pub fn new(smart_lock_id: i64, event_type: ActivityEvent) -> Self {
        Self {
            id: 0,
            smart_lock_id,
            access_code_id: None,
            user_id: None,
            event_type,
            occurred_at: Utc::now(),
            metadata: Json(serde_json::Value::Object(serde_json::Map::new())),
        }
    }

    pub fn with_code(mut self, access_code_id: i64) -> Self {
        self.access_code_id = Some(access_code_id);
        self
    }

    pub fn with_user(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Json(metadata);
        self
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// String field from the metadata object.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.0.get(key).and_then(|v| v.as_str())
    }
}

/// Optional filters for activity queries. Bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub event_type: Option<ActivityEvent>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// Offset pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_ACTIVITY_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Page request with `limit` clamped to `1..=MAX_ACTIVITY_PAGE_SIZE`.
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_ACTIVITY_PAGE_SIZE),
        }
    }

    /// The following page.
    pub fn next(self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }
}

/// One page of results plus the total matching count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        i64::from(self.offset) + (self.items.len() as i64) < self.total
    }
}
