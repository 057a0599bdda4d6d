use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Member;

/// Key prefix for persisted member snapshots; the full key is the prefix
/// followed by the group id.
pub const MEMBERS_KEY_PREFIX: &str = "members:";

/// Persisted snapshots older than this are ignored.
pub const DEFAULT_TTL_MINUTES: i64 = 5;

/// Persisted snapshot of one group's members.
///
/// Stored as `{"ts": <epoch millis>, "members": [...]}`. Both fields are
/// required; a value missing either one is treated as a cache miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub ts: i64,
    pub members: Vec<Member>,
}

/// Borrowed form used when writing, so saving never clones the list.
#[derive(Serialize)]
struct CacheEntryRef<'a> {
    ts: i64,
    members: &'a [Member],
}

impl CacheEntry {
    pub fn key(group_id: &str) -> String {
        format!("{}{}", MEMBERS_KEY_PREFIX, group_id)
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Encode a member list stamped with `now`.
    pub fn encode(members: &[Member], now: DateTime<Utc>) -> Result<String, serde_json::Error> {
        serde_json::to_string(&CacheEntryRef {
            ts: now.timestamp_millis(),
            members,
        })
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        Duration::milliseconds(now.timestamp_millis() - self.ts)
    }

    /// Fresh while `now - ts <= ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) <= ttl
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age(Utc::now()).num_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}
