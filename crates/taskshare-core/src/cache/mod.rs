//! Members caching module.
//!
//! `MembersCache` serves group member lists from three tiers: an in-memory
//! map, a persistent key/value store holding one timestamped snapshot per
//! group, and the backend. Persisted snapshots are usable for 5 minutes;
//! a usable snapshot is returned immediately while a background refresh
//! updates both tiers.

pub mod entry;
pub mod members;
mod volatile;

pub use entry::{CacheEntry, DEFAULT_TTL_MINUTES, MEMBERS_KEY_PREFIX};
pub use members::{CacheSettings, FetchOptions, MembersCache};
