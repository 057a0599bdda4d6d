use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use super::entry::{CacheEntry, DEFAULT_TTL_MINUTES};
use super::volatile::VolatileStore;
use crate::api::GroupSource;
use crate::models::Member;
use crate::store::KeyValueStore;

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Maximum age of a persisted snapshot that may still be served.
    pub ttl: Duration,
    /// Cap on groups held in memory. `None` keeps every group.
    pub max_groups: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            max_groups: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Skip both cache tiers and block on the backend.
    pub force: bool,
}

impl FetchOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

struct Inner {
    source: Arc<dyn GroupSource>,
    store: Arc<dyn KeyValueStore>,
    settings: CacheSettings,
    volatile: Mutex<VolatileStore>,
    /// Ticket of the last save issued per group. Held across the store
    /// write so saves land in ticket order.
    persisted: tokio::sync::Mutex<HashMap<String, u64>>,
    background: Mutex<JoinSet<()>>,
}

/// Group membership cache.
///
/// Reads never fail: backend and storage errors are logged and the best
/// locally known list is returned instead. Clone is cheap and every clone
/// shares the same state.
///
/// Concurrent reads of the same uncached group are not coalesced; each one
/// may call the backend. When two fetches overlap, the one that started
/// last wins regardless of which finishes last, in memory and in storage.
#[derive(Clone)]
pub struct MembersCache {
    inner: Arc<Inner>,
}

impl MembersCache {
    pub fn new(
        source: Arc<dyn GroupSource>,
        store: Arc<dyn KeyValueStore>,
        settings: CacheSettings,
    ) -> Self {
        let volatile = VolatileStore::new(settings.max_groups);
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                settings,
                volatile: Mutex::new(volatile),
                persisted: tokio::sync::Mutex::new(HashMap::new()),
                background: Mutex::new(JoinSet::new()),
            }),
        }
    }

    fn volatile(&self) -> MutexGuard<'_, VolatileStore> {
        self.inner
            .volatile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn background(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.inner
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn issue_ticket(&self) -> u64 {
        self.volatile().issue_ticket()
    }

    /// Members of `group_id`, served from the fastest usable tier.
    ///
    /// An empty `group_id` yields an empty list without touching any tier.
    pub async fn get_members(&self, group_id: &str, options: FetchOptions) -> Vec<Member> {
        if group_id.is_empty() {
            return Vec::new();
        }

        if !options.force {
            if let Some(members) = self.cached_non_empty(group_id) {
                debug!(group_id = group_id, count = members.len(), "Members served from memory");
                return members;
            }

            let ticket = self.issue_ticket();
            if let Some(entry) = self.load_from_store(group_id).await {
                debug!(group_id = group_id, count = entry.members.len(), "Members served from storage, revalidating");
                let members = self.apply(group_id, entry.members, ticket);
                self.spawn_revalidate(group_id);
                return members;
            }
        }

        self.fetch_blocking(group_id).await
    }

    /// Always reads from the backend, with the same fallback as `get_members`.
    pub async fn refresh_members(&self, group_id: &str) -> Vec<Member> {
        self.get_members(group_id, FetchOptions::forced()).await
    }

    /// Optimistically add a member. No-op if a member with the same id is
    /// already listed.
    pub async fn add_member_locally(&self, group_id: &str, member: Member) {
        if group_id.is_empty() {
            return;
        }

        let (updated, ticket) = {
            let mut volatile = self.volatile();
            let current = volatile.get(group_id).unwrap_or_default();
            if current.iter().any(|m| m.id == member.id) {
                debug!(group_id = group_id, member_id = %member.id, "Member already listed");
                return;
            }
            let mut updated = Vec::with_capacity(current.len() + 1);
            updated.push(member);
            updated.extend_from_slice(current);

            let ticket = volatile.issue_ticket();
            volatile.insert(group_id, updated.clone(), ticket);
            (updated, ticket)
        };

        self.save_to_store(group_id, &updated, ticket).await;
    }

    /// Optimistically remove a member. No-op if the id is not listed.
    pub async fn remove_member_locally(&self, group_id: &str, member_id: &str) {
        if group_id.is_empty() {
            return;
        }

        let (updated, ticket) = {
            let mut volatile = self.volatile();
            let current = volatile.get(group_id).unwrap_or_default();
            if !current.iter().any(|m| m.id == member_id) {
                debug!(group_id = group_id, member_id = member_id, "Member not listed");
                return;
            }
            let updated: Vec<Member> = current
                .iter()
                .filter(|m| m.id != member_id)
                .cloned()
                .collect();

            let ticket = volatile.issue_ticket();
            volatile.insert(group_id, updated.clone(), ticket);
            (updated, ticket)
        };

        self.save_to_store(group_id, &updated, ticket).await;
    }

    /// Wait for every background refresh started so far to finish.
    pub async fn wait_for_background(&self) {
        let mut tasks = std::mem::take(&mut *self.background());
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Background members refresh task failed");
            }
        }
    }

    /// Record `group_id` as known-empty unless something is already held.
    pub fn seed_empty(&self, group_id: &str) {
        if group_id.is_empty() {
            return;
        }
        let mut volatile = self.volatile();
        if !volatile.contains(group_id) {
            volatile.insert(group_id, Vec::new(), 0);
        }
    }

    /// In-memory list for `group_id`, without any I/O.
    pub fn cached(&self, group_id: &str) -> Option<Vec<Member>> {
        self.volatile().get(group_id).map(|m| m.to_vec())
    }

    /// Age of the persisted snapshot for display, fresh or not.
    pub async fn persisted_age(&self, group_id: &str) -> Option<String> {
        if group_id.is_empty() {
            return None;
        }
        match self.inner.store.get(&CacheEntry::key(group_id)).await {
            Ok(Some(raw)) => CacheEntry::parse(&raw).ok().map(|e| e.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(group_id = group_id, error = %e, "Failed to load members for age display");
                None
            }
        }
    }

    fn cached_non_empty(&self, group_id: &str) -> Option<Vec<Member>> {
        let mut volatile = self.volatile();
        let members = volatile.get(group_id).filter(|m| !m.is_empty())?.to_vec();
        volatile.touch(group_id);
        Some(members)
    }

    /// Store `members` in memory under `ticket`; returns what memory now holds.
    fn apply(&self, group_id: &str, members: Vec<Member>, ticket: u64) -> Vec<Member> {
        let mut volatile = self.volatile();
        if volatile.insert(group_id, members.clone(), ticket) {
            members
        } else {
            volatile.get(group_id).map(|m| m.to_vec()).unwrap_or(members)
        }
    }

    /// Fetch from the backend and write through to both tiers. Returns `None`
    /// if the fetch failed, or `Some(current)` with whatever memory holds
    /// afterwards.
    async fn fetch_and_store(&self, group_id: &str) -> Option<Vec<Member>> {
        let ticket = self.issue_ticket();
        match self.inner.source.fetch_group_and_members(group_id).await {
            Ok(fetched) => {
                let members = fetched.members;
                let applied = {
                    let mut volatile = self.volatile();
                    volatile.insert(group_id, members.clone(), ticket)
                };
                if applied {
                    self.save_to_store(group_id, &members, ticket).await;
                    Some(members)
                } else {
                    Some(self.cached(group_id).unwrap_or(members))
                }
            }
            Err(e) => {
                error!(group_id = group_id, error = %e, "Failed to fetch members");
                None
            }
        }
    }

    async fn fetch_blocking(&self, group_id: &str) -> Vec<Member> {
        match self.fetch_and_store(group_id).await {
            Some(members) => members,
            None => {
                let fallback = self.cached(group_id).unwrap_or_default();
                warn!(group_id = group_id, count = fallback.len(), "Falling back to cached members");
                fallback
            }
        }
    }

    /// Refresh `group_id` in a background task. Callers are never told the
    /// outcome; failures are only logged.
    fn spawn_revalidate(&self, group_id: &str) {
        let cache = self.clone();
        let group_id = group_id.to_string();
        let mut background = self.background();
        // Reap finished refreshes so the set only holds pending ones
        while background.try_join_next().is_some() {}
        background.spawn(async move {
            if cache.fetch_and_store(&group_id).await.is_some() {
                debug!(group_id = %group_id, "Background members refresh applied");
            } else {
                warn!(group_id = %group_id, "Background members refresh failed, keeping cached list");
            }
        });
    }

    /// Read a usable snapshot. Missing, unreadable and expired entries all
    /// count as a miss.
    async fn load_from_store(&self, group_id: &str) -> Option<CacheEntry> {
        let raw = match self.inner.store.get(&CacheEntry::key(group_id)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(group_id = group_id, error = %e, "Failed to read cached members");
                return None;
            }
        };

        let entry = match CacheEntry::parse(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(group_id = group_id, error = %e, "Discarding unreadable cached members");
                return None;
            }
        };

        if !entry.is_fresh(self.inner.settings.ttl, Utc::now()) {
            debug!(group_id = group_id, age_ms = entry.age(Utc::now()).num_milliseconds(), "Cached members expired");
            return None;
        }

        Some(entry)
    }

    /// Best effort: failures are logged and otherwise ignored. A save whose
    /// ticket is older than the last one issued for the group is skipped.
    async fn save_to_store(&self, group_id: &str, members: &[Member], ticket: u64) {
        let mut persisted = self.inner.persisted.lock().await;
        if let Some(&last) = persisted.get(group_id) {
            if last > ticket {
                debug!(group_id = group_id, ticket, last, "Skipping superseded members save");
                return;
            }
        }
        persisted.insert(group_id.to_string(), ticket);

        let raw = match CacheEntry::encode(members, Utc::now()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(group_id = group_id, error = %e, "Failed to encode members for storage");
                return;
            }
        };
        if let Err(e) = self.inner.store.set(&CacheEntry::key(group_id), &raw).await {
            warn!(group_id = group_id, error = %e, "Failed to cache members");
        }
    }
}
