//! The current user's list of groups.
//!
//! Unlike the members cache, a failed refresh empties the directory instead
//! of keeping the previous list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info};

use crate::api::GroupSource;
use crate::models::{Group, GroupPatch};

pub struct GroupsDirectory {
    source: Arc<dyn GroupSource>,
    groups: RwLock<Vec<Group>>,
    /// Bumped on every clear, so a refresh that started before a sign-out
    /// cannot repopulate the list afterwards.
    epoch: AtomicU64,
}

impl GroupsDirectory {
    pub fn new(source: Arc<dyn GroupSource>) -> Self {
        Self {
            source,
            groups: RwLock::new(Vec::new()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current list.
    pub fn groups(&self) -> Vec<Group> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn find_group(&self, group_id: &str) -> Option<Group> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
    }

    /// Replace the whole list with the backend's view. On failure the list
    /// becomes empty.
    pub async fn refresh_groups(&self) {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let groups = match self.source.fetch_my_groups().await {
            Ok(records) => records.iter().map(|r| r.to_group()).collect(),
            Err(e) => {
                error!(error = %e, "Failed to refresh groups");
                Vec::new()
            }
        };

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Groups cleared during refresh, discarding result");
            return;
        }
        info!(count = groups.len(), "Groups refreshed");
        self.replace(groups);
    }

    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.replace(Vec::new());
    }

    /// Prepend a group, replacing any entry with the same id.
    pub fn add_group_locally(&self, group: Group) {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        groups.retain(|g| g.id != group.id);
        groups.insert(0, group);
    }

    /// Returns whether the group was listed.
    pub fn remove_group_locally(&self, group_id: &str) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let before = groups.len();
        groups.retain(|g| g.id != group_id);
        groups.len() != before
    }

    pub fn update_group_locally(&self, group_id: &str, patch: &GroupPatch) {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(group) = groups.iter_mut().find(|g| g.id == group_id) {
            group.apply(patch);
        }
    }

    fn replace(&self, groups: Vec<Group>) {
        *self.groups.write().unwrap_or_else(PoisonError::into_inner) = groups;
    }
}
