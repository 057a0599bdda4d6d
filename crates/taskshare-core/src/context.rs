//! Application-wide groups context.
//!
//! `GroupsContext` is built once at startup and handed to every consumer.
//! It owns the groups directory and the members cache, and exposes the
//! group mutations that have to keep both consistent.

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::GroupSource;
use crate::auth::IdentitySignal;
use crate::cache::{CacheSettings, FetchOptions, MembersCache};
use crate::directory::GroupsDirectory;
use crate::models::{Group, GroupPatch, Member, NewGroup};
use crate::store::KeyValueStore;

#[derive(Clone)]
pub struct GroupsContext {
    source: Arc<dyn GroupSource>,
    directory: Arc<GroupsDirectory>,
    members: MembersCache,
    identity: IdentitySignal,
}

impl GroupsContext {
    pub fn new(
        source: Arc<dyn GroupSource>,
        store: Arc<dyn KeyValueStore>,
        settings: CacheSettings,
        identity: IdentitySignal,
    ) -> Self {
        Self {
            directory: Arc::new(GroupsDirectory::new(source.clone())),
            members: MembersCache::new(source.clone(), store, settings),
            source,
            identity,
        }
    }

    pub fn identity(&self) -> &IdentitySignal {
        &self.identity
    }

    pub fn members_cache(&self) -> &MembersCache {
        &self.members
    }

    // ===== Identity =====

    /// Keep the directory in step with the identity signal.
    ///
    /// Signing in (or switching user) refreshes the groups; signing out
    /// clears them. The members cache is left as is on sign-out.
    pub fn watch_identity(&self) -> JoinHandle<()> {
        let mut rx = self.identity.subscribe();
        let directory = self.directory.clone();

        tokio::spawn(async move {
            let mut current_user: Option<String> = None;
            loop {
                let user = rx.borrow_and_update().clone();
                match user {
                    Some(user) if current_user.as_deref() != Some(user.id.as_str()) => {
                        info!(user_id = %user.id, "User signed in, refreshing groups");
                        current_user = Some(user.id);
                        directory.refresh_groups().await;
                    }
                    None if current_user.is_some() => {
                        info!("User signed out, clearing groups");
                        current_user = None;
                        directory.clear();
                    }
                    _ => {}
                }

                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    // ===== Groups =====

    pub fn groups(&self) -> Vec<Group> {
        self.directory.groups()
    }

    pub fn find_group(&self, group_id: &str) -> Option<Group> {
        self.directory.find_group(group_id)
    }

    pub async fn refresh_groups(&self) {
        self.directory.refresh_groups().await;
    }

    /// Prepend a freshly created group and record it as having no members
    /// yet, unless members are already known.
    pub fn add_group_locally(&self, group: Group) {
        self.members.seed_empty(&group.id);
        self.directory.add_group_locally(group);
    }

    pub async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        let created = self.source.create_group(group).await?;
        info!(group_id = %created.id, "Group created");
        self.add_group_locally(created.clone());
        Ok(created)
    }

    pub async fn join_group_by_code(&self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.is_empty() {
            bail!("Join code is empty");
        }
        self.source.join_group_by_code(code).await?;
        info!("Joined group by code");
        self.directory.refresh_groups().await;
        Ok(())
    }

    pub async fn update_group(&self, group_id: &str, patch: &GroupPatch) -> Result<()> {
        self.source.update_group(group_id, patch).await?;
        self.directory.update_group_locally(group_id, patch);
        Ok(())
    }

    pub async fn leave_group(&self, group_id: &str) -> Result<()> {
        self.source.leave_group(group_id).await?;
        info!(group_id = group_id, "Left group");
        self.directory.remove_group_locally(group_id);
        Ok(())
    }

    pub async fn delete_group(&self, group_id: &str) -> Result<()> {
        self.source.delete_group(group_id).await?;
        info!(group_id = group_id, "Group deleted");
        self.directory.remove_group_locally(group_id);
        Ok(())
    }

    // ===== Members =====

    pub async fn get_members(&self, group_id: &str, options: FetchOptions) -> Vec<Member> {
        self.members.get_members(group_id, options).await
    }

    pub async fn refresh_members(&self, group_id: &str) -> Vec<Member> {
        self.members.refresh_members(group_id).await
    }

    pub async fn add_member_locally(&self, group_id: &str, member: Member) {
        self.members.add_member_locally(group_id, member).await;
    }

    pub async fn remove_member_locally(&self, group_id: &str, member_id: &str) {
        self.members.remove_member_locally(group_id, member_id).await;
    }
}
