use async_trait::async_trait;
use anyhow::Result;
use serde::Deserialize;

use crate::models::{Group, GroupPatch, GroupRecord, Member, NewGroup};

/// One group with its full member list, as returned by a member fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupAndMembers {
    pub group: GroupRecord,
    #[serde(default)]
    pub members: Vec<Member>,
}

/// The authoritative source for groups and membership.
///
/// Every call is a plain request/response; implementations are expected to be
/// always correct but possibly slow or unavailable.
#[async_trait]
pub trait GroupSource: Send + Sync {
    async fn fetch_group_and_members(&self, group_id: &str) -> Result<GroupAndMembers>;

    async fn fetch_my_groups(&self) -> Result<Vec<GroupRecord>>;

    async fn create_group(&self, group: &NewGroup) -> Result<Group>;

    async fn join_group_by_code(&self, code: &str) -> Result<()>;

    async fn update_group(&self, group_id: &str, patch: &GroupPatch) -> Result<()>;

    async fn leave_group(&self, group_id: &str) -> Result<()>;

    async fn delete_group(&self, group_id: &str) -> Result<()>;
}
