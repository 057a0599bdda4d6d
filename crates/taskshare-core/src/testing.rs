//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::api::{GroupAndMembers, GroupSource};
use crate::models::{Group, GroupPatch, GroupRecord, Member, NewGroup};
use crate::store::{KeyValueStore, MemoryStore, StoreError};

/// In-memory backend with call counters and failure switches.
#[derive(Default)]
pub struct FakeSource {
    members: Mutex<HashMap<String, Vec<Member>>>,
    groups: Mutex<Vec<GroupRecord>>,
    failing_groups: Mutex<HashSet<String>>,
    fail_directory: AtomicBool,
    fail_mutations: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    directory_gate: Mutex<Option<Arc<Semaphore>>>,
    member_fetches: AtomicUsize,
    completed_fetches: AtomicUsize,
    directory_fetches: AtomicUsize,
    mutations: AtomicUsize,
    joined_codes: Mutex<Vec<String>>,
}

pub fn record(id: &str, name: &str) -> GroupRecord {
    GroupRecord {
        id: id.to_string(),
        name: Some(name.to_string()),
        icon: None,
        color: None,
        member_count: None,
        members: None,
        pending_task_count: None,
        join_code: None,
    }
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(self, group_id: &str, ids: &[&str]) -> Self {
        self.set_members(group_id, ids);
        self
    }

    pub fn with_groups(self, records: Vec<GroupRecord>) -> Self {
        self.set_groups(records);
        self
    }

    pub fn set_members(&self, group_id: &str, ids: &[&str]) {
        let members = ids.iter().map(|id| Member::new(*id)).collect();
        self.members
            .lock()
            .unwrap()
            .insert(group_id.to_string(), members);
    }

    pub fn set_groups(&self, records: Vec<GroupRecord>) {
        *self.groups.lock().unwrap() = records;
    }

    pub fn fail_members(&self, group_id: &str, failing: bool) {
        let mut failing_groups = self.failing_groups.lock().unwrap();
        if failing {
            failing_groups.insert(group_id.to_string());
        } else {
            failing_groups.remove(group_id);
        }
    }

    pub fn fail_directory(&self, failing: bool) {
        self.fail_directory.store(failing, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, failing: bool) {
        self.fail_mutations.store(failing, Ordering::SeqCst);
    }

    /// Member fetches started from now on wait for a permit on the returned
    /// semaphore. The response is captured when the fetch starts.
    pub fn hold_fetches(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Directory fetches started from now on wait for a permit.
    pub fn hold_directory(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.directory_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Let member fetches started from now on through immediately.
    pub fn stop_holding(&self) {
        *self.gate.lock().unwrap() = None;
    }

    pub fn member_fetches(&self) -> usize {
        self.member_fetches.load(Ordering::SeqCst)
    }

    pub fn completed_fetches(&self) -> usize {
        self.completed_fetches.load(Ordering::SeqCst)
    }

    pub fn directory_fetches(&self) -> usize {
        self.directory_fetches.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn joined_codes(&self) -> Vec<String> {
        self.joined_codes.lock().unwrap().clone()
    }

    fn begin_mutation(&self) -> Result<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.load(Ordering::SeqCst) {
            bail!("backend rejected mutation");
        }
        Ok(())
    }
}

#[async_trait]
impl GroupSource for FakeSource {
    async fn fetch_group_and_members(&self, group_id: &str) -> Result<GroupAndMembers> {
        self.member_fetches.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_groups.lock().unwrap().contains(group_id);
        let members = self.members.lock().unwrap().get(group_id).cloned();
        let gate = self.gate.lock().unwrap().clone();

        if let Some(gate) = gate {
            gate.acquire().await?.forget();
        }
        self.completed_fetches.fetch_add(1, Ordering::SeqCst);

        if failing {
            bail!("backend unavailable for {group_id}");
        }
        let members = members.ok_or_else(|| anyhow!("group {group_id} not found"))?;
        Ok(GroupAndMembers {
            group: record(group_id, group_id),
            members,
        })
    }

    async fn fetch_my_groups(&self) -> Result<Vec<GroupRecord>> {
        self.directory_fetches.fetch_add(1, Ordering::SeqCst);
        let groups = self.groups.lock().unwrap().clone();
        let gate = self.directory_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await?.forget();
        }
        if self.fail_directory.load(Ordering::SeqCst) {
            bail!("backend unavailable");
        }
        Ok(groups)
    }

    async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        self.begin_mutation()?;
        let mut created = record(&format!("new-{}", group.name.to_lowercase()), &group.name);
        created.icon = group.icon.clone();
        created.color = group.color.clone();
        created.member_count = Some(1);
        Ok(created.to_group())
    }

    async fn join_group_by_code(&self, code: &str) -> Result<()> {
        self.begin_mutation()?;
        self.joined_codes.lock().unwrap().push(code.to_string());
        Ok(())
    }

    async fn update_group(&self, _group_id: &str, _patch: &GroupPatch) -> Result<()> {
        self.begin_mutation()
    }

    async fn leave_group(&self, _group_id: &str) -> Result<()> {
        self.begin_mutation()
    }

    async fn delete_group(&self, _group_id: &str) -> Result<()> {
        self.begin_mutation()
    }
}

/// Memory store whose writes can be held back, to control the order in
/// which saves land.
#[derive(Default)]
pub struct GatedStore {
    inner: MemoryStore,
    gate: Mutex<Option<Arc<Semaphore>>>,
    started_writes: AtomicUsize,
}

impl GatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes started from now on wait for a permit before landing.
    pub fn hold_writes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn started_writes(&self) -> usize {
        self.started_writes.load(Ordering::SeqCst)
    }

    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.peek(key)
    }
}

#[async_trait]
impl KeyValueStore for GatedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.started_writes.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
                .forget();
        }
        self.inner.set(key, value).await
    }
}

/// Poll `condition` until it holds, failing the test after about a second.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

/// Give detached tasks a chance to run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
