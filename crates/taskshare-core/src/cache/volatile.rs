//! In-memory tier of the members cache.
//!
//! Every stored list carries the ticket of the operation that produced it.
//! Tickets are handed out when an operation starts, so a write is accepted
//! only if no operation that started later has already written.

use std::collections::HashMap;

use tracing::debug;

use crate::models::Member;

struct Slot {
    members: Vec<Member>,
    ticket: u64,
}

#[derive(Default)]
pub(crate) struct VolatileStore {
    slots: HashMap<String, Slot>,
    /// Group ids, least recently used first.
    order: Vec<String>,
    next_ticket: u64,
    max_groups: Option<usize>,
}

impl VolatileStore {
    pub(crate) fn new(max_groups: Option<usize>) -> Self {
        Self {
            max_groups,
            ..Default::default()
        }
    }

    pub(crate) fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    pub(crate) fn get(&self, group_id: &str) -> Option<&[Member]> {
        self.slots.get(group_id).map(|s| s.members.as_slice())
    }

    pub(crate) fn contains(&self, group_id: &str) -> bool {
        self.slots.contains_key(group_id)
    }

    /// Store `members` unless a newer write is already held. Returns whether
    /// the write was applied.
    pub(crate) fn insert(&mut self, group_id: &str, members: Vec<Member>, ticket: u64) -> bool {
        if let Some(slot) = self.slots.get_mut(group_id) {
            if slot.ticket > ticket {
                debug!(group_id = group_id, ticket, held = slot.ticket, "Dropping superseded members write");
                return false;
            }
            slot.members = members;
            slot.ticket = ticket;
            self.touch(group_id);
            return true;
        }

        self.evict_if_full();
        self.slots.insert(group_id.to_string(), Slot { members, ticket });
        self.order.push(group_id.to_string());
        true
    }

    /// Mark a group as most recently used.
    pub(crate) fn touch(&mut self, group_id: &str) {
        if let Some(pos) = self.order.iter().position(|id| id == group_id) {
            let id = self.order.remove(pos);
            self.order.push(id);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    fn evict_if_full(&mut self) {
        let Some(max) = self.max_groups else {
            return;
        };
        if max == 0 || self.slots.len() < max {
            return;
        }

        // Remove the least recently used half
        let evict_count = (max / 2).max(1);
        let to_remove: Vec<_> = self.order.drain(..evict_count).collect();
        for key in &to_remove {
            self.slots.remove(key);
        }
        debug!(evicted = to_remove.len(), "Evicted least recently used member lists");
    }
}
