//! Group models.
//!
//! `GroupRecord` mirrors what the backend returns for "my groups"; the
//! directory only ever holds the normalized `Group`.

use serde::{Deserialize, Serialize};

use super::Member;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Denormalized count from the directory fetch; not kept in sync with
    /// the members cache.
    #[serde(rename = "memberCount", default)]
    pub member_count: u32,
    #[serde(rename = "pendingTaskCount", default)]
    pub pending_task_count: u32,
    #[serde(rename = "joinCode", default)]
    pub join_code: Option<String>,
}

impl Group {
    pub fn display_member_count(&self) -> String {
        match self.member_count {
            1 => "1 member".to_string(),
            n => format!("{} members", n),
        }
    }

    /// Apply the non-empty fields of a patch.
    pub fn apply(&mut self, patch: &GroupPatch) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if patch.icon.is_some() {
            self.icon = patch.icon.clone();
        }
        if patch.color.is_some() {
            self.color = patch.color.clone();
        }
    }
}

/// Raw group record from the backend.
///
/// The member count arrives either as an aggregate or only as an embedded
/// member list, depending on how the backend query was shaped.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(rename = "memberCount", default)]
    pub member_count: Option<u32>,
    #[serde(default)]
    pub members: Option<Vec<Member>>,
    #[serde(rename = "pendingTaskCount", default)]
    pub pending_task_count: Option<u32>,
    #[serde(rename = "joinCode", default)]
    pub join_code: Option<String>,
}

impl GroupRecord {
    pub fn to_group(&self) -> Group {
        let member_count = self
            .member_count
            .or_else(|| self.members.as_ref().map(|m| m.len() as u32))
            .unwrap_or(0);

        Group {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_default(),
            icon: self.icon.clone(),
            color: self.color.clone(),
            member_count,
            pending_task_count: self.pending_task_count.unwrap_or(0),
            join_code: self.join_code.clone(),
        }
    }
}

/// Body for creating a group.
#[derive(Debug, Clone, Serialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl NewGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
            color: None,
        }
    }
}

/// Partial update for a group. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}
