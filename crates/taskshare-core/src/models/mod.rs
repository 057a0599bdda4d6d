//! Data models for taskshare entities.
//!
//! - `Member`: one person belonging to a group
//! - `Group`: a shared task-list container, as held by the groups directory
//! - `GroupRecord`: the raw "my groups" record returned by the backend
//! - `NewGroup`, `GroupPatch`: request bodies for group mutations

pub mod group;
pub mod member;

pub use group::{Group, GroupPatch, GroupRecord, NewGroup};
pub use member::Member;
