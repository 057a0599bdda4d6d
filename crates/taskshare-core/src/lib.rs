//! Core library for taskshare.
//!
//! Shared groups and their members, served from a local cache:
//!
//! - `api`: the backend as an authoritative `GroupSource`, and its REST client
//! - `store`: persistent key/value stores backing the cache
//! - `cache`: the stale-while-revalidate members cache
//! - `directory`: the signed-in user's list of groups
//! - `context`: `GroupsContext`, wiring all of the above together
//! - `auth`: identity signal and persisted session
//! - `config`: on-disk configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod directory;
pub mod models;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, GroupSource};
pub use auth::{IdentitySignal, Session, SessionData, UserIdentity};
pub use cache::{CacheSettings, FetchOptions, MembersCache};
pub use config::Config;
pub use context::GroupsContext;
pub use directory::GroupsDirectory;
pub use models::{Group, GroupPatch, Member, NewGroup};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
