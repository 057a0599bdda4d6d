//! Backend API module.
//!
//! `GroupSource` is the authoritative source of groups and members as seen by
//! the cache and the directory. `ApiClient` implements it over the hosted
//! REST backend using bearer token authentication.

pub mod client;
pub mod error;
pub mod source;

pub use client::ApiClient;
pub use error::ApiError;
pub use source::{GroupAndMembers, GroupSource};
