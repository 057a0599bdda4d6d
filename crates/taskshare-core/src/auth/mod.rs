//! Identity and session management.
//!
//! - `IdentitySignal`: the "current user" value the directory reacts to
//! - `Session`: the persisted bearer token and user identity
//!
//! Sessions are persisted to the cache directory as JSON.

pub mod identity;
pub mod session;

pub use identity::{IdentitySignal, UserIdentity};
pub use session::{Session, SessionData};
