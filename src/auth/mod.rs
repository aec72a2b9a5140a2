//! Bearer token authentication
//!
//! Access tokens are stored as SHA-256 digests; see
//! [`crate::data::hash_access_token`].

mod middleware;

pub use middleware::{AdminAccount, CurrentAccount, MaybeAccount};
