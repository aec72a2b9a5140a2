//! Data layer module
//!
//! Handles all data persistence:
//! - Entity models
//! - The `PersistenceGateway` contract used by services
//! - Its SQLite implementation

mod database;
mod gateway;
mod models;

pub use database::{Database, hash_access_token};
pub use gateway::PersistenceGateway;
pub use models::*;
