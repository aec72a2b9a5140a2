//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services talk to storage only through `PersistenceGateway`.

mod announcement;
mod reblog;
pub mod visibility;

pub use announcement::{
    AnnouncementParams, AnnouncementService, AnnouncementView, chronological_cmp,
    sort_chronological, sort_reverse_chronological, summarize_reactions,
};
pub use reblog::{ReblogService, ReblogState};
