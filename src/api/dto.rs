//! API response DTOs
//!
//! Data Transfer Objects for the JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Announcement, ReactionSummary, Status};
use crate::service::{AnnouncementView, ReblogState};

// =============================================================================
// Statuses
// =============================================================================

/// Reblog state of a status for the requesting account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReblogResponse {
    pub id: String,
    pub reblogs_count: i64,
    pub reblogged: bool,
}

impl From<ReblogState> for StatusReblogResponse {
    fn from(state: ReblogState) -> Self {
        Self {
            id: state.status.id,
            reblogs_count: state.reblogs_count,
            reblogged: state.reblogged,
        }
    }
}

/// Body of `POST /api/v1/statuses/:id/reblog`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReblogResponse {
    pub reblog: StatusReblogResponse,
}

/// Status referenced by an announcement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSummary {
    pub id: String,
    pub account_id: String,
    pub content: String,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
}

impl From<Status> for StatusSummary {
    fn from(status: Status) -> Self {
        Self {
            visibility: status.visibility.as_str().to_string(),
            id: status.id,
            account_id: status.account_id,
            content: status.content,
            created_at: status.created_at,
        }
    }
}

// =============================================================================
// Announcements
// =============================================================================

/// Grouped reaction count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub name: String,
    pub count: i64,
    pub me: bool,
}

impl From<ReactionSummary> for ReactionResponse {
    fn from(summary: ReactionSummary) -> Self {
        Self {
            name: summary.name,
            count: summary.count,
            me: summary.me,
        }
    }
}

/// Published announcement as shown to viewers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementResponse {
    pub id: String,
    pub content: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Absent for anonymous viewers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    pub reactions: Vec<ReactionResponse>,
    pub statuses: Vec<StatusSummary>,
}

impl AnnouncementResponse {
    pub fn from_view(view: AnnouncementView, authenticated: bool) -> Self {
        let announcement = view.announcement;
        Self {
            id: announcement.id,
            content: announcement.text,
            starts_at: announcement.starts_at,
            ends_at: announcement.ends_at,
            all_day: announcement.all_day,
            published_at: announcement.published_at,
            updated_at: announcement.updated_at,
            read: authenticated.then_some(view.read),
            reactions: view.reactions.into_iter().map(Into::into).collect(),
            statuses: view.statuses.into_iter().map(Into::into).collect(),
        }
    }
}

/// Full announcement record for administrators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAnnouncementResponse {
    pub id: String,
    pub text: String,
    pub published: bool,
    pub all_day: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub status_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Announcement> for AdminAnnouncementResponse {
    fn from(announcement: Announcement) -> Self {
        Self {
            id: announcement.id,
            text: announcement.text,
            published: announcement.published,
            all_day: announcement.all_day,
            scheduled_at: announcement.scheduled_at,
            starts_at: announcement.starts_at,
            ends_at: announcement.ends_at,
            published_at: announcement.published_at,
            status_ids: announcement.status_ids.unwrap_or_default(),
            created_at: announcement.created_at,
            updated_at: announcement.updated_at,
        }
    }
}
