//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Account
// =============================================================================

/// A local account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// May manage announcements
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Status
// =============================================================================

/// Who may see a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    /// Followers only
    Private,
    /// Mentioned accounts only
    Direct,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
            Self::Direct => "direct",
        }
    }

    /// Public and unlisted statuses are visible to everyone
    pub fn is_world_readable(&self) -> bool {
        matches!(self, Self::Public | Self::Unlisted)
    }
}

/// A post
///
/// The reblog count is not stored here; it is always derived from the
/// `reblogs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Status {
    pub id: String,
    /// Author
    pub account_id: String,
    pub content: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

/// Reblog (boost) relationship
///
/// At most one row exists per (account, status) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reblog {
    pub id: String,
    /// The reblogging account
    pub account_id: String,
    pub status_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Announcements
// =============================================================================

/// Publication state of an announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementState {
    Unpublished,
    Published,
}

/// Instance-wide announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub text: String,
    pub published: bool,
    pub all_day: bool,
    /// Set only while unpublished and waiting for publication
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Validity window start; requires `ends_at`
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    /// Referenced statuses, in display order
    pub status_ids: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    pub fn state(&self) -> AnnouncementState {
        if self.published {
            AnnouncementState::Published
        } else {
            AnnouncementState::Unpublished
        }
    }

    /// Sort key for chronological listings
    ///
    /// First present of `starts_at`, `scheduled_at`, `published_at`,
    /// falling back to `created_at`.
    pub fn chronological_key(&self) -> DateTime<Utc> {
        self.starts_at
            .or(self.scheduled_at)
            .or(self.published_at)
            .unwrap_or(self.created_at)
    }
}

/// Named reaction to an announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnnouncementReaction {
    pub id: String,
    pub announcement_id: String,
    /// Reacting account, if attributed
    pub account_id: Option<String>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Reactions aggregated by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub name: String,
    pub count: i64,
    /// Whether the viewing account reacted with this name
    pub me: bool,
}
