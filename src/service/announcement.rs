//! Announcement service
//!
//! Publication lifecycle, chronological listings, reactions and
//! referenced statuses of instance-wide announcements.
//!
//! # State machine
//!
//! ```text
//!  create (scheduled in the future) ──► Unpublished ──publish──► Published
//!  create (no schedule / past)      ───────────────────────────► Published
//!                                       Unpublished ◄─unpublish─ Published
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::data::{
    Account, Announcement, AnnouncementReaction, AnnouncementState, EntityId, PersistenceGateway,
    ReactionSummary, Status,
};
use crate::error::{AppError, ValidationErrors};
use crate::metrics::ANNOUNCEMENT_TRANSITIONS_TOTAL;

const BLANK: &str = "can't be blank";

/// Editable announcement attributes, used for both create and update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncementParams {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub all_day: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status_ids: Option<Vec<String>>,
}

impl AnnouncementParams {
    /// Collect every validation failure
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = ValidationErrors::new();

        if self.text.trim().is_empty() {
            errors.add("text", BLANK);
        }

        match (self.starts_at, self.ends_at) {
            (Some(_), None) => errors.add("ends_at", BLANK),
            (None, Some(_)) => errors.add("starts_at", BLANK),
            (Some(starts_at), Some(ends_at)) if ends_at < starts_at => {
                errors.add("ends_at", "must be after starts_at")
            }
            _ => {}
        }

        errors.into_result()
    }
}

impl Announcement {
    /// Transition to Published
    pub fn publish(&mut self, now: DateTime<Utc>) {
        self.published = true;
        self.published_at = Some(now);
        self.scheduled_at = None;
        self.updated_at = now;
    }

    /// Transition back to Unpublished
    pub fn unpublish(&mut self, now: DateTime<Utc>) {
        self.published = false;
        self.published_at = None;
        self.scheduled_at = None;
        self.updated_at = now;
    }
}

/// Chronological order: [`Announcement::chronological_key`], then id
pub fn chronological_cmp(a: &Announcement, b: &Announcement) -> Ordering {
    a.chronological_key()
        .cmp(&b.chronological_key())
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort oldest first
pub fn sort_chronological(announcements: &mut [Announcement]) {
    announcements.sort_by(chronological_cmp);
}

/// Sort newest first; the exact reverse of [`sort_chronological`]
pub fn sort_reverse_chronological(announcements: &mut [Announcement]) {
    announcements.sort_by(|a, b| chronological_cmp(b, a));
}

/// Group reactions by name
///
/// `reactions` must be ordered by creation time; groups come out ordered by
/// their earliest reaction.
pub fn summarize_reactions(
    reactions: &[AnnouncementReaction],
    account: Option<&Account>,
) -> Vec<ReactionSummary> {
    let mut summaries: Vec<ReactionSummary> = Vec::new();
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();

    for reaction in reactions {
        let me = match (account, reaction.account_id.as_deref()) {
            (Some(account), Some(reactor)) => account.id == reactor,
            _ => false,
        };

        match index_by_name.get(reaction.name.as_str()) {
            Some(&index) => {
                summaries[index].count += 1;
                summaries[index].me |= me;
            }
            None => {
                index_by_name.insert(reaction.name.as_str(), summaries.len());
                summaries.push(ReactionSummary {
                    name: reaction.name.clone(),
                    count: 1,
                    me,
                });
            }
        }
    }

    summaries
}

/// A published announcement as shown to one viewer
#[derive(Debug, Clone)]
pub struct AnnouncementView {
    pub announcement: Announcement,
    /// Viewer dismissed it
    pub read: bool,
    pub reactions: Vec<ReactionSummary>,
    pub statuses: Vec<Status>,
}

/// Announcement service
pub struct AnnouncementService {
    gateway: Arc<dyn PersistenceGateway>,
}

impl AnnouncementService {
    /// Create new announcement service
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Create an announcement
    ///
    /// Published immediately unless `scheduled_at` lies in the future.
    pub async fn create(
        &self,
        params: AnnouncementParams,
        now: DateTime<Utc>,
    ) -> Result<Announcement, AppError> {
        params.validate()?;

        let mut announcement = Announcement {
            id: EntityId::new().0,
            text: params.text,
            published: false,
            all_day: params.all_day,
            scheduled_at: params.scheduled_at,
            starts_at: params.starts_at,
            ends_at: params.ends_at,
            published_at: None,
            status_ids: params.status_ids,
            created_at: now,
            updated_at: now,
        };

        if announcement.scheduled_at.is_none_or(|at| at <= now) {
            announcement.publish(now);
        }

        self.gateway.insert_announcement(&announcement).await?;

        tracing::info!(
            announcement_id = %announcement.id,
            published = announcement.published,
            scheduled_at = ?announcement.scheduled_at,
            "Announcement created"
        );

        Ok(announcement)
    }

    /// Get announcement by ID
    pub async fn find(&self, id: &str) -> Result<Announcement, AppError> {
        self.gateway
            .get_announcement(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Replace the editable attributes of an announcement
    ///
    /// The schedule of a published announcement is left empty.
    pub async fn update(
        &self,
        id: &str,
        params: AnnouncementParams,
        now: DateTime<Utc>,
    ) -> Result<Announcement, AppError> {
        params.validate()?;
        let mut announcement = self.find(id).await?;

        announcement.text = params.text;
        announcement.all_day = params.all_day;
        announcement.starts_at = params.starts_at;
        announcement.ends_at = params.ends_at;
        announcement.status_ids = params.status_ids;
        if announcement.state() == AnnouncementState::Unpublished {
            announcement.scheduled_at = params.scheduled_at;
        }
        announcement.updated_at = now;

        self.persist(&announcement).await?;
        Ok(announcement)
    }

    /// Delete an announcement with its reactions and dismissals
    pub async fn destroy(&self, id: &str) -> Result<(), AppError> {
        if !self.gateway.delete_announcement(id).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!(announcement_id = %id, "Announcement deleted");
        Ok(())
    }

    // =========================================================================
    // Publication
    // =========================================================================

    /// Publish an unpublished announcement
    ///
    /// Already-published announcements are returned unchanged.
    pub async fn publish(&self, id: &str, now: DateTime<Utc>) -> Result<Announcement, AppError> {
        let mut announcement = self.find(id).await?;
        if announcement.state() == AnnouncementState::Published {
            tracing::debug!(announcement_id = %id, "Announcement already published");
            return Ok(announcement);
        }

        announcement.publish(now);
        self.persist(&announcement).await?;

        ANNOUNCEMENT_TRANSITIONS_TOTAL
            .with_label_values(&["published"])
            .inc();
        tracing::info!(announcement_id = %id, "Announcement published");

        Ok(announcement)
    }

    /// Return a published announcement to the unpublished state
    ///
    /// Already-unpublished announcements are returned unchanged.
    pub async fn unpublish(&self, id: &str, now: DateTime<Utc>) -> Result<Announcement, AppError> {
        let mut announcement = self.find(id).await?;
        if announcement.state() == AnnouncementState::Unpublished {
            tracing::debug!(announcement_id = %id, "Announcement already unpublished");
            return Ok(announcement);
        }

        announcement.unpublish(now);
        self.persist(&announcement).await?;

        ANNOUNCEMENT_TRANSITIONS_TOTAL
            .with_label_values(&["unpublished"])
            .inc();
        tracing::info!(announcement_id = %id, "Announcement unpublished");

        Ok(announcement)
    }

    /// Publish every scheduled announcement that is due
    ///
    /// # Returns
    /// Number of announcements published
    pub async fn publish_due(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let due = self.gateway.get_due_scheduled_announcements(now).await?;
        let mut published = 0;

        for announcement in due {
            if self.gateway.publish_scheduled(&announcement.id, now).await? {
                published += 1;
                ANNOUNCEMENT_TRANSITIONS_TOTAL
                    .with_label_values(&["published"])
                    .inc();
                tracing::info!(
                    announcement_id = %announcement.id,
                    "Scheduled announcement published"
                );
            } else {
                tracing::debug!(
                    announcement_id = %announcement.id,
                    "Scheduled announcement changed before publishing"
                );
            }
        }

        Ok(published)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All published announcements
    pub async fn published(&self) -> Result<Vec<Announcement>, AppError> {
        self.gateway.get_announcements_by_published(true).await
    }

    /// All unpublished announcements
    pub async fn unpublished(&self) -> Result<Vec<Announcement>, AppError> {
        self.gateway.get_announcements_by_published(false).await
    }

    /// All announcements, oldest first
    pub async fn chronological(&self) -> Result<Vec<Announcement>, AppError> {
        let mut announcements = self.gateway.get_all_announcements().await?;
        sort_chronological(&mut announcements);
        Ok(announcements)
    }

    /// All announcements, newest first
    pub async fn reverse_chronological(&self) -> Result<Vec<Announcement>, AppError> {
        let mut announcements = self.gateway.get_all_announcements().await?;
        sort_reverse_chronological(&mut announcements);
        Ok(announcements)
    }

    /// Reactions to an announcement, oldest first
    ///
    /// With an account, only reactions attributed to that account are
    /// returned; unattributed reactions are excluded.
    pub async fn reactions(
        &self,
        announcement: &Announcement,
        account: Option<&Account>,
    ) -> Result<Vec<AnnouncementReaction>, AppError> {
        self.gateway
            .get_announcement_reactions(&announcement.id, account.map(|a| a.id.as_str()))
            .await
    }

    /// Reactions grouped by name, with the viewer's own participation
    pub async fn reaction_summary(
        &self,
        announcement: &Announcement,
        account: Option<&Account>,
    ) -> Result<Vec<ReactionSummary>, AppError> {
        let reactions = self.reactions(announcement, None).await?;
        Ok(summarize_reactions(&reactions, account))
    }

    /// Referenced statuses that are public or unlisted, in `status_ids` order
    pub async fn statuses(&self, announcement: &Announcement) -> Result<Vec<Status>, AppError> {
        let ids = match announcement.status_ids.as_deref() {
            Some(ids) if !ids.is_empty() => ids,
            _ => return Ok(vec![]),
        };

        let mut by_id: HashMap<String, Status> = self
            .gateway
            .get_statuses_by_ids(ids)
            .await?
            .into_iter()
            .filter(|status| status.visibility.is_world_readable())
            .map(|status| (status.id.clone(), status))
            .collect();

        // `remove` also drops repeated ids
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Published announcements that have not ended, oldest first
    pub async fn list_active(
        &self,
        account: Option<&Account>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AnnouncementView>, AppError> {
        let mut announcements = self.published().await?;
        announcements.retain(|announcement| announcement.ends_at.is_none_or(|at| at >= now));
        sort_chronological(&mut announcements);

        let muted = match account {
            Some(account) => self.gateway.get_muted_announcement_ids(&account.id).await?,
            None => Default::default(),
        };

        let mut views = Vec::with_capacity(announcements.len());
        for announcement in announcements {
            let reactions = self.reaction_summary(&announcement, account).await?;
            let statuses = self.statuses(&announcement).await?;
            views.push(AnnouncementView {
                read: muted.contains(&announcement.id),
                announcement,
                reactions,
                statuses,
            });
        }

        Ok(views)
    }

    // =========================================================================
    // Viewer interactions
    // =========================================================================

    /// Mark an announcement as read for `account`
    pub async fn dismiss(&self, id: &str, account: &Account) -> Result<(), AppError> {
        let announcement = self.find_published(id).await?;
        self.gateway
            .insert_announcement_mute_if_absent(&account.id, &announcement.id)
            .await?;
        Ok(())
    }

    /// React to an announcement; repeating the same reaction is a no-op
    pub async fn add_reaction(
        &self,
        id: &str,
        account: &Account,
        name: &str,
    ) -> Result<(), AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation(ValidationErrors::single("name", BLANK)));
        }

        let announcement = self.find_published(id).await?;
        let reaction = AnnouncementReaction {
            id: EntityId::new().0,
            announcement_id: announcement.id,
            account_id: Some(account.id.clone()),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        if self
            .gateway
            .insert_announcement_reaction_if_absent(&reaction)
            .await?
        {
            tracing::debug!(
                announcement_id = %reaction.announcement_id,
                account_id = %account.id,
                name = %reaction.name,
                "Announcement reaction added"
            );
        }

        Ok(())
    }

    /// Withdraw a reaction
    pub async fn remove_reaction(
        &self,
        id: &str,
        account: &Account,
        name: &str,
    ) -> Result<(), AppError> {
        let announcement = self.find_published(id).await?;
        if !self
            .gateway
            .delete_announcement_reaction(&announcement.id, &account.id, name.trim())
            .await?
        {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn find_published(&self, id: &str) -> Result<Announcement, AppError> {
        let announcement = self.find(id).await?;
        match announcement.state() {
            AnnouncementState::Published => Ok(announcement),
            AnnouncementState::Unpublished => Err(AppError::NotFound),
        }
    }

    async fn persist(&self, announcement: &Announcement) -> Result<(), AppError> {
        if !self.gateway.update_announcement(announcement).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
