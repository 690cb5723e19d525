//! Profile and media feed entities.

use crate::access::Role;
use crate::identity::{PostId, SchoolId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub role: Role,
    pub display_name: String,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<u16>,
    #[serde(default)]
    pub school_id: Option<SchoolId>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Free-form athletic stats (e.g. "40yd" → "4.52").
    #[serde(default)]
    pub stats: BTreeMap<String, String>,
    pub updated_at: Timestamp,
}

/// Partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BTreeMap<String, String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Predict the server result of this update. Used for optimistic writes;
    /// the server's response always replaces it.
    pub fn applied_to(&self, profile: &Profile) -> Profile {
        let mut next = profile.clone();
        if let Some(name) = &self.display_name {
            next.display_name = name.clone();
        }
        if let Some(sport) = &self.sport {
            next.sport = Some(sport.clone());
        }
        if let Some(position) = &self.position {
            next.position = Some(position.clone());
        }
        if let Some(year) = self.graduation_year {
            next.graduation_year = Some(year);
        }
        if let Some(bio) = &self.bio {
            next.bio = Some(bio.clone());
        }
        if let Some(url) = &self.avatar_url {
            next.avatar_url = Some(url.clone());
        }
        if let Some(stats) = &self.stats {
            next.stats = stats.clone();
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPost {
    pub id: PostId,
    pub author_id: UserId,
    pub author_name: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    pub like_count: u32,
    #[serde(default)]
    pub liked_by_me: bool,
    #[serde(default)]
    pub comment_count: u32,
    pub created_at: Timestamp,
}

impl MediaPost {
    /// The post as it would look after the current actor toggles their like.
    pub fn with_like_toggled(&self) -> Self {
        let mut next = self.clone();
        if next.liked_by_me {
            next.liked_by_me = false;
            next.like_count = next.like_count.saturating_sub(1);
        } else {
            next.liked_by_me = true;
            next.like_count = next.like_count.saturating_add(1);
        }
        next
    }
}

/// Opaque pagination cursor issued by the feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedCursor(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<MediaPost>,
    #[serde(default)]
    pub next_cursor: Option<FeedCursor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub caption: String,
    pub media: Vec<MediaItem>,
}
