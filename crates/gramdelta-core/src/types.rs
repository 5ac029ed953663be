//! Canonical domain types shared across the workspace.
//!
//! Upstream endpoints disagree about field casing and identity typing (numeric
//! `pk` on some endpoints, string `id` on others). Everything past the
//! upstream client boundary uses these types; the `id` field is always a
//! string, coerced once at normalization time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One account as seen by the upstream social-graph provider.
///
/// Identity invariant: two `Person` records refer to the same real account iff
/// `id` matches. `handle` can be renamed by the account owner and is only used
/// as a fallback join key in shared-activity checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub is_private: bool,
    pub follower_count: Option<i64>,
    pub following_count: Option<i64>,
    pub media_count: Option<i64>,
    pub biography: Option<String>,
    pub external_url: Option<String>,
}

/// A story item from the target's active reel. Best-effort data: story
/// fetches fail soft, so callers must tolerate an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryItem {
    pub id: String,
    pub media_url: Option<String>,
    pub media_type: MediaType,
    pub taken_at: Option<i64>,
    pub expiring_at: Option<i64>,
    pub duration_secs: Option<f64>,
    pub view_count: i64,
    pub has_audio: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
}

/// One post from the target's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    pub shortcode: Option<String>,
    pub caption: String,
    pub thumbnail_url: Option<String>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub taken_at: Option<i64>,
}

/// One comment on a post. The author is carried as id + handle only; the
/// upstream comments endpoint does not return full profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_handle: String,
    pub text: String,
}

/// Last fully-fetched state of one target account, keyed by handle.
///
/// At most one live snapshot exists per handle; writes are full replacements,
/// never merges. Snapshots are removed only by the age-based retention sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub handle: String,
    pub profile: Person,
    pub followers: Vec<Person>,
    pub following: Vec<Person>,
    pub total_followers: i64,
    pub total_following: i64,
    pub last_full_update: DateTime<Utc>,
    pub last_followers_update: DateTime<Utc>,
    pub last_following_update: DateTime<Utc>,
    pub update_frequency_minutes: i32,
    pub is_stale: bool,
}

impl Snapshot {
    /// Whether the snapshot was fully refreshed within the last
    /// `max_age_minutes` minutes.
    #[must_use]
    pub fn is_fresh(&self, max_age_minutes: i64) -> bool {
        let age = Utc::now() - self.last_full_update;
        age.num_minutes() < max_age_minutes
    }
}

/// The fields a snapshot write replaces. Totals are derived from the list
/// lengths by the store, not supplied by the caller.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub handle: String,
    pub profile: Person,
    pub followers: Vec<Person>,
    pub following: Vec<Person>,
}

/// What the caller asked to track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Followers,
    Following,
    Both,
}

impl SearchKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchKind::Followers => "followers",
            SearchKind::Following => "following",
            SearchKind::Both => "both",
        }
    }
}

impl std::str::FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "followers" => Ok(SearchKind::Followers),
            "following" => Ok(SearchKind::Following),
            "both" => Ok(SearchKind::Both),
            other => Err(format!("unknown search kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Pending,
    Completed,
    Failed,
    RateLimited,
}

impl SearchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStatus::Pending => "pending",
            SearchStatus::Completed => "completed",
            SearchStatus::Failed => "failed",
            SearchStatus::RateLimited => "rate_limited",
        }
    }
}

impl std::str::FromStr for SearchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SearchStatus::Pending),
            "completed" => Ok(SearchStatus::Completed),
            "failed" => Ok(SearchStatus::Failed),
            "rate_limited" => Ok(SearchStatus::RateLimited),
            other => Err(format!("unknown search status: {other}")),
        }
    }
}

/// Audit record for one search operation.
///
/// Invariant: `total_new_followers` / `total_new_following` always equal the
/// lengths of the corresponding lists. Use [`SearchRecord::new`] and the
/// mutators below; never set the totals directly from caller input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: Uuid,
    pub requester_id: Option<Uuid>,
    pub target_handle: String,
    pub search_kind: SearchKind,
    pub data_source: String,
    pub new_followers: Vec<Person>,
    pub new_following: Vec<Person>,
    pub total_new_followers: i64,
    pub total_new_following: i64,
    pub processing_time_ms: i64,
    pub cache_hit: bool,
    pub status: SearchStatus,
    pub error_message: Option<String>,
    pub results: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl SearchRecord {
    /// Creates a pending record for a search that is about to run.
    #[must_use]
    pub fn new(
        requester_id: Option<Uuid>,
        target_handle: &str,
        search_kind: SearchKind,
        data_source: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_id,
            target_handle: target_handle.to_owned(),
            search_kind,
            data_source: data_source.to_owned(),
            new_followers: Vec::new(),
            new_following: Vec::new(),
            total_new_followers: 0,
            total_new_following: 0,
            processing_time_ms: 0,
            cache_hit: false,
            status: SearchStatus::Pending,
            error_message: None,
            results: None,
            created_at: Utc::now(),
        }
    }

    /// Stores the computed deltas, recomputing both totals from the list
    /// lengths.
    pub fn set_deltas(&mut self, new_followers: Vec<Person>, new_following: Vec<Person>) {
        self.total_new_followers = i64::try_from(new_followers.len()).unwrap_or(i64::MAX);
        self.total_new_following = i64::try_from(new_following.len()).unwrap_or(i64::MAX);
        self.new_followers = new_followers;
        self.new_following = new_following;
    }

    pub fn complete(&mut self, processing_time_ms: i64, results: serde_json::Value) {
        self.status = SearchStatus::Completed;
        self.processing_time_ms = processing_time_ms;
        self.results = Some(results);
    }

    pub fn fail(&mut self, processing_time_ms: i64, message: &str, rate_limited: bool) {
        self.status = if rate_limited {
            SearchStatus::RateLimited
        } else {
            SearchStatus::Failed
        };
        self.processing_time_ms = processing_time_ms;
        self.error_message = Some(message.to_owned());
    }
}
