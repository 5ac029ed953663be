//! Result shapes returned by the search operations.
//!
//! Derived data only; none of these are persisted as-is. The history sink
//! stores its own `SearchRecord` representation.

use serde::Serialize;

use gramdelta_core::{Media, Person, StoryItem};

/// A follower or followee who engaged with more than one recent post.
#[derive(Debug, Clone, Serialize)]
pub struct RedFlagEntry {
    pub person: Person,
    pub interaction_count: i64,
}

/// A frequent liker ranked by share of recent posts liked.
#[derive(Debug, Clone, Serialize)]
pub struct AdmirerEntry {
    pub person: Person,
    pub like_percentage: i64,
    pub rank: i64,
}

/// Minimal post reference used in shared-activity classifications.
#[derive(Debug, Clone, Serialize)]
pub struct PostRef {
    pub id: String,
    pub shortcode: Option<String>,
    pub caption: String,
    pub thumbnail_url: Option<String>,
}

impl PostRef {
    #[must_use]
    pub fn from_media(media: &Media) -> Self {
        Self {
            id: media.id.clone(),
            shortcode: media.shortcode.clone(),
            caption: media.caption.clone(),
            thumbnail_url: media.thumbnail_url.clone(),
        }
    }
}

/// Nudge attached to every anonymous search result.
#[derive(Debug, Clone, Serialize)]
pub struct UpsellNotice {
    pub upgrade_available: bool,
    pub message: String,
}

impl Default for UpsellNotice {
    fn default() -> Self {
        Self {
            upgrade_available: true,
            message: "Sign in to unlock exact follower changes, full history, \
                      and deeper analysis."
                .to_owned(),
        }
    }
}

/// Anonymous one-shot search: sampled deltas plus red flags.
#[derive(Debug, Clone, Serialize)]
pub struct BasicSearchResult {
    pub profile: Person,
    pub new_followers: Vec<Person>,
    pub new_following: Vec<Person>,
    pub red_flags: Vec<RedFlagEntry>,
    pub total_followers: i64,
    pub total_following: i64,
    pub is_first_search: bool,
    pub upsell: UpsellNotice,
    pub processing_time_ms: i64,
}

/// Authenticated exhaustive search: exact deltas plus resume cursors.
#[derive(Debug, Clone, Serialize)]
pub struct AdvancedSearchResult {
    pub profile: Person,
    pub new_followers: Vec<Person>,
    pub new_following: Vec<Person>,
    pub red_flags: Vec<RedFlagEntry>,
    pub stories: Vec<StoryItem>,
    pub total_followers: i64,
    pub total_following: i64,
    pub is_first_search: bool,
    pub followers_cursor: Option<String>,
    pub following_cursor: Option<String>,
    pub media_cursor: Option<String>,
    pub processing_time_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdmirersResult {
    pub profile: Person,
    pub admirers: Vec<AdmirerEntry>,
    pub total_posts: i64,
    pub processing_time_ms: i64,
}

/// Profile detail view: previews only, no diffing.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDetailsResult {
    pub profile: Person,
    pub followers_preview: Vec<Person>,
    pub following_preview: Vec<Person>,
    pub media: Vec<Media>,
    pub stories: Vec<StoryItem>,
    pub processing_time_ms: i64,
}

/// Two-account shared-activity comparison.
///
/// The follow flags are best-effort when the bounded following scan stopped
/// before covering the whole list.
#[derive(Debug, Clone, Serialize)]
pub struct SharedActivityResult {
    pub profile_a: Person,
    pub profile_b: Person,
    pub is_a_following_b: bool,
    pub is_b_following_a: bool,
    pub posts_a_liked_by_b: Vec<PostRef>,
    pub posts_a_commented_by_b: Vec<PostRef>,
    pub posts_b_liked_by_a: Vec<PostRef>,
    pub posts_b_commented_by_a: Vec<PostRef>,
    pub posts_processed_a: i64,
    pub posts_processed_b: i64,
    pub processing_time_ms: i64,
}

/// One more page of followers or following for client-driven load-more.
#[derive(Debug, Clone, Serialize)]
pub struct PeoplePageResult {
    pub people: Vec<Person>,
    pub next_cursor: Option<String>,
}

/// One more page of posts.
#[derive(Debug, Clone, Serialize)]
pub struct MediaPageResult {
    pub media: Vec<Media>,
    pub next_cursor: Option<String>,
}
