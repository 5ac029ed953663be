//! Raw upstream wire shapes and their normalization into canonical types.
//!
//! The provider is inconsistent about identity typing: the profile, followers,
//! and likers endpoints key identity as numeric `pk`, while the following
//! endpoint uses string `id`. Both are coerced to `String` here, once; no raw
//! upstream shape leaks past this module.

use gramdelta_core::{Comment, Media, MediaType, Person, StoryItem};
use serde::Deserialize;

/// One page of people plus the last cursor the upstream handed back.
///
/// `next_cursor` is opaque; callers only test it for presence.
#[derive(Debug, Clone, Default)]
pub struct PeoplePage {
    pub people: Vec<Person>,
    pub next_cursor: Option<String>,
}

/// One page of posts plus the last observed cursor.
#[derive(Debug, Clone, Default)]
pub struct MediaPage {
    pub media: Vec<Media>,
    pub next_cursor: Option<String>,
}

/// An identifier that arrives as either a JSON number or a JSON string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Num(i64),
    Str(String),
}

impl RawId {
    pub(crate) fn into_string(self) -> String {
        match self {
            RawId::Num(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileEnvelope {
    pub(crate) user: Option<RawUser>,
}

/// A person record as the `/v2/*` endpoints emit it (`pk`-keyed) or as the
/// following-chunk endpoint emits it (`id`-keyed).
#[derive(Debug, Deserialize)]
pub(crate) struct RawUser {
    pub(crate) pk: Option<RawId>,
    pub(crate) id: Option<RawId>,
    pub(crate) username: String,
    #[serde(default)]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    pub(crate) profile_pic_url: Option<String>,
    #[serde(default)]
    pub(crate) is_verified: bool,
    #[serde(default)]
    pub(crate) is_private: bool,
    #[serde(default)]
    pub(crate) follower_count: Option<i64>,
    #[serde(default)]
    pub(crate) following_count: Option<i64>,
    #[serde(default)]
    pub(crate) media_count: Option<i64>,
    #[serde(default)]
    pub(crate) biography: Option<String>,
    #[serde(default)]
    pub(crate) external_url: Option<String>,
}

impl RawUser {
    /// Canonical string identity: `pk` when present, else `id`.
    pub(crate) fn canonical_id(&self) -> Option<String> {
        self.pk
            .clone()
            .or_else(|| self.id.clone())
            .map(RawId::into_string)
    }

    pub(crate) fn into_person(self) -> Option<Person> {
        let id = self.canonical_id()?;
        Some(Person {
            id,
            handle: self.username,
            display_name: self.full_name.unwrap_or_default(),
            avatar_url: self.profile_pic_url,
            is_verified: self.is_verified,
            is_private: self.is_private,
            follower_count: self.follower_count,
            following_count: self.following_count,
            media_count: self.media_count,
            biography: self.biography,
            external_url: self.external_url,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FollowersEnvelope {
    pub(crate) response: Option<FollowersInner>,
    pub(crate) next_page_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FollowersInner {
    #[serde(default)]
    pub(crate) users: Vec<RawUser>,
}

/// The following-chunk endpoint returns a bare two-element array:
/// `[[user, ...], next_cursor]`.
#[derive(Debug, Deserialize)]
pub(crate) struct FollowingChunk(pub(crate) Vec<RawUser>, pub(crate) Option<String>);

#[derive(Debug, Deserialize)]
pub(crate) struct MediasEnvelope {
    pub(crate) response: Option<MediasInner>,
    pub(crate) next_page_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediasInner {
    #[serde(default)]
    pub(crate) items: Vec<RawMedia>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMedia {
    pub(crate) id: Option<RawId>,
    pub(crate) pk: Option<RawId>,
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) caption: Option<RawCaption>,
    #[serde(default)]
    pub(crate) image_versions2: Option<RawImageVersions>,
    #[serde(default)]
    pub(crate) like_count: Option<i64>,
    #[serde(default)]
    pub(crate) comment_count: Option<i64>,
    #[serde(default)]
    pub(crate) taken_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCaption {
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawImageVersions {
    #[serde(default)]
    pub(crate) candidates: Vec<RawImageCandidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawImageCandidate {
    pub(crate) url: String,
}

impl RawMedia {
    pub(crate) fn into_media(self) -> Option<Media> {
        let id = self
            .id
            .or(self.pk)
            .map(RawId::into_string)?;
        let thumbnail_url = self
            .image_versions2
            .and_then(|v| v.candidates.into_iter().next())
            .map(|c| c.url);
        Some(Media {
            id,
            shortcode: self.code,
            caption: self.caption.and_then(|c| c.text).unwrap_or_default(),
            thumbnail_url,
            like_count: self.like_count,
            comment_count: self.comment_count,
            taken_at: self.taken_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LikersEnvelope {
    #[serde(default)]
    pub(crate) users: Vec<RawUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentsEnvelope {
    pub(crate) response: Option<CommentsInner>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentsInner {
    #[serde(default)]
    pub(crate) comments: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawComment {
    pub(crate) pk: Option<RawId>,
    pub(crate) user_id: Option<RawId>,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) user: Option<RawCommentAuthor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCommentAuthor {
    #[serde(default)]
    pub(crate) username: Option<String>,
}

impl RawComment {
    pub(crate) fn into_comment(self, post_id: &str) -> Option<Comment> {
        let author_id = self.user_id.map(RawId::into_string)?;
        Some(Comment {
            id: self
                .pk
                .map(RawId::into_string)
                .unwrap_or_default(),
            post_id: post_id.to_owned(),
            author_id,
            author_handle: self.user.and_then(|u| u.username).unwrap_or_default(),
            text: self.text.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoriesEnvelope {
    pub(crate) reel: Option<StoriesReel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoriesReel {
    #[serde(default)]
    pub(crate) items: Vec<RawStoryItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawStoryItem {
    pub(crate) pk: Option<RawId>,
    #[serde(default)]
    pub(crate) video_versions: Option<Vec<RawVideoVersion>>,
    #[serde(default)]
    pub(crate) image_versions2: Option<RawImageVersions>,
    #[serde(default)]
    pub(crate) taken_at: Option<i64>,
    #[serde(default)]
    pub(crate) expiring_at: Option<i64>,
    #[serde(default)]
    pub(crate) video_duration: Option<f64>,
    #[serde(default)]
    pub(crate) view_count: Option<i64>,
    #[serde(default)]
    pub(crate) has_audio: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawVideoVersion {
    pub(crate) url: String,
}

impl RawStoryItem {
    pub(crate) fn into_story(self) -> Option<StoryItem> {
        let id = self.pk.map(RawId::into_string)?;
        let is_video = self.video_versions.is_some();
        let media_url = match &self.video_versions {
            Some(versions) => versions.first().map(|v| v.url.clone()),
            None => self
                .image_versions2
                .as_ref()
                .and_then(|v| v.candidates.first())
                .map(|c| c.url.clone()),
        };
        Some(StoryItem {
            id,
            media_url,
            media_type: if is_video {
                MediaType::Video
            } else {
                MediaType::Image
            },
            taken_at: self.taken_at,
            expiring_at: self.expiring_at,
            duration_secs: self.video_duration,
            view_count: self.view_count.unwrap_or(0),
            has_audio: self.has_audio.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_user_coerces_numeric_pk_to_string_id() {
        let raw: RawUser = serde_json::from_value(json!({
            "pk": 12345,
            "username": "alice",
            "full_name": "Alice A",
            "is_verified": true
        }))
        .expect("deserialize");
        let person = raw.into_person().expect("person");
        assert_eq!(person.id, "12345");
        assert_eq!(person.handle, "alice");
        assert!(person.is_verified);
    }

    #[test]
    fn raw_user_accepts_string_id_from_following_endpoint() {
        let raw: RawUser = serde_json::from_value(json!({
            "id": "98765",
            "username": "bob"
        }))
        .expect("deserialize");
        let person = raw.into_person().expect("person");
        assert_eq!(person.id, "98765");
    }

    #[test]
    fn raw_user_prefers_pk_over_id_when_both_present() {
        let raw: RawUser = serde_json::from_value(json!({
            "pk": 1,
            "id": "2",
            "username": "carol"
        }))
        .expect("deserialize");
        assert_eq!(raw.canonical_id().as_deref(), Some("1"));
    }

    #[test]
    fn raw_user_without_any_id_is_dropped() {
        let raw: RawUser =
            serde_json::from_value(json!({ "username": "ghost" })).expect("deserialize");
        assert!(raw.into_person().is_none());
    }

    #[test]
    fn following_chunk_parses_bare_two_element_array() {
        let chunk: FollowingChunk = serde_json::from_value(json!([
            [{ "id": "7", "username": "dora" }],
            "cursor-2"
        ]))
        .expect("deserialize");
        assert_eq!(chunk.0.len(), 1);
        assert_eq!(chunk.1.as_deref(), Some("cursor-2"));
    }

    #[test]
    fn following_chunk_last_page_has_null_cursor() {
        let chunk: FollowingChunk =
            serde_json::from_value(json!([[], null])).expect("deserialize");
        assert!(chunk.0.is_empty());
        assert!(chunk.1.is_none());
    }

    #[test]
    fn raw_media_extracts_caption_and_thumbnail() {
        let raw: RawMedia = serde_json::from_value(json!({
            "id": "111_222",
            "code": "AbC123",
            "caption": { "text": "sunset" },
            "image_versions2": { "candidates": [{ "url": "https://cdn.example/a.jpg" }] }
        }))
        .expect("deserialize");
        let media = raw.into_media().expect("media");
        assert_eq!(media.id, "111_222");
        assert_eq!(media.shortcode.as_deref(), Some("AbC123"));
        assert_eq!(media.caption, "sunset");
        assert_eq!(
            media.thumbnail_url.as_deref(),
            Some("https://cdn.example/a.jpg")
        );
    }

    #[test]
    fn raw_media_with_null_caption_yields_empty_string() {
        let raw: RawMedia =
            serde_json::from_value(json!({ "pk": 5, "caption": null })).expect("deserialize");
        let media = raw.into_media().expect("media");
        assert_eq!(media.id, "5");
        assert_eq!(media.caption, "");
    }

    #[test]
    fn raw_story_video_takes_video_url_and_type() {
        let raw: RawStoryItem = serde_json::from_value(json!({
            "pk": 9,
            "video_versions": [{ "url": "https://cdn.example/v.mp4" }],
            "video_duration": 7.5,
            "has_audio": true
        }))
        .expect("deserialize");
        let story = raw.into_story().expect("story");
        assert_eq!(story.media_type, MediaType::Video);
        assert_eq!(story.media_url.as_deref(), Some("https://cdn.example/v.mp4"));
        assert!(story.has_audio);
    }

    #[test]
    fn raw_comment_normalizes_author() {
        let raw: RawComment = serde_json::from_value(json!({
            "pk": 42,
            "user_id": 777,
            "text": "nice",
            "user": { "username": "eve" }
        }))
        .expect("deserialize");
        let comment = raw.into_comment("m1").expect("comment");
        assert_eq!(comment.post_id, "m1");
        assert_eq!(comment.author_id, "777");
        assert_eq!(comment.author_handle, "eve");
    }
}
