//! HTTP client for the upstream social-graph provider.
//!
//! Wraps `reqwest` with provider-specific error classification, access-key
//! management, and normalization of the provider's uneven wire shapes into
//! canonical types. Whether a method fails hard or soft is part of its
//! contract: profile/followers/following/media fetches propagate classified
//! errors, while stories, likers, and comments degrade to empty results.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use gramdelta_core::{AppConfig, Comment, Person, StoryItem};

use crate::collector::{collect_media, collect_people, CollectMode, CollectorConfig};
use crate::error::UpstreamError;
use crate::types::{
    CommentsEnvelope, FollowersEnvelope, FollowingChunk, LikersEnvelope, MediaPage,
    MediasEnvelope, PeoplePage, ProfileEnvelope, RawMedia, RawStoryItem, RawUser,
    StoriesEnvelope,
};

const DEFAULT_RETRY_AFTER_SECS: u64 = 300;

/// Explicit configuration for the upstream client. There is no process-wide
/// client; callers construct one from config and pass it where needed.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub access_key: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub page_cap: usize,
    pub inter_page_delay_ms: u64,
}

impl UpstreamConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.upstream_base_url.clone(),
            access_key: config.upstream_access_key.clone(),
            timeout_secs: config.upstream_request_timeout_secs,
            user_agent: config.upstream_user_agent.clone(),
            page_cap: config.upstream_page_cap,
            inter_page_delay_ms: config.upstream_inter_page_delay_ms,
        }
    }
}

/// Client for the upstream provider's REST API.
///
/// Use [`UpstreamClient::new`] for production or point `base_url` at a mock
/// server in tests.
pub struct UpstreamClient {
    client: Client,
    access_key: String,
    base_url: Url,
    page_cap: usize,
    inter_page_delay: Duration,
}

impl UpstreamClient {
    /// Creates a new client from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`UpstreamError::UnexpectedStatus`] if
    /// `base_url` does not parse as a URL.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()?;

        // Normalise: exactly one trailing slash so joined paths resolve
        // against the root rather than replacing the last segment.
        let normalised = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| UpstreamError::UnexpectedStatus {
            status: 0,
            url: format!("invalid base URL '{}': {e}", config.base_url),
        })?;

        Ok(Self {
            client,
            access_key: config.access_key.clone(),
            base_url,
            page_cap: config.page_cap,
            inter_page_delay: Duration::from_millis(config.inter_page_delay_ms),
        })
    }

    /// Resolves a handle to its profile. Fails hard.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::NotFound`] if the handle does not resolve.
    /// - [`UpstreamError::PrivateAccount`] if the account is private.
    /// - Classified transport errors (`RateLimited`, `Unavailable`,
    ///   `Forbidden`, `Http`, `Deserialize`).
    pub async fn fetch_profile(&self, handle: &str) -> Result<Person, UpstreamError> {
        let body = self
            .get_json("v2/user/by/username", &[("username", handle)])
            .await?;
        let envelope: ProfileEnvelope = parse(body, &format!("profile(@{handle})"))?;

        let Some(raw) = envelope.user else {
            return Err(UpstreamError::NotFound {
                context: format!("@{handle}"),
            });
        };
        if raw.is_private {
            return Err(UpstreamError::PrivateAccount {
                handle: handle.to_owned(),
            });
        }
        raw.into_person().ok_or_else(|| UpstreamError::NotFound {
            context: format!("@{handle}: profile carried no identity"),
        })
    }

    /// Fetches one followers page. Fails hard.
    ///
    /// # Errors
    ///
    /// Classified transport errors as for [`UpstreamClient::fetch_profile`].
    pub async fn fetch_followers_page(
        &self,
        user_id: &str,
        cursor: Option<&str>,
    ) -> Result<PeoplePage, UpstreamError> {
        let mut params = vec![("user_id", user_id)];
        if let Some(c) = cursor {
            params.push(("page_id", c));
        }
        let body = self.get_json("v2/user/followers", &params).await?;
        let envelope: FollowersEnvelope = parse(body, &format!("followers(user_id={user_id})"))?;

        let users = envelope.response.map(|r| r.users).unwrap_or_default();
        tracing::debug!(user_id, count = users.len(), "followers page fetched");
        Ok(PeoplePage {
            people: normalize_people(users),
            next_cursor: envelope.next_page_id,
        })
    }

    /// Fetches one following page. Fails hard.
    ///
    /// The provider serves this from a different backend that returns a bare
    /// `[users, cursor]` array with string ids; the quirk stays here.
    ///
    /// # Errors
    ///
    /// Classified transport errors as for [`UpstreamClient::fetch_profile`].
    pub async fn fetch_following_page(
        &self,
        user_id: &str,
        cursor: Option<&str>,
    ) -> Result<PeoplePage, UpstreamError> {
        let mut params = vec![("user_id", user_id)];
        if let Some(c) = cursor {
            params.push(("end_cursor", c));
        }
        let body = self.get_json("gql/user/following/chunk", &params).await?;
        let chunk: FollowingChunk = parse(body, &format!("following(user_id={user_id})"))?;

        tracing::debug!(user_id, count = chunk.0.len(), "following page fetched");
        Ok(PeoplePage {
            people: normalize_people(chunk.0),
            next_cursor: chunk.1,
        })
    }

    /// Fetches one page of the user's posts. Fails hard.
    ///
    /// # Errors
    ///
    /// Classified transport errors as for [`UpstreamClient::fetch_profile`].
    pub async fn fetch_media_page(
        &self,
        user_id: &str,
        cursor: Option<&str>,
    ) -> Result<MediaPage, UpstreamError> {
        let mut params = vec![("user_id", user_id), ("safe_int", "true")];
        if let Some(c) = cursor {
            params.push(("page_id", c));
        }
        let body = self.get_json("v2/user/medias", &params).await?;
        let envelope: MediasEnvelope = parse(body, &format!("medias(user_id={user_id})"))?;

        let items = envelope.response.map(|r| r.items).unwrap_or_default();
        Ok(MediaPage {
            media: items.into_iter().filter_map(RawMedia::into_media).collect(),
            next_cursor: envelope.next_page_id,
        })
    }

    /// Fetches the user's active stories. Fails soft: any error is logged and
    /// an empty list returned.
    pub async fn fetch_stories(&self, user_id: &str) -> Vec<StoryItem> {
        match self.fetch_stories_strict(user_id).await {
            Ok(stories) => stories,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "stories fetch failed; degrading to empty");
                Vec::new()
            }
        }
    }

    async fn fetch_stories_strict(&self, user_id: &str) -> Result<Vec<StoryItem>, UpstreamError> {
        let body = self
            .get_json("v2/user/stories", &[("user_id", user_id)])
            .await?;
        let envelope: StoriesEnvelope = parse(body, &format!("stories(user_id={user_id})"))?;
        Ok(envelope
            .reel
            .map(|r| r.items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(RawStoryItem::into_story)
            .collect())
    }

    /// Fetches the likers of one post. Fails soft to an empty list; a single
    /// failed liker fetch degrades that post's contribution to zero without
    /// aborting the batch.
    pub async fn fetch_post_likers(&self, media_id: &str) -> Vec<Person> {
        match self.fetch_post_likers_strict(media_id).await {
            Ok(people) => people,
            Err(e) => {
                tracing::warn!(media_id, error = %e, "likers fetch failed; degrading to empty");
                Vec::new()
            }
        }
    }

    async fn fetch_post_likers_strict(&self, media_id: &str) -> Result<Vec<Person>, UpstreamError> {
        let body = self.get_json("v2/media/likers", &[("id", media_id)]).await?;
        let envelope: LikersEnvelope = parse(body, &format!("likers(media_id={media_id})"))?;
        Ok(normalize_people(envelope.users))
    }

    /// Fetches the comments of one post. Fails soft to an empty list.
    pub async fn fetch_post_comments(&self, media_id: &str) -> Vec<Comment> {
        match self.fetch_post_comments_strict(media_id).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::warn!(media_id, error = %e, "comments fetch failed; degrading to empty");
                Vec::new()
            }
        }
    }

    async fn fetch_post_comments_strict(
        &self,
        media_id: &str,
    ) -> Result<Vec<Comment>, UpstreamError> {
        let body = self
            .get_json("v2/media/comments", &[("id", media_id)])
            .await?;
        let envelope: CommentsEnvelope = parse(body, &format!("comments(media_id={media_id})"))?;
        Ok(envelope
            .response
            .map(|r| r.comments)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.into_comment(media_id))
            .collect())
    }

    /// Collects followers across pages according to `mode`, up to the
    /// configured cap.
    ///
    /// # Errors
    ///
    /// Propagates the first classified error from any page fetch.
    pub async fn collect_followers(
        &self,
        user_id: &str,
        mode: CollectMode,
    ) -> Result<PeoplePage, UpstreamError> {
        let config = self.collector_config();
        collect_people(
            |cursor| async move { self.fetch_followers_page(user_id, cursor.as_deref()).await },
            &config,
            mode,
        )
        .await
    }

    /// Collects following across pages according to `mode`, up to the
    /// configured cap.
    ///
    /// # Errors
    ///
    /// Propagates the first classified error from any page fetch.
    pub async fn collect_following(
        &self,
        user_id: &str,
        mode: CollectMode,
    ) -> Result<PeoplePage, UpstreamError> {
        let config = self.collector_config();
        collect_people(
            |cursor| async move { self.fetch_following_page(user_id, cursor.as_deref()).await },
            &config,
            mode,
        )
        .await
    }

    /// Collects up to `limit` recent posts.
    ///
    /// # Errors
    ///
    /// Propagates the first classified error from any page fetch.
    pub async fn collect_media(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<MediaPage, UpstreamError> {
        collect_media(
            |cursor| async move { self.fetch_media_page(user_id, cursor.as_deref()).await },
            limit,
            self.inter_page_delay,
        )
        .await
    }

    fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            cap: self.page_cap,
            inter_page_delay: self.inter_page_delay,
        }
    }

    /// Builds the full request URL with percent-encoded query parameters and
    /// sends a GET with the access-key header, classifying the status before
    /// parsing the body as JSON.
    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, UpstreamError> {
        let url = self.build_url(path, params);
        let response = self
            .client
            .get(url.clone())
            .header("accept", "application/json")
            .header("x-access-key", &self.access_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &url, &response));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }

    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        url
    }
}

/// Maps an upstream HTTP status to the error taxonomy.
///
/// 429 carries retry guidance (from `Retry-After` when present), 402 and 5xx
/// are provider unavailability, 404 is not-found, 403 is access denied, and
/// anything else passes through unclassified.
fn classify_status(status: StatusCode, url: &Url, response: &reqwest::Response) -> UpstreamError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            UpstreamError::RateLimited { retry_after_secs }
        }
        StatusCode::PAYMENT_REQUIRED => UpstreamError::Unavailable {
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND => UpstreamError::NotFound {
            context: url.to_string(),
        },
        StatusCode::FORBIDDEN => UpstreamError::Forbidden {
            context: url.to_string(),
        },
        s if s.is_server_error() => UpstreamError::Unavailable {
            status: s.as_u16(),
        },
        s => UpstreamError::UnexpectedStatus {
            status: s.as_u16(),
            url: url.to_string(),
        },
    }
}

fn normalize_people(users: Vec<RawUser>) -> Vec<Person> {
    users.into_iter().filter_map(RawUser::into_person).collect()
}

fn parse<T: serde::de::DeserializeOwned>(
    body: serde_json::Value,
    context: &str,
) -> Result<T, UpstreamError> {
    serde_json::from_value(body).map_err(|e| UpstreamError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}
