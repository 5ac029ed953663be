//! Search orchestration over the upstream client, snapshot store, and
//! history sink.
//!
//! Every operation times itself from the first upstream call to result
//! assembly. The tracked operations write a pending history record up front
//! and update it to completed or failed; history writes are best-effort and
//! never fail an otherwise successful search.

use std::time::Instant;

use futures::future::join_all;
use uuid::Uuid;

use gramdelta_core::{
    HistorySink, NewSnapshot, Person, SearchKind, SearchRecord, SnapshotStore,
};
use gramdelta_upstream::{CollectMode, UpstreamClient};

use crate::delta::{decoy_diff, diff};
use crate::engagement::{graph_id_set, rank_admirers, red_flags, tally_likers};
use crate::error::SearchError;
use crate::shared::compare_activity;
use crate::types::{
    AdmirersResult, AdvancedSearchResult, BasicSearchResult, MediaPageResult, PeoplePageResult,
    ProfileDetailsResult, RedFlagEntry, SharedActivityResult, UpsellNotice,
};

const DATA_SOURCE: &str = "upstream_api";

/// Per-operation media fetch limits.
#[derive(Debug, Clone, Copy)]
pub struct EngineLimits {
    pub basic_media: usize,
    pub advanced_media: usize,
    pub profile_media: usize,
    pub admirers_media: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            basic_media: 12,
            advanced_media: 12,
            profile_media: 24,
            admirers_media: 48,
        }
    }
}

pub struct SearchEngine<S, H> {
    upstream: UpstreamClient,
    snapshots: S,
    history: H,
    limits: EngineLimits,
}

impl<S: SnapshotStore, H: HistorySink> SearchEngine<S, H> {
    pub fn new(upstream: UpstreamClient, snapshots: S, history: H) -> Self {
        Self {
            upstream,
            snapshots,
            history,
            limits: EngineLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Anonymous one-shot search: single followers/following pages, sampled
    /// deltas, red flags, snapshot refresh.
    ///
    /// # Errors
    ///
    /// Classified upstream errors from the profile and page fetches, or a
    /// snapshot store failure.
    pub async fn basic_search(
        &self,
        handle: &str,
        kind: SearchKind,
    ) -> Result<BasicSearchResult, SearchError> {
        let started = Instant::now();
        let mut record = SearchRecord::new(None, handle, kind, DATA_SOURCE);
        self.record_best_effort(&record).await;

        match self.run_basic(handle, kind, started).await {
            Ok(result) => {
                record.set_deltas(result.new_followers.clone(), result.new_following.clone());
                record.complete(result.processing_time_ms, summarize_basic(&result));
                self.record_best_effort(&record).await;
                Ok(result)
            }
            Err(e) => {
                record.fail(elapsed_ms(started), &e.to_string(), e.is_rate_limited());
                self.record_best_effort(&record).await;
                Err(e)
            }
        }
    }

    async fn run_basic(
        &self,
        handle: &str,
        kind: SearchKind,
        started: Instant,
    ) -> Result<BasicSearchResult, SearchError> {
        let profile = self.upstream.fetch_profile(handle).await?;
        let previous = self.snapshots.get(handle).await?;

        let (followers, following, media) = tokio::try_join!(
            self.upstream
                .collect_followers(&profile.id, CollectMode::FetchOnce),
            self.upstream
                .collect_following(&profile.id, CollectMode::FetchOnce),
            self.upstream.collect_media(&profile.id, self.limits.basic_media),
        )?;

        let is_first_search = previous.is_none();
        let (prev_followers, prev_following) = previous
            .map(|s| (s.followers, s.following))
            .unwrap_or_default();

        let new_followers = match kind {
            SearchKind::Followers | SearchKind::Both => {
                decoy_diff(&followers.people, &prev_followers)
            }
            SearchKind::Following => Vec::new(),
        };
        let new_following = match kind {
            SearchKind::Following | SearchKind::Both => {
                decoy_diff(&following.people, &prev_following)
            }
            SearchKind::Followers => Vec::new(),
        };

        let red_flags = self
            .cross_reference(&media.media, &followers.people, &following.people)
            .await;

        let snapshot = self
            .snapshots
            .upsert(NewSnapshot {
                handle: handle.to_owned(),
                profile: profile.clone(),
                followers: followers.people,
                following: following.people,
            })
            .await?;

        Ok(BasicSearchResult {
            profile,
            new_followers,
            new_following,
            red_flags,
            total_followers: snapshot.total_followers,
            total_following: snapshot.total_following,
            is_first_search,
            upsell: UpsellNotice::default(),
            processing_time_ms: elapsed_ms(started),
        })
    }

    /// Authenticated exhaustive search with exact deltas.
    ///
    /// The previous snapshot is read before the new fetch replaces it; with
    /// no previous snapshot the result is a baseline (`is_first_search`,
    /// empty deltas) rather than a fabricated comparison.
    ///
    /// # Errors
    ///
    /// `Unauthorized` before any upstream call when `requester` is `None`;
    /// otherwise classified upstream or store errors.
    pub async fn advanced_search(
        &self,
        handle: &str,
        requester: Option<Uuid>,
    ) -> Result<AdvancedSearchResult, SearchError> {
        let Some(requester) = requester else {
            return Err(SearchError::Unauthorized);
        };

        let started = Instant::now();
        let mut record = SearchRecord::new(Some(requester), handle, SearchKind::Both, DATA_SOURCE);
        self.record_best_effort(&record).await;

        match self.run_advanced(handle, started).await {
            Ok(result) => {
                record.set_deltas(result.new_followers.clone(), result.new_following.clone());
                record.complete(result.processing_time_ms, summarize_advanced(&result));
                self.record_best_effort(&record).await;
                Ok(result)
            }
            Err(e) => {
                record.fail(elapsed_ms(started), &e.to_string(), e.is_rate_limited());
                self.record_best_effort(&record).await;
                Err(e)
            }
        }
    }

    async fn run_advanced(
        &self,
        handle: &str,
        started: Instant,
    ) -> Result<AdvancedSearchResult, SearchError> {
        let profile = self.upstream.fetch_profile(handle).await?;
        let previous = self.snapshots.get(handle).await?;

        let (followers, following, stories, media) = tokio::try_join!(
            self.upstream
                .collect_followers(&profile.id, CollectMode::Exhaustive),
            self.upstream
                .collect_following(&profile.id, CollectMode::Exhaustive),
            async {
                Ok::<_, gramdelta_upstream::UpstreamError>(
                    self.upstream.fetch_stories(&profile.id).await,
                )
            },
            self.upstream
                .collect_media(&profile.id, self.limits.advanced_media),
        )?;

        let is_first_search = previous.is_none();
        let (new_followers, new_following) = match &previous {
            Some(prev) => (
                diff(&followers.people, &prev.followers),
                diff(&following.people, &prev.following),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let red_flags = self
            .cross_reference(&media.media, &followers.people, &following.people)
            .await;

        let snapshot = self
            .snapshots
            .upsert(NewSnapshot {
                handle: handle.to_owned(),
                profile: profile.clone(),
                followers: followers.people,
                following: following.people,
            })
            .await?;

        Ok(AdvancedSearchResult {
            profile,
            new_followers,
            new_following,
            red_flags,
            stories,
            total_followers: snapshot.total_followers,
            total_following: snapshot.total_following,
            is_first_search,
            followers_cursor: followers.next_cursor,
            following_cursor: following.next_cursor,
            media_cursor: media.next_cursor,
            processing_time_ms: elapsed_ms(started),
        })
    }

    /// Ranks frequent likers across up to 48 recent posts. No
    /// follower/following cross-reference.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without a requester; otherwise classified upstream
    /// errors from the profile and media fetches.
    pub async fn admirers(
        &self,
        handle: &str,
        requester: Option<Uuid>,
    ) -> Result<AdmirersResult, SearchError> {
        if requester.is_none() {
            return Err(SearchError::Unauthorized);
        }

        let started = Instant::now();
        let profile = self.upstream.fetch_profile(handle).await?;
        let media = self
            .upstream
            .collect_media(&profile.id, self.limits.admirers_media)
            .await?;

        let likers = join_all(
            media
                .media
                .iter()
                .map(|m| self.upstream.fetch_post_likers(&m.id)),
        )
        .await;
        let tally = tally_likers(&likers);
        let total_posts = i64::try_from(media.media.len()).unwrap_or(i64::MAX);
        let admirers = rank_admirers(&tally, total_posts);

        Ok(AdmirersResult {
            profile,
            admirers,
            total_posts,
            processing_time_ms: elapsed_ms(started),
        })
    }

    /// Profile detail view: previews of followers/following, recent posts,
    /// and stories. No diffing, no snapshot write.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without a requester; otherwise classified upstream
    /// errors.
    pub async fn profile_details(
        &self,
        handle: &str,
        requester: Option<Uuid>,
    ) -> Result<ProfileDetailsResult, SearchError> {
        if requester.is_none() {
            return Err(SearchError::Unauthorized);
        }

        let started = Instant::now();
        let profile = self.upstream.fetch_profile(handle).await?;

        let (followers, following, stories, media) = tokio::try_join!(
            self.upstream
                .collect_followers(&profile.id, CollectMode::FetchOnce),
            self.upstream
                .collect_following(&profile.id, CollectMode::FetchOnce),
            async {
                Ok::<_, gramdelta_upstream::UpstreamError>(
                    self.upstream.fetch_stories(&profile.id).await,
                )
            },
            self.upstream
                .collect_media(&profile.id, self.limits.profile_media),
        )?;

        Ok(ProfileDetailsResult {
            profile,
            followers_preview: followers.people,
            following_preview: following.people,
            media: media.media,
            stories,
            processing_time_ms: elapsed_ms(started),
        })
    }

    /// Shared-activity comparison between two accounts, recorded in history.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without a requester; otherwise classified upstream
    /// errors from the comparator's load-bearing fetches.
    pub async fn shared_activity(
        &self,
        handle_a: &str,
        handle_b: &str,
        requester: Option<Uuid>,
    ) -> Result<SharedActivityResult, SearchError> {
        let Some(requester) = requester else {
            return Err(SearchError::Unauthorized);
        };

        let started = Instant::now();
        let mut record = SearchRecord::new(
            Some(requester),
            handle_a,
            SearchKind::Both,
            "shared_activity",
        );
        self.record_best_effort(&record).await;

        match compare_activity(
            &self.upstream,
            handle_a,
            handle_b,
            self.limits.advanced_media,
        )
        .await
        {
            Ok(result) => {
                record.complete(result.processing_time_ms, summarize_shared(&result));
                self.record_best_effort(&record).await;
                Ok(result)
            }
            Err(e) => {
                record.fail(elapsed_ms(started), &e.to_string(), e.is_rate_limited());
                self.record_best_effort(&record).await;
                Err(e)
            }
        }
    }

    /// Fetches one more followers page from a previously returned cursor.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `user_id` or `cursor` before touching
    /// upstream; otherwise classified upstream errors.
    pub async fn load_more_followers(
        &self,
        user_id: &str,
        cursor: &str,
    ) -> Result<PeoplePageResult, SearchError> {
        validate_page_args(user_id, cursor)?;
        let page = self
            .upstream
            .fetch_followers_page(user_id, Some(cursor))
            .await?;
        Ok(PeoplePageResult {
            people: page.people,
            next_cursor: page.next_cursor,
        })
    }

    /// Fetches one more following page from a previously returned cursor.
    ///
    /// # Errors
    ///
    /// As for [`SearchEngine::load_more_followers`].
    pub async fn load_more_following(
        &self,
        user_id: &str,
        cursor: &str,
    ) -> Result<PeoplePageResult, SearchError> {
        validate_page_args(user_id, cursor)?;
        let page = self
            .upstream
            .fetch_following_page(user_id, Some(cursor))
            .await?;
        Ok(PeoplePageResult {
            people: page.people,
            next_cursor: page.next_cursor,
        })
    }

    /// Fetches one more media page from a previously returned cursor.
    ///
    /// # Errors
    ///
    /// As for [`SearchEngine::load_more_followers`].
    pub async fn load_more_media(
        &self,
        user_id: &str,
        cursor: &str,
    ) -> Result<MediaPageResult, SearchError> {
        validate_page_args(user_id, cursor)?;
        let page = self.upstream.fetch_media_page(user_id, Some(cursor)).await?;
        Ok(MediaPageResult {
            media: page.media,
            next_cursor: page.next_cursor,
        })
    }

    /// Fans out liker fetches for the given posts and flags repeat engagers
    /// present in the follower/following graph.
    async fn cross_reference(
        &self,
        media: &[gramdelta_core::Media],
        followers: &[Person],
        following: &[Person],
    ) -> Vec<RedFlagEntry> {
        let likers = join_all(media.iter().map(|m| self.upstream.fetch_post_likers(&m.id))).await;
        let tally = tally_likers(&likers);
        let graph = graph_id_set(followers, following);
        red_flags(&tally, &graph)
    }

    async fn record_best_effort(&self, record: &SearchRecord) {
        if let Err(e) = self.history.record(record).await {
            tracing::warn!(
                target_handle = %record.target_handle,
                status = record.status.as_str(),
                error = %e,
                "history write failed"
            );
        }
    }
}

fn validate_page_args(user_id: &str, cursor: &str) -> Result<(), SearchError> {
    if user_id.trim().is_empty() {
        return Err(SearchError::InvalidArgument("user_id is required".to_owned()));
    }
    if cursor.trim().is_empty() {
        return Err(SearchError::InvalidArgument("cursor is required".to_owned()));
    }
    Ok(())
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

fn summarize_basic(result: &BasicSearchResult) -> serde_json::Value {
    serde_json::json!({
        "kind": "basic",
        "total_followers": result.total_followers,
        "total_following": result.total_following,
        "red_flag_count": result.red_flags.len(),
        "is_first_search": result.is_first_search,
    })
}

fn summarize_advanced(result: &AdvancedSearchResult) -> serde_json::Value {
    serde_json::json!({
        "kind": "advanced",
        "total_followers": result.total_followers,
        "total_following": result.total_following,
        "red_flag_count": result.red_flags.len(),
        "story_count": result.stories.len(),
        "is_first_search": result.is_first_search,
    })
}

fn summarize_shared(result: &SharedActivityResult) -> serde_json::Value {
    serde_json::json!({
        "kind": "shared_activity",
        "handle_a": result.profile_a.handle,
        "handle_b": result.profile_b.handle,
        "is_a_following_b": result.is_a_following_b,
        "is_b_following_a": result.is_b_following_a,
        "posts_processed_a": result.posts_processed_a,
        "posts_processed_b": result.posts_processed_b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_page_args_rejects_blank_inputs() {
        assert!(matches!(
            validate_page_args("", "cursor"),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_page_args("42", "  "),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(validate_page_args("42", "cursor").is_ok());
    }

    #[test]
    fn default_limits_match_operation_tiers() {
        let limits = EngineLimits::default();
        assert_eq!(limits.basic_media, 12);
        assert_eq!(limits.advanced_media, 12);
        assert_eq!(limits.profile_media, 24);
        assert_eq!(limits.admirers_media, 48);
    }
}
