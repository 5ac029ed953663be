//! Two-account shared-activity comparison.
//!
//! Matching is by id where possible, falling back to handle: the following
//! endpoint emits string ids from a different backend than the profile
//! endpoint, so id equality alone would miss known-same accounts.

use std::time::Instant;

use futures::future::join_all;

use gramdelta_core::{Comment, Media, Person};
use gramdelta_upstream::{CollectMode, UpstreamClient};

use crate::error::SearchError;
use crate::types::{PostRef, SharedActivityResult};

pub(crate) fn is_same_account(a: &Person, b: &Person) -> bool {
    a.id == b.id || a.handle == b.handle
}

pub(crate) fn list_contains(list: &[Person], target: &Person) -> bool {
    list.iter().any(|p| is_same_account(p, target))
}

fn comment_by(comment: &Comment, target: &Person) -> bool {
    comment.author_id == target.id || comment.author_handle == target.handle
}

/// Classification of one side's posts against the other party.
#[derive(Debug, Default)]
pub(crate) struct SideActivity {
    pub(crate) liked: Vec<PostRef>,
    pub(crate) commented: Vec<PostRef>,
    pub(crate) posts_processed: i64,
}

/// Fans out liker and comment fetches for each post and classifies which
/// posts `other` liked or commented on. Liker and comment fetches fail soft,
/// so a degraded post simply contributes nothing.
pub(crate) async fn classify_side(
    client: &UpstreamClient,
    posts: &[Media],
    other: &Person,
) -> SideActivity {
    let per_post = posts.iter().map(|post| async move {
        let (likers, comments) = tokio::join!(
            client.fetch_post_likers(&post.id),
            client.fetch_post_comments(&post.id)
        );
        (post, likers, comments)
    });
    let fetched = join_all(per_post).await;

    let mut activity = SideActivity {
        posts_processed: i64::try_from(posts.len()).unwrap_or(i64::MAX),
        ..SideActivity::default()
    };
    for (post, likers, comments) in fetched {
        if list_contains(&likers, other) {
            activity.liked.push(PostRef::from_media(post));
        }
        if comments.iter().any(|c| comment_by(c, other)) {
            activity.commented.push(PostRef::from_media(post));
        }
    }
    activity
}

/// Compares two accounts: mutual-follow flags from bounded following scans,
/// plus per-post like/comment classification in both directions.
///
/// The following scans stop at the sentinel (the other account's id), the
/// configured cap, or the end of the list, whichever comes first, so the
/// follow flags are best-effort when the scan stopped early for another
/// reason.
///
/// # Errors
///
/// Propagates classified upstream errors from the profile, following, and
/// media fetches. Liker and comment fetches degrade instead of failing.
pub async fn compare_activity(
    client: &UpstreamClient,
    handle_a: &str,
    handle_b: &str,
    media_limit: usize,
) -> Result<SharedActivityResult, SearchError> {
    let started = Instant::now();

    let (profile_a, profile_b) =
        tokio::try_join!(client.fetch_profile(handle_a), client.fetch_profile(handle_b))?;

    let (following_a, following_b) = tokio::try_join!(
        client.collect_following(&profile_a.id, CollectMode::StopOnSentinel(profile_b.id.clone())),
        client.collect_following(&profile_b.id, CollectMode::StopOnSentinel(profile_a.id.clone()))
    )?;

    let is_a_following_b = list_contains(&following_a.people, &profile_b);
    let is_b_following_a = list_contains(&following_b.people, &profile_a);

    let (media_a, media_b) = tokio::try_join!(
        client.collect_media(&profile_a.id, media_limit),
        client.collect_media(&profile_b.id, media_limit)
    )?;

    let (side_a, side_b) = tokio::join!(
        classify_side(client, &media_a.media, &profile_b),
        classify_side(client, &media_b.media, &profile_a)
    );

    Ok(SharedActivityResult {
        profile_a,
        profile_b,
        is_a_following_b,
        is_b_following_a,
        posts_a_liked_by_b: side_a.liked,
        posts_a_commented_by_b: side_a.commented,
        posts_b_liked_by_a: side_b.liked,
        posts_b_commented_by_a: side_b.commented,
        posts_processed_a: side_a.posts_processed,
        posts_processed_b: side_b.posts_processed,
        processing_time_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: &str, handle: &str) -> Person {
        Person {
            id: id.to_owned(),
            handle: handle.to_owned(),
            display_name: String::new(),
            avatar_url: None,
            is_verified: false,
            is_private: false,
            follower_count: None,
            following_count: None,
            media_count: None,
            biography: None,
            external_url: None,
        }
    }

    #[test]
    fn same_account_matches_on_id_despite_rename() {
        assert!(is_same_account(&person("1", "old_name"), &person("1", "new_name")));
    }

    #[test]
    fn same_account_falls_back_to_handle_across_id_spaces() {
        // Different backends can emit different id encodings for one account.
        assert!(is_same_account(&person("123", "amy"), &person("999", "amy")));
    }

    #[test]
    fn different_accounts_do_not_match() {
        assert!(!is_same_account(&person("1", "amy"), &person("2", "bob")));
    }

    #[test]
    fn list_contains_scans_whole_list() {
        let list = vec![person("1", "amy"), person("2", "bob")];
        assert!(list_contains(&list, &person("2", "someone_else")));
        assert!(!list_contains(&list, &person("3", "carol")));
    }

    #[test]
    fn comment_author_matches_by_id_or_handle() {
        let comment = Comment {
            id: "c1".to_owned(),
            post_id: "m1".to_owned(),
            author_id: "7".to_owned(),
            author_handle: "amy".to_owned(),
            text: "hi".to_owned(),
        };
        assert!(comment_by(&comment, &person("7", "other")));
        assert!(comment_by(&comment, &person("other", "amy")));
        assert!(!comment_by(&comment, &person("8", "bob")));
    }
}
