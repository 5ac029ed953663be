//! Cursor-driven pagination collector.
//!
//! Drives a page-fetching closure until a stop condition is satisfied,
//! merging results. Cursors are opaque upstream tokens; the collector only
//! tests them for presence, never interprets them.

use std::future::Future;
use std::time::Duration;

use crate::error::UpstreamError;
use crate::types::{MediaPage, PeoplePage};

/// How far the collector should page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectMode {
    /// Stop after the first page regardless of cursor.
    FetchOnce,
    /// Page until the cap, an empty page, or a missing cursor.
    Exhaustive,
    /// Like `Exhaustive`, but also stop once a page contains the person with
    /// this id. The page containing the sentinel is kept whole.
    StopOnSentinel(String),
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Hard ceiling on accumulated people; results are truncated to exactly
    /// this many.
    pub cap: usize,
    /// Optional pause between page fetches. A rate-limiting safety valve,
    /// not a correctness requirement; defaults to zero.
    pub inter_page_delay: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            cap: 500,
            inter_page_delay: Duration::ZERO,
        }
    }
}

/// Collects people across pages until a stop condition holds.
///
/// Stop conditions, checked after each page: accumulated count reached the
/// cap; the page was empty; the upstream provided no next cursor; the mode is
/// [`CollectMode::FetchOnce`]; or the sentinel id appeared in the page. The
/// returned `next_cursor` is the last observed upstream cursor, enabling
/// resumable load-more calls.
///
/// # Errors
///
/// Propagates the first [`UpstreamError`] from any page fetch; no partial
/// results survive a failed page.
pub async fn collect_people<F, Fut>(
    mut fetch_page: F,
    config: &CollectorConfig,
    mode: CollectMode,
) -> Result<PeoplePage, UpstreamError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<PeoplePage, UpstreamError>>,
{
    let mut people = Vec::new();
    let mut cursor: Option<String> = None;

    while people.len() < config.cap {
        let page = fetch_page(cursor.clone()).await?;
        let page_empty = page.people.is_empty();
        let sentinel_seen = match &mode {
            CollectMode::StopOnSentinel(id) => page.people.iter().any(|p| p.id == *id),
            _ => false,
        };

        people.extend(page.people);
        cursor = page.next_cursor;

        if cursor.is_none() || page_empty || sentinel_seen || mode == CollectMode::FetchOnce {
            break;
        }
        if !config.inter_page_delay.is_zero() {
            tokio::time::sleep(config.inter_page_delay).await;
        }
    }

    people.truncate(config.cap);
    Ok(PeoplePage {
        people,
        next_cursor: cursor,
    })
}

/// Collects up to `limit` posts across pages. Same loop shape as
/// [`collect_people`] with the per-operation media limit as the cap.
///
/// # Errors
///
/// Propagates the first [`UpstreamError`] from any page fetch.
pub async fn collect_media<F, Fut>(
    mut fetch_page: F,
    limit: usize,
    inter_page_delay: Duration,
) -> Result<MediaPage, UpstreamError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<MediaPage, UpstreamError>>,
{
    let mut media = Vec::new();
    let mut cursor: Option<String> = None;

    while media.len() < limit {
        let page = fetch_page(cursor.clone()).await?;
        let page_empty = page.media.is_empty();

        media.extend(page.media);
        cursor = page.next_cursor;

        if cursor.is_none() || page_empty {
            break;
        }
        if !inter_page_delay.is_zero() {
            tokio::time::sleep(inter_page_delay).await;
        }
    }

    media.truncate(limit);
    Ok(MediaPage {
        media,
        next_cursor: cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramdelta_core::Person;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn person(id: usize) -> Person {
        Person {
            id: id.to_string(),
            handle: format!("user_{id}"),
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

    /// Fetcher serving `pages` in order; panics if asked past the end.
    fn scripted_pages(
        pages: Vec<PeoplePage>,
    ) -> impl FnMut(Option<String>) -> std::future::Ready<Result<PeoplePage, UpstreamError>> {
        let mut iter = pages.into_iter();
        move |_cursor| {
            std::future::ready(Ok(iter.next().expect("fetcher called past scripted pages")))
        }
    }

    fn page(ids: std::ops::Range<usize>, next: Option<&str>) -> PeoplePage {
        PeoplePage {
            people: ids.map(person).collect(),
            next_cursor: next.map(ToOwned::to_owned),
        }
    }

    #[tokio::test]
    async fn exhaustive_merges_pages_and_stops_on_missing_cursor() {
        let fetcher = scripted_pages(vec![page(0..3, Some("c1")), page(3..5, None)]);
        let result = collect_people(fetcher, &CollectorConfig::default(), CollectMode::Exhaustive)
            .await
            .expect("collect");

        assert_eq!(result.people.len(), 5);
        assert_eq!(result.people[0].id, "0");
        assert_eq!(result.people[4].id, "4");
        assert!(result.next_cursor.is_none());
    }

    #[tokio::test]
    async fn exhaustive_stops_on_empty_page_and_keeps_cursor() {
        let fetcher = scripted_pages(vec![
            page(0..2, Some("c1")),
            PeoplePage {
                people: vec![],
                next_cursor: Some("c2".to_owned()),
            },
        ]);
        let result = collect_people(fetcher, &CollectorConfig::default(), CollectMode::Exhaustive)
            .await
            .expect("collect");

        assert_eq!(result.people.len(), 2);
        // Last observed cursor is returned for resumable load-more.
        assert_eq!(result.next_cursor.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn cap_truncates_to_exactly_cap_without_fabrication() {
        // 3 pages of 40 against a cap of 100: the collector must observe at
        // least 100 people before returning exactly 100.
        let fetcher = scripted_pages(vec![
            page(0..40, Some("c1")),
            page(40..80, Some("c2")),
            page(80..120, Some("c3")),
        ]);
        let config = CollectorConfig {
            cap: 100,
            inter_page_delay: Duration::ZERO,
        };
        let result = collect_people(fetcher, &config, CollectMode::Exhaustive)
            .await
            .expect("collect");

        assert_eq!(result.people.len(), 100);
        assert_eq!(result.people[99].id, "99");
    }

    #[tokio::test]
    async fn fetch_once_stops_after_first_page_despite_cursor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let fetcher = move |_cursor: Option<String>| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(page(0..10, Some("more"))))
        };
        let result = collect_people(fetcher, &CollectorConfig::default(), CollectMode::FetchOnce)
            .await
            .expect("collect");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.people.len(), 10);
        assert_eq!(result.next_cursor.as_deref(), Some("more"));
    }

    #[tokio::test]
    async fn sentinel_stops_mid_scan_but_keeps_whole_page() {
        let fetcher = scripted_pages(vec![page(0..5, Some("c1")), page(5..10, Some("c2"))]);
        let result = collect_people(
            fetcher,
            &CollectorConfig::default(),
            CollectMode::StopOnSentinel("6".to_owned()),
        )
        .await
        .expect("collect");

        // Sentinel 6 is in the second page; that page is kept whole and no
        // third page is requested.
        assert_eq!(result.people.len(), 10);
        assert_eq!(result.next_cursor.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn sentinel_absent_falls_through_to_other_stop_conditions() {
        let fetcher = scripted_pages(vec![page(0..5, None)]);
        let result = collect_people(
            fetcher,
            &CollectorConfig::default(),
            CollectMode::StopOnSentinel("999".to_owned()),
        )
        .await
        .expect("collect");

        assert_eq!(result.people.len(), 5);
        assert!(result.next_cursor.is_none());
    }

    #[tokio::test]
    async fn page_error_propagates_without_partial_results() {
        let mut call = 0;
        let fetcher = move |_cursor: Option<String>| {
            call += 1;
            std::future::ready(if call == 1 {
                Ok(page(0..3, Some("c1")))
            } else {
                Err(UpstreamError::Unavailable { status: 503 })
            })
        };
        let result =
            collect_people(fetcher, &CollectorConfig::default(), CollectMode::Exhaustive).await;

        assert!(
            matches!(result, Err(UpstreamError::Unavailable { status: 503 })),
            "expected Unavailable, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn collect_media_respects_limit() {
        use gramdelta_core::Media;
        let make_media = |id: usize| Media {
            id: id.to_string(),
            shortcode: None,
            caption: String::new(),
            thumbnail_url: None,
            like_count: None,
            comment_count: None,
            taken_at: None,
        };
        let mut served = 0usize;
        let fetcher = move |_cursor: Option<String>| {
            let batch: Vec<Media> = (served..served + 10).map(make_media).collect();
            served += 10;
            std::future::ready(Ok(MediaPage {
                media: batch,
                next_cursor: Some("next".to_owned()),
            }))
        };
        let result = collect_media(fetcher, 12, Duration::ZERO)
            .await
            .expect("collect");

        assert_eq!(result.media.len(), 12);
        assert_eq!(result.media[11].id, "11");
        assert_eq!(result.next_cursor.as_deref(), Some("next"));
    }
}
