//! Cross-referencing of post likers against the social graph.
//!
//! A tally counts each person at most once per post. Red flags are repeat
//! engagers who are also in the target's follower or following lists;
//! admirers are ranked by the share of recent posts they liked.

use std::collections::{HashMap, HashSet};

use gramdelta_core::Person;

use crate::types::{AdmirerEntry, RedFlagEntry};

/// Per-person engagement counts across posts.
///
/// A person appearing multiple times in one post's liker list (upstream
/// duplication) counts once for that post. The first-seen `Person` record is
/// kept for display.
#[must_use]
pub fn tally_likers(posts_with_likers: &[Vec<Person>]) -> Vec<(Person, i64)> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    let mut first_seen: Vec<Person> = Vec::new();
    let mut known: HashSet<String> = HashSet::new();

    for likers in posts_with_likers {
        let mut seen_this_post: HashSet<&str> = HashSet::new();
        for person in likers {
            if !seen_this_post.insert(person.id.as_str()) {
                continue;
            }
            *counts.entry(person.id.clone()).or_insert(0) += 1;
            if known.insert(person.id.clone()) {
                first_seen.push(person.clone());
            }
        }
    }

    first_seen
        .into_iter()
        .map(|person| {
            let count = counts.get(&person.id).copied().unwrap_or(0);
            (person, count)
        })
        .collect()
}

/// Builds the id membership set for red-flag checks from the follower and
/// following lists.
#[must_use]
pub fn graph_id_set<'a>(followers: &'a [Person], following: &'a [Person]) -> HashSet<&'a str> {
    followers
        .iter()
        .chain(following.iter())
        .map(|p| p.id.as_str())
        .collect()
}

/// Repeat engagers (more than one post) who are in the follower or following
/// set. Sorted by interaction count descending, ties by handle ascending.
#[must_use]
pub fn red_flags(tally: &[(Person, i64)], graph_ids: &HashSet<&str>) -> Vec<RedFlagEntry> {
    let mut entries: Vec<RedFlagEntry> = tally
        .iter()
        .filter(|(person, count)| *count > 1 && graph_ids.contains(person.id.as_str()))
        .map(|(person, count)| RedFlagEntry {
            person: person.clone(),
            interaction_count: *count,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.interaction_count
            .cmp(&a.interaction_count)
            .then_with(|| a.person.handle.cmp(&b.person.handle))
    });
    entries
}

/// Ranks likers by the percentage of fetched posts they liked.
///
/// `total_posts` is the number of posts actually fetched, not the account's
/// media count. Zero posts yields an empty ranking. Percentages are rounded
/// to the nearest integer; ties are broken by handle ascending and ranks run
/// `1..=N`.
#[must_use]
pub fn rank_admirers(tally: &[(Person, i64)], total_posts: i64) -> Vec<AdmirerEntry> {
    if total_posts == 0 {
        return Vec::new();
    }

    let mut entries: Vec<AdmirerEntry> = tally
        .iter()
        .map(|(person, count)| {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            let like_percentage = (*count as f64 / total_posts as f64 * 100.0).round() as i64;
            AdmirerEntry {
                person: person.clone(),
                like_percentage,
                rank: 0,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.like_percentage
            .cmp(&a.like_percentage)
            .then_with(|| a.person.handle.cmp(&b.person.handle))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i64::try_from(i + 1).unwrap_or(i64::MAX);
    }
    entries
}
