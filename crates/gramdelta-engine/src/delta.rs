//! Follower/following delta computation.
//!
//! `diff` is the exact, order-preserving comparison used by authenticated
//! searches. `decoy_diff` is the anonymous-tier variant that substitutes a
//! random sample when no honest answer exists; the randomness never touches
//! the exact path.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;

use gramdelta_core::Person;

/// Members of `current` whose id does not appear in `previous`, in
/// `current`'s order.
#[must_use]
pub fn diff(current: &[Person], previous: &[Person]) -> Vec<Person> {
    let known: HashSet<&str> = previous.iter().map(|p| p.id.as_str()).collect();
    current
        .iter()
        .filter(|p| !known.contains(p.id.as_str()))
        .cloned()
        .collect()
}

/// Anonymous-tier delta: a real diff when one exists, otherwise a plausible
/// random sample.
///
/// - No previous list: without-replacement sample of 1 to 15 of `current`.
/// - Real diff non-empty: the real diff.
/// - Real diff empty but `current` non-empty: sample of 1 to 5.
///
/// Sample sizes are clamped to `current.len()`; an empty `current` always
/// yields an empty result.
#[must_use]
pub fn decoy_diff(current: &[Person], previous: &[Person]) -> Vec<Person> {
    if current.is_empty() {
        return Vec::new();
    }
    if previous.is_empty() {
        return sample(current, 15);
    }
    let real = diff(current, previous);
    if real.is_empty() {
        return sample(current, 5);
    }
    real
}

fn sample(current: &[Person], max_size: usize) -> Vec<Person> {
    let mut rng = rand::rng();
    let upper = max_size.min(current.len());
    let n = rng.random_range(1..=upper);
    current.choose_multiple(&mut rng, n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: &str) -> Person {
        Person {
            id: id.to_owned(),
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

    fn people(ids: &[&str]) -> Vec<Person> {
        ids.iter().map(|id| person(id)).collect()
    }

    #[test]
    fn diff_preserves_current_order() {
        let current = people(&["3", "1", "5", "2"]);
        let previous = people(&["1", "2"]);

        let result = diff(&current, &previous);
        let ids: Vec<&str> = result.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["3", "5"]);
    }

    #[test]
    fn diff_matches_by_id_not_handle() {
        let mut renamed = person("1");
        renamed.handle = "totally_new_name".to_owned();
        let current = vec![renamed, person("2")];
        let previous = people(&["1"]);

        let result = diff(&current, &previous);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "2");
    }

    #[test]
    fn diff_of_identical_lists_is_empty() {
        let current = people(&["1", "2", "3"]);
        assert!(diff(&current, &current).is_empty());
    }

    #[test]
    fn decoy_diff_empty_current_is_empty() {
        assert!(decoy_diff(&[], &[]).is_empty());
        assert!(decoy_diff(&[], &people(&["1"])).is_empty());
    }

    #[test]
    fn decoy_diff_without_previous_samples_one_to_fifteen() {
        let current: Vec<Person> = (0..100).map(|i| person(&i.to_string())).collect();
        let current_ids: HashSet<&str> = current.iter().map(|p| p.id.as_str()).collect();

        for _ in 0..20 {
            let sample = decoy_diff(&current, &[]);
            assert!((1..=15).contains(&sample.len()), "got {}", sample.len());

            // Without replacement, and every sampled person is real.
            let ids: HashSet<&str> = sample.iter().map(|p| p.id.as_str()).collect();
            assert_eq!(ids.len(), sample.len());
            assert!(ids.iter().all(|id| current_ids.contains(id)));
        }
    }

    #[test]
    fn decoy_diff_sample_never_exceeds_current_len() {
        let current = people(&["1", "2"]);
        for _ in 0..20 {
            let sample = decoy_diff(&current, &[]);
            assert!((1..=2).contains(&sample.len()));
        }
    }

    #[test]
    fn decoy_diff_with_real_changes_returns_exact_diff() {
        let current = people(&["1", "2", "9"]);
        let previous = people(&["1", "2"]);

        let result = decoy_diff(&current, &previous);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "9");
    }

    #[test]
    fn decoy_diff_no_changes_samples_one_to_five() {
        let current: Vec<Person> = (0..50).map(|i| person(&i.to_string())).collect();

        for _ in 0..20 {
            let sample = decoy_diff(&current, &current);
            assert!((1..=5).contains(&sample.len()), "got {}", sample.len());
        }
    }
}
