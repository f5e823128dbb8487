//! Stages that need the whole upstream before producing output.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::Hash;

use crate::core::iter::{drain, Next};

/// Materialize upstream on the first pull, rebuild it with `build`, then
/// stream the result.
pub(crate) fn blocking<T, R, F>(mut next: Next<T>, build: F, stage: &'static str) -> Next<R>
where
    T: 'static,
    R: 'static,
    F: FnOnce(Vec<T>) -> Vec<R> + 'static,
{
    let mut build = Some(build);
    let mut out: Option<std::vec::IntoIter<R>> = None;
    Box::new(move || {
        if let Some(build) = build.take() {
            let items = drain(&mut next);
            tracing::debug!(stage, count = items.len(), "materialized upstream");
            out = Some(build(items).into_iter());
        }
        out.as_mut()?.next()
    })
}

/// Stable sort by the natural order.
pub(crate) fn sort<T: Ord + 'static>(next: Next<T>) -> Next<T> {
    blocking(
        next,
        |mut items| {
            items.sort();
            items
        },
        "sort",
    )
}

/// Stable sort with a comparator.
pub(crate) fn sort_by<T, F>(next: Next<T>, mut compare: F) -> Next<T>
where
    T: 'static,
    F: FnMut(&T, &T) -> Ordering + 'static,
{
    blocking(
        next,
        move |mut items| {
            items.sort_by(|a, b| compare(a, b));
            items
        },
        "sort_by",
    )
}

/// Stable sort by a projected key.
pub(crate) fn sort_by_key<T, K, F>(next: Next<T>, mut key: F) -> Next<T>
where
    T: 'static,
    K: Ord + 'static,
    F: FnMut(&T) -> K + 'static,
{
    blocking(
        next,
        move |mut items| {
            items.sort_by_key(|item| key(item));
            items
        },
        "sort_by_key",
    )
}

pub(crate) fn reverse<T: 'static>(next: Next<T>) -> Next<T> {
    blocking(
        next,
        |mut items| {
            items.reverse();
            items
        },
        "reverse",
    )
}

/// Keep the first element for every distinct key.
///
/// Output matches a blocking dedup, but elements are released as soon as
/// they are known to be new.
pub(crate) fn uniq_by<T, K, F>(mut next: Next<T>, mut key: F) -> Next<T>
where
    T: 'static,
    K: Hash + Eq + 'static,
    F: FnMut(&T) -> K + 'static,
{
    let mut seen = HashSet::new();
    Box::new(move || loop {
        let item = next()?;
        if seen.insert(key(&item)) {
            return Some(item);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iter::from_iter;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_blocking_waits_for_first_pull() {
        let pulled = Rc::new(Cell::new(0));
        let counter = pulled.clone();
        let upstream: Next<i32> = Box::new({
            let mut items = vec![3, 1, 2].into_iter();
            move || {
                counter.set(counter.get() + 1);
                items.next()
            }
        });

        let mut next = sort(upstream);
        assert_eq!(pulled.get(), 0);
        assert_eq!(next(), Some(1));
        // three elements plus the exhausting pull
        assert_eq!(pulled.get(), 4);
        assert_eq!(drain(&mut next), vec![2, 3]);
    }

    #[test]
    fn test_sort_by_key_is_stable() {
        let items = vec![(1, "a"), (0, "z"), (1, "b"), (0, "y")];
        let mut next = sort_by_key(from_iter(items), |(key, _)| *key);
        assert_eq!(
            drain(&mut next),
            vec![(0, "z"), (0, "y"), (1, "a"), (1, "b")]
        );
    }

    #[test]
    fn test_sort_by_descending() {
        let mut next = sort_by(from_iter(vec![2, 5, 1]), |a, b| b.cmp(a));
        assert_eq!(drain(&mut next), vec![5, 2, 1]);
    }

    #[test]
    fn test_reverse() {
        let mut next = reverse(from_iter(vec!["a", "b", "c"]));
        assert_eq!(drain(&mut next), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_uniq_by_keeps_first() {
        let words = vec!["apple", "avocado", "banana", "blueberry", "cherry"];
        let mut next = uniq_by(from_iter(words), |w| w.chars().next());
        assert_eq!(drain(&mut next), vec!["apple", "banana", "cherry"]);
    }
}
