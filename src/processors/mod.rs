//! Stage implementations for the lazyflow engine.
//!
//! Each function here takes the upstream pull function and returns a new
//! one. None of them does any work until the returned closure is called.

pub mod aggregate;
pub mod flatten;

use std::rc::Rc;

use crate::core::context::Context;
use crate::core::func::MapFn;
use crate::core::iter::{Next, Pull};

/// Apply a transformation in any of the supported shapes.
///
/// Dropped elements are skipped. A fault is recorded into `ctx` and ends the
/// stage: every later pull returns `None`.
pub(crate) fn map<T, R>(mut next: Next<T>, mut f: MapFn<T, R>, ctx: &Rc<Context>) -> Next<R>
where
    T: 'static,
    R: 'static,
{
    let ctx = ctx.clone();
    Box::new(move || loop {
        if ctx.has_err() {
            return None;
        }
        let item = next()?;
        match f.apply(item) {
            Ok(Some(out)) => return Some(out),
            Ok(None) => continue,
            Err(err) => {
                ctx.set_err(err);
                return None;
            }
        }
    })
}

/// Keep elements matching the predicate.
pub(crate) fn filter<T, F>(mut next: Next<T>, mut predicate: F) -> Next<T>
where
    T: 'static,
    F: FnMut(&T) -> bool + 'static,
{
    Box::new(move || loop {
        let item = next()?;
        if predicate(&item) {
            return Some(item);
        }
    })
}

/// Call `f` with each element and its index as it passes through.
pub(crate) fn foreach<T, F>(mut next: Next<T>, mut f: F) -> Next<T>
where
    T: 'static,
    F: FnMut(&T, usize) + 'static,
{
    let mut index = 0;
    Box::new(move || {
        let item = next()?;
        f(&item, index);
        index += 1;
        Some(item)
    })
}

/// Pass at most `remaining` elements.
pub(crate) fn take<T: 'static>(mut next: Next<T>, mut remaining: usize) -> Next<T> {
    Box::new(move || {
        if remaining == 0 {
            return None;
        }
        let item = next()?;
        remaining -= 1;
        Some(item)
    })
}

/// Pass elements until the predicate first fails.
pub(crate) fn take_while<T, F>(mut next: Next<T>, mut predicate: F) -> Next<T>
where
    T: 'static,
    F: FnMut(&T) -> bool + 'static,
{
    let mut done = false;
    Box::new(move || {
        if done {
            return None;
        }
        match next() {
            Some(item) if predicate(&item) => Some(item),
            _ => {
                done = true;
                None
            }
        }
    })
}

/// Drop the first `count` elements.
pub(crate) fn skip<T: 'static>(mut next: Next<T>, mut count: usize) -> Next<T> {
    Box::new(move || {
        while count > 0 {
            next()?;
            count -= 1;
        }
        next()
    })
}

/// Drop elements while the predicate holds, then pass everything.
pub(crate) fn skip_while<T, F>(mut next: Next<T>, predicate: F) -> Next<T>
where
    T: 'static,
    F: FnMut(&T) -> bool + 'static,
{
    let mut predicate = Some(predicate);
    Box::new(move || {
        if let Some(mut skipping) = predicate.take() {
            loop {
                let item = next()?;
                if !skipping(&item) {
                    return Some(item);
                }
            }
        }
        next()
    })
}

/// Emit `items` before anything from upstream.
pub(crate) fn prepend<T: 'static>(next: Next<T>, items: Vec<T>) -> Next<T> {
    if !items.is_empty() {
        tracing::trace!(count = items.len(), "prepending elements");
    }
    crate::core::iter::replay(items, next)
}

/// Emit upstream, then `tail`.
///
/// The tail is only read once upstream is exhausted without a fault, and a
/// fault raised inside the tail is forwarded into `ctx`.
pub(crate) fn chain<T: 'static>(mut next: Next<T>, mut tail: Pull<T>, ctx: &Rc<Context>) -> Next<T> {
    let ctx = ctx.clone();
    let mut head_done = false;
    let mut tail_done = false;
    Box::new(move || {
        if !head_done {
            if let Some(item) = next() {
                return Some(item);
            }
            head_done = true;
        }
        if tail_done || ctx.has_err() {
            return None;
        }
        match tail.pull() {
            Some(item) => Some(item),
            None => {
                tail_done = true;
                if let Some(err) = tail.fault() {
                    ctx.set_err(err);
                }
                None
            }
        }
    })
}

/// Pair elements of two pipelines; ends with the shorter one.
///
/// A fault raised inside `other` is forwarded into `ctx` once it ends.
pub(crate) fn zip<T, U, R, F>(mut next: Next<T>, mut other: Pull<U>, mut f: F, ctx: &Rc<Context>) -> Next<R>
where
    T: 'static,
    U: 'static,
    R: 'static,
    F: FnMut(T, U) -> R + 'static,
{
    let ctx = ctx.clone();
    Box::new(move || {
        let left = next()?;
        match other.pull() {
            Some(right) => Some(f(left, right)),
            None => {
                if let Some(err) = other.fault() {
                    ctx.set_err(err);
                }
                None
            }
        }
    })
}

/// Combine one element from every pipeline; ends with the shortest one.
///
/// The operand that ends the row has its fault forwarded into `ctx`.
pub(crate) fn zip_n<T, R, F>(mut nexts: Vec<Pull<T>>, mut f: F, ctx: &Rc<Context>) -> Next<R>
where
    T: 'static,
    R: 'static,
    F: FnMut(Vec<T>) -> R + 'static,
{
    let ctx = ctx.clone();
    let mut done = false;
    Box::new(move || {
        if done {
            return None;
        }
        let mut row = Vec::with_capacity(nexts.len());
        for next in nexts.iter_mut() {
            match next.pull() {
                Some(item) => row.push(item),
                None => {
                    done = true;
                    if let Some(err) = next.fault() {
                        ctx.set_err(err);
                    }
                    return None;
                }
            }
        }
        Some(f(row))
    })
}

/// Group every `size` consecutive elements into one batch.
pub(crate) fn partition<T: 'static>(mut next: Next<T>, size: usize) -> Next<Vec<T>> {
    Box::new(move || {
        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            match next() {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        (!batch.is_empty()).then_some(batch)
    })
}

/// Close a batch at every element matching `splitter`.
///
/// The matching element ends the batch it closes when `include_splitter` is
/// set, and is dropped otherwise. Empty batches between adjacent splitters
/// are skipped.
pub(crate) fn partition_by<T, F>(mut next: Next<T>, mut splitter: F, include_splitter: bool) -> Next<Vec<T>>
where
    T: 'static,
    F: FnMut(&T) -> bool + 'static,
{
    Box::new(move || {
        let mut batch = Vec::new();
        loop {
            let Some(item) = next() else {
                return (!batch.is_empty()).then_some(batch);
            };
            if !splitter(&item) {
                batch.push(item);
                continue;
            }
            if include_splitter {
                batch.push(item);
            }
            if !batch.is_empty() {
                return Some(batch);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iter::{drain, from_iter};
    use crate::error::Error;

    #[test]
    fn test_map_halts_on_fault() {
        let ctx = Context::root();
        let f = MapFn::fallible(|s: &'static str| {
            if s == "c" {
                Err(Error::custom("bad c"))
            } else {
                Ok(s.to_uppercase())
            }
        });
        let mut next = map(from_iter(vec!["a", "b", "c", "d"]), f, &ctx);

        assert_eq!(drain(&mut next), vec!["A", "B"]);
        assert_eq!(next(), None);
        assert_eq!(ctx.err(), Some(&Error::custom("bad c")));
    }

    #[test]
    fn test_map_keep_drops() {
        let ctx = Context::root();
        let mut next = map(
            from_iter(1..=6),
            MapFn::keep(|x: i32| (x * 10, x % 2 == 0)),
            &ctx,
        );
        assert_eq!(drain(&mut next), vec![20, 40, 60]);
        assert!(!ctx.has_err());
    }

    #[test]
    fn test_take_and_skip() {
        let mut taken = take(from_iter(1..=10), 3);
        assert_eq!(drain(&mut taken), vec![1, 2, 3]);

        let mut skipped = skip(from_iter(1..=5), 3);
        assert_eq!(drain(&mut skipped), vec![4, 5]);

        let mut past_end = skip(from_iter(1..=2), 5);
        assert_eq!(drain(&mut past_end), Vec::<i32>::new());
    }

    #[test]
    fn test_take_while_is_fused() {
        let mut next = take_while(from_iter(vec![1, 2, 5, 1, 2]), |x| *x < 3);
        assert_eq!(drain(&mut next), vec![1, 2]);
        assert_eq!(next(), None);
    }

    #[test]
    fn test_skip_while_only_at_start() {
        let mut next = skip_while(from_iter(vec![1, 2, 5, 1, 2]), |x| *x < 3);
        assert_eq!(drain(&mut next), vec![5, 1, 2]);
    }

    #[test]
    fn test_chain_forwards_tail_fault() {
        let ctx = Context::root();
        let tail_ctx = Context::root();
        tail_ctx.set_err(Error::custom("tail"));
        let tail = Pull::new(from_iter(vec![3]), Some(tail_ctx));

        let mut next = chain(from_iter(vec![1, 2]), tail, &ctx);
        assert_eq!(drain(&mut next), vec![1, 2, 3]);
        assert_eq!(ctx.err(), Some(&Error::custom("tail")));
    }

    #[test]
    fn test_zip_n_stops_at_shortest() {
        let pulls = vec![
            Pull::from_iter(vec![1, 2, 3]),
            Pull::from_iter(vec![10, 20]),
            Pull::from_iter(vec![100, 200, 300]),
        ];
        let ctx = Context::root();
        let mut next = zip_n(pulls, |row: Vec<i32>| row.iter().sum::<i32>(), &ctx);
        assert_eq!(drain(&mut next), vec![111, 222]);
        assert!(!ctx.has_err());
    }

    #[test]
    fn test_zip_forwards_operand_fault() {
        let ctx = Context::root();
        let other_ctx = Context::root();
        other_ctx.set_err(Error::custom("other broke"));
        let other = Pull::new(from_iter(vec![1]), Some(other_ctx));

        let mut next = zip(from_iter(vec![10, 20, 30]), other, |a, b| a + b, &ctx);
        assert_eq!(drain(&mut next), vec![11]);
        assert_eq!(ctx.err(), Some(&Error::custom("other broke")));
    }

    #[test]
    fn test_partition() {
        let mut next = partition(from_iter(vec!["a", "b", "c", "d"]), 3);
        assert_eq!(drain(&mut next), vec![vec!["a", "b", "c"], vec!["d"]]);
    }

    #[test]
    fn test_partition_by_include_splitter() {
        let mut next = partition_by(
            from_iter(vec!["a", "b", "c", "d", "e", "c", "c"]),
            |s| *s == "c",
            true,
        );
        assert_eq!(
            drain(&mut next),
            vec![vec!["a", "b", "c"], vec!["d", "e", "c"], vec!["c"]]
        );
    }

    #[test]
    fn test_partition_by_exclude_splitter() {
        let mut next = partition_by(from_iter(vec![1, 0, 2, 3, 0, 0, 4]), |x| *x == 0, false);
        assert_eq!(drain(&mut next), vec![vec![1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn test_foreach_indexes() {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut next = foreach(from_iter(vec!["x", "y"]), move |s, i| {
            sink.borrow_mut().push(format!("{}{}", s, i))
        });
        assert!(seen.borrow().is_empty());
        drain(&mut next);
        assert_eq!(*seen.borrow(), vec!["x0", "y1"]);
    }
}
