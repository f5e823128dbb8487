//! One-level expansion of nested sequences.

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc;

use crate::core::context::Context;
use crate::core::iter::{replay, Next, Pull};

/// An element that can be expanded by [`Stream::flatten`](crate::stream::Stream::flatten).
///
/// Vectors, arrays, options, std channels and nested streams are all
/// flattenable. A nested stream may be the absent sentinel, which contributes
/// no elements.
pub trait Nested: 'static {
    /// The element type of the inner sequence.
    type Item: 'static;

    /// Whether flatten has to look ahead for the first non-absent inner
    /// sequence before it can decide the shape of its result.
    const PROBE: bool = false;

    /// Whether this inner sequence is the absent sentinel.
    fn is_absent(&self) -> bool {
        false
    }

    /// Open the inner sequence for reading.
    fn into_pull(self) -> Pull<Self::Item>;
}

impl<T: 'static> Nested for Vec<T> {
    type Item = T;

    fn into_pull(self) -> Pull<T> {
        Pull::from_iter(self)
    }
}

impl<T: 'static> Nested for VecDeque<T> {
    type Item = T;

    fn into_pull(self) -> Pull<T> {
        Pull::from_iter(self)
    }
}

impl<T: 'static, const N: usize> Nested for [T; N] {
    type Item = T;

    fn into_pull(self) -> Pull<T> {
        Pull::from_iter(self)
    }
}

impl<T: 'static> Nested for Option<T> {
    type Item = T;

    fn into_pull(self) -> Pull<T> {
        Pull::from_iter(self)
    }
}

impl<T: 'static> Nested for mpsc::Receiver<T> {
    type Item = T;

    fn into_pull(self) -> Pull<T> {
        Pull::from_fn(move || self.recv().ok())
    }
}

/// Skip leading absent inner sequences and return the outer iterator with
/// the first live one spliced back in front, or `None` if there is none.
pub(crate) fn probe<N: Nested>(mut outer: Next<N>) -> Option<Next<N>> {
    let mut skipped = 0usize;
    while let Some(nested) = outer() {
        if nested.is_absent() {
            skipped += 1;
            continue;
        }
        return Some(replay(vec![nested], outer));
    }
    tracing::debug!(skipped, "flatten found no live inner stream");
    None
}

/// Read every inner sequence in order.
///
/// Absent inner sequences are skipped. A fault recorded inside an inner
/// stream is forwarded into `ctx` and ends the stage.
pub(crate) fn flatten<N: Nested>(mut outer: Next<N>, ctx: &Rc<Context>) -> Next<N::Item> {
    let ctx = ctx.clone();
    let mut inner: Option<Pull<N::Item>> = None;
    Box::new(move || loop {
        if ctx.has_err() {
            return None;
        }
        if let Some(pull) = inner.as_mut() {
            if let Some(item) = pull.pull() {
                return Some(item);
            }
            if let Some(err) = pull.fault() {
                ctx.set_err(err);
            }
            inner = None;
            continue;
        }
        let nested = outer()?;
        if !nested.is_absent() {
            inner = Some(nested.into_pull());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iter::{drain, from_iter};

    #[test]
    fn test_flatten_vectors() {
        let ctx = Context::root();
        let outer = from_iter(vec![vec![1, 2], vec![], vec![3]]);
        let mut next = flatten(outer, &ctx);
        assert_eq!(drain(&mut next), vec![1, 2, 3]);
    }

    #[test]
    fn test_flatten_options() {
        let ctx = Context::root();
        let outer = from_iter(vec![Some("a"), None, Some("b")]);
        let mut next = flatten(outer, &ctx);
        assert_eq!(drain(&mut next), vec!["a", "b"]);
    }

    #[test]
    fn test_flatten_channels() {
        let ctx = Context::root();
        let (tx1, rx1) = mpsc::channel();
        let (tx2, rx2) = mpsc::channel();
        tx1.send(1).unwrap();
        tx1.send(2).unwrap();
        tx2.send(3).unwrap();
        drop(tx1);
        drop(tx2);

        let mut next = flatten(from_iter(vec![rx1, rx2]), &ctx);
        assert_eq!(drain(&mut next), vec![1, 2, 3]);
    }

    #[test]
    fn test_probe_without_lookahead_target() {
        let outer = from_iter(vec![Vec::<i32>::new()]);
        // plain vectors are never absent, so the first one is found
        assert!(probe(outer).is_some());
        assert!(probe(from_iter(Vec::<Vec<i32>>::new())).is_none());
    }
}
