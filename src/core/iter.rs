//! Pull iterators and the helpers that splice them together.
//!
//! A pipeline stage is a function from an upstream [`Next`] to a new
//! [`Next`]. Composing stages wraps closures around closures, so pulling one
//! element from the tail of a chain does work proportional to the number of
//! stages, and nothing is buffered unless a stage needs it.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::core::context::Context;
use crate::error::Error;

/// A pull function: `Some(item)` for the next element, `None` once exhausted.
pub type Next<T> = Box<dyn FnMut() -> Option<T>>;

/// An iterator that is already exhausted.
pub(crate) fn empty<T: 'static>() -> Next<T> {
    Box::new(|| None)
}

/// Pull from any iterator.
pub(crate) fn from_iter<I>(items: I) -> Next<I::Item>
where
    I: IntoIterator,
    I::IntoIter: 'static,
{
    let mut iter = items.into_iter();
    Box::new(move || iter.next())
}

/// Pull everything that is left.
pub(crate) fn drain<T>(next: &mut Next<T>) -> Vec<T> {
    std::iter::from_fn(|| next()).collect()
}

/// Replay `buffered` in order, then continue with `next`.
pub(crate) fn replay<T: 'static>(buffered: impl Into<VecDeque<T>>, mut next: Next<T>) -> Next<T> {
    let mut buffered = buffered.into();
    if buffered.is_empty() {
        return next;
    }
    Box::new(move || match buffered.pop_front() {
        Some(item) => Some(item),
        None => next(),
    })
}

/// Inspect a prefix of `next` without consuming it.
///
/// Elements are pulled while `inspect` returns `true`; everything pulled is
/// spliced back in front of the remaining iterator, so later readers observe
/// the stream exactly as if it had never been touched.
pub(crate) fn repeatable<T: 'static>(
    mut next: Next<T>,
    mut inspect: impl FnMut(&T) -> bool,
) -> Next<T> {
    let mut seen = VecDeque::new();
    while let Some(item) = next() {
        let more = inspect(&item);
        seen.push_back(item);
        if !more {
            break;
        }
    }
    replay(seen, next)
}

/// A pull function paired with the fault channel of the stage that feeds it.
///
/// Nested sequences, union operands and zip operands are read through a
/// `Pull`, so a fault raised inside them can be forwarded to the stage that
/// consumes them.
pub struct Pull<T> {
    next: Next<T>,
    ctx: Option<Rc<Context>>,
}

impl<T: 'static> Pull<T> {
    /// Pull from a plain iterator, which can never fault.
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Self {
            next: from_iter(items),
            ctx: None,
        }
    }

    /// Pull from a closure, which can never fault.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut() -> Option<T> + 'static,
    {
        Self {
            next: Box::new(f),
            ctx: None,
        }
    }

    pub(crate) fn new(next: Next<T>, ctx: Option<Rc<Context>>) -> Self {
        Self { next, ctx }
    }

    pub(crate) fn empty() -> Self {
        Self::new(empty(), None)
    }

    pub(crate) fn pull(&mut self) -> Option<T> {
        (self.next)()
    }

    /// The fault recorded by the feeding stage, if any.
    pub(crate) fn fault(&self) -> Option<Error> {
        self.ctx.as_ref().and_then(|ctx| ctx.err()).cloned()
    }
}

/// Owning iterator over a pipeline.
pub struct IntoIter<T> {
    pub(crate) next: Next<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        (self.next)()
    }
}
