//! The lazy pipeline type.
//!
//! A [`Stream`] is either the absent sentinel or a live pipeline: a pull
//! function, the context that records its faults, and an optional memo of
//! elements that a terminal read has already materialized.
//!
//! Every transformation consumes the stream and returns a new one wrapping a
//! new pull function. Nothing runs until a terminal operation pulls.

mod relation;
mod terminal;

pub use relation::StreamProcessor;

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::sync::mpsc;

use crate::core::context::Context;
use crate::core::func::MapFn;
use crate::core::iter::{self, Next, Pull};
use crate::core::traits::{Cursor, Source};
use crate::error::Error;
use crate::processors::{self, aggregate, flatten, flatten::Nested};
use crate::sources::{AsyncSource, ChannelSource, CursorSource, TokioChannelSource};

/// A lazy, single-consumer sequence of `T`.
///
/// # Examples
///
/// ```rust
/// use lazyflow::Stream;
///
/// let words = Stream::of(vec!["a", "b", "c", "d"])
///     .map(|s| s.to_uppercase())
///     .filter(|s| s != "C")
///     .result();
/// assert_eq!(words, vec!["A", "B", "D"]);
/// ```
pub struct Stream<T> {
    state: State<T>,
}

enum State<T> {
    Absent,
    Live(Pipe<T>),
}

struct Pipe<T> {
    next: Next<T>,
    ctx: Rc<Context>,
    memo: Option<Vec<T>>,
}

impl<T: 'static> Stream<T> {
    /// The absent sentinel: empty, with no known element type.
    ///
    /// Transformations on it return the sentinel again, except the binary
    /// ones (`union`, `append`, `prepend`) where the other operand decides.
    pub fn absent() -> Self {
        Self {
            state: State::Absent,
        }
    }

    pub(crate) fn live(next: Next<T>, ctx: Rc<Context>) -> Self {
        Self {
            state: State::Live(Pipe {
                next,
                ctx,
                memo: None,
            }),
        }
    }

    /// An empty stream whose context already carries `err`.
    pub(crate) fn faulted(err: Error) -> Self {
        let ctx = Context::root();
        ctx.set_err(err);
        Self::live(iter::empty(), ctx)
    }

    /// A stream over the elements of `items`.
    pub fn of(items: Vec<T>) -> Self {
        Self::from_iter(items)
    }

    /// A stream that pulls lazily from any iterator.
    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Self::live(iter::from_iter(items), Context::root())
    }

    /// A stream over a generator; `None` ends it.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut() -> Option<T> + 'static,
    {
        Self::live(Box::new(f), Context::root())
    }

    /// A stream over any [`Source`].
    ///
    /// If the source stops because of a fault, the fault is recorded in the
    /// stream's context.
    pub fn from_source<S>(mut source: S) -> Self
    where
        S: Source<Item = T> + 'static,
    {
        let ctx = Context::root();
        let sink = ctx.clone();
        let mut done = false;
        let next: Next<T> = Box::new(move || {
            if done {
                return None;
            }
            let item = source.next();
            if item.is_none() {
                done = true;
                if let Some(err) = source.take_error() {
                    sink.set_err(err);
                }
            }
            item
        });
        Self::live(next, ctx)
    }

    /// A stream over a std channel; it ends once every sender is dropped.
    pub fn from_channel(rx: mpsc::Receiver<T>) -> Self {
        Self::from_source(ChannelSource::new(rx))
    }

    /// A stream over a tokio channel, read with blocking receives.
    ///
    /// Must not be pulled from inside an async runtime worker.
    pub fn from_tokio_channel(rx: tokio::sync::mpsc::Receiver<T>) -> Self {
        Self::from_source(TokioChannelSource::new(rx))
    }

    /// A stream over an async stream, driven on the calling thread.
    pub fn from_async<S>(stream: S) -> Self
    where
        S: futures_core::Stream<Item = T> + Unpin + 'static,
    {
        Self::from_source(AsyncSource::new(stream))
    }

    /// A stream over the rows of a [`Cursor`], each decoded row passed
    /// through `f`.
    ///
    /// A row that fails to scan ends the stream with that fault.
    pub fn from_cursor<C>(cursor: C, f: MapFn<C::Row, T>) -> Self
    where
        C: Cursor + 'static,
    {
        Stream::from_source(CursorSource::new(cursor)).map_with(f)
    }

    /// Whether this is the absent sentinel.
    pub fn is_absent(&self) -> bool {
        matches!(self.state, State::Absent)
    }

    /// A rendering of the element type, or `None` for the absent sentinel.
    pub fn elem_type(&self) -> Option<&'static str> {
        match self.state {
            State::Absent => None,
            State::Live(_) => Some(std::any::type_name::<T>()),
        }
    }

    /// Split into the pull function and context, replaying any memo first.
    ///
    /// A memo of a faulted stream is replayed under a fresh context that
    /// only receives the fault once the memo is drained, so stages derived
    /// from it still see the prefix produced before the fault.
    fn into_parts(self) -> Option<(Next<T>, Rc<Context>)> {
        let State::Live(Pipe { next, ctx, memo }) = self.state else {
            return None;
        };
        let Some(items) = memo else {
            return Some((next, ctx));
        };
        let Some(err) = ctx.err().cloned() else {
            return Some((iter::replay(items, next), ctx));
        };
        let replay_ctx = Context::root();
        let sink = replay_ctx.clone();
        let mut pending = Some(err);
        let tail: Next<T> = Box::new(move || {
            if let Some(err) = pending.take() {
                sink.set_err(err);
            }
            None
        });
        Some((iter::replay(items, tail), replay_ctx))
    }

    pub(crate) fn into_pull(self) -> Pull<T> {
        match self.into_parts() {
            Some((next, ctx)) => Pull::new(next, Some(ctx)),
            None => Pull::empty(),
        }
    }

    /// Derive a new stage from this one; the absent sentinel stays absent.
    fn stage<R, F>(self, build: F) -> Stream<R>
    where
        R: 'static,
        F: FnOnce(Next<T>, &Rc<Context>) -> Next<R>,
    {
        match self.into_parts() {
            Some((next, parent)) => derived(next, &parent, build),
            None => Stream::absent(),
        }
    }

    /// Map every element.
    pub fn map<R, F>(self, f: F) -> Stream<R>
    where
        R: 'static,
        F: FnMut(T) -> R + 'static,
    {
        self.map_with(MapFn::plain(f))
    }

    /// Map and filter in one pass: elements whose flag is `false` are dropped.
    pub fn map_keep<R, F>(self, f: F) -> Stream<R>
    where
        R: 'static,
        F: FnMut(T) -> (R, bool) + 'static,
    {
        self.map_with(MapFn::keep(f))
    }

    /// Map and filter in one pass: `None` results are dropped.
    pub fn filter_map<R, F>(self, f: F) -> Stream<R>
    where
        R: 'static,
        F: FnMut(T) -> Option<R> + 'static,
    {
        self.map_with(MapFn::optional(f))
    }

    /// Map with a fallible function.
    ///
    /// The first `Err` is recorded in the stream's context and ends the
    /// pipeline; elements already produced remain visible to the consumer.
    pub fn try_map<R, E, F>(self, f: F) -> Stream<R>
    where
        R: 'static,
        E: Into<Error>,
        F: FnMut(T) -> Result<R, E> + 'static,
    {
        self.map_with(MapFn::fallible(f))
    }

    /// Map with a function in any of the supported shapes.
    pub fn map_with<R: 'static>(self, f: MapFn<T, R>) -> Stream<R> {
        self.stage(move |next, ctx| processors::map(next, f, ctx))
    }

    /// Map every element to a nested sequence and flatten the result.
    pub fn flat_map<N, F>(self, f: F) -> Stream<N::Item>
    where
        N: Nested,
        F: FnMut(T) -> N + 'static,
    {
        self.map(f).flatten()
    }

    /// Like [`flat_map`](Self::flat_map) with a function in any supported
    /// shape. Dropped outer elements contribute nothing; a fault halts.
    pub fn flat_map_with<N: Nested>(self, f: MapFn<T, N>) -> Stream<N::Item> {
        self.map_with(f).flatten()
    }

    /// Keep the elements matching the predicate.
    ///
    /// ```rust
    /// use lazyflow::Stream;
    ///
    /// let even = Stream::of(vec![1, 2, 3, 4]).filter(|x| x % 2 == 0).result();
    /// assert_eq!(even, vec![2, 4]);
    /// ```
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + 'static,
    {
        self.stage(move |next, _| processors::filter(next, predicate))
    }

    /// Drop the elements matching the predicate.
    pub fn reject<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + 'static,
    {
        self.filter(move |item| !predicate(item))
    }

    /// Observe each element as it is pulled.
    pub fn foreach<F>(self, mut f: F) -> Self
    where
        F: FnMut(&T) + 'static,
    {
        self.foreach_indexed(move |item, _| f(item))
    }

    /// Observe each element together with its position.
    pub fn foreach_indexed<F>(self, f: F) -> Self
    where
        F: FnMut(&T, usize) + 'static,
    {
        self.stage(move |next, _| processors::foreach(next, f))
    }

    /// Pass at most `n` elements. Upstream is not pulled past the last one.
    pub fn take(self, n: usize) -> Self {
        self.stage(move |next, _| processors::take(next, n))
    }

    /// Pass elements until the predicate first fails; nothing after that.
    pub fn take_while<F>(self, predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + 'static,
    {
        self.stage(move |next, _| processors::take_while(next, predicate))
    }

    /// Drop the first `n` elements.
    pub fn skip(self, n: usize) -> Self {
        self.stage(move |next, _| processors::skip(next, n))
    }

    /// Drop leading elements while the predicate holds.
    pub fn skip_while<F>(self, predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + 'static,
    {
        self.stage(move |next, _| processors::skip_while(next, predicate))
    }

    /// Group consecutive elements into batches of `size`; the last batch may
    /// be shorter.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn partition(self, size: usize) -> Stream<Vec<T>> {
        assert!(size > 0, "partition size must be positive");
        self.stage(move |next, _| processors::partition(next, size))
    }

    /// Start a new batch after every element matching `splitter`.
    ///
    /// The matching element closes its batch when `include_splitter` is set
    /// and is dropped otherwise.
    pub fn partition_by<F>(self, splitter: F, include_splitter: bool) -> Stream<Vec<T>>
    where
        F: FnMut(&T) -> bool + 'static,
    {
        self.stage(move |next, _| processors::partition_by(next, splitter, include_splitter))
    }

    /// Stable sort with a comparator. Blocks until upstream is exhausted.
    pub fn sort_by<F>(self, compare: F) -> Self
    where
        F: FnMut(&T, &T) -> Ordering + 'static,
    {
        self.stage(move |next, _| aggregate::sort_by(next, compare))
    }

    /// Stable sort by a projected key. Blocks until upstream is exhausted.
    pub fn sort_by_key<K, F>(self, key: F) -> Self
    where
        K: Ord + 'static,
        F: FnMut(&T) -> K + 'static,
    {
        self.stage(move |next, _| aggregate::sort_by_key(next, key))
    }

    /// Keep the first element of every distinct key.
    pub fn uniq_by<K, F>(self, key: F) -> Self
    where
        K: Hash + Eq + 'static,
        F: FnMut(&T) -> K + 'static,
    {
        self.stage(move |next, _| aggregate::uniq_by(next, key))
    }

    /// Reverse the order. Blocks until upstream is exhausted.
    pub fn reverse(self) -> Self {
        self.stage(|next, _| aggregate::reverse(next))
    }
}

impl<T: Ord + 'static> Stream<T> {
    /// Stable sort by the natural order. Blocks until upstream is exhausted.
    pub fn sort(self) -> Self {
        self.stage(|next, _| aggregate::sort(next))
    }
}

impl<T: Hash + Eq + Clone + 'static> Stream<T> {
    /// Keep the first occurrence of every element.
    pub fn uniq(self) -> Self {
        self.uniq_by(T::clone)
    }
}

impl<T: Nested> Stream<T> {
    /// Expand one level of nesting.
    ///
    /// Inner streams that are the absent sentinel are skipped. For a stream
    /// of streams the outer sequence is read ahead, at construction, up to the
    /// first live inner stream; if there is none the result is the absent
    /// sentinel.
    pub fn flatten(self) -> Stream<T::Item> {
        let Some((next, parent)) = self.into_parts() else {
            return Stream::absent();
        };
        let next = if T::PROBE {
            match flatten::probe(next) {
                Some(next) => next,
                None if parent.has_err() => {
                    return Stream::live(iter::empty(), Context::child(&parent));
                }
                None => return Stream::absent(),
            }
        } else {
            next
        };
        derived(next, &parent, flatten::flatten)
    }
}

impl<T: 'static> Nested for Stream<T> {
    type Item = T;
    const PROBE: bool = true;

    fn is_absent(&self) -> bool {
        Stream::is_absent(self)
    }

    fn into_pull(self) -> Pull<T> {
        Stream::into_pull(self)
    }
}

/// Build a child stage of `parent`.
///
/// A stage derived from an already faulted context never reads upstream.
fn derived<T, R, F>(next: Next<T>, parent: &Rc<Context>, build: F) -> Stream<R>
where
    T: 'static,
    R: 'static,
    F: FnOnce(Next<T>, &Rc<Context>) -> Next<R>,
{
    let ctx = Context::child(parent);
    let next = if ctx.has_err() {
        iter::empty()
    } else {
        build(next, &ctx)
    };
    Stream::live(next, ctx)
}

impl<T: 'static> Default for Stream<T> {
    fn default() -> Self {
        Self::absent()
    }
}

impl<T: 'static> FromIterator<T> for Stream<T> {
    fn from_iter<I: IntoIterator<Item = T>>(items: I) -> Self {
        Stream::of(items.into_iter().collect())
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Absent => write!(f, "Stream::Absent"),
            State::Live(pipe) => f
                .debug_struct("Stream")
                .field("elem_type", &std::any::type_name::<T>())
                .field("memoized", &pipe.memo.as_ref().map(Vec::len))
                .field("err", &pipe.ctx.err())
                .finish(),
        }
    }
}
