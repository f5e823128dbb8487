//! Operations combining a stream with other streams or projecting it into a
//! [`KVStream`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use super::{derived, Stream};
use crate::core::context::Context;
use crate::core::iter::{self, Next};
use crate::kvstream::KVStream;
use crate::processors;

/// A consumer of one branch of [`Stream::branch`].
pub type StreamProcessor<T> = Box<dyn FnOnce(Stream<T>)>;

impl<T: 'static> Stream<T> {
    /// Emit every element of `self`, then every element of `other`.
    ///
    /// An absent operand contributes nothing, so the other one is returned.
    pub fn union(self, other: Stream<T>) -> Self {
        if other.is_absent() {
            return self;
        }
        if self.is_absent() {
            return other;
        }
        let tail = other.into_pull();
        self.stage(move |next, ctx| processors::chain(next, tail, ctx))
    }

    /// Emit `item` after the last element.
    pub fn append(self, item: T) -> Self {
        self.append_all(vec![item])
    }

    /// Emit `items` after the last element.
    pub fn append_all(self, items: Vec<T>) -> Self {
        if self.is_absent() {
            return Stream::of(items);
        }
        if !items.is_empty() {
            tracing::trace!(count = items.len(), "appending elements");
        }
        let tail = iter::Pull::from_iter(items);
        self.stage(move |next, ctx| processors::chain(next, tail, ctx))
    }

    /// Emit `item` before the first element.
    pub fn prepend(self, item: T) -> Self {
        self.prepend_all(vec![item])
    }

    /// Emit `items`, in order, before the first element.
    pub fn prepend_all(self, items: Vec<T>) -> Self {
        if self.is_absent() {
            return Stream::of(items);
        }
        self.stage(move |next, _| processors::prepend(next, items))
    }

    /// Combine elements pairwise; the result ends with the shorter stream.
    ///
    /// Zipping with the absent sentinel yields the absent sentinel.
    pub fn zip<U, R, F>(self, other: Stream<U>, f: F) -> Stream<R>
    where
        U: 'static,
        R: 'static,
        F: FnMut(T, U) -> R + 'static,
    {
        if other.is_absent() {
            return Stream::absent();
        }
        let other = other.into_pull();
        self.stage(move |next, ctx| processors::zip(next, other, f, ctx))
    }

    /// Combine one element of `self` and of every stream in `others`.
    ///
    /// `f` receives the elements in operand order, `self` first. The result
    /// ends with the shortest operand and is absent if any operand is.
    pub fn zip_n<R, F>(self, others: Vec<Stream<T>>, f: F) -> Stream<R>
    where
        R: 'static,
        F: FnMut(Vec<T>) -> R + 'static,
    {
        if others.iter().any(Stream::is_absent) {
            return Stream::absent();
        }
        self.stage(move |next, ctx| {
            let mut pulls = Vec::with_capacity(others.len() + 1);
            pulls.push(iter::Pull::new(next, None));
            pulls.extend(others.into_iter().map(Stream::into_pull));
            processors::zip_n(pulls, f, ctx)
        })
    }

    /// Keep the elements whose key, under `key`, is not found in `other`.
    ///
    /// `other` is indexed once, on the first pull.
    pub fn sub_by<K, F>(self, other: Stream<T>, key: F) -> Self
    where
        K: Hash + Eq + 'static,
        F: Fn(&T) -> K + 'static,
    {
        if other.is_absent() {
            return self;
        }
        let key = Rc::new(key);
        let index_key = key.clone();
        self.select(
            move || other.to_set_by(move |item| index_key(item)),
            move |set, item| set.contains(&key(item)),
            false,
        )
    }

    /// Keep the elements whose key, under `key`, is found in `other`.
    ///
    /// Intersecting with the absent sentinel yields the absent sentinel.
    pub fn interact_by<K, F>(self, other: Stream<T>, key: F) -> Self
    where
        K: Hash + Eq + 'static,
        F: Fn(&T) -> K + 'static,
    {
        if other.is_absent() {
            return Stream::absent();
        }
        let key = Rc::new(key);
        let index_key = key.clone();
        self.select(
            move || other.to_set_by(move |item| index_key(item)),
            move |set, item| set.contains(&key(item)),
            true,
        )
    }

    /// Index the elements by `key`; a later element replaces an earlier one
    /// with the same key.
    pub fn to_set_by<K, F>(self, mut key: F) -> KVStream<K, T>
    where
        K: Hash + Eq + 'static,
        F: FnMut(&T) -> K + 'static,
    {
        self.to_set_by_pair(move |item| (key(&item), item))
    }

    /// Build a map from the pairs produced by `f`; the last write per key wins.
    pub fn to_set_by_pair<K, V, F>(self, mut f: F) -> KVStream<K, V>
    where
        K: Hash + Eq + 'static,
        V: 'static,
        F: FnMut(T) -> (K, V) + 'static,
    {
        self.into_table(move |mut next| {
            let mut table = HashMap::new();
            while let Some(item) = next() {
                let (k, v) = f(item);
                table.insert(k, v);
            }
            table
        })
    }

    /// Group the elements by `key`, keeping their order inside each group.
    pub fn group_by<K, F>(self, mut key: F) -> KVStream<K, Vec<T>>
    where
        K: Hash + Eq + 'static,
        F: FnMut(&T) -> K + 'static,
    {
        self.into_table(move |mut next| {
            let mut table: HashMap<K, Vec<T>> = HashMap::new();
            while let Some(item) = next() {
                table.entry(key(&item)).or_default().push(item);
            }
            table
        })
    }

    fn into_table<K, V, F>(self, build: F) -> KVStream<K, V>
    where
        K: Hash + Eq + 'static,
        V: 'static,
        F: FnOnce(Next<T>) -> HashMap<K, V> + 'static,
    {
        match self.into_parts() {
            Some((next, parent)) => KVStream::deferred(Context::child(&parent), move || build(next)),
            None => KVStream::absent(),
        }
    }

    /// Keep the elements whose membership in an index equals `keep`.
    ///
    /// The index is built by `build` on the first pull. A fault recorded
    /// while building it is forwarded into this stage and ends it.
    fn select<K, V, B, M>(self, build: B, mut member: M, keep: bool) -> Self
    where
        K: Hash + Eq + 'static,
        V: 'static,
        B: FnOnce() -> KVStream<K, V> + 'static,
        M: FnMut(&KVStream<K, V>, &T) -> bool + 'static,
    {
        self.stage(move |mut next, ctx| {
            let ctx = ctx.clone();
            let mut build = Some(build);
            let mut index: Option<KVStream<K, V>> = None;
            Box::new(move || {
                if let Some(build) = build.take() {
                    tracing::trace!("building set index");
                    let set = build();
                    if let Some(err) = set.error() {
                        ctx.set_err(err);
                    }
                    index = Some(set);
                }
                if ctx.has_err() {
                    return None;
                }
                let set = index.as_ref()?;
                loop {
                    let item = next()?;
                    if member(set, &item) == keep {
                        return Some(item);
                    }
                }
            })
        })
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Feed this stream to several processors.
    ///
    /// Processors run in order. Elements pulled by one are buffered, so every
    /// later processor sees the whole stream. Not meant for unbounded input.
    pub fn branch(self, processors: Vec<StreamProcessor<T>>) {
        let mut processors = processors.into_iter();
        if processors.len() == 1 {
            if let Some(processor) = processors.next() {
                processor(self);
            }
            return;
        }
        let Some((live, ctx)) = self.into_parts() else {
            processors.for_each(|processor| processor(Stream::absent()));
            return;
        };
        let shared = Rc::new(RefCell::new(Shared {
            seen: Vec::new(),
            live,
        }));
        for processor in processors {
            let next = branch_reader(shared.clone());
            processor(derived(next, &ctx, |next, _| next));
        }
    }
}

struct Shared<T> {
    seen: Vec<T>,
    live: Next<T>,
}

fn branch_reader<T: Clone + 'static>(shared: Rc<RefCell<Shared<T>>>) -> Next<T> {
    let mut cursor = 0;
    Box::new(move || {
        let mut guard = shared.borrow_mut();
        let state = &mut *guard;
        let item = match state.seen.get(cursor) {
            Some(item) => item.clone(),
            None => {
                let item = (state.live)()?;
                state.seen.push(item.clone());
                item
            }
        };
        cursor += 1;
        Some(item)
    })
}

impl<T: Hash + Eq + 'static> Stream<T> {
    /// Keep the elements not found in `other`.
    ///
    /// Subtracting the absent sentinel leaves the stream unchanged.
    pub fn sub(self, other: Stream<T>) -> Self {
        if other.is_absent() {
            return self;
        }
        self.select(move || other.to_set(), |set, item| set.contains(item), false)
    }

    /// Keep the elements found in `other`.
    ///
    /// Intersecting with the absent sentinel yields the absent sentinel.
    pub fn interact(self, other: Stream<T>) -> Self {
        if other.is_absent() {
            return Stream::absent();
        }
        self.select(move || other.to_set(), |set, item| set.contains(item), true)
    }

    /// Collect the distinct elements into a set-like [`KVStream`].
    pub fn to_set(self) -> KVStream<T, ()> {
        self.to_set_by_pair(|item| (item, ()))
    }
}
