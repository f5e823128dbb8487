//! Key-value pipelines.
//!
//! A [`KVStream`] is backed by a `HashMap` that is built by a deferred thunk
//! the first time anything reads it, and cached from then on. Transformations
//! chain new thunks, so nothing is built until a read.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::core::context::Context;
use crate::core::traits::KVSource;
use crate::error::Error;
use crate::processors::flatten::Nested;
use crate::stream::Stream;

type Build<K, V> = Box<dyn FnOnce() -> HashMap<K, V>>;

/// A lazily built map from `K` to `V`.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use lazyflow::KVStream;
///
/// let prices = HashMap::from([("apple", 3), ("pear", 5), ("plum", 2)]);
/// let cheap = KVStream::of(prices).filter(|_, price| *price < 4);
/// assert_eq!(cheap.size(), 2);
/// assert!(cheap.contains(&"plum"));
/// ```
pub struct KVStream<K, V> {
    table: Option<Table<K, V>>,
}

struct Table<K, V> {
    build: RefCell<Option<Build<K, V>>>,
    map: OnceCell<HashMap<K, V>>,
    ctx: Rc<Context>,
}

impl<K, V> Table<K, V> {
    fn map(&self) -> &HashMap<K, V> {
        self.map.get_or_init(|| {
            let build = self.build.borrow_mut().take();
            build.map(|build| build()).unwrap_or_default()
        })
    }

    fn into_map(self) -> HashMap<K, V> {
        match self.map.into_inner() {
            Some(map) => map,
            None => self
                .build
                .into_inner()
                .map(|build| build())
                .unwrap_or_default(),
        }
    }
}

impl<K: Hash + Eq + 'static, V: 'static> KVStream<K, V> {
    /// The absent sentinel: no map at all.
    pub fn absent() -> Self {
        Self { table: None }
    }

    /// A stream over an existing map.
    pub fn of(map: HashMap<K, V>) -> Self {
        let table = Table {
            build: RefCell::new(None),
            map: OnceCell::from(map),
            ctx: Context::root(),
        };
        Self { table: Some(table) }
    }

    /// A stream over every pair of a [`KVSource`]; a later pair replaces an
    /// earlier one with the same key.
    pub fn from_source<S>(mut source: S) -> Self
    where
        S: KVSource<Key = K, Value = V> + 'static,
    {
        Self::deferred(Context::root(), move || {
            let mut map = HashMap::new();
            while let Some((k, v)) = source.next() {
                map.insert(k, v);
            }
            map
        })
    }

    /// A stream whose map is built by `build` on first read.
    ///
    /// If `ctx` already carries a fault, `build` never runs and the map is
    /// empty.
    pub(crate) fn deferred<F>(ctx: Rc<Context>, build: F) -> Self
    where
        F: FnOnce() -> HashMap<K, V> + 'static,
    {
        let build: Build<K, V> = if ctx.has_err() {
            tracing::debug!("context already faulted, key-value stream left empty");
            Box::new(HashMap::new)
        } else {
            Box::new(build)
        };
        let table = Table {
            build: RefCell::new(Some(build)),
            map: OnceCell::new(),
            ctx,
        };
        Self { table: Some(table) }
    }

    /// Chain a rebuild of the map; the absent sentinel stays absent.
    fn rebuild<K2, V2, F>(self, f: F) -> KVStream<K2, V2>
    where
        K2: Hash + Eq + 'static,
        V2: 'static,
        F: FnOnce(HashMap<K, V>) -> HashMap<K2, V2> + 'static,
    {
        match self.table {
            Some(table) => {
                let ctx = Context::child(&table.ctx);
                KVStream::deferred(ctx, move || f(table.into_map()))
            }
            None => KVStream::absent(),
        }
    }

    /// Whether this is the absent sentinel.
    pub fn is_absent(&self) -> bool {
        self.table.is_none()
    }

    /// Observe every pair when the map is built.
    pub fn foreach<F>(self, mut f: F) -> Self
    where
        F: FnMut(&K, &V) + 'static,
    {
        self.rebuild(move |map| {
            for (k, v) in &map {
                f(k, v);
            }
            map
        })
    }

    /// Map every pair to a new pair; colliding keys keep the last write.
    pub fn map<K2, V2, F>(self, mut f: F) -> KVStream<K2, V2>
    where
        K2: Hash + Eq + 'static,
        V2: 'static,
        F: FnMut(K, V) -> (K2, V2) + 'static,
    {
        self.rebuild(move |map| map.into_iter().map(|(k, v)| f(k, v)).collect())
    }

    /// Keep the pairs matching the predicate.
    pub fn filter<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&K, &V) -> bool + 'static,
    {
        self.rebuild(move |mut map| {
            map.retain(|k, v| predicate(k, v));
            map
        })
    }

    /// Drop the pairs matching the predicate.
    pub fn reject<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&K, &V) -> bool + 'static,
    {
        self.filter(move |k, v| !predicate(k, v))
    }

    /// Project every pair into one element of a [`Stream`].
    pub fn zip_map<R, F>(self, mut f: F) -> Stream<R>
    where
        R: 'static,
        F: FnMut(K, V) -> R + 'static,
    {
        self.pairs().map(move |(k, v)| f(k, v))
    }

    /// Project every pair into a nested sequence and flatten the result.
    pub fn flat_map<N, F>(self, f: F) -> Stream<N::Item>
    where
        N: Nested,
        F: FnMut(K, V) -> N + 'static,
    {
        self.zip_map(f).flatten()
    }

    /// The keys, read lazily once the map is built.
    pub fn keys(self) -> Stream<K> {
        self.pairs().map(|(k, _)| k)
    }

    /// The values, read lazily once the map is built.
    pub fn values(self) -> Stream<V> {
        self.pairs().map(|(_, v)| v)
    }

    fn pairs(self) -> Stream<(K, V)> {
        let Some(table) = self.table else {
            return Stream::absent();
        };
        let ctx = Context::child(&table.ctx);
        let mut table = Some(table);
        let mut pairs = None;
        Stream::live(
            Box::new(move || {
                if let Some(table) = table.take() {
                    pairs = Some(table.into_map().into_iter());
                }
                pairs.as_mut()?.next()
            }),
            ctx,
        )
    }

    /// Whether `key` is present. Builds the map on first use.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Look up `key` in the built map.
    ///
    /// The map is built once and shared by every later read, so repeated
    /// lookups do not rerun upstream stages. Always `None` for the absent
    /// sentinel.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.as_ref()?.map().get(key)
    }

    /// Number of distinct keys.
    pub fn size(&self) -> usize {
        self.table.as_ref().map_or(0, |table| table.map().len())
    }

    /// The built map; empty for the absent sentinel.
    pub fn result(self) -> HashMap<K, V> {
        self.table.map(Table::into_map).unwrap_or_default()
    }

    /// Build the map and return the fault recorded while building it.
    pub fn error(&self) -> Option<Error> {
        let table = self.table.as_ref()?;
        table.map();
        table.ctx.err().cloned()
    }
}

impl<K: Hash + Eq + 'static, V: 'static> Default for KVStream<K, V> {
    fn default() -> Self {
        Self::absent()
    }
}

impl<K: Hash + Eq + 'static, V: 'static> From<HashMap<K, V>> for KVStream<K, V> {
    fn from(map: HashMap<K, V>) -> Self {
        Self::of(map)
    }
}

impl<K, V> fmt::Debug for KVStream<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            None => write!(f, "KVStream::Absent"),
            Some(table) => f
                .debug_struct("KVStream")
                .field("key_type", &std::any::type_name::<K>())
                .field("value_type", &std::any::type_name::<V>())
                .field("built", &table.map.get().map(HashMap::len))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MapSource;
    use std::cell::Cell;

    fn scores() -> KVStream<&'static str, i32> {
        KVStream::of(HashMap::from([("ann", 7), ("bob", 3), ("cy", 9)]))
    }

    #[test]
    fn test_map_filter_reject() {
        let doubled = scores().map(|k, v| (k.len(), v * 2)).result();
        // "ann" and "bob" collide on length 3
        assert!(matches!(doubled.get(&3), Some(14) | Some(6)));
        assert_eq!(doubled.get(&2), Some(&18));

        let high = scores().filter(|_, v| *v > 5);
        assert_eq!(high.size(), 2);
        assert!(!high.contains(&"bob"));

        let low = scores().reject(|_, v| *v > 5);
        assert_eq!(low.result(), HashMap::from([("bob", 3)]));
    }

    #[test]
    fn test_build_is_deferred_and_cached() {
        let builds = Rc::new(Cell::new(0));
        let counter = builds.clone();
        let kv = scores().foreach(move |_, _| counter.set(counter.get() + 1));

        assert_eq!(builds.get(), 0);
        assert_eq!(kv.size(), 3);
        assert!(kv.contains(&"cy"));
        assert_eq!(kv.get(&"ann"), Some(&7));
        assert_eq!(builds.get(), 3);
    }

    #[test]
    fn test_keys_values_zip_map() {
        let mut keys = scores().keys().result();
        keys.sort();
        assert_eq!(keys, vec!["ann", "bob", "cy"]);

        let total: i32 = scores().values().reduce(0, |acc, v| acc + v).into_inner().unwrap_or(0);
        assert_eq!(total, 19);

        let mut labels = scores().zip_map(|k, v| format!("{}={}", k, v)).result();
        labels.sort();
        assert_eq!(labels, vec!["ann=7", "bob=3", "cy=9"]);
    }

    #[test]
    fn test_flat_map() {
        let mut chars = scores()
            .filter(|k, _| k.len() == 2)
            .flat_map(|k, _| k.chars().collect::<Vec<_>>())
            .result();
        chars.sort();
        assert_eq!(chars, vec!['c', 'y']);
    }

    #[test]
    fn test_absent() {
        let kv: KVStream<i32, i32> = KVStream::absent();
        assert!(kv.is_absent());
        assert_eq!(kv.size(), 0);
        assert!(!kv.contains(&1));
        assert!(kv.error().is_none());
        assert!(kv.keys().is_absent());
    }

    #[test]
    fn test_faulted_context_short_circuits() {
        let ctx = Context::root();
        ctx.set_err(Error::custom("upstream"));
        let kv: KVStream<i32, i32> = KVStream::deferred(ctx, || HashMap::from([(1, 1)]));
        assert_eq!(kv.size(), 0);
        assert_eq!(kv.error(), Some(Error::custom("upstream")));
    }

    #[test]
    fn test_from_source_last_write_wins() {
        let kv = KVStream::from_source(MapSource::new(vec![("a", 1), ("b", 2), ("a", 3)]));
        assert_eq!(kv.get(&"a"), Some(&3));
        assert_eq!(kv.size(), 2);
    }

    #[test]
    fn test_error_from_upstream_stream() {
        let kv = Stream::of(vec![1, 2, 3])
            .try_map(|x| if x == 3 { Err("three") } else { Ok(x) })
            .to_set();
        assert_eq!(kv.error(), Some(Error::custom("three")));
        assert_eq!(kv.size(), 2);
    }
}
