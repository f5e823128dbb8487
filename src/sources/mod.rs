//! Source implementations for the lazyflow engine.
//!
//! This module provides concrete sources that feed pipelines: iterators,
//! generator closures, channels, row cursors, counters, line readers,
//! timers, async streams, and key-value pair sources.

use std::io::BufRead;
use std::ops::RangeInclusive;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use futures::executor::BlockingStream;

use crate::core::iter::Pull;
use crate::core::traits::{Cursor, KVSource, Source};
use crate::error::Error;
use crate::stream::Stream;

/// A source that yields the items of any iterator
pub struct IterSource<I> {
    iter: I,
}

impl<I: Iterator> IterSource<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(items: T) -> Self {
        Self {
            iter: items.into_iter(),
        }
    }
}

impl<I> Source for IterSource<I>
where
    I: Iterator,
    I::Item: 'static,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

/// A source driven by a generator closure; `None` ends it
pub struct FnSource<F> {
    f: F,
}

impl<F> FnSource<F> {
    /// Create a source that calls `f` for each element until it returns `None`
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, T> Source for FnSource<F>
where
    F: FnMut() -> Option<T>,
    T: 'static,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        (self.f)()
    }
}

/// A source over a std channel receiver.
///
/// Each pull blocks until a value arrives; the source ends once every sender
/// is dropped.
pub struct ChannelSource<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> ChannelSource<T> {
    /// Create a source draining `rx`
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self { rx }
    }
}

impl<T: 'static> Source for ChannelSource<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.recv().ok()
    }
}

/// A source over a tokio channel receiver, read with `blocking_recv`.
///
/// Pulling from it inside an async runtime worker panics, as
/// `blocking_recv` does; feed it from a runtime and pull from a plain thread.
pub struct TokioChannelSource<T> {
    rx: tokio::sync::mpsc::Receiver<T>,
}

impl<T> TokioChannelSource<T> {
    /// Create a source draining `rx` with blocking receives
    pub fn new(rx: tokio::sync::mpsc::Receiver<T>) -> Self {
        Self { rx }
    }
}

impl<T: 'static> Source for TokioChannelSource<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }
}

/// A source over an async stream, polled to completion on the calling thread
pub struct AsyncSource<S: futures_core::Stream + Unpin> {
    inner: BlockingStream<S>,
}

impl<S: futures_core::Stream + Unpin> AsyncSource<S> {
    /// Create a source driving `stream` on the calling thread
    pub fn new(stream: S) -> Self {
        Self {
            inner: futures::executor::block_on_stream(stream),
        }
    }
}

impl<S> Source for AsyncSource<S>
where
    S: futures_core::Stream + Unpin,
    S::Item: 'static,
{
    type Item = S::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// A source reading the rows of a [`Cursor`]
///
/// A row that fails to scan ends the source; the scan error becomes the
/// stream's fault.
pub struct CursorSource<C> {
    cursor: C,
    error: Option<Error>,
    done: bool,
}

impl<C: Cursor> CursorSource<C> {
    /// Create a source reading every row of `cursor`
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            error: None,
            done: false,
        }
    }
}

impl<C: Cursor> Source for CursorSource<C> {
    type Item = C::Row;

    fn next(&mut self) -> Option<C::Row> {
        if self.done || !self.cursor.advance() {
            self.done = true;
            return None;
        }
        match self.cursor.scan() {
            Ok(row) => Some(row),
            Err(err) => {
                tracing::debug!(error = %err, "cursor scan failed");
                self.error = Some(err);
                self.done = true;
                None
            }
        }
    }

    fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

/// A source counting up through an inclusive range of `i64`
pub struct CounterSource {
    range: RangeInclusive<i64>,
}

impl CounterSource {
    /// Yield `0, 1, ..., count - 1`
    pub fn new(count: i64) -> Self {
        Self {
            range: 0..=count.saturating_sub(1),
        }
    }

    /// Yield `from, from + 1, ..., to`, both ends included
    pub fn range(from: i64, to: i64) -> Self {
        Self { range: from..=to }
    }
}

impl Source for CounterSource {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        self.range.next()
    }
}

/// A source yielding `0, 1, 2, ...` up to and including `u64::MAX`
pub struct NaturalNumbers {
    range: RangeInclusive<u64>,
}

impl NaturalNumbers {
    pub fn new() -> Self {
        Self { range: 0..=u64::MAX }
    }
}

impl Default for NaturalNumbers {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for NaturalNumbers {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.range.next()
    }
}

/// Stream of `0, 1, ..., count - 1`
pub fn times(count: i64) -> Stream<i64> {
    Stream::from_source(CounterSource::new(count))
}

/// Stream of `from, ..., to`, both ends included
pub fn range(from: i64, to: i64) -> Stream<i64> {
    Stream::from_source(CounterSource::range(from, to))
}

/// Stream of the natural numbers
pub fn natural_numbers() -> Stream<u64> {
    Stream::from_source(NaturalNumbers::new())
}

/// Stream of the indexes `0, 1, 2, ...`
pub fn index() -> Stream<usize> {
    natural_numbers().filter_map(|i| usize::try_from(i).ok())
}

/// Configuration for [`LineSource`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSourceConfig {
    /// Trim surrounding whitespace from every line
    pub trim: bool,
    /// Drop lines that are empty (after trimming, if enabled)
    pub skip_empty: bool,
}

impl LineSourceConfig {
    /// Set whether lines are trimmed
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Set whether empty lines are dropped
    pub fn skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }
}

/// A source yielding the lines of a reader, without line terminators.
///
/// A read failure ends the source and is reported through
/// [`Source::take_error`], so a stream over it records the failure.
pub struct LineSource<R> {
    reader: R,
    config: LineSourceConfig,
    err: Option<Error>,
    done: bool,
}

impl<R: BufRead> LineSource<R> {
    /// Create a source yielding each line of `reader` with the line ending removed
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, LineSourceConfig::default())
    }

    /// Read lines with the trimming and filtering in `config`.
    pub fn with_config(reader: R, config: LineSourceConfig) -> Self {
        Self {
            reader,
            config,
            err: None,
            done: false,
        }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(line)
            }
            Err(e) => {
                tracing::warn!(error = %e, "line source read failed");
                self.err = Some(Error::from(e));
                None
            }
        }
    }
}

impl<R: BufRead> Source for LineSource<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.done {
            let Some(line) = self.read_line() else {
                self.done = true;
                break;
            };
            let line = if self.config.trim {
                line.trim().to_string()
            } else {
                line
            };
            if self.config.skip_empty && line.is_empty() {
                continue;
            }
            return Some(line);
        }
        None
    }

    fn take_error(&mut self) -> Option<Error> {
        self.err.take()
    }
}

/// A source yielding `Instant::now()` every `interval`.
///
/// Each pull sleeps the calling thread until the next tick. Without a limit
/// the source never ends.
pub struct TickerSource {
    interval: Duration,
    next_tick: Option<Instant>,
    remaining: Option<usize>,
}

impl TickerSource {
    /// Create a ticker firing every `interval`, with no limit
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: None,
            remaining: None,
        }
    }

    /// Stop after `limit` ticks
    pub fn with_limit(interval: Duration, limit: usize) -> Self {
        Self {
            remaining: Some(limit),
            ..Self::new(interval)
        }
    }
}

impl Source for TickerSource {
    type Item = Instant;

    fn next(&mut self) -> Option<Instant> {
        if let Some(ref mut remaining) = self.remaining {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let due = self
            .next_tick
            .unwrap_or_else(|| Instant::now() + self.interval);
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
        self.next_tick = Some(due + self.interval);
        Some(Instant::now())
    }
}

/// A source that sleeps for `interval` before every element
pub struct DelaySource {
    interval: Duration,
}

impl DelaySource {
    /// Create a delay source
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Source for DelaySource {
    type Item = Instant;

    fn next(&mut self) -> Option<Instant> {
        std::thread::sleep(self.interval);
        Some(Instant::now())
    }
}

/// A source that repeats a single value
pub struct RepeatSource<T> {
    value: T,
    remaining: Option<usize>,
}

impl<T: Clone> RepeatSource<T> {
    /// Repeat a value indefinitely
    pub fn new(value: T) -> Self {
        Self {
            value,
            remaining: None,
        }
    }

    /// Repeat a value `count` times
    pub fn times(value: T, count: usize) -> Self {
        Self {
            value,
            remaining: Some(count),
        }
    }
}

impl<T: Clone + 'static> Source for RepeatSource<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if let Some(ref mut remaining) = self.remaining {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        Some(self.value.clone())
    }
}

/// A source reading a [`Stream`] back out, as returned by
/// [`Stream::into_source`].
pub struct StreamSource<T> {
    pull: Pull<T>,
    reported: bool,
}

impl<T: 'static> StreamSource<T> {
    pub(crate) fn new(pull: Pull<T>) -> Self {
        Self {
            pull,
            reported: false,
        }
    }
}

impl<T: 'static> Source for StreamSource<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.pull.pull()
    }

    fn take_error(&mut self) -> Option<Error> {
        if self.reported {
            return None;
        }
        self.reported = true;
        self.pull.fault()
    }
}

/// A key-value source over any iterator of pairs
pub struct MapSource<I> {
    pairs: I,
}

impl<I: Iterator> MapSource<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(pairs: T) -> Self {
        Self {
            pairs: pairs.into_iter(),
        }
    }
}

impl<I, K, V> KVSource for MapSource<I>
where
    I: Iterator<Item = (K, V)>,
    K: 'static,
    V: 'static,
{
    type Key = K;
    type Value = V;

    fn next(&mut self) -> Option<(K, V)> {
        self.pairs.next()
    }
}
