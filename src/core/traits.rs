//! Core traits for the pull-based pipeline engine.
//!
//! This module defines the contract every data source satisfies so that it
//! can feed a [`Stream`](crate::stream::Stream) or a
//! [`KVStream`](crate::kvstream::KVStream).

use crate::error::{Error, Result};
use crate::kvstream::KVStream;
use crate::stream::Stream;

/// A source produces elements one at a time, on demand.
///
/// Sources are stateful and single-pass; they are not required to be
/// restartable. Returning `None` signals exhaustion.
///
/// # Examples
///
/// ```rust
/// use lazyflow::core::Source;
///
/// struct CounterSource {
///     current: u64,
///     max: u64,
/// }
///
/// impl Source for CounterSource {
///     type Item = u64;
///
///     fn next(&mut self) -> Option<Self::Item> {
///         if self.current < self.max {
///             self.current += 1;
///             Some(self.current)
///         } else {
///             None // Signal completion
///         }
///     }
/// }
/// ```
pub trait Source {
    /// The type of elements this source generates
    type Item: 'static;

    /// Produce the next element, or `None` if the source is exhausted.
    fn next(&mut self) -> Option<Self::Item>;

    /// A rendering of the element type.
    fn elem_type(&self) -> &'static str {
        std::any::type_name::<Self::Item>()
    }

    /// Take the fault that ended this source early, if any.
    ///
    /// Called once after `next` returns `None`; the fault is recorded into
    /// the pipeline's context.
    fn take_error(&mut self) -> Option<Error> {
        None
    }
}

/// A source of key-value pairs.
pub trait KVSource {
    /// The key type
    type Key: 'static;
    /// The value type
    type Value: 'static;

    /// Produce the next pair, or `None` if the source is exhausted.
    fn next(&mut self) -> Option<(Self::Key, Self::Value)>;

    /// Renderings of the key and value types.
    fn elem_type(&self) -> (&'static str, &'static str) {
        (
            std::any::type_name::<Self::Key>(),
            std::any::type_name::<Self::Value>(),
        )
    }
}

/// A row cursor, such as a database result set.
///
/// `advance` moves to the next row and reports whether one exists; `scan`
/// decodes the current row. A cursor is read through a
/// [`CursorSource`](crate::sources::CursorSource) or
/// [`Stream::from_cursor`].
pub trait Cursor {
    /// The decoded row type
    type Row: 'static;

    /// Move to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> bool;

    /// Decode the row the cursor is positioned on.
    fn scan(&mut self) -> Result<Self::Row>;
}

/// Extension trait turning any source into a pipeline.
pub trait SourceExt: Source {
    /// Wrap this source in a [`Stream`].
    fn into_stream(self) -> Stream<Self::Item>
    where
        Self: Sized + 'static,
    {
        Stream::from_source(self)
    }
}

impl<S: Source> SourceExt for S {}

/// Extension trait turning any key-value source into a [`KVStream`].
pub trait KVSourceExt: KVSource {
    /// Wrap this source in a [`KVStream`].
    fn into_kv_stream(self) -> KVStream<Self::Key, Self::Value>
    where
        Self: Sized + 'static,
        Self::Key: std::hash::Hash + Eq,
    {
        KVStream::from_source(self)
    }
}

impl<S: KVSource> KVSourceExt for S {}
