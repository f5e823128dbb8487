//! Terminal reads and repeatable inspections.

use super::{Pipe, State, Stream};
use crate::core::iter::{self, drain, IntoIter};
use crate::error::{Error, Result};
use crate::sources::StreamSource;
use crate::value::Value;

impl<T: 'static> Stream<T> {
    fn pipe_mut(&mut self) -> Option<&mut Pipe<T>> {
        match &mut self.state {
            State::Live(pipe) => Some(pipe),
            State::Absent => None,
        }
    }

    /// The fault recorded so far, without pulling anything.
    pub(crate) fn fault(&self) -> Option<Error> {
        match &self.state {
            State::Live(pipe) => pipe.ctx.err().cloned(),
            State::Absent => None,
        }
    }

    /// Materialize every remaining element into the memo.
    fn memoize(&mut self) -> Option<&Vec<T>> {
        let Pipe { next, memo, .. } = self.pipe_mut()?;
        Some(memo.get_or_insert_with(|| {
            let items = drain(next);
            tracing::trace!(count = items.len(), "memoized stream");
            items
        }))
    }

    /// Show elements to `f` while it returns `true`, without consuming them.
    fn inspect<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        let Some(pipe) = self.pipe_mut() else {
            return;
        };
        match &pipe.memo {
            Some(items) => {
                for item in items {
                    if !f(item) {
                        break;
                    }
                }
            }
            None => {
                let next = std::mem::replace(&mut pipe.next, iter::empty());
                pipe.next = iter::repeatable(next, f);
            }
        }
    }

    /// The first element. It stays in the stream for later reads.
    pub fn first(&mut self) -> Value<T>
    where
        T: Clone,
    {
        let mut found = None;
        self.inspect(|item| {
            found = Some(item.clone());
            false
        });
        Value::new(found, self.fault())
    }

    /// Whether the stream has no elements. Nothing is consumed.
    pub fn is_empty(&mut self) -> bool {
        let mut seen = false;
        self.inspect(|_| {
            seen = true;
            false
        });
        !seen
    }

    /// Whether there is at least one element. It is kept for later reads.
    pub fn has_something(&mut self) -> bool {
        !self.is_empty()
    }

    /// Same as [`has_something`](Self::has_something).
    pub fn exists(&mut self) -> bool {
        !self.is_empty()
    }

    /// Whether some element equals `target`.
    ///
    /// Elements read while searching stay in the stream.
    pub fn contains(&mut self, target: &T) -> bool
    where
        T: PartialEq,
    {
        self.contains_by(|item| item == target)
    }

    /// Whether some element matches the predicate.
    ///
    /// Elements read while searching stay in the stream.
    pub fn contains_by<F>(&mut self, mut predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let mut found = false;
        self.inspect(|item| {
            found = predicate(item);
            !found
        });
        found
    }

    /// Number of elements. The elements are kept for later reads.
    pub fn size(&mut self) -> usize {
        self.memoize().map_or(0, Vec::len)
    }

    /// Same as [`size`](Self::size).
    pub fn count(&mut self) -> usize {
        self.size()
    }

    /// Drain the stream, dropping the elements.
    pub fn run(&mut self) {
        if let Some(pipe) = self.pipe_mut() {
            if pipe.memo.is_none() {
                while (pipe.next)().is_some() {}
            }
        }
    }

    /// Drain the stream and return the first recorded fault.
    ///
    /// The elements are kept, so a later [`result`](Self::result) still sees
    /// the prefix produced before the fault.
    pub fn error(&mut self) -> Option<Error> {
        self.memoize();
        self.fault()
    }

    /// Fold every element into an accumulator.
    pub fn reduce<A, F>(self, init: A, mut f: F) -> Value<A>
    where
        F: FnMut(A, T) -> A,
    {
        let Some((mut next, ctx)) = self.into_parts() else {
            return Value::of(init);
        };
        let mut acc = init;
        while let Some(item) = next() {
            acc = f(acc, item);
        }
        Value::new(Some(acc), ctx.err().cloned())
    }

    /// Fold using the first element as the accumulator.
    pub fn reduce0<F>(self, mut f: F) -> Value<T>
    where
        F: FnMut(T, T) -> T,
    {
        let Some((mut next, ctx)) = self.into_parts() else {
            return Value::empty();
        };
        let Some(mut acc) = next() else {
            return Value::new(None, ctx.err().cloned());
        };
        while let Some(item) = next() {
            acc = f(acc, item);
        }
        Value::new(Some(acc), ctx.err().cloned())
    }

    /// Collect every element.
    pub fn result(self) -> Vec<T> {
        match self.into_parts() {
            Some((mut next, _)) => drain(&mut next),
            None => Vec::new(),
        }
    }

    /// Collect every element, failing if a fault was recorded.
    pub fn try_result(self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        self.to_slice(&mut items)?;
        Ok(items)
    }

    /// Replace the contents of `dst` with every element.
    ///
    /// On a fault `dst` still holds the prefix produced before it.
    pub fn to_slice(self, dst: &mut Vec<T>) -> Result<()> {
        dst.clear();
        let Some((mut next, ctx)) = self.into_parts() else {
            return Ok(());
        };
        dst.extend(std::iter::from_fn(|| next()));
        match ctx.err() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Expose the stream as a [`Source`](crate::core::Source).
    pub fn into_source(self) -> StreamSource<T> {
        StreamSource::new(self.into_pull())
    }

    /// Expose the stream as an async stream.
    ///
    /// Each poll pulls synchronously, so blocking sources block the task.
    pub fn into_async(self) -> futures::stream::Iter<IntoIter<T>> {
        futures::stream::iter(self)
    }
}

impl<T: 'static> IntoIterator for Stream<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        let next = match self.into_parts() {
            Some((next, _)) => next,
            None => iter::empty(),
        };
        IntoIter { next }
    }
}

impl<U: 'static> Stream<Result<U>> {
    /// The first `Err` element, or else the first recorded fault.
    ///
    /// Elements read while searching stay in the stream.
    pub fn first_error(&mut self) -> Option<Error> {
        let mut found = None;
        self.inspect(|item| match item {
            Ok(_) => true,
            Err(err) => {
                found = Some(err.clone());
                false
            }
        });
        found.or_else(|| self.fault())
    }
}

impl<T: Into<String> + 'static> Stream<T> {
    /// Collect the elements as owned strings.
    pub fn strings(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }

    /// Concatenate the elements with `sep` between them.
    pub fn join_strings(self, sep: &str) -> String {
        self.strings().join(sep)
    }
}

impl<T: Into<i64> + 'static> Stream<T> {
    /// Collect the elements widened to `i64`.
    pub fn ints(self) -> Vec<i64> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<f64> + 'static> Stream<T> {
    /// Collect the elements widened to `f64`.
    pub fn floats(self) -> Vec<f64> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<u8> + 'static> Stream<T> {
    /// Collect the elements as bytes.
    pub fn bytes(self) -> Vec<u8> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T, S> Stream<T>
where
    T: IntoIterator<Item = S> + 'static,
    S: Into<String>,
{
    /// Collect nested string sequences, such as the batches of a partition.
    pub fn strings_list(self) -> Vec<Vec<String>> {
        self.into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect()
    }
}
