//! A deferred value that may be present, absent, or faulted.
//!
//! A [`Monad`] wraps a thunk returning `Result<Option<T>>`: `Ok(Some(v))` is
//! a present value, `Ok(None)` is absence (not a fault), `Err(e)` is a fault.
//! Combinators chain thunks; nothing runs until a terminal read.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::core::context::Context;
use crate::core::func::MapFn;
use crate::error::{Error, Result};
use crate::stream::Stream;
use crate::value::Value;

type Thunk<T> = Rc<dyn Fn() -> Result<Option<T>>>;

/// A composable present/absent/faulted value.
///
/// Every terminal read evaluates the whole chain again unless it was
/// wrapped with [`once`](Self::once).
///
/// # Examples
///
/// ```rust
/// use lazyflow::{Error, Monad};
///
/// let port = Monad::of("8080")
///     .try_map(|s| s.parse::<u16>().map_err(Error::transform))
///     .expect_pass(|port| *port > 1024)
///     .val();
/// assert_eq!(port.get(), Some(&8080));
/// ```
pub struct Monad<T> {
    thunk: Thunk<T>,
}

impl<T> Clone for Monad<T> {
    fn clone(&self) -> Self {
        Self {
            thunk: self.thunk.clone(),
        }
    }
}

impl<T: Clone + 'static> Monad<T> {
    /// A present value.
    pub fn of(value: T) -> Self {
        Self::from_fn(move || Ok(Some(value.clone())))
    }

    /// A present value if `present` is set, otherwise absence.
    pub fn maybe(value: T, present: bool) -> Self {
        if present {
            Self::of(value)
        } else {
            Self::none()
        }
    }

    /// Present for `Some`, absent for `None`.
    pub fn from_option(value: Option<T>) -> Self {
        Self::from_fn(move || Ok(value.clone()))
    }

    /// Present for `Ok`, faulted for `Err`.
    ///
    /// ```rust
    /// use lazyflow::Monad;
    ///
    /// let parsed = Monad::from_result("42".parse::<i32>().map_err(|e| e.to_string()));
    /// assert_eq!(parsed.map(|n| n + 1).val().into_inner(), Some(43));
    /// ```
    pub fn from_result<E: Into<Error>>(res: std::result::Result<T, E>) -> Self {
        let res = res.map(Some).map_err(Into::into);
        Self::from_fn(move || res.clone())
    }

    /// Absence.
    pub fn none() -> Self {
        Self::from_fn(|| Ok(None))
    }

    /// A fault. Every combinator passes it through untouched.
    pub fn fault(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self::from_fn(move || Err(err.clone()))
    }

    /// A monad evaluated by calling `f` at every terminal read.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Result<Option<T>> + 'static,
    {
        Self { thunk: Rc::new(f) }
    }

    fn eval(&self) -> Result<Option<T>> {
        (self.thunk)()
    }

    /// Map a present value. Absence and faults pass through untouched.
    pub fn map<R, F>(self, f: F) -> Monad<R>
    where
        R: Clone + 'static,
        F: FnMut(T) -> R + 'static,
    {
        self.map_with(MapFn::plain(f))
    }

    /// Map a present value; a `false` flag turns it into absence.
    pub fn map_keep<R, F>(self, f: F) -> Monad<R>
    where
        R: Clone + 'static,
        F: FnMut(T) -> (R, bool) + 'static,
    {
        self.map_with(MapFn::keep(f))
    }

    /// Map a present value with a fallible function; `Err` becomes a fault.
    pub fn try_map<R, E, F>(self, f: F) -> Monad<R>
    where
        R: Clone + 'static,
        E: Into<Error>,
        F: FnMut(T) -> std::result::Result<R, E> + 'static,
    {
        self.map_with(MapFn::fallible(f))
    }

    /// Map with a function in any of the supported shapes.
    ///
    /// A dropped value becomes absence and an `Err` becomes the fault.
    pub fn map_with<R: Clone + 'static>(self, f: MapFn<T, R>) -> Monad<R> {
        let source = self.thunk;
        let f = RefCell::new(f);
        Monad::from_fn(move || match source()? {
            Some(value) => f.borrow_mut().apply(value),
            None => Ok(None),
        })
    }

    /// Keep a present value only if it passes `predicate`.
    pub fn expect_pass<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        let source = self.thunk;
        Self::from_fn(move || Ok(source()?.filter(|value| predicate(value))))
    }

    /// Turn a present value into a fault if `check` rejects it.
    pub fn expect_no_error<E, F>(self, check: F) -> Self
    where
        E: fmt::Display,
        F: Fn(&T) -> std::result::Result<(), E> + 'static,
    {
        let source = self.thunk;
        Self::from_fn(move || match source()? {
            Some(value) => match check(&value) {
                Ok(()) => Ok(Some(value)),
                Err(e) => Err(Error::check(e.to_string())),
            },
            None => Ok(None),
        })
    }

    /// A stream over the sequence `f` builds from the value.
    ///
    /// The monad is evaluated on the first pull. Absence gives an empty
    /// stream; a fault is recorded in the stream's context.
    pub fn stream_of<I, F>(self, f: F) -> Stream<I::Item>
    where
        I: IntoIterator,
        I::Item: 'static,
        I::IntoIter: 'static,
        F: FnOnce(T) -> I + 'static,
    {
        let ctx = Context::root();
        let sink = ctx.clone();
        let mut pending = Some((self.thunk, f));
        let mut items: Option<I::IntoIter> = None;
        Stream::live(
            Box::new(move || {
                if let Some((source, f)) = pending.take() {
                    match source() {
                        Ok(Some(value)) => items = Some(f(value).into_iter()),
                        Ok(None) => {}
                        Err(err) => sink.set_err(err),
                    }
                }
                items.as_mut()?.next()
            }),
            ctx,
        )
    }

    /// The stream `f` builds from the value, evaluated now.
    ///
    /// Absence gives the absent sentinel; a fault gives an empty stream
    /// carrying it.
    pub fn stream_with<R, F>(self, f: F) -> Stream<R>
    where
        R: 'static,
        F: FnOnce(T) -> Stream<R>,
    {
        match self.eval() {
            Ok(Some(value)) => f(value),
            Ok(None) => Stream::absent(),
            Err(err) => Stream::faulted(err),
        }
    }

    /// Combine with another monad. Operands are evaluated in order and the
    /// first one that is not present decides the outcome.
    pub fn zip<U, R, F>(self, other: Monad<U>, f: F) -> Monad<R>
    where
        U: Clone + 'static,
        R: Clone + 'static,
        F: Fn(T, U) -> R + 'static,
    {
        let left = self.thunk;
        let right = other.thunk;
        Monad::from_fn(move || {
            let Some(a) = left()? else {
                return Ok(None);
            };
            let Some(b) = right()? else {
                return Ok(None);
            };
            Ok(Some(f(a, b)))
        })
    }

    /// Combine with any number of monads of the same type, `self` first.
    pub fn zip_all<R, F>(self, others: Vec<Monad<T>>, f: F) -> Monad<R>
    where
        R: Clone + 'static,
        F: Fn(Vec<T>) -> R + 'static,
    {
        let mut operands = Vec::with_capacity(others.len() + 1);
        operands.push(self.thunk);
        operands.extend(others.into_iter().map(|m| m.thunk));
        Monad::from_fn(move || {
            let mut values = Vec::with_capacity(operands.len());
            for operand in &operands {
                match operand()? {
                    Some(value) => values.push(value),
                    None => return Ok(None),
                }
            }
            Ok(Some(f(values)))
        })
    }

    /// Evaluate at most once; later reads reuse the first outcome.
    pub fn once(self) -> Self {
        let source = self.thunk;
        let cell: OnceCell<Result<Option<T>>> = OnceCell::new();
        Self::from_fn(move || cell.get_or_init(|| source()).clone())
    }

    /// Evaluate into a [`Value`].
    pub fn val(&self) -> Value<T> {
        self.eval().into()
    }

    /// Write a present value into `dst`. Returns whether there was one.
    pub fn to(&self, dst: &mut T) -> Result<bool> {
        match self.eval()? {
            Some(value) => {
                *dst = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Evaluate, returning only the fault.
    pub fn error(&self) -> Option<Error> {
        self.eval().err()
    }
}

impl<T> fmt::Debug for Monad<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Monad<{}>", std::any::type_name::<T>())
    }
}
