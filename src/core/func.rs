//! Transformation function shapes.
//!
//! A caller may hand a stage one of three result shapes. They are all
//! normalized to `Result<Option<R>>`: `Ok(Some(r))` keeps the element,
//! `Ok(None)` drops it, `Err(e)` is a fault for the pipeline's context.

use crate::error::{Error, Result};

/// A transformation from `T` to `R` in one of the supported shapes.
pub enum MapFn<T, R> {
    /// `T -> R`, always kept.
    Plain(Box<dyn FnMut(T) -> R>),
    /// `T -> Option<R>`, kept when `Some`.
    Keep(Box<dyn FnMut(T) -> Option<R>>),
    /// `T -> Result<R>`, kept when `Ok`, a fault when `Err`.
    Fallible(Box<dyn FnMut(T) -> Result<R>>),
}

impl<T: 'static, R: 'static> MapFn<T, R> {
    /// Wrap a function whose result is always kept.
    pub fn plain<F>(f: F) -> Self
    where
        F: FnMut(T) -> R + 'static,
    {
        MapFn::Plain(Box::new(f))
    }

    /// Wrap a function returning a value together with a keep flag.
    pub fn keep<F>(mut f: F) -> Self
    where
        F: FnMut(T) -> (R, bool) + 'static,
    {
        MapFn::Keep(Box::new(move |input| {
            let (out, keep) = f(input);
            keep.then_some(out)
        }))
    }

    /// Wrap a function returning an optional value.
    pub fn optional<F>(f: F) -> Self
    where
        F: FnMut(T) -> Option<R> + 'static,
    {
        MapFn::Keep(Box::new(f))
    }

    /// Wrap a function that may fail.
    pub fn fallible<F, E>(mut f: F) -> Self
    where
        F: FnMut(T) -> std::result::Result<R, E> + 'static,
        E: Into<Error>,
    {
        MapFn::Fallible(Box::new(move |input| f(input).map_err(Into::into)))
    }

    /// Apply the function and normalize its result.
    pub fn apply(&mut self, input: T) -> Result<Option<R>> {
        match self {
            MapFn::Plain(f) => Ok(Some(f(input))),
            MapFn::Keep(f) => Ok(f(input)),
            MapFn::Fallible(f) => f(input).map(Some),
        }
    }
}

impl<T, R> std::fmt::Debug for MapFn<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapFn::Plain(_) => write!(f, "Plain(..)"),
            MapFn::Keep(_) => write!(f, "Keep(..)"),
            MapFn::Fallible(_) => write!(f, "Fallible(..)"),
        }
    }
}
