//! Single-value results of terminal reads.

use crate::error::{Error, Result};

/// The outcome of a read that produces at most one value, such as
/// [`Stream::first`](crate::Stream::first), [`Stream::reduce`](crate::Stream::reduce)
/// or [`Monad::val`](crate::Monad::val).
///
/// A value may be present and still carry the fault recorded while it was
/// computed; check [`err`](Self::err) before trusting it.
#[derive(Debug, Clone, PartialEq)]
pub struct Value<T> {
    value: Option<T>,
    err: Option<Error>,
}

impl<T> Value<T> {
    pub(crate) fn new(value: Option<T>, err: Option<Error>) -> Self {
        Self { value, err }
    }

    /// A present value with no fault.
    pub fn of(value: T) -> Self {
        Self::new(Some(value), None)
    }

    /// No value and no fault.
    pub fn empty() -> Self {
        Self::new(None, None)
    }

    /// A fault with no value.
    pub fn fault(err: Error) -> Self {
        Self::new(None, Some(err))
    }

    /// The value, if present.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Take the value, discarding any fault.
    pub fn into_inner(self) -> Option<T> {
        self.value
    }

    /// Whether a value is present. A fault may still accompany it.
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// The recorded fault.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Copy the value into `dst`. Returns whether there was one.
    pub fn to(&self, dst: &mut T) -> bool
    where
        T: Clone,
    {
        match &self.value {
            Some(value) => {
                dst.clone_from(value);
                true
            }
            None => false,
        }
    }

    /// The fault if there is one, otherwise the optional value.
    pub fn into_result(self) -> Result<Option<T>> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }

    pub fn elem_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Result<Option<T>>> for Value<T> {
    fn from(res: Result<Option<T>>) -> Self {
        match res {
            Ok(value) => Self::new(value, None),
            Err(err) => Self::fault(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_copies_present_value() {
        let mut dst = String::from("old");
        assert!(Value::of("new".to_string()).to(&mut dst));
        assert_eq!(dst, "new");

        assert!(!Value::<String>::empty().to(&mut dst));
        assert_eq!(dst, "new");
    }

    #[test]
    fn test_fault_and_absence_differ() {
        let absent: Value<i32> = Value::empty();
        assert_eq!(absent.clone().into_result(), Ok(None));

        let faulted: Value<i32> = Value::fault(Error::custom("boom"));
        assert!(!faulted.is_present());
        assert_eq!(faulted.into_result(), Err(Error::custom("boom")));
    }

    #[test]
    fn test_from_result() {
        let v: Value<u8> = Ok(Some(7)).into();
        assert_eq!(v.get(), Some(&7));
        assert_eq!(v.elem_type(), "u8");
    }
}
