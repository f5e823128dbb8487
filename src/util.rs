//! Predicate helpers for [`Stream::filter`](crate::Stream::filter) and
//! [`Stream::reject`](crate::Stream::reject).

use crate::error::Result;

/// Matches elements equal to `target`.
pub fn equal<T: PartialEq>(target: T) -> impl Fn(&T) -> bool {
    move |item| *item == target
}

/// Matches strings equal to `target`, ignoring case.
pub fn equal_ignore_case<S: AsRef<str>>(target: impl Into<String>) -> impl Fn(&S) -> bool {
    let target = target.into().to_lowercase();
    move |item| item.as_ref().to_lowercase() == target
}

/// Matches empty strings.
pub fn empty_string<S: AsRef<str>>() -> impl Fn(&S) -> bool {
    |item| item.as_ref().is_empty()
}

/// Matches results that are `Ok`.
pub fn no_error<T>() -> impl Fn(&Result<T>) -> bool {
    |res| res.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::stream::Stream;

    #[test]
    fn test_equal() {
        let hits = Stream::of(vec![1, 2, 1, 3]).filter(equal(1)).count();
        assert_eq!(hits, 2);
    }

    #[test]
    fn test_equal_ignore_case() {
        let words = Stream::of(vec!["Rust", "java", "RUST", "rusty"])
            .filter(equal_ignore_case("rust"))
            .result();
        assert_eq!(words, vec!["Rust", "RUST"]);
    }

    #[test]
    fn test_empty_string() {
        let lines = Stream::of(vec!["a".to_string(), String::new(), "b".to_string()])
            .reject(empty_string())
            .result();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_no_error() {
        let outcomes: Vec<Result<i32>> = vec![Ok(1), Err(Error::custom("bad")), Ok(2)];
        let ok = Stream::of(outcomes).filter(no_error()).count();
        assert_eq!(ok, 2);
    }
}
