//! # Lazy, pull-based data pipelines for Rust
//!
//! This crate provides chainable transformation pipelines that do no work
//! until a terminal operation pulls from them. A fault raised by any stage is
//! recorded once and becomes visible to every stage downstream of it.
//!
//! ## Core Concepts
//!
//! - **Stream**: a lazy, single-consumer sequence built from stages
//! - **KVStream**: a lazily built, cached key-value map
//! - **Source**: anything that yields elements on demand
//! - **Value**: the outcome of a read that produces at most one element
//! - **Monad**: a deferred value that may be present, absent or faulted
//!
//! ## Example
//!
//! ```rust
//! use lazyflow::prelude::*;
//!
//! let mut evens = times(10)
//!     .filter(|x| x % 2 == 0)
//!     .map(|x| x * 3)
//!     .take(3);
//!
//! assert_eq!(evens.first().get(), Some(&0));
//! assert_eq!(evens.result(), vec![0, 6, 12]);
//! ```

pub mod core;
pub mod error;
pub mod kvstream;
pub mod monad;
pub mod processors;
pub mod sources;
pub mod stream;
pub mod util;
pub mod value;

// Re-export commonly used items
pub mod prelude {
    pub use crate::core::{Cursor, KVSource, KVSourceExt, MapFn, Source, SourceExt};
    pub use crate::error::{Error, IntoError, Result};
    pub use crate::kvstream::KVStream;
    pub use crate::monad::Monad;
    pub use crate::processors::flatten::Nested;
    pub use crate::sources::{index, natural_numbers, range, times};
    pub use crate::stream::{Stream, StreamProcessor};
    pub use crate::util::{empty_string, equal, equal_ignore_case, no_error};
    pub use crate::value::Value;
}

pub use crate::core::{Context, Cursor, KVSource, KVSourceExt, MapFn, Source, SourceExt};
pub use error::{Error, Result};
pub use kvstream::KVStream;
pub use monad::Monad;
pub use processors::flatten::Nested;
pub use stream::{Stream, StreamProcessor};
pub use value::Value;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
