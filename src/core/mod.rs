//! Core traits and types for the lazyflow engine.
//!
//! This module contains the source and cursor contracts, the pull-iterator plumbing,
//! the per-stage error channel and the transformation function shapes.

pub mod context;
pub mod func;
pub mod iter;
pub mod traits;

// Re-export core items
pub use crate::error::{Error, Result};
pub use context::Context;
pub use func::MapFn;
pub use iter::{IntoIter, Next, Pull};
pub use traits::{Cursor, KVSource, KVSourceExt, Source, SourceExt};
