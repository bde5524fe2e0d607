pub(crate) mod bounded;

pub use bounded::{BoundedLru, CacheEntry};
