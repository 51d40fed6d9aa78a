//! FX rate resolution engine: cache, source abstraction, resolver.

mod cache;
mod resolver;
mod source;

pub use cache::RateCache;
pub use resolver::{RateResolver, Resolution};
pub use source::RateSource;
