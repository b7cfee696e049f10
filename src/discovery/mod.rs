//! URL discovery from syndication feeds and XML sitemaps.

mod engine;
pub mod feed;
pub mod sitemap;
pub mod visited;

pub use engine::{dedup_and_sort, DiscoveryEngine};
pub use visited::{MemoryVisitedSet, RedisVisitedSet, VisitedSet};
