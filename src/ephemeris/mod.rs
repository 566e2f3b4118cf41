//! GNSS assistance data: the upstream provider and the spatial cache in
//! front of it.

use async_trait::async_trait;

use crate::{error::Result, geometry::Point};

mod cache;
mod client;
mod pg;
mod profile;
mod store;

pub use cache::SpatialCache;
pub use client::UbloxClient;
pub use pg::PgCacheStore;
pub use profile::Profile;
pub use store::{CacheEntry, MemoryCacheStore, SpatialStore};

/// Source of assistance data.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Fetches data for `profile`, filtered around `point` when one is given.
    async fn fetch_online(&self, point: Option<Point>, profile: &Profile) -> Result<Vec<u8>>;
}
