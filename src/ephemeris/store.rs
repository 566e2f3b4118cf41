use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;

use crate::{error::Result, geometry::Point};

/// One stored provider answer.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// `Profile::key` the payload was fetched with
    pub profile: String,
    pub point: Point,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Persistent storage of cached payloads queried by proximity.
#[async_trait]
pub trait SpatialStore: Send + Sync {
    /// Payload of the closest entry for `profile` within `max_distance`
    /// meters of `point` that is younger than `max_age`.
    async fn find_nearest(
        &self,
        profile: &str,
        point: Point,
        max_distance: f64,
        max_age: Duration,
    ) -> Result<Option<Vec<u8>>>;

    async fn insert(&self, entry: CacheEntry) -> Result<()>;

    /// Deletes entries created before `older_than`, returning how many.
    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64>;
}

/// Oldest creation time still considered fresh for `max_age`.
pub(crate) fn cutoff(max_age: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(max_age)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Closest candidate within `max_distance` of `point`.
pub(crate) fn nearest<T>(
    point: Point,
    max_distance: f64,
    candidates: impl IntoIterator<Item = (Point, T)>,
) -> Option<T> {
    candidates
        .into_iter()
        .map(|(p, value)| (point.distance(p), value))
        .filter(|(distance, _)| *distance <= max_distance)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, value)| value)
}

/// Store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<Vec<CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<CacheEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl SpatialStore for MemoryCacheStore {
    async fn find_nearest(
        &self,
        profile: &str,
        point: Point,
        max_distance: f64,
        max_age: Duration,
    ) -> Result<Option<Vec<u8>>> {
        let cutoff = cutoff(max_age);
        let entries = self.entries.read();
        let found = nearest(
            point,
            max_distance,
            entries
                .iter()
                .filter(|e| e.profile == profile && e.created_at > cutoff)
                .map(|e| (e.point, &e.payload)),
        );
        Ok(found.cloned())
    }

    async fn insert(&self, entry: CacheEntry) -> Result<()> {
        self.entries.write().push(entry);
        Ok(())
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.created_at >= older_than);
        Ok((before - entries.len()) as u64)
    }
}
