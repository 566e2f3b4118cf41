use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::{query, query_as, query_scalar, FromRow, PgPool};

use super::store::{cutoff, nearest, CacheEntry, SpatialStore};
use crate::{
    error::Result,
    geometry::{Bounds, Point},
};

/// Cache store backed by the `ephemeris_cache` table.
#[derive(Debug, Clone)]
pub struct PgCacheStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct Candidate {
    id: i64,
    lon: f64,
    lat: f64,
}

impl PgCacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SpatialStore for PgCacheStore {
    async fn find_nearest(
        &self,
        profile: &str,
        point: Point,
        max_distance: f64,
        max_age: Duration,
    ) -> Result<Option<Vec<u8>>> {
        // the box only narrows the scan, distances are checked below
        let bounds = Bounds::around(point, max_distance);
        let (min_lon, max_lon) = bounds.lon.unzip();

        let candidates: Vec<(Point, i64)> = query_as::<_, Candidate>(
            "select id, lon, lat from ephemeris_cache
            where profile = $1 and created_at > $2
            and lat between $3 and $4
            and ($5::float8 is null or lon between $5 and $6)",
        )
        .bind(profile)
        .bind(cutoff(max_age))
        .bind(bounds.min_lat)
        .bind(bounds.max_lat)
        .bind(min_lon)
        .bind(max_lon)
        .fetch(&self.pool)
        .try_filter_map(|c| async move { Ok(Point::new(c.lon, c.lat).ok().map(|p| (p, c.id))) })
        .try_collect()
        .await?;

        let Some(id) = nearest(point, max_distance, candidates) else {
            return Ok(None);
        };

        // a concurrent prune may have removed it in the meantime
        Ok(
            query_scalar::<_, Vec<u8>>("select payload from ephemeris_cache where id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert(&self, entry: CacheEntry) -> Result<()> {
        query(
            "insert into ephemeris_cache (profile, lon, lat, payload, created_at)
            values ($1, $2, $3, $4, $5)",
        )
        .bind(entry.profile)
        .bind(entry.point.lon())
        .bind(entry.point.lat())
        .bind(entry.payload)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64> {
        Ok(query("delete from ephemeris_cache where created_at < $1")
            .bind(older_than)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }
}
