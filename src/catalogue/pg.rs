use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, FromRow, PgPool};
use tracing::{info, warn};

use super::Catalogue;
use crate::{
    error::{Error, Result},
    geometry::Point,
    model::{CellRadio, TowerKey, TowerRecord},
};

/// Catalogue backed by the `cell` table.
#[derive(Debug, Clone)]
pub struct PgCatalogue {
    pool: PgPool,
}

#[derive(FromRow)]
struct CellRow {
    lon: f64,
    lat: f64,
    range: f64,
}

impl TryFrom<CellRow> for TowerRecord {
    type Error = Error;

    fn try_from(row: CellRow) -> Result<Self> {
        Ok(TowerRecord {
            location: Point::new(row.lon, row.lat)?,
            accuracy: row.range,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub upserted: u64,
    pub pruned: u64,
}

impl PgCatalogue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64> {
        Ok(query_scalar::<_, i64>("select count(*) from cell")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Upserts `towers` in a single transaction. With `prune`, towers that
    /// this import did not refresh are deleted afterwards.
    pub async fn import(&self, towers: &[(TowerKey, TowerRecord)], prune: bool) -> Result<ImportSummary> {
        let started = Utc::now();
        let mut summary = ImportSummary::default();

        let mut tx = self.pool.begin().await?;
        for (key, record) in towers {
            let Ok(cell) = i64::try_from(key.cell) else {
                warn!(?key, "cell id does not fit the table");
                continue;
            };

            query(
                "insert into cell (radio, country, network, area, cell, lon, lat, range, updated_at)
                values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                on conflict (radio, country, network, area, cell) do update
                set lon = excluded.lon, lat = excluded.lat, range = excluded.range, updated_at = excluded.updated_at",
            )
            .bind(key.radio.as_ref())
            .bind(i32::from(key.country))
            .bind(i64::from(key.network))
            .bind(i64::from(key.area))
            .bind(cell)
            .bind(record.location.lon())
            .bind(record.location.lat())
            .bind(record.accuracy)
            .bind(started)
            .execute(&mut *tx)
            .await?;
            summary.upserted += 1;
        }

        if prune {
            summary.pruned = query("delete from cell where updated_at < $1")
                .bind(started)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        info!(upserted = summary.upserted, pruned = summary.pruned, "cell import committed");
        Ok(summary)
    }
}

#[async_trait]
impl Catalogue for PgCatalogue {
    async fn find_towers(
        &self,
        radio: CellRadio,
        country: u16,
        network: u32,
        cells: &[(u32, u64)],
    ) -> Result<Vec<TowerRecord>> {
        let (areas, ids): (Vec<i64>, Vec<i64>) = cells
            .iter()
            .filter_map(|&(area, cell)| Some((i64::from(area), i64::try_from(cell).ok()?)))
            .unzip();

        let rows = query_as::<_, CellRow>(
            "select lon, lat, range from cell
            where radio = $1 and country = $2 and network = $3
            and (area, cell) in (select * from unnest($4::bigint[], $5::bigint[]))",
        )
        .bind(radio.as_ref())
        .bind(i32::from(country))
        .bind(i64::from(network))
        .bind(areas)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TowerRecord::try_from).collect()
    }
}
