use std::future::Future;

use sqlx::{query_as, PgPool};

use crate::model::{CoverageFilter, MeasurementPoint};

/// Source of raw measurements for coverage queries.
///
/// No ordering or deduplication is promised; callers aggregate whatever comes back.
pub trait PointStore {
    fn read_points(
        &self,
        filter: &CoverageFilter,
        limit: i64,
    ) -> impl Future<Output = sqlx::Result<Vec<MeasurementPoint>>>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PointStore for PgStore {
    async fn read_points(
        &self,
        filter: &CoverageFilter,
        limit: i64,
    ) -> sqlx::Result<Vec<MeasurementPoint>> {
        let bbox = filter.bbox;
        let bands = (!filter.bands.is_empty()).then(|| filter.bands.clone());

        query_as::<_, MeasurementPoint>(
            "select latitude, longitude, altitude, band, rsrp, rsrq, recorded_at from measurement
            where ($1::float8 is null or latitude between $1 and $2)
            and ($3::float8 is null or longitude between $3 and $4)
            and ($5::text[] is null or band = any($5))
            limit $6",
        )
        .bind(bbox.map(|b| b.min_lat))
        .bind(bbox.map(|b| b.max_lat))
        .bind(bbox.map(|b| b.min_lon))
        .bind(bbox.map(|b| b.max_lon))
        .bind(bands)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
