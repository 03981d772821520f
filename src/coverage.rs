use tracing::{info, warn};

use crate::{
    aggregate::aggregate,
    boundary::boundary_of,
    error::{CoverageError, Result},
    index::{self, check_coordinate},
    model::{Coverage, CoverageCell, CoverageFilter, MeasurementPoint},
    store::PointStore,
};

/// Fetches measurements and turns them into renderable coverage cells.
pub struct CoverageService<S> {
    store: S,
    max_points: i64,
}

impl<S: PointStore> CoverageService<S> {
    pub fn new(store: S, max_points: i64) -> Self {
        Self { store, max_points }
    }

    async fn fetch(&self, filter: &CoverageFilter) -> Result<Vec<MeasurementPoint>> {
        if let Some(bbox) = &filter.bbox {
            bbox.validate()?;
        }

        let points = self
            .store
            .read_points(filter, self.max_points)
            .await
            .map_err(CoverageError::DataUnavailable)?;
        if points.len() as i64 >= self.max_points {
            warn!(limit = self.max_points, "point limit reached, coverage may be incomplete");
        }
        Ok(points)
    }

    pub async fn query(&self, filter: &CoverageFilter, resolution: u8) -> Result<Coverage> {
        let h3_resolution = index::resolution(resolution)?;
        let points = self.fetch(filter).await?;

        let aggregation = aggregate(&points, h3_resolution);
        let cells = aggregation
            .cells
            .into_iter()
            .map(|summary| {
                let boundary =
                    boundary_of(u64::from(summary.cell)).map_err(CoverageError::aggregation)?;
                Ok(CoverageCell { summary, boundary })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            resolution,
            points = points.len(),
            cells = cells.len(),
            skipped = aggregation.skipped,
            "coverage computed"
        );

        Ok(Coverage {
            resolution,
            cells,
            skipped: aggregation.skipped,
        })
    }

    /// Raw measurements matching `filter`, without the ones aggregation would skip.
    pub async fn points(&self, filter: &CoverageFilter) -> Result<Vec<MeasurementPoint>> {
        let mut points = self.fetch(filter).await?;
        let total = points.len();
        points.retain(|x| check_coordinate(x.latitude, x.longitude).is_ok() && x.rsrp.is_finite());
        if points.len() < total {
            warn!(skipped = total - points.len(), total, "measurements excluded from point map");
        }
        Ok(points)
    }
}
