use chrono::{DateTime, Utc};
use h3o::CellIndex;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    boundary::Boundary,
    error::{CoverageError, Result},
    index::check_coordinate,
};

/// A single signal reading as stored in the `measurement` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MeasurementPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub band: String,
    pub rsrp: f64,
    pub rsrq: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn validate(&self) -> Result<()> {
        check_coordinate(self.min_lat, self.min_lon)?;
        check_coordinate(self.max_lat, self.max_lon)?;
        if self.min_lat > self.max_lat || self.min_lon > self.max_lon {
            return Err(CoverageError::InvalidCoordinate {
                lat: self.min_lat,
                lon: self.min_lon,
            });
        }
        Ok(())
    }
}

/// Which points a coverage query should look at. An empty band list matches every band.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageFilter {
    pub bbox: Option<BoundingBox>,
    pub bands: Vec<String>,
}

/// Per (cell, band) statistics produced by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellSummary {
    #[serde(serialize_with = "serialize_cell")]
    pub cell: CellIndex,
    pub band: String,
    pub mean_latitude: f64,
    pub mean_longitude: f64,
    pub mean_rsrp: f64,
    pub mean_rsrq: Option<f64>,
    pub point_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageCell {
    #[serde(flatten)]
    pub summary: CellSummary,
    pub boundary: Boundary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub resolution: u8,
    pub cells: Vec<CoverageCell>,
    pub skipped: usize,
}

fn serialize_cell<S: Serializer>(cell: &CellIndex, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(cell)
}
