use geo::{LineString, Polygon, Winding};
use h3o::CellIndex;
use serde::{Serialize, Serializer};

use crate::error::{CoverageError, Result};

/// Closed, counter-clockwise ring of (lon, lat) degrees outlining a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary(LineString<f64>);

impl Boundary {
    pub fn ring(&self) -> &LineString<f64> {
        &self.0
    }

    /// Number of distinct vertices, the closing coordinate is not counted.
    pub fn vertex_count(&self) -> usize {
        self.0 .0.len().saturating_sub(1)
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(self.0.clone(), vec![])
    }
}

impl Serialize for Boundary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.coords().map(|c| [c.x, c.y]))
    }
}

/// Rings crossing the antimeridian are unwrapped eastwards, so their longitudes may exceed 180.
pub fn resolve(cell: CellIndex) -> Boundary {
    let mut coords: Vec<(f64, f64)> = cell
        .boundary()
        .iter()
        .map(|ll| (ll.lng(), ll.lat()))
        .collect();
    let (min, max) = coords
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &(lon, _)| {
            (min.min(lon), max.max(lon))
        });
    if max - min > 180.0 {
        for (lon, _) in coords.iter_mut().filter(|(lon, _)| *lon < 0.0) {
            *lon += 360.0;
        }
    }

    let mut ring = LineString::from(coords);
    ring.close();
    ring.make_ccw_winding();
    Boundary(ring)
}

pub fn boundary_of(raw: u64) -> Result<Boundary> {
    let cell = CellIndex::try_from(raw).map_err(|_| CoverageError::InvalidCellId(format!("{raw:x}")))?;
    Ok(resolve(cell))
}

/// Parses the hexadecimal form used in URLs and JSON.
pub fn parse_cell(value: &str) -> Result<CellIndex> {
    value
        .parse()
        .map_err(|_| CoverageError::InvalidCellId(value.to_owned()))
}
