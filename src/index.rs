//! Mapping of coordinates onto H3 cells.

use h3o::{CellIndex, LatLng, Resolution};

use crate::error::{CoverageError, Result};

pub fn resolution(value: u8) -> Result<Resolution> {
    Resolution::try_from(value).map_err(|_| CoverageError::InvalidResolution(value))
}

pub fn check_coordinate(lat: f64, lon: f64) -> Result<()> {
    // h3o only rejects non-finite values, out of range degrees would silently wrap.
    // NaN is never contained in a range.
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(CoverageError::InvalidCoordinate { lat, lon });
    }
    Ok(())
}

/// Cell containing `(lat, lon)` at the given resolution.
pub fn cell_at(lat: f64, lon: f64, resolution: Resolution) -> Result<CellIndex> {
    check_coordinate(lat, lon)?;
    let loc = LatLng::new(lat, lon).map_err(|_| CoverageError::InvalidCoordinate { lat, lon })?;
    Ok(loc.to_cell(resolution))
}
