//! Grouping of measurements into (cell, band) summaries.

use std::collections::BTreeMap;

use h3o::{CellIndex, Resolution};
use tracing::{debug, warn};

use crate::{
    index::cell_at,
    model::{CellSummary, MeasurementPoint},
};

#[derive(Debug, Default, PartialEq)]
pub struct Aggregation {
    /// Sorted by (cell, band), one entry per pair.
    pub cells: Vec<CellSummary>,
    /// Points excluded because of unusable coordinates or readings.
    pub skipped: usize,
}

#[derive(Default)]
struct Group {
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    rsrp: Vec<f64>,
    rsrq: Vec<f64>,
}

pub fn aggregate(points: &[MeasurementPoint], resolution: Resolution) -> Aggregation {
    let mut groups: BTreeMap<(CellIndex, &str), Group> = BTreeMap::new();
    let mut skipped = 0;

    for point in points {
        let cell = match cell_at(point.latitude, point.longitude, resolution) {
            Ok(cell) => cell,
            Err(e) => {
                debug!(%e, band = %point.band, "skipping point");
                skipped += 1;
                continue;
            }
        };
        if !point.rsrp.is_finite() {
            debug!(rsrp = point.rsrp, "skipping point with unusable rsrp");
            skipped += 1;
            continue;
        }

        let group = groups.entry((cell, point.band.as_str())).or_default();
        group.latitude.push(point.latitude);
        group.longitude.push(point.longitude);
        group.rsrp.push(point.rsrp);
        if let Some(rsrq) = point.rsrq.filter(|x| x.is_finite()) {
            group.rsrq.push(rsrq);
        }
    }

    if skipped > 0 {
        warn!(skipped, total = points.len(), "measurements excluded from aggregation");
    }

    let cells = groups
        .into_iter()
        .map(|((cell, band), mut group)| CellSummary {
            cell,
            band: band.to_owned(),
            point_count: group.rsrp.len(),
            mean_latitude: mean(&mut group.latitude).unwrap_or_default(),
            mean_longitude: mean(&mut group.longitude).unwrap_or_default(),
            mean_rsrp: mean(&mut group.rsrp).unwrap_or_default(),
            mean_rsrq: mean(&mut group.rsrq),
        })
        .collect();

    Aggregation { cells, skipped }
}

// values are summed in sorted order so the result does not depend on input order
fn mean(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}
