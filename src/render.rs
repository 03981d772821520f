//! Map output for computed coverage: GeoJSON for interactive maps, SVG for a static picture.
//!
//! Besides the hexagon map there are two views of the raw measurements: a scatter of points per
//! band, and the same scatter with the convex hull of each band and the base station.

use std::{collections::BTreeMap, iter, ops::Range};

use anyhow::Result;
use geo::{ConvexHull, MultiPoint};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use plotters::{element::DashedPathElement, prelude::*};
use serde::Serialize;
use serde_json::json;

use crate::model::{Coverage, CoverageCell, MeasurementPoint};

pub const DEFAULT_SIZE: (u32, u32) = (1000, 1000);

/// A band needs more points than this to get a hull.
pub const MIN_HULL_POINTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RsrpClass {
    Good,
    Fair,
    Poor,
}

impl RsrpClass {
    const ALL: [RsrpClass; 3] = [RsrpClass::Good, RsrpClass::Fair, RsrpClass::Poor];

    pub fn from_rsrp(rsrp: f64) -> Self {
        if rsrp >= -85.0 {
            RsrpClass::Good
        } else if rsrp >= -100.0 {
            RsrpClass::Fair
        } else {
            RsrpClass::Poor
        }
    }

    pub fn color(self) -> RGBColor {
        match self {
            RsrpClass::Good => RGBColor(0x2e, 0xa0, 0x43),
            RsrpClass::Fair => RGBColor(0xf0, 0x8c, 0x00),
            RsrpClass::Poor => RGBColor(0xd0, 0x1c, 0x1c),
        }
    }

    pub fn hex(self) -> String {
        let RGBColor(r, g, b) = self.color();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    fn label(self) -> &'static str {
        match self {
            RsrpClass::Good => "RSRP >= -85 dBm",
            RsrpClass::Fair => "-100 <= RSRP < -85 dBm",
            RsrpClass::Poor => "RSRP < -100 dBm",
        }
    }
}

pub fn to_geojson(coverage: &Coverage) -> FeatureCollection {
    let features = coverage.cells.iter().map(feature).collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn feature(cell: &CoverageCell) -> Feature {
    let summary = &cell.summary;
    let class = RsrpClass::from_rsrp(summary.mean_rsrp);

    let mut properties = JsonObject::new();
    properties.insert("cell".into(), json!(summary.cell.to_string()));
    properties.insert("band".into(), json!(summary.band));
    properties.insert("mean_rsrp".into(), json!(summary.mean_rsrp));
    properties.insert("mean_rsrq".into(), json!(summary.mean_rsrq));
    properties.insert("point_count".into(), json!(summary.point_count));
    properties.insert("class".into(), json!(class));
    properties.insert("color".into(), json!(class.hex()));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&cell.boundary.to_polygon()))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn to_svg(coverage: &Coverage, size: (u32, u32)) -> Result<String> {
    let (x_range, y_range) = extent(coverage);
    let mut buf = String::new();

    {
        let root = SVGBackend::with_string(&mut buf, size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Coverage, H3 resolution {}", coverage.resolution),
                ("sans-serif", 20),
            )
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_desc("Longitude")
            .y_desc("Latitude")
            .draw()?;

        for class in RsrpClass::ALL {
            let color = class.color();
            chart
                .draw_series(
                    coverage
                        .cells
                        .iter()
                        .filter(|cell| RsrpClass::from_rsrp(cell.summary.mean_rsrp) == class)
                        .map(|cell| {
                            let vertices: Vec<_> =
                                cell.boundary.ring().coords().map(|c| (c.x, c.y)).collect();
                            Polygon::new(vertices, color.mix(0.5).filled())
                        }),
                )?
                .label(class.label())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart.draw_series(coverage.cells.iter().map(|cell| {
            Circle::new(
                (cell.summary.mean_longitude, cell.summary.mean_latitude),
                2,
                BLACK.filled(),
            )
        }))?;

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
    }

    Ok(buf)
}

// lon/lat ranges covering every boundary with a small margin
fn extent(coverage: &Coverage) -> (Range<f64>, Range<f64>) {
    let coords = coverage
        .cells
        .iter()
        .flat_map(|cell| cell.boundary.ring().coords())
        .map(|c| (c.x, c.y));

    match bounds(coords) {
        Some([min_x, max_x, min_y, max_y]) => {
            let pad_x = (max_x - min_x) * 0.05 + 0.001;
            let pad_y = (max_y - min_y) * 0.05 + 0.001;
            (
                (min_x - pad_x)..(max_x + pad_x),
                (min_y - pad_y)..(max_y + pad_y),
            )
        }
        None => world(),
    }
}

fn world() -> (Range<f64>, Range<f64>) {
    (-180.0..180.0, -90.0..90.0)
}

// [min_x, max_x, min_y, max_y]
fn bounds(coords: impl IntoIterator<Item = (f64, f64)>) -> Option<[f64; 4]> {
    coords.into_iter().fold(None, |acc, (x, y)| {
        Some(match acc {
            None => [x, x, y, y],
            Some([min_x, max_x, min_y, max_y]) => {
                [min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y)]
            }
        })
    })
}

/// (lon, lat) of every point, grouped by band in band order.
fn by_band(points: &[MeasurementPoint]) -> BTreeMap<&str, Vec<(f64, f64)>> {
    let mut bands: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for point in points {
        bands
            .entry(point.band.as_str())
            .or_default()
            .push((point.longitude, point.latitude));
    }
    bands
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandHull {
    pub band: String,
    pub point_count: usize,
    pub hull: geo::Polygon<f64>,
}

/// Convex hull of each band's points. Bands with [`MIN_HULL_POINTS`] points or fewer are left out.
pub fn band_hulls(points: &[MeasurementPoint]) -> Vec<BandHull> {
    by_band(points)
        .into_iter()
        .filter(|(_, coords)| coords.len() > MIN_HULL_POINTS)
        .map(|(band, coords)| BandHull {
            band: band.to_owned(),
            point_count: coords.len(),
            hull: MultiPoint::from(coords).convex_hull(),
        })
        .collect()
}

pub fn hulls_to_geojson(hulls: &[BandHull]) -> FeatureCollection {
    let features = hulls
        .iter()
        .map(|x| {
            let mut properties = JsonObject::new();
            properties.insert("band".into(), json!(x.band));
            properties.insert("point_count".into(), json!(x.point_count));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&x.hull))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Scatter of the raw measurements, one colour per band.
pub fn points_to_svg(points: &[MeasurementPoint], size: (u32, u32)) -> Result<String> {
    draw_points(points, false, None, "Measurements by band", size)
}

/// Scatter with a dashed hull around each band and, when known, the base station as a triangle.
///
/// `base_station` is `(lat, lon)`.
pub fn clusters_to_svg(
    points: &[MeasurementPoint],
    base_station: Option<(f64, f64)>,
    size: (u32, u32),
) -> Result<String> {
    draw_points(points, true, base_station, "Coverage clusters", size)
}

fn draw_points(
    points: &[MeasurementPoint],
    hulls: bool,
    base_station: Option<(f64, f64)>,
    caption: &str,
    size: (u32, u32),
) -> Result<String> {
    let bands = by_band(points);
    let station = base_station.map(|(lat, lon)| (lon, lat));

    let (x_range, y_range) = match bounds(bands.values().flatten().copied().chain(station)) {
        Some([min_x, max_x, min_y, max_y]) => {
            ((min_x - 0.01)..(max_x + 0.01), (min_y - 0.01)..(max_y + 0.01))
        }
        None => world(),
    };
    let mut buf = String::new();

    {
        let root = SVGBackend::with_string(&mut buf, size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_desc("Longitude")
            .y_desc("Latitude")
            .draw()?;

        for (i, (band, coords)) in bands.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            chart
                .draw_series(
                    coords
                        .iter()
                        .map(|&c| Circle::new(c, 3, color.mix(0.6).filled())),
                )?
                .label(*band)
                .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));

            if hulls && coords.len() > MIN_HULL_POINTS {
                let hull = MultiPoint::from(coords.clone()).convex_hull();
                let outline: Vec<(f64, f64)> =
                    hull.exterior().coords().map(|c| (c.x, c.y)).collect();
                chart
                    .draw_series(iter::once(DashedPathElement::new(
                        outline,
                        6,
                        4,
                        color.stroke_width(2),
                    )))?
                    .label(format!("{band} cluster"))
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], color));
            }
        }

        if let Some(station) = station {
            chart
                .draw_series(iter::once(TriangleMarker::new(station, 8, RED.filled())))?
                .label("Base station")
                .legend(|(x, y)| TriangleMarker::new((x + 5, y), 5, RED.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
    }

    Ok(buf)
}
