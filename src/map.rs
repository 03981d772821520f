use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use crate::{
    coverage::CoverageService,
    model::{BoundingBox, CoverageFilter},
    render,
    store::PointStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Hexagons as GeoJSON polygons
    Geojson,
    /// Hexagons coloured by mean RSRP
    Svg,
    /// Raw measurements, one colour per band
    Points,
    /// Raw measurements with a hull per band and the base station
    Clusters,
}

impl Format {
    fn default_name(self, resolution: u8) -> String {
        match self {
            Format::Geojson => format!("coverage-{resolution}.geojson"),
            Format::Svg => format!("coverage-{resolution}.svg"),
            Format::Points => "points.svg".to_owned(),
            Format::Clusters => "clusters.svg".to_owned(),
        }
    }
}

#[derive(Debug, Args)]
pub struct MapArgs {
    #[arg(long, value_enum, default_value_t = Format::Geojson)]
    format: Format,

    /// Output file, defaults to coverage-<resolution>.<ext>, points.svg or clusters.svg
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(short, long)]
    resolution: Option<u8>,

    /// Only include these bands
    #[arg(short, long, value_delimiter = ',')]
    band: Vec<String>,

    #[arg(
        long,
        num_args = 4,
        value_names = ["MIN_LAT", "MAX_LAT", "MIN_LON", "MAX_LON"],
        allow_negative_numbers = true
    )]
    bbox: Option<Vec<f64>>,

    /// Base station marked on cluster maps, overrides the config
    #[arg(
        long,
        num_args = 2,
        value_names = ["LAT", "LON"],
        allow_negative_numbers = true
    )]
    base_station: Option<Vec<f64>>,
}

impl MapArgs {
    fn filter(&self) -> CoverageFilter {
        let bbox = self.bbox.as_deref().and_then(|x| match *x {
            [min_lat, max_lat, min_lon, max_lon] => Some(BoundingBox {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            }),
            _ => None,
        });
        CoverageFilter {
            bbox,
            bands: self.band.clone(),
        }
    }

    fn base_station(&self) -> Option<(f64, f64)> {
        match self.base_station.as_deref()? {
            &[lat, lon] => Some((lat, lon)),
            _ => None,
        }
    }
}

pub async fn run<S: PointStore>(
    service: &CoverageService<S>,
    default_resolution: u8,
    default_base_station: Option<(f64, f64)>,
    args: MapArgs,
) -> Result<()> {
    let resolution = args.resolution.unwrap_or(default_resolution);
    let filter = args.filter();

    let data = match args.format {
        Format::Geojson | Format::Svg => {
            let coverage = service.query(&filter, resolution).await?;
            info!(cells = coverage.cells.len(), "coverage ready");
            if args.format == Format::Geojson {
                serde_json::to_string(&render::to_geojson(&coverage))?
            } else {
                render::to_svg(&coverage, render::DEFAULT_SIZE)?
            }
        }
        Format::Points => {
            let points = service.points(&filter).await?;
            info!(points = points.len(), "points ready");
            render::points_to_svg(&points, render::DEFAULT_SIZE)?
        }
        Format::Clusters => {
            let points = service.points(&filter).await?;
            let base_station = args.base_station().or(default_base_station);
            info!(points = points.len(), ?base_station, "points ready");
            render::clusters_to_svg(&points, base_station, render::DEFAULT_SIZE)?
        }
    };

    let path = args
        .out
        .unwrap_or_else(|| args.format.default_name(resolution).into());
    fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("wrote {}", path.display());

    Ok(())
}
