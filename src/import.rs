//! Loading of measurement exports into the `measurement` table.
//!
//! The spreadsheet is expected as CSV with a header row. Header names are matched case-insensitively
//! and a few common spellings are accepted, e.g. `lat` for `latitude` or `eventtime` for the timestamp.

use std::{fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use h3o::{CellIndex, Resolution};
use serde::{de, Deserialize, Deserializer};
use sqlx::{query, PgPool};
use tracing::{info, warn};

use crate::{index::cell_at, model::MeasurementPoint};

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
    #[serde(default, alias = "alt")]
    altitude: Option<f64>,
    band: String,
    rsrp: f64,
    #[serde(default)]
    rsrq: Option<f64>,
    #[serde(
        rename = "eventtime",
        alias = "timestamp",
        alias = "time",
        deserialize_with = "deserialize_time"
    )]
    recorded_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Imported {
    pub point: MeasurementPoint,
    pub cell: CellIndex,
}

#[derive(Debug, Default)]
pub struct Parsed {
    pub rows: Vec<Imported>,
    pub skipped: usize,
}

pub async fn run(pool: &PgPool, path: &Path, resolution: Resolution) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let parsed = parse(file, resolution)?;
    info!(rows = parsed.rows.len(), skipped = parsed.skipped, "parsed {}", path.display());

    let mut tx = pool.begin().await?;
    for (i, row) in parsed.rows.iter().enumerate() {
        let point = &row.point;
        query(
            "insert into measurement (latitude, longitude, altitude, band, rsrp, rsrq, recorded_at, cell, resolution) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(point.altitude)
        .bind(point.band.as_str())
        .bind(point.rsrp)
        .bind(point.rsrq)
        .bind(point.recorded_at)
        // h3 indexes never set the sign bit
        .bind(u64::from(row.cell) as i64)
        .bind(i16::from(u8::from(resolution)))
        .execute(&mut *tx)
        .await?;

        if i > 0 && i % 100_000 == 0 {
            info!(i, "inserting");
        }
    }
    tx.commit().await?;

    info!(
        inserted = parsed.rows.len(),
        skipped = parsed.skipped,
        "import finished"
    );
    Ok(())
}

pub fn parse<R: Read>(input: R, resolution: Resolution) -> Result<Parsed> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: csv::StringRecord = reader
        .headers()
        .context("Failed to read header row")?
        .iter()
        .map(|x| x.trim().to_lowercase())
        .collect();
    reader.set_headers(headers);

    let mut parsed = Parsed::default();
    for (i, result) in reader.deserialize::<Row>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = match result {
            Ok(x) => x,
            Err(e) => {
                warn!(line, %e, "skipping malformed row");
                parsed.skipped += 1;
                continue;
            }
        };

        let cell = match cell_at(row.latitude, row.longitude, resolution) {
            Ok(x) => x,
            Err(e) => {
                warn!(line, %e, "skipping row");
                parsed.skipped += 1;
                continue;
            }
        };
        if !row.rsrp.is_finite() {
            warn!(line, rsrp = row.rsrp, "skipping row without a usable rsrp");
            parsed.skipped += 1;
            continue;
        }

        parsed.rows.push(Imported {
            point: MeasurementPoint {
                latitude: row.latitude,
                longitude: row.longitude,
                altitude: row.altitude,
                band: row.band.trim().to_owned(),
                rsrp: row.rsrp,
                rsrq: row.rsrq.filter(|x| x.is_finite()),
                recorded_at: row.recorded_at,
            },
            cell,
        });
    }

    Ok(parsed)
}

fn deserialize_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let value = String::deserialize(deserializer)?;
    parse_time(value.trim()).ok_or_else(|| de::Error::custom(format!("unrecognised timestamp {value:?}")))
}

// exports are written without a zone, those times are taken as UTC
fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(x) = DateTime::parse_from_rfc3339(value) {
        return Some(x.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%d.%m.%Y %H:%M:%S"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|x| x.and_utc())
}
