use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use h3o::Resolution;

use crate::index::check_coordinate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Resolution used when importing and when a request does not ask for one.
    #[serde(default = "default_h3_resolution")]
    pub h3_resolution: u8,

    // upper bound on rows fetched from the store for a single query
    #[serde(default = "default_max_points")]
    pub max_points: i64,

    /// `[lat, lon]` of the antenna, marked on cluster maps.
    #[serde(default)]
    pub base_station: Option<(f64, f64)>,
}

fn default_http_port() -> u16 {
    8080
}

fn default_h3_resolution() -> u8 {
    9
}

fn default_max_points() -> i64 {
    100_000
}

impl Config {
    pub fn resolution(&self) -> Result<Resolution> {
        Resolution::try_from(self.h3_resolution).context("Invalid h3_resolution in config")
    }

    pub fn validate(&self) -> Result<()> {
        self.resolution()?;
        ensure!(
            self.max_points > 0,
            "Invalid max_points in config: {}, must be positive",
            self.max_points
        );
        if let Some((lat, lon)) = self.base_station {
            check_coordinate(lat, lon).context("Invalid base_station in config")?;
        }
        Ok(())
    }
}

pub fn load(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).context("Failed to read config")?;
    let mut config: Config = toml::from_str(&data).context("Failed to parse config")?;

    if let Ok(url) = dotenvy::var("DATABASE_URL") {
        config.database_url = url;
    }
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: Config = toml::from_str(r#"database_url = "postgres://localhost/coverage""#).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.h3_resolution, 9);
        assert_eq!(config.max_points, 100_000);
        assert_eq!(config.resolution().unwrap(), Resolution::Nine);
        assert_eq!(config.base_station, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn base_station() {
        let config: Config = toml::from_str(
            r#"
            database_url = "postgres://localhost/coverage"
            base_station = [52.27664, 104.27792]
            "#,
        )
        .unwrap();
        assert_eq!(config.base_station, Some((52.27664, 104.27792)));
        assert!(config.validate().is_ok());

        let config: Config = toml::from_str(
            r#"
            database_url = "postgres://localhost/coverage"
            base_station = [104.27792, 252.27664]
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_resolution() {
        let config: Config = toml::from_str(
            r#"
            database_url = "postgres://localhost/coverage"
            h3_resolution = 16
            "#,
        )
        .unwrap();
        assert!(config.resolution().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn max_points_must_be_positive() {
        for max_points in [0, -1] {
            let config: Config = toml::from_str(&format!(
                "database_url = \"postgres://localhost/coverage\"\nmax_points = {max_points}"
            ))
            .unwrap();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("max_points"), "{err}");
        }

        let dir = std::env::temp_dir().join(format!("coverage-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, "database_url = \"postgres://localhost/coverage\"\nmax_points = 0\n").unwrap();
        assert!(load(&path).is_err());
        fs::remove_dir_all(dir).unwrap();
    }
}
