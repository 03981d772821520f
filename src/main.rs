use std::path::{Path, PathBuf};

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod aggregate;
mod api;
mod boundary;
mod config;
mod coverage;
mod error;
mod import;
mod index;
mod map;
mod model;
mod render;
mod store;

use crate::{api::AppState, coverage::CoverageService, store::PgStore};

#[derive(Debug, Parser)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve coverage over HTTP
    Serve { port: Option<u16> },
    /// Load a CSV export of measurements into the database
    Import { path: PathBuf },
    /// Render coverage or the raw measurements to a GeoJSON or SVG file
    Map(map::MapArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let path = match cli.config.as_deref() {
        Some(x) => x,
        None => Path::new("config.toml"),
    };
    let config = config::load(path)?;

    let pool = PgPool::connect(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;

    match cli.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(config.http_port);
            let state = web::Data::new(AppState {
                coverage: CoverageService::new(PgStore::new(pool), config.max_points),
                resolution: config.h3_resolution,
                base_station: config.base_station,
            });

            info!(port, "listening");
            HttpServer::new(move || {
                App::new()
                    .app_data(state.clone())
                    .configure(api::configure::<PgStore>)
            })
            .bind(("0.0.0.0", port))?
            .run()
            .await?;
        }

        Command::Import { path } => import::run(&pool, &path, config.resolution()?).await?,
        Command::Map(args) => {
            let service = CoverageService::new(PgStore::new(pool), config.max_points);
            map::run(&service, config.h3_resolution, config.base_station, args).await?;
        }
    };

    Ok(())
}
