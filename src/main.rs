use std::{
    fs::{self, File},
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::{info, warn};

use geotrack::{
    catalogue::{
        import::{read_cells, Filter},
        PgCatalogue,
    },
    config::{self, Config},
    ephemeris::{PgCacheStore, Provider, SpatialCache, UbloxClient},
    geometry::{Circle, Point},
    logging,
    model::CellRadio,
    resolver::Resolver,
};

#[derive(Debug, Parser)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Estimate a position from a cell tower fingerprint
    Locate {
        #[arg(long, value_parser = CellRadio::from_tag)]
        radio: Option<CellRadio>,
        fingerprint: String,
    },
    /// Fetch GNSS assistance data, through the cache when a position is given
    Ephemeris {
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load an OpenCelliD/MLS cell export into the catalogue
    ImportCells {
        path: PathBuf,
        #[arg(long = "radio", value_parser = CellRadio::from_tag)]
        radios: Vec<CellRadio>,
        #[arg(long = "country")]
        countries: Vec<u16>,
        /// delete towers missing from this export
        #[arg(long)]
        prune: bool,
    },
    /// Delete expired assistance data
    PruneCache,
    /// Print a circular area as a GeoJSON polygon
    Area {
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// meters
        #[arg(long)]
        radius: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = match cli.config.as_deref() {
        Some(x) => x,
        None => Path::new("config.toml"),
    };
    let config = config::load(path)?;
    logging::init(&config.log)?;

    match cli.command {
        Command::Locate { radio, fingerprint } => {
            let catalogue = PgCatalogue::new(connect(&config).await?);
            if catalogue.count().await? == 0 {
                warn!("tower catalogue is empty, run import-cells first");
            }

            let radio = radio.unwrap_or(config.lbs.default_radio);
            let estimate = Resolver::new(catalogue).locate(radio, &fingerprint).await?;
            println!("{}", serde_json::to_string(&estimate)?);
        }

        Command::Ephemeris { lon, lat, output } => {
            let ublox = config
                .ublox
                .as_ref()
                .context("Missing [ublox] section in config")?;
            let client = UbloxClient::new(ublox)?;

            let data = match lon.zip(lat) {
                Some((lon, lat)) => {
                    let point = Point::new(lon, lat)?;
                    let store = PgCacheStore::new(connect(&config).await?);
                    SpatialCache::new(store, client, config.cache.clone())
                        .get(point, &ublox.profile)
                        .await?
                }
                None => client.fetch_online(None, &ublox.profile).await?,
            };

            match output {
                Some(path) => fs::write(&path, &data).context("Failed to write output")?,
                None => io::stdout().lock().write_all(&data)?,
            }
        }

        Command::ImportCells {
            path,
            radios,
            countries,
            prune,
        } => {
            let file = File::open(&path).context("Failed to open cell export")?;
            let filter = Filter {
                radios: radios.into_iter().collect(),
                countries: countries.into_iter().collect(),
            };
            let batch = read_cells(BufReader::new(file), &filter)?;
            info!(
                read = batch.stats.read,
                kept = batch.stats.kept,
                filtered = batch.stats.filtered,
                skipped = batch.stats.skipped,
                "read cell export"
            );

            let catalogue = PgCatalogue::new(connect(&config).await?);
            catalogue.import(&batch.towers, prune).await?;
        }

        Command::PruneCache => {
            let ublox = config
                .ublox
                .as_ref()
                .context("Missing [ublox] section in config")?;
            let store = PgCacheStore::new(connect(&config).await?);
            SpatialCache::new(store, UbloxClient::new(ublox)?, config.cache.clone())
                .prune()
                .await?;
        }

        Command::Area { lon, lat, radius } => {
            let circle = Circle::new(Point::new(lon, lat)?, radius)?;
            let geometry = circle.to_geojson(config.geometry.circle_segments);
            println!("{geometry}");
        }
    };

    Ok(())
}

async fn connect(config: &Config) -> Result<PgPool> {
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!().run(&pool).await?;
    Ok(pool)
}
