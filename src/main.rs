use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use satintel::config::{Config, EngineConfig};
use satintel::predict::{
    Observer, OrbitSummary, OrbitalElementSet, PassFinder, PassRecord, SatelliteInfo,
    StateVector, TleEntry, TleLoader,
};

#[derive(Parser)]
#[command(name = "satintel")]
#[command(about = "Satellite position and pass prediction from TLE data")]
struct Cli {
    /// YAML config with station and prediction settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// TLE file or directory of .tle/.txt files
    #[arg(long)]
    tle: PathBuf,
    /// Catalog number or name substring; all satellites when omitted
    #[arg(long)]
    satellite: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print parsed mean elements and orbit shape
    Elements {
        #[command(flatten)]
        source: Source,
    },
    /// Print the state vector at an instant (default: now)
    Position {
        #[command(flatten)]
        source: Source,
        /// RFC3339 instant
        #[arg(long)]
        at: Option<String>,
    },
    /// List upcoming passes over an observer
    Passes {
        #[command(flatten)]
        source: Source,
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "altitude_m")]
        lon: Option<f64>,
        /// Observer altitude above the spherical Earth, metres
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        altitude_m: Option<f64>,
        /// Scan length, e.g. "24h"
        #[arg(long)]
        horizon: Option<String>,
        /// Sampling step, e.g. "5m"
        #[arg(long)]
        step: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        min_elevation: Option<f64>,
        /// RFC3339 start of the scan (default: now)
        #[arg(long)]
        start: Option<String>,
    },
}

#[derive(Serialize)]
struct ElementsReport<'a> {
    satellite: &'a SatelliteInfo,
    elements: &'a OrbitalElementSet,
    orbit: OrbitSummary,
}

#[derive(Serialize)]
struct PositionReport<'a> {
    satellite: &'a SatelliteInfo,
    state: StateVector,
}

#[derive(Serialize)]
struct PassReport {
    satellite: SatelliteInfo,
    pass: PassRecord,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => Some(c),
            Err(e) => {
                eprintln!("Config error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: Option<Config>) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = config
        .as_ref()
        .map(|c| c.predict.clone())
        .unwrap_or_default();

    match command {
        Commands::Elements { source } => {
            let loader = load(&source, &engine)?;
            let reports: Vec<_> = select(&loader, &source)?
                .into_iter()
                .map(|e| ElementsReport {
                    satellite: &e.info,
                    elements: e.propagator.elements(),
                    orbit: e.propagator.elements().summary(engine.earth_radius_km),
                })
                .collect();
            print_json(&reports)
        }
        Commands::Position { source, at } => {
            let at = parse_instant(at.as_deref())?;
            let loader = load(&source, &engine)?;
            let mut reports = Vec::new();
            for entry in select(&loader, &source)? {
                match entry.propagator.propagate(at) {
                    Ok(state) => reports.push(PositionReport {
                        satellite: &entry.info,
                        state,
                    }),
                    Err(e) => log::warn!("No position for {}: {}", entry.info.name, e),
                }
            }
            print_json(&reports)
        }
        Commands::Passes {
            source,
            lat,
            lon,
            altitude_m,
            horizon,
            step,
            min_elevation,
            start,
        } => {
            if let Some(horizon) = horizon {
                engine.horizon = humantime::parse_duration(&horizon)?;
            }
            if let Some(step) = step {
                engine.step = humantime::parse_duration(&step)?;
            }
            if let Some(min_elevation) = min_elevation {
                engine.min_elevation_deg = min_elevation;
            }
            let finder = PassFinder::new(&engine)?;

            let observer = match (lat, lon, altitude_m) {
                (Some(lat), Some(lon), Some(alt)) => Observer::new(lat, lon, alt / 1000.0)?,
                _ => match config.as_ref().and_then(|c| c.station.as_ref()) {
                    Some(station) => {
                        Observer::from_coordinates(&station.coordinates, station.altitude_m)?
                    }
                    None => {
                        return Err(
                            "observer needs --lat, --lon and --altitude-m, or a station in --config"
                                .into(),
                        )
                    }
                },
            };

            let start = parse_instant(start.as_deref())?;
            let loader = load(&source, &engine)?;
            let passes: Vec<_> = finder
                .find_passes_for_all(select(&loader, &source)?, &observer, start)?
                .into_iter()
                .map(|(satellite, pass)| PassReport { satellite, pass })
                .collect();
            log::info!("Found {} passes", passes.len());
            print_json(&passes)
        }
    }
}

fn load(source: &Source, engine: &EngineConfig) -> Result<TleLoader, Box<dyn std::error::Error>> {
    let mut loader = TleLoader::new(source.tle.clone(), engine.clone());
    loader.load_all()?;
    Ok(loader)
}

fn select<'a>(
    loader: &'a TleLoader,
    source: &Source,
) -> Result<Vec<&'a TleEntry>, Box<dyn std::error::Error>> {
    match &source.satellite {
        Some(query) => loader
            .find(query)
            .map(|e| vec![e])
            .ok_or_else(|| format!("no satellite matches {:?}", query).into()),
        None => Ok(loader.satellites()),
    }
}

fn parse_instant(value: Option<&str>) -> Result<DateTime<Utc>, chrono::ParseError> {
    match value {
        Some(s) => DateTime::parse_from_rfc3339(s.trim()).map(|dt| dt.with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
