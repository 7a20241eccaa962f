// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wayfinder command line.
//!
//! Works on the data directory from `WAYFINDER_DATA_DIR` (or `--data-dir`).
//! Results are printed to stdout as JSON; logs go to stderr.
//!
//! ```text
//! wayfinder ingest-surface --location lab --id scan-1 scan.obj
//! wayfinder remove-surface --location lab --id scan-1
//! wayfinder ingest-trace --location lab --device phone walk.csv
//! wayfinder rebuild --location lab
//! wayfinder path --location lab --from 0,0,0 --to 5,0,5
//! wayfinder stats --location lab
//! wayfinder locations
//! ```
//!
//! Each run is a fresh process: commands that read the mesh first wait for
//! the location's stored surfaces and traces to be loaded.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use wayfinder_core::{parse_trace, Point3};
use wayfinder_navigator::{FileCatalog, Navigator, NavigatorConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data directory (overrides WAYFINDER_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a surface scan (OBJ) and rebuild the location
    IngestSurface {
        #[arg(short, long)]
        location: String,
        #[arg(long)]
        id: String,
        file: PathBuf,
    },
    /// Delete a surface scan and rebuild the location
    RemoveSurface {
        #[arg(short, long)]
        location: String,
        #[arg(long)]
        id: String,
    },
    /// Store a position trace (CSV) and learn from it
    IngestTrace {
        #[arg(short, long)]
        location: String,
        #[arg(short, long)]
        device: String,
        file: PathBuf,
    },
    /// Rebuild the mesh engine and floor plans
    Rebuild {
        #[arg(short, long)]
        location: String,
    },
    /// Find a path between two points
    Path {
        #[arg(short, long)]
        location: String,
        /// Start as x,y,z
        #[arg(long, value_parser = parse_point)]
        from: Point3<f64>,
        /// End as x,y,z
        #[arg(long, value_parser = parse_point)]
        to: Point3<f64>,
    },
    /// Print mesh engine counters
    Stats {
        #[arg(short, long)]
        location: String,
    },
    /// List locations in the data directory
    Locations,
}

fn parse_point(s: &str) -> Result<Point3<f64>, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{:?}: {}", v, e)))
        .collect::<Result<Vec<f64>, String>>()?;
    match values.as_slice() {
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z, got {:?}", s)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,wayfinder_navigator=debug".into());
    if args.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let mut config = NavigatorConfig::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    let catalog = FileCatalog::open(config.data_dir.join("catalog.json")).context("opening layer catalog")?;
    let navigator = Navigator::new(config, Arc::new(catalog));

    match args.command {
        Command::IngestSurface { location, id, file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let summary = navigator.ingest_surface(&location, &id, bytes).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::RemoveSurface { location, id } => {
            let summary = navigator.remove_surface(&location, &id).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::IngestTrace { location, device, file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let samples = parse_trace(&text)?;
            navigator.wait_loaded(&location).await?;
            let report = navigator.ingest_trace(&location, &device, &samples).await?;
            println!(
                "{}",
                serde_json::json!({
                    "samples": samples.len(),
                    "hits": report.map(|r| r.hits),
                    "misses": report.map(|r| r.misses),
                })
            );
        }
        Command::Rebuild { location } => {
            let summary = navigator.rebuild_map(&location).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Path { location, from, to } => {
            navigator.wait_loaded(&location).await?;
            let path: Vec<[f64; 3]> = navigator
                .find_path(&location, from, to)
                .iter()
                .map(|p| [p.x, p.y, p.z])
                .collect();
            println!("{}", serde_json::to_string(&path)?);
        }
        Command::Stats { location } => {
            navigator.wait_loaded(&location).await?;
            let stats = navigator.mesh_stats(&location)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Locations => {
            println!("{}", serde_json::to_string(&navigator.locations()?)?);
        }
    }

    let written = navigator.persist_floor_grids()?;
    tracing::debug!(written, "Floor grids persisted");
    Ok(())
}
